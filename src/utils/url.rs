// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

/// Canonical form of a link, used for every equality and dedup comparison.
///
/// Trims surrounding whitespace, upgrades a plain `http://` scheme to
/// `https://` and strips the trailing path separator. Empty input passes
/// through untouched.
///
/// # Examples
/// ```
/// use gofile_relay::utils::url::normalize;
///
/// assert_eq!(normalize("http://x/d/ABC/"), "https://x/d/ABC");
/// assert_eq!(normalize(&normalize(" http://x/d/ABC/ ")), "https://x/d/ABC");
/// ```
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let upgraded = match trimmed.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("http://") => {
            format!("https://{}", &trimmed[7..])
        }
        _ => trimmed.to_string(),
    };

    // Slashes and whitespace can alternate at the end; strip both together
    // so a second pass has nothing left to do.
    upgraded
        .trim_end_matches(|c: char| c == '/' || c.is_whitespace())
        .to_string()
}

/// Repair the `htps://` misspelling the index site sometimes emits.
pub fn fix_scheme(url: &str) -> String {
    match url.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("htps://") => {
            format!("https://{}", &url[7..])
        }
        _ => url.to_string(),
    }
}

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .map(|base| resolve_url(&base, href))
}

/// Extract the lowercase host from a URL string.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_lowercase()))
}

/// Whether the URL's host is `suffix` or a subdomain of it.
pub fn host_matches(url_str: &str, suffix: &str) -> bool {
    let suffix = suffix.to_lowercase();
    get_domain(url_str).is_some_and(|host| {
        host == suffix
            || host
                .strip_suffix(&suffix)
                .is_some_and(|rest| rest.ends_with('.'))
    })
}

/// First non-empty value among the named query parameters, percent-decoded.
pub fn query_param(url_str: &str, names: &[String]) -> Option<String> {
    let parsed = Url::parse(url_str).ok()?;
    names.iter().find_map(|name| {
        parsed
            .query_pairs()
            .find(|(key, value)| key == name.as_str() && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    })
}

/// Substitute the `{page}` placeholder of a paged URL template.
pub fn page_url(template: &str, page: u32) -> String {
    template.replace("{page}", &page.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_example() {
        assert_eq!(normalize("http://x/d/ABC/"), "https://x/d/ABC");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "http://x/d/ABC/",
            "  HTTP://gofile.io/d/Zz9  ",
            "https://gofile.io/d/abc//",
            "https://gofile.io/d/abc/ /",
            "http://",
            "/",
            " / ",
            "gofile.io/d/abc",
            "ftp://host/",
            "",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_normalize_empty_passthrough() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_normalize_keeps_https_and_case_of_path() {
        assert_eq!(
            normalize("https://gofile.io/d/AbC"),
            "https://gofile.io/d/AbC"
        );
    }

    #[test]
    fn test_fix_scheme() {
        assert_eq!(fix_scheme("htps://gofile.io/d/a"), "https://gofile.io/d/a");
        assert_eq!(fix_scheme("https://gofile.io/d/a"), "https://gofile.io/d/a");
        assert_eq!(fix_scheme("ht"), "ht");
    }

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "page.html"),
            "https://example.com/path/page.html"
        );
        assert_eq!(
            resolve_url(&base, "/root.html"),
            "https://example.com/root.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_get_domain() {
        assert_eq!(
            get_domain("https://Example.COM/path"),
            Some("example.com".to_string())
        );
        assert_eq!(get_domain("invalid-url"), None);
    }

    #[test]
    fn test_host_matches_subdomains_only() {
        assert!(host_matches("https://gofilelab.com/out/1", "gofilelab.com"));
        assert!(host_matches("https://www.gofilelab.com/out/1", "gofilelab.com"));
        assert!(!host_matches("https://notgofilelab.com/out/1", "gofilelab.com"));
        assert!(!host_matches("/out/1", "gofilelab.com"));
    }

    #[test]
    fn test_query_param_decodes() {
        let names = vec!["url".to_string(), "u".to_string()];
        assert_eq!(
            query_param(
                "https://gofilelab.com/redirect?u=https%3A%2F%2Fgofile.io%2Fd%2FABCD",
                &names
            ),
            Some("https://gofile.io/d/ABCD".to_string())
        );
        assert_eq!(query_param("https://gofilelab.com/redirect?url=", &names), None);
    }

    #[test]
    fn test_page_url() {
        assert_eq!(
            page_url("https://gofilelab.com/newest?page={page}", 7),
            "https://gofilelab.com/newest?page=7"
        );
    }
}
