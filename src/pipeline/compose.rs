// src/pipeline/compose.rs

//! Post text composition.

use unicode_segmentation::UnicodeSegmentation;

use crate::models::{Candidate, PublisherConfig};

/// A batch entry with its lifetime sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedLink {
    pub number: u64,
    pub url: String,
}

/// Number a batch in order, starting at `first`.
pub fn number_batch(batch: &[Candidate], first: u64) -> Vec<NumberedLink> {
    batch
        .iter()
        .zip(first..)
        .map(|(candidate, number)| NumberedLink {
            number,
            url: candidate.canonical.clone(),
        })
        .collect()
}

/// Final post text and how many links made it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub text: String,
    pub included: usize,
}

/// Lays numbered links out as one post within the platform's length limit.
#[derive(Debug, Clone)]
pub struct Composer {
    limit: usize,
    url_weight: usize,
}

impl Composer {
    pub fn new(config: &PublisherConfig) -> Self {
        Self {
            limit: config.tweet_limit,
            url_weight: config.url_weight,
        }
    }

    /// Length as the platform counts it: every URL weighs a fixed amount,
    /// everything else counts per grapheme.
    pub fn weighted_len(&self, text: &str) -> usize {
        text.split_inclusive(char::is_whitespace)
            .map(|token| {
                let word = token.trim_end();
                let tail = &token[word.len()..];
                match word.find("https://").or_else(|| word.find("http://")) {
                    Some(at) => {
                        word[..at].graphemes(true).count()
                            + self.url_weight
                            + tail.graphemes(true).count()
                    }
                    None => token.graphemes(true).count(),
                }
            })
            .sum()
    }

    fn layout(links: &[NumberedLink], separator: &str) -> String {
        links
            .iter()
            .map(|link| format!("{}.{}{}", link.number, separator, link.url))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `"{n}. {url}"` lines. Over the limit the space after the number goes,
    /// then trailing lines until the text fits.
    pub fn compose(&self, links: &[NumberedLink]) -> Composed {
        let text = Self::layout(links, " ");
        if self.weighted_len(&text) <= self.limit {
            return Composed {
                text,
                included: links.len(),
            };
        }

        let mut included = links.len();
        loop {
            let text = Self::layout(&links[..included], "");
            if included <= 1 || self.weighted_len(&text) <= self.limit {
                if included < links.len() {
                    log::warn!(
                        "Post too long, dropped {} trailing links",
                        links.len() - included
                    );
                }
                return Composed { text, included };
            }
            included -= 1;
        }
    }
}
