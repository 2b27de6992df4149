//! Stub collaborators shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::error::{AppError, Result};
use crate::models::PersistedState;
use crate::publisher::{Post, Publisher};
use crate::services::{LinkProbe, PageRenderer, Verdict};
use crate::storage::StateStore;
use crate::utils::{FetchedPage, Fetcher};

/// Canned pages and redirects, recording every request made.
#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, (u16, String)>,
    redirects: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn with_page(mut self, url: &str, status: u16, body: &str) -> Self {
        self.pages
            .insert(url.to_string(), (status, body.to_string()));
        self
    }

    pub fn with_redirect(mut self, url: &str, location: &str) -> Self {
        self.redirects.insert(url.to_string(), location.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<FetchedPage> {
        self.requests.lock().unwrap().push(format!("GET {url}"));
        match self.pages.get(url) {
            Some((status, body)) => Ok(FetchedPage {
                url: url.to_string(),
                status: *status,
                body: body.clone(),
            }),
            None => Err(AppError::fetch(url, "not stubbed")),
        }
    }

    async fn redirect_location(&self, url: &str, _timeout: Duration) -> Result<Option<String>> {
        self.requests.lock().unwrap().push(format!("HEAD {url}"));
        Ok(self.redirects.get(url).cloned())
    }
}

#[derive(Default)]
pub struct StubRenderer {
    pages: HashMap<String, String>,
    rendered: Mutex<Vec<String>>,
}

impl StubRenderer {
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageRenderer for StubRenderer {
    async fn render(&self, url: &str, _timeout: Duration) -> Result<String> {
        self.rendered.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::render(url, "not stubbed"))
    }
}

/// Alive unless told otherwise.
#[derive(Default)]
pub struct StubProbe {
    verdicts: HashMap<String, Verdict>,
    delay: Duration,
    probed: Mutex<Vec<String>>,
}

impl StubProbe {
    pub fn with_verdict(mut self, url: &str, verdict: Verdict) -> Self {
        self.verdicts.insert(url.to_string(), verdict);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl LinkProbe for StubProbe {
    async fn probe(&self, url: &str) -> Verdict {
        self.probed.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.verdicts.get(url).cloned().unwrap_or(Verdict::Alive)
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    posts: Mutex<Vec<Post>>,
    reject_with: Option<u16>,
}

impl RecordingPublisher {
    pub fn rejecting(status: u16) -> Self {
        Self {
            reject_with: Some(status),
            ..Self::default()
        }
    }

    pub fn posts(&self) -> Vec<Post> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, post: &Post) -> Result<String> {
        if let Some(status) = self.reject_with {
            return Err(AppError::Unauthorized {
                status,
                message: "rejected".into(),
            });
        }
        let mut posts = self.posts.lock().unwrap();
        posts.push(post.clone());
        Ok(format!("post-{}", posts.len()))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<PersistedState>,
    saves: Mutex<usize>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    pub fn state(&self) -> PersistedState {
        self.state.lock().unwrap().clone()
    }

    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> PersistedState {
        self.state()
    }

    async fn save(&self, state: &PersistedState) -> Result<()> {
        if self.fail_saves {
            return Err(AppError::Io(std::io::Error::other("disk full")));
        }
        *self.state.lock().unwrap() = state.clone();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

/// Serve one canned response to every connection; returns the base URL.
pub async fn serve(status: u16, body: &'static str, delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                tokio::time::sleep(delay).await;
                let head = request.starts_with(b"HEAD");
                let response = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    if head { "" } else { body }
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}
