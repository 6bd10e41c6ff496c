//! In-memory transport
//!
//! Serves a file tree held in memory and renders h5ai-style listings for
//! directory URLs. Endpoints can be made unreachable or slow, and every
//! request is recorded, which is what the engine tests need to drive mirror
//! selection and check download counts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use url::Url;

use super::{RemoteBody, Transport};
use crate::error::{Result, network};

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<String, Vec<u8>>,
    unreachable: Vec<String>,
    delays: Vec<(String, Duration)>,
    requests: Vec<String>,
}

/// A remote file tree kept in memory
#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: Mutex<State>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Add or replace a file
    pub fn insert(&self, url: &str, bytes: impl Into<Vec<u8>>) {
        self.state().files.insert(url.to_string(), bytes.into());
    }

    pub fn remove(&self, url: &str) {
        self.state().files.remove(url);
    }

    /// Fail every request whose URL starts with `prefix`
    pub fn set_unreachable(&self, prefix: &str) {
        self.state().unreachable.push(prefix.to_string());
    }

    /// Delay every request whose URL starts with `prefix`
    pub fn set_delay(&self, prefix: &str, delay: Duration) {
        self.state().delays.push((prefix.to_string(), delay));
    }

    /// Requests served so far, as `GET <url>` / `HEAD <url>`
    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }

    /// Number of GET requests made for `url`
    pub fn get_count(&self, url: &str) -> usize {
        let wanted = format!("GET {url}");
        self.state().requests.iter().filter(|r| **r == wanted).count()
    }

    /// Record the request and apply reachability and delay rules
    fn enter(&self, method: &str, url: &Url, timeout: Option<Duration>) -> Result<()> {
        let delay = {
            let mut state = self.state();
            state.requests.push(format!("{method} {url}"));
            if state.unreachable.iter().any(|p| url.as_str().starts_with(p)) {
                return Err(network::http(url, "connection refused"));
            }
            state
                .delays
                .iter()
                .find(|(p, _)| url.as_str().starts_with(p))
                .map(|(_, d)| *d)
        };

        if let Some(delay) = delay {
            match timeout {
                Some(limit) if delay > limit => {
                    thread::sleep(limit);
                    return Err(network::http(url, "operation timed out"));
                }
                _ => thread::sleep(delay),
            }
        }
        Ok(())
    }

    fn render_listing(&self, dir: &Url) -> Option<String> {
        let state = self.state();
        let prefix = dir.as_str();
        let mut children = BTreeSet::new();
        for key in state.files.keys() {
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((child, _)) => children.insert(format!("{child}/")),
                None => children.insert(rest.to_string()),
            };
        }
        if children.is_empty() {
            return None;
        }

        let mut html = String::from("<html><body><table>\n<tr><td><a href=\"..\">Parent Directory</a></td></tr>\n");
        for child in children {
            let label = child.trim_end_matches('/');
            let _ = writeln!(
                html,
                "<tr><td><a href=\"{}{child}\">{label}</a></td></tr>",
                dir.path()
            );
        }
        html.push_str("</table></body></html>\n");
        Some(html)
    }
}

impl Transport for MemoryTransport {
    fn open(&self, url: &Url, timeout: Option<Duration>) -> Result<RemoteBody> {
        self.enter("GET", url, timeout)?;

        if let Some(bytes) = self.state().files.get(url.as_str()).cloned() {
            return Ok(RemoteBody {
                len: Some(bytes.len() as u64),
                reader: Box::new(Cursor::new(bytes)),
            });
        }

        if url.path().ends_with('/') {
            if let Some(html) = self.render_listing(url) {
                return Ok(RemoteBody {
                    len: Some(html.len() as u64),
                    reader: Box::new(Cursor::new(html.into_bytes())),
                });
            }
        }

        Err(network::http(url, "HTTP 404 Not Found"))
    }

    fn exists(&self, url: &Url) -> Result<bool> {
        self.enter("HEAD", url, None)?;
        let state = self.state();
        let key = url.as_str();
        Ok(state.files.contains_key(key)
            || state
                .files
                .keys()
                .any(|k| k.starts_with(key) && key.ends_with('/')))
    }
}
