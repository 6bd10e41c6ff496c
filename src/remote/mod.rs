//! Access to the remote update repository
//!
//! Everything the engine fetches goes through the [`Transport`] trait:
//! the speed test file, directory listings, sentinel checks, checksum
//! sidecars and the artifacts themselves. [`HttpTransport`] talks to the
//! real servers; [`MemoryTransport`] serves an in-memory tree.

pub mod http;
pub mod listing;
pub mod memory;

use std::io::Read;
use std::time::Duration;

use url::Url;

use crate::error::{Result, network};

pub use http::HttpTransport;
pub use listing::{ListingEntry, parse_listing};
pub use memory::MemoryTransport;

/// An open response body
pub struct RemoteBody {
    /// Content length, when the server announced one
    pub len: Option<u64>,
    pub reader: Box<dyn Read + Send>,
}

impl std::fmt::Debug for RemoteBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBody").field("len", &self.len).finish()
    }
}

/// Blocking access to a remote file tree
pub trait Transport: Send + Sync {
    /// Open `url` for reading. With a timeout the whole request, body
    /// included, must finish within it.
    fn open(&self, url: &Url, timeout: Option<Duration>) -> Result<RemoteBody>;

    /// Whether `url` exists
    fn exists(&self, url: &Url) -> Result<bool>;

    /// Fetch `url` as text
    fn get_text(&self, url: &Url) -> Result<String> {
        let mut body = self.open(url, None)?;
        let mut text = String::new();
        body.reader
            .read_to_string(&mut text)
            .map_err(|e| network::http(url, e))?;
        Ok(text)
    }

    /// List the entries of a directory URL; a page without links is not a
    /// listing
    fn list(&self, url: &Url) -> Result<Vec<ListingEntry>> {
        let html = self.get_text(url)?;
        if !html.to_ascii_lowercase().contains("<a") {
            return Err(network::listing_parse(url, "response is not a directory listing"));
        }
        Ok(parse_listing(&html, url))
    }
}

/// Join a path relative to a directory URL
pub fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| network::http(base, format!("cannot join '{path}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TriquetraError;

    #[test]
    fn test_list_rejects_page_without_links() {
        let transport = MemoryTransport::new();
        transport.insert("http://primary.test/26100.1742/", "Service Unavailable");
        let url = Url::parse("http://primary.test/26100.1742/").unwrap();

        assert!(matches!(
            transport.list(&url),
            Err(TriquetraError::ListingParse { .. })
        ));
    }

    #[test]
    fn test_join_stays_inside_directory() {
        let base = Url::parse("http://primary.test/updates/").unwrap();
        assert_eq!(
            join(&base, "26100.1742/amd64/").unwrap().as_str(),
            "http://primary.test/updates/26100.1742/amd64/"
        );
    }
}
