//! h5ai directory listing parser
//!
//! The repository is served through h5ai, which renders every directory as
//! an HTML table of links. Only links that resolve to a direct child of the
//! listed directory are kept; parent links, sort links and h5ai's own assets
//! are dropped.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static HREF: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#"(?i)<a\s[^>]*href\s*=\s*["']([^"']+)["']"#).unwrap()
});

/// One child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Last path segment, without a trailing slash
    pub name: String,
    pub url: Url,
    pub is_dir: bool,
}

/// Extract the direct children of `base` from an h5ai HTML page
pub fn parse_listing(html: &str, base: &Url) -> Vec<ListingEntry> {
    let mut entries: Vec<ListingEntry> = Vec::new();

    for capture in HREF.captures_iter(html) {
        let href = &capture[1];
        if href.starts_with('?') || href.starts_with('#') {
            continue;
        }
        let Ok(url) = base.join(href) else { continue };
        if url.query().is_some() {
            continue;
        }
        let Some(rest) = url.path().strip_prefix(base.path()) else {
            continue;
        };
        if url.host_str() != base.host_str()
            || url.port_or_known_default() != base.port_or_known_default()
        {
            continue;
        }

        let is_dir = rest.ends_with('/');
        let name = rest.trim_end_matches('/');
        if name.is_empty() || name.contains('/') || name.starts_with("_h5ai") {
            continue;
        }

        let name = decode_segment(name);
        if entries.iter().any(|e| e.name == name) {
            continue;
        }
        entries.push(ListingEntry { name, url, is_dir });
    }

    entries
}

/// Undo the percent-encoding `Url` applies to spaces and a few reserved bytes
fn decode_segment(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&segment[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
