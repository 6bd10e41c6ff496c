//! Progress bar display for downloads and long-running steps

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Creates progress bars, or hidden ones when output is not interactive
#[derive(Debug, Clone, Copy)]
pub struct ProgressDisplay {
    enabled: bool,
}

impl ProgressDisplay {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Progress display that draws nothing
    pub fn hidden() -> Self {
        Self { enabled: false }
    }

    /// Byte progress for one download; a spinner when the length is unknown
    pub fn download(&self, file_name: &str, len: Option<u64>) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = match len {
            Some(len) => {
                let style = ProgressStyle::default_bar()
                    .template("  [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-");
                let pb = ProgressBar::new(len);
                pb.set_style(style);
                pb
            }
            None => {
                let style = ProgressStyle::default_spinner()
                    .template("  {spinner} {bytes} ({bytes_per_sec}) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner());
                let pb = ProgressBar::new_spinner();
                pb.set_style(style);
                pb
            }
        };
        pb.set_message(truncate(file_name));
        pb
    }

    /// Spinner for a step without measurable progress
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let pb = ProgressBar::new_spinner();
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

/// Truncate long file names for display
fn truncate(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() > 50 {
        let tail: String = chars[chars.len() - 47..].iter().collect();
        format!("...{tail}")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bars() {
        let display = ProgressDisplay::hidden();
        let pb = display.download("windows11.0-kb5043080-x64.esd", Some(10));
        pb.inc(5);
        assert!(pb.is_hidden());
        assert!(display.spinner("Selecting server").is_hidden());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short.cab"), "short.cab");
        let long = "x".repeat(60);
        let truncated = truncate(&long);
        assert_eq!(truncated.chars().count(), 50);
        assert!(truncated.starts_with("..."));
    }
}
