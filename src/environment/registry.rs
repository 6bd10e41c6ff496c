//! `reg query` output parsing
//!
//! The probe shells out to `reg query` instead of binding the registry API,
//! so the parser only has to understand lines of the form
//!
//! ```text
//!     BuildLab    REG_SZ    26100.ge_release.240331-1435
//!     UBR    REG_DWORD    0x6ce
//! ```

use std::collections::HashMap;
use std::process::Command;

use crate::error::{Result, environment};

/// Registry key holding the OS version values
pub const CURRENT_VERSION_KEY: &str = r"HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion";

/// Values read from the `CurrentVersion` key, keyed by value name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryValues {
    values: HashMap<String, String>,
}

impl RegistryValues {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Read a `REG_DWORD` value as a number
    pub fn get_dword(&self, name: &str) -> Option<u32> {
        let raw = self.get(name)?;
        match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse().ok(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }
}

/// Parse the text printed by `reg query <key>`
pub fn parse_reg_query(output: &str) -> RegistryValues {
    let mut values = RegistryValues::default();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("HKEY_") {
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else { continue };
        let Some(kind) = parts.next() else { continue };
        if !kind.starts_with("REG_") {
            continue;
        }

        // REG_SZ data may contain spaces
        let data = parts.collect::<Vec<_>>().join(" ");
        values.insert(name, data);
    }

    values
}

/// Run `reg query` against the `CurrentVersion` key
pub fn query_current_version() -> Result<RegistryValues> {
    let output = Command::new("reg")
        .args(["query", CURRENT_VERSION_KEY])
        .output()
        .map_err(|e| environment::read_failed(format!("could not run reg query: {e}")))?;

    if !output.status.success() {
        return Err(environment::read_failed(format!(
            "reg query exited with {}",
            output.status
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    Ok(parse_reg_query(&text))
}
