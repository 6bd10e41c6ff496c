//! Checksum utilities for artifact and updater integrity
//!
//! Every artifact published on the update server has a sidecar checksum file
//! next to it (`<file>.blake3` or `<file>.sha256`). The same routines verify
//! the running updater binary, fresh downloads (hashed while they stream to
//! disk), and cache entries retained from an earlier run.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::Digest;

use crate::error::{Result, TriquetraError, integrity};

/// Hash prefix for BLAKE3 checksums
pub const BLAKE3_PREFIX: &str = "blake3:";

/// Hash prefix for SHA-256 checksums
pub const SHA256_PREFIX: &str = "sha256:";

/// Supported checksum algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Blake3,
    Sha256,
}

impl ChecksumAlgorithm {
    /// Sidecar suffixes in order of preference
    pub const ALL: [ChecksumAlgorithm; 2] = [ChecksumAlgorithm::Blake3, ChecksumAlgorithm::Sha256];

    pub fn prefix(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Blake3 => BLAKE3_PREFIX,
            ChecksumAlgorithm::Sha256 => SHA256_PREFIX,
        }
    }

    /// Suffix of the sidecar file holding this checksum (`.blake3`, `.sha256`)
    pub fn sidecar_suffix(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Blake3 => ".blake3",
            ChecksumAlgorithm::Sha256 => ".sha256",
        }
    }

    fn hasher(self) -> StreamHasher {
        match self {
            ChecksumAlgorithm::Blake3 => StreamHasher::Blake3(Box::new(blake3::Hasher::new())),
            ChecksumAlgorithm::Sha256 => StreamHasher::Sha256(sha2::Sha256::new()),
        }
    }
}

/// A content checksum: algorithm plus lowercase hex digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checksum {
    algorithm: ChecksumAlgorithm,
    digest: String,
}

impl Checksum {
    /// Build a checksum from a hex digest, validating its shape
    pub fn new(algorithm: ChecksumAlgorithm, digest: &str) -> Result<Self> {
        let digest = digest.trim().to_ascii_lowercase();
        if digest.len() != 64 {
            return Err(integrity::invalid_checksum(
                digest,
                "expected 64 hexadecimal characters",
            ));
        }
        if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(integrity::invalid_checksum(
                digest,
                "contains non-hexadecimal characters",
            ));
        }
        Ok(Self { algorithm, digest })
    }

    /// Parse `blake3:<hex>`, `sha256:<hex>` or a bare hex digest.
    ///
    /// A bare digest takes `default_algorithm`.
    pub fn parse(value: &str, default_algorithm: ChecksumAlgorithm) -> Result<Self> {
        let value = value.trim();
        for algorithm in ChecksumAlgorithm::ALL {
            if let Some(rest) = value.strip_prefix(algorithm.prefix()) {
                return Self::new(algorithm, rest);
            }
        }
        Self::new(default_algorithm, value)
    }

    /// Parse the contents of a sidecar file (`<hex>  <filename>` format).
    pub fn from_sidecar(contents: &str, algorithm: ChecksumAlgorithm) -> Result<Self> {
        let token = contents
            .split_whitespace()
            .next()
            .ok_or_else(|| integrity::invalid_checksum(contents.trim(), "sidecar file is empty"))?;
        Self::parse(token, algorithm)
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.algorithm.prefix(), self.digest)
    }
}

impl TryFrom<String> for Checksum {
    type Error = TriquetraError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value, ChecksumAlgorithm::default())
    }
}

impl From<Checksum> for String {
    fn from(value: Checksum) -> Self {
        value.to_string()
    }
}

enum StreamHasher {
    Blake3(Box<blake3::Hasher>),
    Sha256(sha2::Sha256),
}

impl StreamHasher {
    fn update(&mut self, bytes: &[u8]) {
        match self {
            StreamHasher::Blake3(h) => {
                h.update(bytes);
            }
            StreamHasher::Sha256(h) => h.update(bytes),
        }
    }

    fn finalize(self) -> Checksum {
        match self {
            StreamHasher::Blake3(h) => Checksum {
                algorithm: ChecksumAlgorithm::Blake3,
                digest: h.finalize().to_hex().to_string(),
            },
            StreamHasher::Sha256(h) => Checksum {
                algorithm: ChecksumAlgorithm::Sha256,
                digest: hex::encode(h.finalize()),
            },
        }
    }
}

/// Writer adapter that hashes everything written through it
///
/// Used to checksum a download while it streams to disk.
pub struct HashingWriter<W: Write> {
    inner: W,
    hasher: StreamHasher,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W, algorithm: ChecksumAlgorithm) -> Self {
        Self {
            inner,
            hasher: algorithm.hasher(),
            written: 0,
        }
    }

    /// Number of bytes written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Finish hashing, returning the inner writer and the checksum
    pub fn finish(self) -> (W, Checksum) {
        (self.inner, self.hasher.finalize())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Hash everything readable from `reader`
pub fn hash_reader<R: Read>(reader: R, algorithm: ChecksumAlgorithm) -> io::Result<Checksum> {
    let mut reader = BufReader::new(reader);
    let mut hasher = algorithm.hasher();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}

/// Calculate the checksum of a file
pub fn hash_file(path: &Path, algorithm: ChecksumAlgorithm) -> Result<Checksum> {
    let file = File::open(path).map_err(|e| integrity::compute_failed(path, e))?;
    hash_reader(file, algorithm).map_err(|e| integrity::compute_failed(path, e))
}

/// Verify a file against an expected checksum
///
/// Returns `Ok(false)` on mismatch; unreadable files fail with
/// [`TriquetraError::ChecksumCompute`].
pub fn verify_file(path: &Path, expected: &Checksum) -> Result<bool> {
    let actual = hash_file(path, expected.algorithm())?;
    Ok(verify_hash(expected, &actual))
}

/// Verify a hash matches the expected value
pub fn verify_hash(expected: &Checksum, actual: &Checksum) -> bool {
    expected.algorithm == actual.algorithm && expected.digest == actual.digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ABC_BLAKE3: &str = "6437b3ac38465133ffb63b75273a8db548c558465d79db03fd359c6cd5bd9d85";
    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn test_hash_file_blake3() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.bin");
        std::fs::write(&file_path, "abc").unwrap();

        let hash = hash_file(&file_path, ChecksumAlgorithm::Blake3).unwrap();
        assert_eq!(hash.digest(), ABC_BLAKE3);
        assert_eq!(hash.to_string(), format!("{BLAKE3_PREFIX}{ABC_BLAKE3}"));
    }

    #[test]
    fn test_hash_file_sha256() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.bin");
        std::fs::write(&file_path, "abc").unwrap();

        let hash = hash_file(&file_path, ChecksumAlgorithm::Sha256).unwrap();
        assert_eq!(hash.digest(), ABC_SHA256);
    }

    #[test]
    fn test_hash_file_not_found() {
        let result = hash_file(
            Path::new("/nonexistent/file.bin"),
            ChecksumAlgorithm::Blake3,
        );
        assert!(matches!(
            result,
            Err(TriquetraError::ChecksumCompute { .. })
        ));
    }

    #[test]
    fn test_hashing_writer_matches_file_hash() {
        let mut writer = HashingWriter::new(Vec::new(), ChecksumAlgorithm::Blake3);
        writer.write_all(b"a").unwrap();
        writer.write_all(b"bc").unwrap();
        assert_eq!(writer.written(), 3);

        let (bytes, checksum) = writer.finish();
        assert_eq!(bytes, b"abc");
        assert_eq!(checksum.digest(), ABC_BLAKE3);
    }

    #[test]
    fn test_parse_prefixed_and_bare() {
        let prefixed = Checksum::parse(&format!("sha256:{ABC_SHA256}"), ChecksumAlgorithm::Blake3)
            .unwrap();
        assert_eq!(prefixed.algorithm(), ChecksumAlgorithm::Sha256);

        let bare = Checksum::parse(&ABC_BLAKE3.to_uppercase(), ChecksumAlgorithm::Blake3).unwrap();
        assert_eq!(bare.algorithm(), ChecksumAlgorithm::Blake3);
        assert_eq!(bare.digest(), ABC_BLAKE3);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Checksum::parse("abc123", ChecksumAlgorithm::Blake3).is_err());
        assert!(Checksum::parse(&"z".repeat(64), ChecksumAlgorithm::Blake3).is_err());
    }

    #[test]
    fn test_from_sidecar() {
        let sidecar = format!("{ABC_SHA256}  windows11.0-kb5043080-x64.esd\n");
        let checksum = Checksum::from_sidecar(&sidecar, ChecksumAlgorithm::Sha256).unwrap();
        assert_eq!(checksum.digest(), ABC_SHA256);

        assert!(Checksum::from_sidecar("   \n", ChecksumAlgorithm::Sha256).is_err());
    }

    #[test]
    fn test_verify_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("artifact.cab");
        std::fs::write(&file_path, "abc").unwrap();

        let good = Checksum::new(ChecksumAlgorithm::Blake3, ABC_BLAKE3).unwrap();
        assert!(verify_file(&file_path, &good).unwrap());

        std::fs::write(&file_path, "abd").unwrap();
        assert!(!verify_file(&file_path, &good).unwrap());
    }

    #[test]
    fn test_verify_hash_requires_same_algorithm() {
        let a = Checksum::new(ChecksumAlgorithm::Blake3, ABC_SHA256).unwrap();
        let b = Checksum::new(ChecksumAlgorithm::Sha256, ABC_SHA256).unwrap();
        assert!(!verify_hash(&a, &b));
        assert!(verify_hash(&a, &a.clone()));
    }
}
