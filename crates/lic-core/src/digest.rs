//! # Digests: h1 and h2
//!
//! Both license digests are SHA-256 rendered as 64 lowercase hex characters.
//!
//! - [`metadata_digest`] hashes an ordered list of already-canonicalized
//!   string fields by plain concatenation. No separators are inserted, so the
//!   caller owns field order and formatting.
//! - [`FileHasher`] / [`file_digest`] hash a byte stream incrementally with a
//!   fixed-size buffer. Documents can be tens of megabytes and are never
//!   buffered whole.

use std::io::{ErrorKind, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// Read buffer for streamed hashing.
const CHUNK_SIZE: usize = 64 * 1024;

// ─── HexDigest ───────────────────────────────────────────────────────

/// A SHA-256 digest as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexDigest(String);

impl HexDigest {
    /// Validate and wrap a hex string. Uppercase input is rejected rather
    /// than folded, since stored and ledger digests are compared as strings.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let valid = s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(ValidationError::InvalidDigest(s.to_string()))
        }
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HexDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HexDigest {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexDigest> for String {
    fn from(d: HexDigest) -> Self {
        d.0
    }
}

impl AsRef<str> for HexDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ─── Metadata Hasher ─────────────────────────────────────────────────

/// SHA-256 over the concatenation of `fields`, in order.
pub fn metadata_digest<S: AsRef<str>>(fields: &[S]) -> HexDigest {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.as_ref().as_bytes());
    }
    HexDigest::from_bytes(&hasher.finalize())
}

// ─── File Hasher ─────────────────────────────────────────────────────

/// Incremental SHA-256 over a byte stream.
///
/// Used directly when the bytes arrive as chunks (an upload body), or via
/// [`file_digest`] when they come from a [`Read`].
#[derive(Debug, Clone, Default)]
pub struct FileHasher {
    inner: Sha256,
    bytes: u64,
}

impl FileHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk.
    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Number of bytes consumed so far.
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes
    }

    /// Consume the hasher, returning the digest.
    pub fn finalize(self) -> HexDigest {
        HexDigest::from_bytes(&self.inner.finalize())
    }
}

/// Hash a reader to exhaustion. Fails if any read fails; a partial stream
/// never produces a digest.
pub fn file_digest<R: Read>(mut reader: R) -> std::io::Result<HexDigest> {
    let mut hasher = FileHasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(hasher.finalize())
}

/// Hash the file at `path`.
pub fn file_digest_path(path: impl AsRef<Path>) -> std::io::Result<HexDigest> {
    let file = std::fs::File::open(path.as_ref())?;
    file_digest(std::io::BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-256("") and SHA-256("abc").
    const EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn metadata_digest_concatenates_without_separator() {
        assert_eq!(metadata_digest(&["a", "b", "c"]).as_str(), ABC);
        assert_eq!(metadata_digest(&["abc"]).as_str(), ABC);
    }

    #[test]
    fn metadata_digest_of_nothing_is_empty_hash() {
        let none: [&str; 0] = [];
        assert_eq!(metadata_digest(&none).as_str(), EMPTY);
    }

    #[test]
    fn file_digest_matches_known_vector() {
        assert_eq!(file_digest(&b"abc"[..]).unwrap().as_str(), ABC);
        assert_eq!(file_digest(&b""[..]).unwrap().as_str(), EMPTY);
    }

    #[test]
    fn file_digest_spans_multiple_chunks() {
        let data = vec![7u8; CHUNK_SIZE * 3 + 17];
        let streamed = file_digest(&data[..]).unwrap();
        let mut one_shot = FileHasher::new();
        one_shot.update(&data);
        assert_eq!(one_shot.bytes_hashed(), data.len() as u64);
        assert_eq!(streamed, one_shot.finalize());
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.served {
                Err(std::io::Error::new(ErrorKind::BrokenPipe, "connection reset"))
            } else {
                self.served = true;
                buf[0] = b'x';
                Ok(1)
            }
        }
    }

    #[test]
    fn read_failure_yields_no_digest() {
        let err = file_digest(FailingReader { served: false }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }

    #[test]
    fn file_digest_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(file_digest_path(&path).unwrap().as_str(), ABC);
    }

    #[test]
    fn file_digest_path_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = file_digest_path(dir.path().join("absent")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn hex_digest_parse_validates_shape() {
        assert!(HexDigest::parse(ABC).is_ok());
        assert!(HexDigest::parse(&ABC.to_uppercase()).is_err());
        assert!(HexDigest::parse(&ABC[..63]).is_err());
        assert!(HexDigest::parse(&format!("{}g", &ABC[..63])).is_err());
    }

    #[test]
    fn hex_digest_deserialize_rejects_bad_input() {
        let ok: HexDigest = serde_json::from_str(&format!("\"{ABC}\"")).unwrap();
        assert_eq!(ok.as_str(), ABC);
        assert!(serde_json::from_str::<HexDigest>("\"deadbeef\"").is_err());
    }
}
