use std::io::{self, Write};

use sha2::{Digest, Sha256};

/// Compares two hex digests case-insensitively.
pub fn checksum_matches(actual: &str, expected: &str) -> bool {
    actual.trim().eq_ignore_ascii_case(expected.trim())
}

/// A writer adapter that hashes every byte it forwards.
///
/// Wrap the destination of a streamed download in a `ChecksumWriter` to obtain the
/// digest of exactly the bytes that reached the destination, without a second pass.
pub struct ChecksumWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> ChecksumWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    /// Returns the wrapped writer and the hex digest of everything written through it.
    pub fn finish(self) -> (W, String) {
        (self.inner, hex::encode(self.hasher.finalize()))
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_WORLD_NL: &str = "a948904f2f0f479b8f8197694b30184b0d2ed1c1cd2a1ec0fb85d299a192a447";

    #[test]
    fn test_checksum_matches_ignores_case_and_whitespace() {
        assert!(checksum_matches(HELLO_WORLD_NL, &HELLO_WORLD_NL.to_uppercase()));
        assert!(checksum_matches(HELLO_WORLD_NL, &format!(" {HELLO_WORLD_NL}\n")));
        assert!(!checksum_matches(HELLO_WORLD_NL, "invalid-checksum"));
    }

    #[test]
    fn test_checksum_writer_matches_file_hash() {
        let mut writer = ChecksumWriter::new(Vec::new());
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world\n").unwrap();

        let (bytes, digest) = writer.finish();
        assert_eq!(bytes, b"hello world\n");
        assert_eq!(digest, HELLO_WORLD_NL);
    }

    #[test]
    fn test_checksum_writer_empty() {
        let (_, digest) = ChecksumWriter::new(Vec::new()).finish();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
