use std::{fmt, io::Read, path::PathBuf, time::Duration};

/// Download progress events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Starting { total: Option<u64> },
    Chunk { current: u64, total: Option<u64> },
    Complete { total: u64 },
}

impl Progress {
    /// Completed fraction for this event.
    ///
    /// `None` when the size is unknown or zero, so no fraction is made up. A completed
    /// download always reports exactly `1.0`.
    pub fn fraction(&self) -> Option<f64> {
        match *self {
            Progress::Starting { .. } => None,
            Progress::Chunk {
                current,
                total: Some(total),
            } if total > 0 => Some((current as f64 / total as f64).min(1.0)),
            Progress::Chunk { .. } => None,
            Progress::Complete { .. } => Some(1.0),
        }
    }
}

/// How long a request may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTimeout {
    /// Bounds the whole exchange, body included.
    Total(Duration),
    /// Bounds connecting and receiving the response head. The body may take as long as it needs.
    UntilHeaders(Duration),
}

/// An open response body for an artifact.
pub struct ArtifactStream {
    pub reader: Box<dyn Read + Send>,
    /// Value of the `Content-Length` header, if the server sent a parseable one.
    pub content_length: Option<u64>,
}

impl ArtifactStream {
    pub fn new(reader: impl Read + Send + 'static, content_length: Option<u64>) -> Self {
        Self {
            reader: Box::new(reader),
            content_length,
        }
    }
}

impl fmt::Debug for ArtifactStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Outcome of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub path: PathBuf,
    pub bytes: u64,
    /// Lower-case hex SHA-256 of the written bytes.
    pub checksum: String,
    /// `None` when no expected checksum was supplied.
    pub verified: Option<bool>,
}
