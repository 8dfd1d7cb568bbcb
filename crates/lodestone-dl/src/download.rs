use std::{
    fs::{self, File},
    io::{BufWriter, Read as _, Write as _},
    path::{Path, PathBuf},
};

use lodestone_utils::{
    fs::{safe_remove, sibling_path},
    hash::{checksum_matches, ChecksumWriter},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    error::{DownloadError, Result},
    types::{ArtifactStream, DownloadReport, Progress},
};

const CHUNK_SIZE: usize = 8192;

/// Streams an [`ArtifactStream`] to a file.
///
/// Bytes go to `<target>.part` first and are renamed over the target only once the whole
/// body has been written, so the target path never holds a partial artifact.
pub struct Download<'a> {
    target: PathBuf,
    expected_checksum: Option<String>,
    strict_checksum: bool,
    cancel: Option<CancellationToken>,
    on_progress: Option<Box<dyn Fn(Progress) + Send + Sync + 'a>>,
}

impl<'a> Download<'a> {
    /// # Examples
    ///
    /// ```no_run
    /// use lodestone_dl::{download::Download, types::ArtifactStream};
    ///
    /// let stream = ArtifactStream::new(&b"data"[..], Some(4));
    /// let report = Download::new("/tmp/pack.zip").execute(stream).unwrap();
    /// assert_eq!(report.bytes, 4);
    /// ```
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            expected_checksum: None,
            strict_checksum: false,
            cancel: None,
            on_progress: None,
        }
    }

    /// Hex SHA-256 the written bytes are compared against.
    ///
    /// Blank values are ignored.
    pub fn expected_checksum(mut self, checksum: Option<impl Into<String>>) -> Self {
        self.expected_checksum = checksum
            .map(Into::into)
            .filter(|c: &String| !c.trim().is_empty());
        self
    }

    /// When set, a checksum mismatch fails the download before the target is touched.
    pub fn strict_checksum(mut self, strict: bool) -> Self {
        self.strict_checksum = strict;
        self
    }

    /// Token checked between chunks. Cancelling aborts the download and removes partial output.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Registers a progress callback, invoked on the thread running [`Download::execute`].
    pub fn progress<F>(mut self, on_progress: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'a,
    {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    /// Performs the download.
    ///
    /// # Errors
    ///
    /// * [`DownloadError::Io`] if reading the body or writing the file fails
    /// * [`DownloadError::Cancelled`] if the token was cancelled
    /// * [`DownloadError::ChecksumMismatch`] in strict mode when the digest differs
    ///
    /// In every error case the `.part` file is removed and whatever was at the target
    /// path before the call is left as it was.
    pub fn execute(self, stream: ArtifactStream) -> Result<DownloadReport> {
        if let Some(parent) = self.target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let part_path = sibling_path(&self.target, ".part");

        let (bytes, checksum) = match self.stream_to(&part_path, stream) {
            Ok(written) => written,
            Err(err) => {
                discard(&part_path);
                return Err(err);
            }
        };

        let verified = match self.expected_checksum.as_deref() {
            None => None,
            Some(expected) if checksum_matches(&checksum, expected) => {
                debug!("Checksum verified for {}", self.target.display());
                Some(true)
            }
            Some(expected) if self.strict_checksum => {
                discard(&part_path);
                return Err(DownloadError::ChecksumMismatch {
                    expected: expected.trim().to_ascii_lowercase(),
                    actual: checksum,
                });
            }
            Some(expected) => {
                warn!(
                    "Checksum mismatch for {}: expected {}, got {}",
                    self.target.display(),
                    expected.trim(),
                    checksum
                );
                Some(false)
            }
        };

        if let Err(err) = fs::rename(&part_path, &self.target) {
            discard(&part_path);
            return Err(err.into());
        }

        Ok(DownloadReport {
            path: self.target,
            bytes,
            checksum,
            verified,
        })
    }

    fn stream_to(&self, part_path: &Path, mut stream: ArtifactStream) -> Result<(u64, String)> {
        let total = stream.content_length;
        self.emit(Progress::Starting {
            total,
        });

        let file = File::create(part_path)?;
        let mut writer = ChecksumWriter::new(BufWriter::new(file));
        let mut buffer = [0u8; CHUNK_SIZE];
        let mut downloaded: u64 = 0;

        loop {
            self.check_cancelled()?;

            let n = stream.reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }

            writer.write_all(&buffer[..n])?;
            downloaded += n as u64;

            self.emit(Progress::Chunk {
                current: downloaded,
                total,
            });
        }

        self.check_cancelled()?;

        let (buffered, checksum) = writer.finish();
        let file = buffered.into_inner().map_err(|err| err.into_error())?;
        file.sync_all()?;

        self.emit(Progress::Complete {
            total: downloaded,
        });

        Ok((downloaded, checksum))
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(DownloadError::Cancelled),
            _ => Ok(()),
        }
    }

    fn emit(&self, progress: Progress) {
        if let Some(ref cb) = self.on_progress {
            cb(progress);
        }
    }
}

fn discard(path: &Path) {
    if let Err(err) = safe_remove(path) {
        warn!("Failed to remove {}: {}", path.display(), err);
    }
}
