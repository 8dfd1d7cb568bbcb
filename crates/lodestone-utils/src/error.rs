use std::{error::Error, fmt, io, path::PathBuf};

/// Failure while expanding a user supplied path.
#[derive(Debug)]
pub enum PathError {
    Empty,
    CurrentDir(io::Error),
    UndefinedVariable { name: String, path: String },
    UnterminatedBrace { path: String },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Path is empty"),
            Self::CurrentDir(err) => write!(f, "Cannot determine working directory: {err}"),
            Self::UndefinedVariable { name, path } => {
                write!(f, "`${name}` is not defined (while expanding `{path}`)")
            }
            Self::UnterminatedBrace { path } => write!(f, "Missing `}}` in `{path}`"),
        }
    }
}

impl Error for PathError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CurrentDir(err) => Some(err),
            _ => None,
        }
    }
}

/// What was being done to a path when the filesystem refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOp {
    CreateDir,
    Write,
    Rename,
    Remove,
}

impl FsOp {
    fn describe(self) -> &'static str {
        match self {
            Self::CreateDir => "create directory",
            Self::Write => "write",
            Self::Rename => "move into place",
            Self::Remove => "remove",
        }
    }
}

#[derive(Debug)]
pub enum FileSystemError {
    Io {
        op: FsOp,
        path: PathBuf,
        source: io::Error,
    },
    NotADirectory(PathBuf),
}

impl FileSystemError {
    pub fn io(op: FsOp, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Io { path, .. } | Self::NotADirectory(path) => path,
        }
    }
}

impl fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { op, path, source } => {
                write!(f, "Cannot {} `{}`: {source}", op.describe(), path.display())
            }
            Self::NotADirectory(path) => {
                write!(f, "`{}` exists and is not a directory", path.display())
            }
        }
    }
}

impl Error for FileSystemError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::NotADirectory(_) => None,
        }
    }
}

#[derive(Debug)]
pub enum UtilsError {
    Path(PathError),
    FileSystem(FileSystemError),
}

impl fmt::Display for UtilsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(err) => err.fmt(f),
            Self::FileSystem(err) => err.fmt(f),
        }
    }
}

impl Error for UtilsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Path(err) => Some(err),
            Self::FileSystem(err) => Some(err),
        }
    }
}

impl From<PathError> for UtilsError {
    fn from(err: PathError) -> Self {
        Self::Path(err)
    }
}

impl From<FileSystemError> for UtilsError {
    fn from(err: FileSystemError) -> Self {
        Self::FileSystem(err)
    }
}

pub type FileSystemResult<T> = std::result::Result<T, FileSystemError>;
pub type PathResult<T> = std::result::Result<T, PathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_system_error_message() {
        let err = FileSystemError::io(
            FsOp::Rename,
            "/cache/default.json",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "Cannot move into place `/cache/default.json`: denied"
        );
        assert!(err.source().is_some());
        assert_eq!(err.path(), &PathBuf::from("/cache/default.json"));

        let err = FileSystemError::NotADirectory(PathBuf::from("/cache"));
        assert_eq!(err.to_string(), "`/cache` exists and is not a directory");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_path_error_message() {
        let err = PathError::UndefinedVariable {
            name: "PACKS".into(),
            path: "$PACKS/x".into(),
        };
        assert_eq!(
            err.to_string(),
            "`$PACKS` is not defined (while expanding `$PACKS/x`)"
        );
        assert_eq!(
            PathError::UnterminatedBrace { path: "${A".into() }.to_string(),
            "Missing `}` in `${A`"
        );
    }

    #[test]
    fn test_utils_error_wraps_source() {
        let err = UtilsError::from(PathError::Empty);
        assert_eq!(err.to_string(), "Path is empty");
        assert!(err.source().is_some());
    }
}
