use std::path::{Path, PathBuf};

use ivault_chunks::ChunkError;
use ivault_core::IvaultError;
use ivault_crypto::CryptoError;
use ivault_snapshot::{InodeError, StoreError};
use thiserror::Error;

/// Why a scan produced no inode. Every variant names the scanned path.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(
        "{}: unsupported entry type ({kind}); only files, directories and symlinks are indexed",
        .path.display()
    )]
    UnsupportedEntryType { path: PathBuf, kind: &'static str },

    #[error("{}: reading attributes failed: {source}", .path.display())]
    AttributeReadFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: I/O error: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: scan aborted", .path.display())]
    ScanAborted { path: PathBuf },

    #[error("{}: encryption failed: {source}", .path.display())]
    Crypto { path: PathBuf, source: CryptoError },

    #[error("{}: storage failed: {source}", .path.display())]
    Storage { path: PathBuf, source: StoreError },

    #[error("{}: invalid chunking parameters: {source}", .path.display())]
    InvalidParams { path: PathBuf, source: IvaultError },

    #[error("{}: inode assembly failed: {source}", .path.display())]
    Inode { path: PathBuf, source: InodeError },

    #[error("{}: scan worker panicked: {message}", .path.display())]
    WorkerPanicked { path: PathBuf, message: String },
}

impl ScanError {
    /// The path the failed scan was bound to.
    pub fn path(&self) -> &Path {
        match self {
            ScanError::UnsupportedEntryType { path, .. }
            | ScanError::AttributeReadFailure { path, .. }
            | ScanError::Io { path, .. }
            | ScanError::ScanAborted { path }
            | ScanError::Crypto { path, .. }
            | ScanError::Storage { path, .. }
            | ScanError::InvalidParams { path, .. }
            | ScanError::Inode { path, .. }
            | ScanError::WorkerPanicked { path, .. } => path,
        }
    }

    pub(crate) fn from_chunking(path: &Path, err: ChunkError) -> Self {
        let path = path.to_path_buf();
        match err {
            ChunkError::Interrupted => ScanError::ScanAborted { path },
            ChunkError::Io(source) => ScanError::Io { path, source },
            ChunkError::InvalidParams(source) => ScanError::InvalidParams { path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_path() {
        let err = ScanError::ScanAborted {
            path: PathBuf::from("/data/tree/file.bin"),
        };
        assert_eq!(err.to_string(), "/data/tree/file.bin: scan aborted");
        assert_eq!(err.path(), Path::new("/data/tree/file.bin"));
    }

    #[test]
    fn chunk_errors_map_to_scan_errors() {
        let path = Path::new("a");
        assert!(matches!(
            ScanError::from_chunking(path, ChunkError::Interrupted),
            ScanError::ScanAborted { .. }
        ));
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let mapped = ScanError::from_chunking(path, ChunkError::Io(io));
        assert!(matches!(mapped, ScanError::Io { .. }));
        assert!(mapped.to_string().contains("disk gone"));
    }
}
