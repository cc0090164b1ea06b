use std::fs::{self, FileType};
use std::io::ErrorKind;
use std::path::Path;

use ivault_snapshot::InodeType;

use crate::error::ScanError;

/// Determine what `path` is, without following a final symlink.
///
/// A path that does not exist (or whose parent is no longer a directory) is
/// [`InodeType::Deleted`]. Sockets, FIFOs and device nodes are rejected.
pub fn classify(path: &Path) -> Result<InodeType, ScanError> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return Ok(InodeType::Deleted);
        }
        Err(source) => {
            return Err(ScanError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let file_type = meta.file_type();
    if file_type.is_symlink() {
        Ok(InodeType::Symlink)
    } else if file_type.is_dir() {
        Ok(InodeType::Directory)
    } else if file_type.is_file() {
        Ok(InodeType::File)
    } else {
        Err(ScanError::UnsupportedEntryType {
            path: path.to_path_buf(),
            kind: special_kind(&file_type),
        })
    }
}

#[cfg(unix)]
fn special_kind(file_type: &FileType) -> &'static str {
    use std::os::unix::fs::FileTypeExt;

    if file_type.is_fifo() {
        "fifo"
    } else if file_type.is_socket() {
        "socket"
    } else if file_type.is_block_device() {
        "block device"
    } else if file_type.is_char_device() {
        "character device"
    } else {
        "unknown"
    }
}

#[cfg(not(unix))]
fn special_kind(_file_type: &FileType) -> &'static str {
    "unknown"
}
