//! Platform attribute collection
//!
//! The scanner only talks to [`AttributeCollector`]; which implementation
//! backs [`default_collector`] is decided at build time.

use std::io;
use std::path::Path;
use std::sync::Arc;

use ivault_snapshot::{PlatformAttributes, Timestamp};

/// Attributes read from one entry, without following a final symlink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryAttributes {
    pub mtime: Timestamp,
    pub platform: PlatformAttributes,
}

pub trait AttributeCollector: Send + Sync {
    fn collect(&self, path: &Path) -> io::Result<EntryAttributes>;

    /// Resolution of mtimes reported for `path`, in nanoseconds.
    fn mtime_granularity(&self, path: &Path) -> u64;
}

/// The collector for the platform this crate was built for.
pub fn default_collector() -> Arc<dyn AttributeCollector> {
    #[cfg(unix)]
    let collector = UnixAttributes;
    #[cfg(windows)]
    let collector = WindowsAttributes;
    #[cfg(not(any(unix, windows)))]
    let collector = PortableAttributes;

    Arc::new(collector)
}

/// `lstat`: mode, uid, gid and a nanosecond mtime.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixAttributes;

#[cfg(unix)]
impl AttributeCollector for UnixAttributes {
    fn collect(&self, path: &Path) -> io::Result<EntryAttributes> {
        use std::os::unix::fs::MetadataExt;

        let meta = std::fs::symlink_metadata(path)?;
        Ok(EntryAttributes {
            mtime: Timestamp::new(meta.mtime(), meta.mtime_nsec() as u32),
            platform: PlatformAttributes {
                mode: meta.mode(),
                uid: meta.uid(),
                gid: meta.gid(),
                ..Default::default()
            },
        })
    }

    fn mtime_granularity(&self, path: &Path) -> u64 {
        // statfs follows symlinks; a link lives on its directory's filesystem
        let fs_path = match path.parent() {
            Some(parent) if is_symlink(path) && !parent.as_os_str().is_empty() => parent,
            _ => path,
        };
        let name = filesystem_name(fs_path)
            .or_else(|| fs_path.parent().and_then(filesystem_name));
        name.map_or(1, |name| filesystem_granularity(&name))
    }
}

/// Timestamp resolution of a filesystem type, in nanoseconds.
///
/// Types are named as `statfs` on macOS reports them (`msdos`, `exfat`,
/// `hfs`, ...). Anything unknown is assumed to keep nanoseconds.
pub fn filesystem_granularity(fs_type: &str) -> u64 {
    match fs_type {
        "msdos" | "vfat" | "fat" => 2_000_000_000,
        "exfat" => 10_000_000,
        "hfs" | "hfsplus" | "iso9660" | "cd9660" | "smbfs" => 1_000_000_000,
        "ntfs" | "ntfs3" | "cifs" => 100,
        _ => 1,
    }
}

#[cfg(unix)]
fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn filesystem_name(path: &Path) -> Option<String> {
    let stat = nix::sys::statfs::statfs(path).ok()?;
    let name = match stat.filesystem_type().0 as i64 {
        0x4d44 => "msdos",
        0x2011_bab0 => "exfat",
        0x4244 => "hfs",
        0x482b => "hfsplus",
        0x9660 => "iso9660",
        0x517b => "smbfs",
        0xff53_4d42 => "cifs",
        0x5346_544e => "ntfs",
        _ => return None,
    };
    Some(name.to_string())
}

#[cfg(target_os = "macos")]
fn filesystem_name(path: &Path) -> Option<String> {
    let stat = nix::sys::statfs::statfs(path).ok()?;
    Some(stat.filesystem_type_name().to_string())
}

#[cfg(all(
    unix,
    not(any(target_os = "linux", target_os = "android", target_os = "macos"))
))]
fn filesystem_name(_path: &Path) -> Option<String> {
    None
}

/// File attribute bits and the last write time (100 ns FILETIME ticks).
#[cfg(windows)]
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsAttributes;

#[cfg(windows)]
impl AttributeCollector for WindowsAttributes {
    fn collect(&self, path: &Path) -> io::Result<EntryAttributes> {
        use std::os::windows::fs::MetadataExt;

        let meta = std::fs::symlink_metadata(path)?;
        Ok(EntryAttributes {
            mtime: filetime_to_timestamp(meta.last_write_time()),
            platform: PlatformAttributes {
                windows_attrib: meta.file_attributes(),
                ..Default::default()
            },
        })
    }

    fn mtime_granularity(&self, _path: &Path) -> u64 {
        100
    }
}

/// Fallback for targets without platform metadata: mtime only.
#[cfg(not(any(unix, windows)))]
#[derive(Debug, Clone, Copy, Default)]
pub struct PortableAttributes;

#[cfg(not(any(unix, windows)))]
impl AttributeCollector for PortableAttributes {
    fn collect(&self, path: &Path) -> io::Result<EntryAttributes> {
        let meta = std::fs::symlink_metadata(path)?;
        Ok(EntryAttributes {
            mtime: Timestamp::from(meta.modified()?),
            platform: PlatformAttributes::default(),
        })
    }

    fn mtime_granularity(&self, _path: &Path) -> u64 {
        1
    }
}

/// 100 ns ticks between 1601-01-01 and 1970-01-01.
#[cfg(any(windows, test))]
const FILETIME_UNIX_OFFSET: i64 = 116_444_736_000_000_000;

#[cfg(any(windows, test))]
fn filetime_to_timestamp(ticks: u64) -> Timestamp {
    let since_epoch = ticks as i64 - FILETIME_UNIX_OFFSET;
    Timestamp::new(
        since_epoch.div_euclid(10_000_000),
        (since_epoch.rem_euclid(10_000_000) * 100) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filetime_conversion() {
        assert_eq!(filetime_to_timestamp(FILETIME_UNIX_OFFSET as u64), Timestamp::UNIX_EPOCH);

        let ts = filetime_to_timestamp(FILETIME_UNIX_OFFSET as u64 + 15_000_001);
        assert_eq!((ts.seconds(), ts.nanos()), (1, 500_000_100));

        let before = filetime_to_timestamp(FILETIME_UNIX_OFFSET as u64 - 1);
        assert_eq!((before.seconds(), before.nanos()), (-1, 999_999_900));
    }

    #[cfg(unix)]
    #[test]
    fn unix_collects_mode_and_mtime() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("f");
        std::fs::write(&file, b"data").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o640)).unwrap();

        let collector = default_collector();
        let attrs = collector.collect(&file).unwrap();
        assert_eq!(attrs.platform.mode & 0o7777, 0o640);
        assert_eq!(attrs.platform.windows_attrib, 0);
        assert!(attrs.mtime > Timestamp::UNIX_EPOCH);
        assert_eq!(collector.mtime_granularity(&file), 1);
    }

    #[test]
    fn coarse_filesystems_map_to_their_resolution() {
        let cases = [
            ("msdos", 2_000_000_000),
            ("vfat", 2_000_000_000),
            ("exfat", 10_000_000),
            ("hfs", 1_000_000_000),
            ("cd9660", 1_000_000_000),
            ("ntfs", 100),
            ("cifs", 100),
            ("ext4", 1),
            ("apfs", 1),
            ("", 1),
        ];
        for (fs_type, expected) in cases {
            assert_eq!(filesystem_granularity(fs_type), expected, "{fs_type}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn unix_granularity_for_missing_path_uses_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let gone = tmp.path().join("gone");
        assert_eq!(
            UnixAttributes.mtime_granularity(&gone),
            UnixAttributes.mtime_granularity(tmp.path())
        );
    }

    #[cfg(unix)]
    #[test]
    fn unix_collect_missing_path_fails() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(UnixAttributes.collect(&tmp.path().join("gone")).is_err());
    }
}
