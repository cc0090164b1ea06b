//! ivault-scan: turn filesystem entries into encrypted inode records
//!
//! # Overview
//! - `classify`: entry type without following symlinks
//! - `attrs`: per-platform attribute collection behind [`AttributeCollector`]
//! - `normalize`: root-relative, `/`-separated path strings
//! - `scanner`: [`InodeScanner`], one entry → one [`Inode`](ivault_snapshot::Inode)
//! - `pool`: [`ScanPool`], background scans with one-shot completion
//! - `creator`: [`SnapshotCreator`], whole-tree scans producing the next snapshot

pub mod attrs;
pub mod classify;
pub mod creator;
pub mod error;
pub mod normalize;
pub mod pool;
pub mod scanner;

pub use attrs::{default_collector, filesystem_granularity, AttributeCollector, EntryAttributes};
pub use classify::classify;
pub use creator::{collect_entries, kdf_params, SnapshotCreator, SnapshotReport};
pub use error::ScanError;
pub use normalize::normalize_path;
pub use pool::{ScanPool, ScanTask};
pub use scanner::{CancelHandle, InodeScanner};
