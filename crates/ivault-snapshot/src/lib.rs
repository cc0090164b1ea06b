//! ivault-snapshot: the snapshot data model
//!
//! An [`Inode`] is the encrypted, chunked description of one filesystem entry
//! at scan time. All record types are immutable values: they are assembled
//! once (constructor or builder) and superseded, never edited.
//!
//! - `encrypted`: ciphertext + IV container
//! - `chunk_info`: identity and recovery metadata of one chunk
//! - `inode`: inode record, builder, timestamps
//! - `snapshot`: revision counter + tree-wide chunking parameters
//! - `store`: storage contracts; `memory` and `fs_store` implement them
//! - `restore`: rebuild a file's plaintext from its inode and the chunk store

pub mod chunk_info;
pub mod encrypted;
pub mod fs_store;
pub mod inode;
pub mod memory;
pub mod restore;
pub mod snapshot;
pub mod store;

pub use chunk_info::ChunkInfo;
pub use encrypted::EncryptedData;
pub use fs_store::{FsChunkStore, FsInodeStore, FsSnapshotStore};
pub use inode::{Inode, InodeBuilder, InodeError, InodeType, PlatformAttributes, Timestamp};
pub use memory::{MemoryChunkStore, MemoryInodeStore, MemorySnapshotStore};
pub use restore::{restore_file, RestoreError};
pub use snapshot::Snapshot;
pub use store::{ChunkStore, InodeStore, SnapshotStore, StoreError, StoreResult};
