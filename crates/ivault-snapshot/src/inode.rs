//! Inode records: one encrypted filesystem entry at scan time
//!
//! Inodes are built once through [`InodeBuilder`] and never modified. The
//! record's identity is the BLAKE3 hash of its protobuf encoding; that hash is
//! what a [`Snapshot`](crate::Snapshot) lists.

use std::time::{SystemTime, UNIX_EPOCH};

use ivault_core::proto;
use prost::Message;
use thiserror::Error;

use crate::chunk_info::ChunkInfo;
use crate::encrypted::EncryptedData;

const NANOS_PER_SEC: u32 = 1_000_000_000;

#[derive(Debug, Error)]
pub enum InodeError {
    #[error("{0:?} inode cannot carry chunks")]
    ChunksOnNonFile(InodeType),

    #[error("{0:?} inode cannot carry a symlink target")]
    SymlinkTargetOnNonSymlink(InodeType),

    #[error("deleted inode cannot carry {0}")]
    DeletedWithMetadata(&'static str),

    #[error("unknown inode type {0}")]
    UnknownType(i32),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid timestamp: {seconds}s {nanos}ns")]
    InvalidTimestamp { seconds: i64, nanos: i32 },

    #[error("inode decode error: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// What kind of entry an inode describes. Discriminants match the wire enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InodeType {
    /// The path no longer exists
    Deleted = 0,
    File = 1,
    Directory = 2,
    Symlink = 3,
}

impl TryFrom<i32> for InodeType {
    type Error = InodeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(InodeType::Deleted),
            1 => Ok(InodeType::File),
            2 => Ok(InodeType::Directory),
            3 => Ok(InodeType::Symlink),
            other => Err(InodeError::UnknownType(other)),
        }
    }
}

impl std::fmt::Display for InodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InodeType::Deleted => "deleted",
            InodeType::File => "file",
            InodeType::Directory => "directory",
            InodeType::Symlink => "symlink",
        };
        f.write_str(name)
    }
}

/// Seconds and nanoseconds since the Unix epoch.
///
/// `nanos` is always below one second, also for instants before the epoch
/// (`-0.25s` is `{seconds: -1, nanos: 750_000_000}`), so ordering the pair
/// orders the instants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    seconds: i64,
    nanos: u32,
}

impl Timestamp {
    pub const UNIX_EPOCH: Timestamp = Timestamp {
        seconds: 0,
        nanos: 0,
    };

    /// Build a timestamp, carrying whole seconds out of `nanos`.
    pub fn new(seconds: i64, nanos: u32) -> Self {
        Self {
            seconds: seconds + i64::from(nanos / NANOS_PER_SEC),
            nanos: nanos % NANOS_PER_SEC,
        }
    }

    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    pub fn as_nanos(&self) -> i128 {
        i128::from(self.seconds) * i128::from(NANOS_PER_SEC) + i128::from(self.nanos)
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::new(d.as_secs() as i64, d.subsec_nanos()),
            Err(e) => {
                let d = e.duration();
                let secs = d.as_secs() as i64;
                match d.subsec_nanos() {
                    0 => Self::new(-secs, 0),
                    n => Self::new(-secs - 1, NANOS_PER_SEC - n),
                }
            }
        }
    }
}

impl From<Timestamp> for proto::Timestamp {
    fn from(ts: Timestamp) -> Self {
        proto::Timestamp {
            seconds: ts.seconds,
            nanos: ts.nanos as i32,
        }
    }
}

impl TryFrom<proto::Timestamp> for Timestamp {
    type Error = InodeError;

    fn try_from(ts: proto::Timestamp) -> Result<Self, Self::Error> {
        if ts.nanos < 0 || ts.nanos as u32 >= NANOS_PER_SEC {
            return Err(InodeError::InvalidTimestamp {
                seconds: ts.seconds,
                nanos: ts.nanos,
            });
        }
        Ok(Self::new(ts.seconds, ts.nanos as u32))
    }
}

/// Platform-specific attribute bits. Fields a platform does not have stay 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PlatformAttributes {
    pub windows_attrib: u32,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

impl PlatformAttributes {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    path: EncryptedData,
    timestamp: Timestamp,
    inode_type: InodeType,
    mtime: Timestamp,
    mtime_granularity: u64,
    attributes: PlatformAttributes,
    chunks: Vec<ChunkInfo>,
    symlink_target: EncryptedData,
}

impl Inode {
    /// Start building an inode of `inode_type` for the encrypted `path`.
    pub fn builder(inode_type: InodeType, path: EncryptedData) -> InodeBuilder {
        InodeBuilder {
            path,
            timestamp: None,
            inode_type,
            mtime: Timestamp::UNIX_EPOCH,
            mtime_granularity: 0,
            attributes: PlatformAttributes::default(),
            chunks: Vec::new(),
            symlink_target: EncryptedData::default(),
        }
    }

    pub fn path(&self) -> &EncryptedData {
        &self.path
    }

    /// When the scan that produced this inode ran.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn inode_type(&self) -> InodeType {
        self.inode_type
    }

    pub fn mtime(&self) -> Timestamp {
        self.mtime
    }

    /// Resolution of `mtime` on the scanning platform, in nanoseconds.
    pub fn mtime_granularity(&self) -> u64 {
        self.mtime_granularity
    }

    pub fn attributes(&self) -> &PlatformAttributes {
        &self.attributes
    }

    pub fn windows_attrib(&self) -> u32 {
        self.attributes.windows_attrib
    }

    pub fn mode(&self) -> u32 {
        self.attributes.mode
    }

    pub fn uid(&self) -> u32 {
        self.attributes.uid
    }

    pub fn gid(&self) -> u32 {
        self.attributes.gid
    }

    /// Chunks in file order. Empty for everything but non-empty files.
    pub fn chunks(&self) -> &[ChunkInfo] {
        &self.chunks
    }

    pub fn symlink_target(&self) -> &EncryptedData {
        &self.symlink_target
    }

    /// Plaintext length of the file: the sum of its chunk sizes.
    pub fn file_size(&self) -> u64 {
        self.chunks.iter().map(ChunkInfo::size).sum()
    }

    pub fn to_proto(&self) -> proto::Inode {
        let deleted = self.inode_type == InodeType::Deleted;
        proto::Inode {
            path: Some((&self.path).into()),
            timestamp: Some(self.timestamp.into()),
            r#type: self.inode_type as i32,
            mtime: (!deleted).then(|| self.mtime.into()),
            mtime_granularity: self.mtime_granularity,
            windows_attrib: self.attributes.windows_attrib,
            mode: self.attributes.mode,
            uid: self.attributes.uid,
            gid: self.attributes.gid,
            chunks: self.chunks.iter().map(Into::into).collect(),
            symlink_target: (!self.symlink_target.is_empty())
                .then(|| (&self.symlink_target).into()),
        }
    }

    /// Convert a decoded record, re-checking every builder invariant.
    pub fn from_proto(record: proto::Inode) -> Result<Self, InodeError> {
        let inode_type = InodeType::try_from(record.r#type)?;
        let path = record.path.ok_or(InodeError::MissingField("path"))?;
        let timestamp = record
            .timestamp
            .ok_or(InodeError::MissingField("timestamp"))?;

        let mut builder = Inode::builder(inode_type, path.into())
            .timestamp(Timestamp::try_from(timestamp)?)
            .mtime_granularity(record.mtime_granularity)
            .attributes(PlatformAttributes {
                windows_attrib: record.windows_attrib,
                mode: record.mode,
                uid: record.uid,
                gid: record.gid,
            })
            .chunks(record.chunks.into_iter().map(Into::into).collect());
        if let Some(mtime) = record.mtime {
            builder = builder.mtime(Timestamp::try_from(mtime)?);
        }
        if let Some(target) = record.symlink_target {
            builder = builder.symlink_target(target.into());
        }
        builder.build()
    }

    /// Protobuf encoding; deterministic for a given inode.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        self.to_proto().encode_to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, InodeError> {
        Self::from_proto(proto::Inode::decode(bytes)?)
    }

    /// BLAKE3 of the encoded record; the inode's store key.
    pub fn hash(&self) -> Vec<u8> {
        ivault_chunks::hash_bytes(&self.encode_to_vec())
            .as_bytes()
            .to_vec()
    }
}

/// Collects the fields of an [`Inode`]; `build` checks them as a whole.
#[derive(Debug, Clone)]
pub struct InodeBuilder {
    path: EncryptedData,
    timestamp: Option<Timestamp>,
    inode_type: InodeType,
    mtime: Timestamp,
    mtime_granularity: u64,
    attributes: PlatformAttributes,
    chunks: Vec<ChunkInfo>,
    symlink_target: EncryptedData,
}

impl InodeBuilder {
    /// Scan time; defaults to the moment `build` is called.
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn mtime(mut self, mtime: Timestamp) -> Self {
        self.mtime = mtime;
        self
    }

    pub fn mtime_granularity(mut self, nanos: u64) -> Self {
        self.mtime_granularity = nanos;
        self
    }

    pub fn attributes(mut self, attributes: PlatformAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn chunks(mut self, chunks: Vec<ChunkInfo>) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn symlink_target(mut self, target: EncryptedData) -> Self {
        self.symlink_target = target;
        self
    }

    pub fn build(self) -> Result<Inode, InodeError> {
        if !self.chunks.is_empty() && self.inode_type != InodeType::File {
            return Err(InodeError::ChunksOnNonFile(self.inode_type));
        }
        if !self.symlink_target.is_empty() && self.inode_type != InodeType::Symlink {
            return Err(InodeError::SymlinkTargetOnNonSymlink(self.inode_type));
        }
        if self.inode_type == InodeType::Deleted {
            if !self.attributes.is_empty() {
                return Err(InodeError::DeletedWithMetadata("attributes"));
            }
            if self.mtime != Timestamp::UNIX_EPOCH {
                return Err(InodeError::DeletedWithMetadata("mtime"));
            }
            if self.mtime_granularity != 0 {
                return Err(InodeError::DeletedWithMetadata("mtime granularity"));
            }
        }

        Ok(Inode {
            path: self.path,
            timestamp: self.timestamp.unwrap_or_else(Timestamp::now),
            inode_type: self.inode_type,
            mtime: self.mtime,
            mtime_granularity: self.mtime_granularity,
            attributes: self.attributes,
            chunks: self.chunks,
            symlink_target: self.symlink_target,
        })
    }
}
