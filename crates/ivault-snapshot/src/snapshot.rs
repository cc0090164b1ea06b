use ivault_core::{proto, ChunkingParams, IvaultError, IvaultResult};
use prost::Message;

/// One revision of a synchronized tree: the inode hashes it consists of and
/// the chunking parameters every scan of the tree uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    revision: i64,
    inode_hashes: Vec<Vec<u8>>,
    chunking: ChunkingParams,
}

impl Snapshot {
    /// Revision 0 of a new tree.
    pub fn initial(chunking: ChunkingParams) -> IvaultResult<Self> {
        Self::new(0, Vec::new(), chunking)
    }

    pub fn new(
        revision: i64,
        inode_hashes: Vec<Vec<u8>>,
        chunking: ChunkingParams,
    ) -> IvaultResult<Self> {
        chunking.validate()?;
        if revision < 0 {
            return Err(IvaultError::Config(format!(
                "snapshot revision {revision} is negative"
            )));
        }
        Ok(Self {
            revision,
            inode_hashes,
            chunking,
        })
    }

    /// The following revision with a new set of inodes and the same chunking.
    pub fn next(&self, inode_hashes: Vec<Vec<u8>>) -> Snapshot {
        Snapshot {
            revision: self.revision + 1,
            inode_hashes,
            chunking: self.chunking,
        }
    }

    pub fn revision(&self) -> i64 {
        self.revision
    }

    pub fn inode_hashes(&self) -> &[Vec<u8>] {
        &self.inode_hashes
    }

    pub fn chunking(&self) -> &ChunkingParams {
        &self.chunking
    }

    pub fn to_proto(&self) -> proto::Snapshot {
        proto::Snapshot {
            revision: self.revision,
            inode_hashes: self.inode_hashes.clone(),
            max_chunksize: self.chunking.max_chunksize,
            min_chunksize: self.chunking.min_chunksize,
            polynomial: self.chunking.polynomial,
            polynomial_degree: self.chunking.polynomial_degree,
            polynomial_shift: self.chunking.polynomial_shift,
            avg_bits: self.chunking.avg_bits,
        }
    }

    pub fn from_proto(record: proto::Snapshot) -> IvaultResult<Self> {
        let chunking = ChunkingParams {
            max_chunksize: record.max_chunksize,
            min_chunksize: record.min_chunksize,
            polynomial: record.polynomial,
            polynomial_degree: record.polynomial_degree,
            polynomial_shift: record.polynomial_shift,
            avg_bits: record.avg_bits,
        };
        Self::new(record.revision, record.inode_hashes, chunking)
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        self.to_proto().encode_to_vec()
    }

    pub fn decode(bytes: &[u8]) -> IvaultResult<Self> {
        Self::from_proto(proto::Snapshot::decode(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_is_empty_revision_zero() {
        let snapshot = Snapshot::initial(ChunkingParams::default()).unwrap();
        assert_eq!(snapshot.revision(), 0);
        assert!(snapshot.inode_hashes().is_empty());
        assert_eq!(snapshot.chunking(), &ChunkingParams::default());
    }

    #[test]
    fn next_bumps_revision_and_keeps_chunking() {
        let params = ChunkingParams {
            min_chunksize: 4096,
            max_chunksize: 65536,
            avg_bits: 13,
            ..Default::default()
        };
        let first = Snapshot::initial(params).unwrap();
        let second = first.next(vec![vec![1; 32], vec![2; 32]]);

        assert_eq!(first.revision(), 0, "previous value untouched");
        assert!(first.inode_hashes().is_empty());
        assert_eq!(second.revision(), 1);
        assert_eq!(second.inode_hashes().len(), 2);
        assert_eq!(second.chunking(), &params);
        assert_eq!(second.next(Vec::new()).revision(), 2);
    }

    #[test]
    fn rejects_invalid_chunking() {
        let params = ChunkingParams {
            min_chunksize: 10,
            max_chunksize: 5,
            ..Default::default()
        };
        assert!(matches!(
            Snapshot::initial(params),
            Err(IvaultError::InvalidParams(_))
        ));
    }

    #[test]
    fn encode_decode_preserves_snapshot() {
        let snapshot = Snapshot::initial(ChunkingParams::default())
            .unwrap()
            .next(vec![vec![0xAB; 32]]);
        assert_eq!(Snapshot::decode(&snapshot.encode_to_vec()).unwrap(), snapshot);
    }

    #[test]
    fn decode_validates_chunking() {
        let mut record = Snapshot::initial(ChunkingParams::default())
            .unwrap()
            .to_proto();
        record.polynomial_shift = 3;
        assert!(matches!(
            Snapshot::decode(&record.encode_to_vec()),
            Err(IvaultError::InvalidParams(_))
        ));
    }
}
