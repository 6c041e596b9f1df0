use std::fmt;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::summary::Summary;

/// A `(hash, number)` pair identifying a block. Equality is by full value,
/// so two ids for the same height on different forks never compare equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockId {
    /// Block hash.
    pub hash: B256,
    /// Block number.
    pub number: u64,
}

impl BlockId {
    /// Creates a new block id.
    pub const fn new(hash: B256, number: u64) -> Self {
        Self { hash, number }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.number, self.hash)
    }
}

/// An L1 block reference, as served by the rollup node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L1BlockRef {
    /// Block hash.
    pub hash: B256,
    /// Block number.
    pub number: u64,
    /// Parent block hash.
    pub parent_hash: B256,
    /// Block timestamp.
    pub timestamp: u64,
}

impl L1BlockRef {
    /// Returns the `(hash, number)` id of this reference.
    pub const fn id(&self) -> BlockId {
        BlockId { hash: self.hash, number: self.number }
    }
}

impl fmt::Display for L1BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.number, self.hash)
    }
}

/// An L2 block reference, as served by the rollup node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L2BlockRef {
    /// Block hash.
    pub hash: B256,
    /// Block number.
    pub number: u64,
    /// Parent block hash.
    pub parent_hash: B256,
    /// Block timestamp.
    pub timestamp: u64,
    /// L1 origin of this L2 block (only hash and number are served).
    pub l1origin: BlockId,
    /// Distance to the first L2 block of the epoch.
    pub sequence_number: u64,
}

impl L2BlockRef {
    /// Returns the `(hash, number)` id of this reference.
    pub const fn id(&self) -> BlockId {
        BlockId { hash: self.hash, number: self.number }
    }
}

/// The sync status of the rollup node, from `optimism_syncStatus`.
///
/// Only the fields the driver consumes are listed; the node serves more.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncStatus {
    /// The L1 block the rollup node is currently deriving from.
    pub current_l1: L1BlockRef,
    /// The perceived head of the L1 chain.
    pub head_l1: L1BlockRef,
    /// The L1 safe head.
    pub safe_l1: L1BlockRef,
    /// The L1 finalized head.
    pub finalized_l1: L1BlockRef,
    /// Highest L2 block produced by the sequencer, not yet persisted to L1.
    pub unsafe_l2: L2BlockRef,
    /// Highest L2 block whose data has been observed on L1.
    pub safe_l2: L2BlockRef,
    /// Highest L2 block derived from finalized L1 data.
    pub finalized_l2: L2BlockRef,
}

impl Summary for SyncStatus {
    fn summary(&self) -> String {
        format!(
            "head_l1={}, safe_l2={}, unsafe_l2={}",
            self.head_l1.number, self.safe_l2.number, self.unsafe_l2.number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_status_deserializes_from_node_json() {
        let json = r#"{
            "current_l1": {
                "hash": "0x0000000000000000000000000000000000000000000000000000000000000001",
                "number": 100,
                "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
                "timestamp": 1234567890
            },
            "head_l1": {
                "hash": "0x0000000000000000000000000000000000000000000000000000000000000002",
                "number": 101,
                "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000001",
                "timestamp": 1234567902
            },
            "safe_l1": {
                "hash": "0x0000000000000000000000000000000000000000000000000000000000000001",
                "number": 100,
                "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
                "timestamp": 1234567890
            },
            "finalized_l1": {
                "hash": "0x0000000000000000000000000000000000000000000000000000000000000001",
                "number": 100,
                "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
                "timestamp": 1234567890
            },
            "unsafe_l2": {
                "hash": "0x0000000000000000000000000000000000000000000000000000000000000003",
                "number": 200,
                "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000002",
                "timestamp": 1234567900,
                "l1origin": {
                    "hash": "0x0000000000000000000000000000000000000000000000000000000000000001",
                    "number": 100
                },
                "sequenceNumber": 0
            },
            "safe_l2": {
                "hash": "0x0000000000000000000000000000000000000000000000000000000000000003",
                "number": 200,
                "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000002",
                "timestamp": 1234567900,
                "l1origin": {
                    "hash": "0x0000000000000000000000000000000000000000000000000000000000000001",
                    "number": 100
                },
                "sequenceNumber": 0
            },
            "finalized_l2": {
                "hash": "0x0000000000000000000000000000000000000000000000000000000000000003",
                "number": 200,
                "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000002",
                "timestamp": 1234567900,
                "l1origin": {
                    "hash": "0x0000000000000000000000000000000000000000000000000000000000000001",
                    "number": 100
                },
                "sequenceNumber": 0
            }
        }"#;

        let status: SyncStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.head_l1.number, 101);
        assert_eq!(status.safe_l2.number, 200);
        assert_eq!(status.unsafe_l2.id().number, 200);
    }

    #[test]
    fn block_id_equality_is_by_hash_and_number() {
        let a = BlockId::new(B256::repeat_byte(0xaa), 7);
        let b = BlockId::new(B256::repeat_byte(0xbb), 7);
        assert_ne!(a, b);
        assert_eq!(a, BlockId::new(B256::repeat_byte(0xaa), 7));
    }
}
