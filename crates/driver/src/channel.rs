use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::Mutex,
};

use alloy::eips::{eip2718::Encodable2718, eip4844::Blob};
use alloy_primitives::{Bytes, keccak256};
use alloy_rlp::RlpEncodable;
use batchd_clients::traits::OpBlock;
use batchd_primitives::{
    blob::{BlobError, encode_blob_data},
    eth::BlockId,
    summary::Summary,
};
use tracing::{debug, warn};

use crate::{error::ChannelError, metrics::BatcherMetrics};

/// The identifier of a channel, derived from the first block committed to it
/// and a monotonic channel counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId([u8; 8]);

impl ChannelId {
    /// Derives a channel id from the first block of the channel and the
    /// number of channels built before it.
    fn derive(first_block: BlockId, channels_built: u64) -> Self {
        let mut preimage = [0u8; 40];
        preimage[..32].copy_from_slice(first_block.hash.as_slice());
        preimage[32..].copy_from_slice(&channels_built.to_be_bytes());

        let digest = keccak256(preimage);
        let mut id = [0u8; 8];
        id.copy_from_slice(&digest[..8]);
        Self(id)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// The identifier of a single frame within a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    /// The channel this frame belongs to.
    pub channel: ChannelId,
    /// The position of this frame within the channel.
    pub index: u16,
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.index)
    }
}

/// A single channel frame: the minimum unit an inbox transaction carries.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The frame identifier.
    pub id: FrameId,
    /// The opaque frame payload.
    pub data: Bytes,
}

/// The stable identifier of a submittable unit.
///
/// The emission nonce makes every emitted unit unique for the lifetime of the
/// driver, even when a failed unit's frames are requeued and re-emitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxId {
    frames: Vec<FrameId>,
    nonce: u64,
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nonce)?;
        for (i, frame) in self.frames.iter().enumerate() {
            let sep = if i == 0 { '@' } else { '+' };
            write!(f, "{sep}{frame}")?;
        }
        Ok(())
    }
}

/// A submittable unit of channel data, emitted by the channel manager and
/// used as the correlation token between a queued candidate and its receipt.
#[derive(Debug, Clone)]
pub struct TxData {
    frames: Vec<Frame>,
    nonce: u64,
}

impl TxData {
    /// The stable identifier of this unit.
    pub fn id(&self) -> TxId {
        TxId { frames: self.frames.iter().map(|f| f.id).collect(), nonce: self.nonce }
    }

    /// The total number of payload bytes across all frames.
    pub fn len(&self) -> usize {
        self.frames.iter().map(|f| f.data.len()).sum()
    }

    /// Returns `true` if the unit carries no payload bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of frames in this unit.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// The number of payload bytes in the final frame.
    pub fn last_frame_len(&self) -> usize {
        self.frames.last().map_or(0, |f| f.data.len())
    }

    /// The raw calldata payload of a single-frame unit.
    ///
    /// Callers must check [`Self::frame_count`] first: a unit rendered as
    /// calldata carries exactly one frame.
    pub fn call_data(&self) -> Bytes {
        self.frames.first().map(|f| f.data.clone()).unwrap_or_default()
    }

    /// Renders the unit as fixed-size blobs, one blob per frame, in order.
    pub fn blobs(&self) -> Result<Vec<Blob>, BlobError> {
        self.frames.iter().map(|f| encode_blob_data(&f.data)).collect()
    }
}

impl Summary for TxData {
    fn summary(&self) -> String {
        format!("id={}, frames={}, data_len={}", self.id(), self.frame_count(), self.len())
    }
}

/// Settings for channel construction.
#[derive(Debug, Clone, Copy)]
pub struct ChannelSettings {
    /// The maximum number of payload bytes in a single frame.
    pub max_frame_size: usize,
    /// The maximum number of frames a single unit can carry.
    pub max_frames_per_tx: usize,
}

/// The per-block payload committed to a channel: the block position and its
/// raw transaction list.
#[derive(Debug, RlpEncodable)]
struct BlockPayload {
    number: u64,
    timestamp: u64,
    transactions: Vec<Bytes>,
}

/// An L2 block buffered in the manager, reduced to its id and channel payload.
#[derive(Debug)]
struct BufferedBlock {
    id: BlockId,
    payload: Bytes,
}

#[derive(Debug, Default)]
struct Inner {
    /// The id of the most recently appended L2 block.
    tip: Option<BlockId>,
    /// Blocks appended but not yet packed into frames.
    blocks: VecDeque<BufferedBlock>,
    /// Frames ready for submission, in emission order.
    frames: VecDeque<Frame>,
    /// Units emitted and awaiting exactly one outcome each.
    pending: HashMap<TxId, TxData>,
    /// Whether the manager refuses new blocks until cleared.
    closed: bool,
    /// Total channels built, mixed into channel ids.
    channels_built: u64,
    /// Total units emitted, used as the emission nonce.
    units_emitted: u64,
}

/// Buffers ingested L2 blocks, packs them into channel frames, and tracks the
/// submission outcome of every emitted unit.
///
/// The manager is internally synchronised: the driver loop appends blocks and
/// drains units while the receipt fan-in reports outcomes concurrently.
#[derive(Debug)]
pub struct ChannelManager {
    settings: ChannelSettings,
    inner: Mutex<Inner>,
}

impl ChannelManager {
    /// Creates a new empty manager with the given settings.
    pub fn new(settings: ChannelSettings) -> Self {
        Self { settings, inner: Mutex::new(Inner::default()) }
    }

    /// Appends an L2 block to the current channel.
    ///
    /// Returns [`ChannelError::Reorg`] when the block does not extend the most
    /// recently appended block, in which case the manager state is untouched
    /// so its buffered data can still be flushed to L1.
    pub fn add_l2_block(&self, block: &OpBlock) -> Result<(), ChannelError> {
        let mut inner = self.lock();

        if inner.closed {
            return Err(ChannelError::Closed);
        }

        let id = BlockId::new(block.header.hash, block.header.number);
        if let Some(tip) = inner.tip {
            if block.header.parent_hash != tip.hash {
                warn!(tip = %tip, block = %id, "Appended block does not extend the channel tip");
                return Err(ChannelError::Reorg);
            }
        }

        inner.blocks.push_back(BufferedBlock { id, payload: block_payload(block) });
        inner.tip = Some(id);
        BatcherMetrics::set_buffered_blocks(inner.blocks.len());

        Ok(())
    }

    /// Returns the next submittable unit, or `None` when nothing is ready.
    ///
    /// `l1_tip` is the id of the L1 block the unit will be submitted against.
    pub fn tx_data(&self, l1_tip: BlockId) -> Result<Option<TxData>, ChannelError> {
        let mut inner = self.lock();

        if inner.frames.is_empty() {
            self.build_frames(&mut inner);
        }
        if inner.frames.is_empty() {
            return Ok(None);
        }

        let take = self.settings.max_frames_per_tx.max(1).min(inner.frames.len());
        let frames: Vec<Frame> = inner.frames.drain(..take).collect();
        let txdata = TxData { frames, nonce: inner.units_emitted };
        inner.units_emitted += 1;

        inner.pending.insert(txdata.id(), txdata.clone());
        BatcherMetrics::set_ready_frames(inner.frames.len());
        BatcherMetrics::set_pending_units(inner.pending.len());
        debug!(unit = %txdata.id(), l1_tip = %l1_tip, "Emitted submittable unit");

        Ok(Some(txdata))
    }

    /// Marks an emitted unit as confirmed in the given L1 block.
    pub fn tx_confirmed(&self, id: &TxId, l1_block: BlockId) {
        let mut inner = self.lock();

        if inner.pending.remove(id).is_none() {
            warn!(unit = %id, "Confirmed unit is not pending");
            return;
        }
        BatcherMetrics::set_pending_units(inner.pending.len());
        debug!(unit = %id, l1_block = %l1_block, "Unit confirmed on L1");
    }

    /// Marks an emitted unit as failed. Its frames are requeued at the front
    /// of the frame queue so the data is re-emitted under a fresh unit id.
    pub fn tx_failed(&self, id: &TxId) {
        let mut inner = self.lock();

        let Some(txdata) = inner.pending.remove(id) else {
            warn!(unit = %id, "Failed unit is not pending");
            return;
        };
        for frame in txdata.frames.into_iter().rev() {
            inner.frames.push_front(frame);
        }
        BatcherMetrics::set_ready_frames(inner.frames.len());
        BatcherMetrics::set_pending_units(inner.pending.len());
    }

    /// Terminates the currently-building channel so its buffered data can
    /// still be emitted, and refuses new blocks until [`Self::clear`].
    ///
    /// Returns [`ChannelError::PendingAfterClose`] when submittable or
    /// in-flight content remains.
    pub fn close(&self) -> Result<(), ChannelError> {
        let mut inner = self.lock();

        inner.closed = true;
        if !inner.blocks.is_empty() || !inner.frames.is_empty() || !inner.pending.is_empty() {
            return Err(ChannelError::PendingAfterClose);
        }
        Ok(())
    }

    /// Drops all state and re-opens the manager.
    pub fn clear(&self) {
        let mut inner = self.lock();

        let units_emitted = inner.units_emitted;
        let channels_built = inner.channels_built;
        *inner = Inner { units_emitted, channels_built, ..Inner::default() };

        BatcherMetrics::set_buffered_blocks(0);
        BatcherMetrics::set_ready_frames(0);
        BatcherMetrics::set_pending_units(0);
    }

    /// The number of blocks buffered and not yet framed.
    pub fn buffered_blocks(&self) -> usize {
        self.lock().blocks.len()
    }

    /// The number of frames ready for emission.
    pub fn ready_frames(&self) -> usize {
        self.lock().frames.len()
    }

    /// The number of units emitted and awaiting an outcome.
    pub fn pending_units(&self) -> usize {
        self.lock().pending.len()
    }

    /// Packs all buffered blocks into a new channel's frames.
    fn build_frames(&self, inner: &mut Inner) {
        let Some(first) = inner.blocks.front() else {
            return;
        };

        let channel = ChannelId::derive(first.id, inner.channels_built);
        inner.channels_built += 1;

        let mut payload = Vec::new();
        for block in inner.blocks.drain(..) {
            payload.extend_from_slice(&block.payload);
        }

        for (index, chunk) in payload.chunks(self.settings.max_frame_size.max(1)).enumerate() {
            let id = FrameId { channel, index: index as u16 };
            inner.frames.push_back(Frame { id, data: Bytes::copy_from_slice(chunk) });
        }

        BatcherMetrics::set_buffered_blocks(0);
        BatcherMetrics::set_ready_frames(inner.frames.len());
        debug!(channel = %channel, frames = inner.frames.len(), "Built channel frames");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("channel manager lock poisoned")
    }
}

/// Encodes the channel payload of a single L2 block.
fn block_payload(block: &OpBlock) -> Bytes {
    let transactions = block
        .transactions
        .txns()
        .map(|tx| tx.inner.inner.inner().encoded_2718().into())
        .collect();

    let payload = BlockPayload {
        number: block.header.number,
        timestamp: block.header.timestamp,
        transactions,
    };

    alloy_rlp::encode(&payload).into()
}

#[cfg(test)]
mod tests {
    use alloy::rpc::types::BlockTransactions;
    use alloy_primitives::B256;

    use super::*;

    fn settings(max_frame_size: usize, max_frames_per_tx: usize) -> ChannelSettings {
        ChannelSettings { max_frame_size, max_frames_per_tx }
    }

    fn block(number: u64, hash: u8, parent: u8) -> OpBlock {
        OpBlock {
            header: alloy::rpc::types::Header {
                hash: B256::repeat_byte(hash),
                inner: alloy::consensus::Header {
                    number,
                    parent_hash: B256::repeat_byte(parent),
                    timestamp: 1_700_000_000 + number,
                    ..Default::default()
                },
                total_difficulty: None,
                size: None,
            },
            uncles: vec![],
            transactions: BlockTransactions::Full(vec![]),
            withdrawals: None,
        }
    }

    fn l1_tip() -> BlockId {
        BlockId::new(B256::repeat_byte(0x11), 1000)
    }

    #[test]
    fn appending_non_extending_block_is_a_reorg() {
        let manager = ChannelManager::new(settings(1024, 1));

        manager.add_l2_block(&block(100, 0xaa, 0x99)).unwrap();
        manager.add_l2_block(&block(101, 0xbb, 0xaa)).unwrap();

        let err = manager.add_l2_block(&block(102, 0xcc, 0x42)).unwrap_err();
        assert_eq!(err, ChannelError::Reorg);

        // The buffered data survives the reorg so it can still be flushed.
        assert_eq!(manager.buffered_blocks(), 2);
    }

    #[test]
    fn tx_data_drains_blocks_into_frames() {
        let manager = ChannelManager::new(settings(8, 1));
        manager.add_l2_block(&block(100, 0xaa, 0x99)).unwrap();

        let first = manager.tx_data(l1_tip()).unwrap().expect("unit ready");
        assert_eq!(first.frame_count(), 1);
        assert!(!first.is_empty());
        assert_eq!(manager.buffered_blocks(), 0);
        assert_eq!(manager.pending_units(), 1);

        // Remaining frames of the same channel drain in order.
        let second = manager.tx_data(l1_tip()).unwrap().expect("unit ready");
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn no_data_when_empty() {
        let manager = ChannelManager::new(settings(1024, 1));
        assert!(manager.tx_data(l1_tip()).unwrap().is_none());
    }

    #[test]
    fn multi_frame_units_respect_the_cap() {
        let manager = ChannelManager::new(settings(4, 6));
        manager.add_l2_block(&block(100, 0xaa, 0x99)).unwrap();

        let unit = manager.tx_data(l1_tip()).unwrap().expect("unit ready");
        assert!(unit.frame_count() <= 6);
        assert!(unit.frame_count() > 1, "a tiny frame size must split the payload");

        let blobs = unit.blobs().unwrap();
        assert_eq!(blobs.len(), unit.frame_count());
    }

    #[test]
    fn failed_unit_is_requeued_under_a_fresh_id() {
        let manager = ChannelManager::new(settings(1024, 1));
        manager.add_l2_block(&block(100, 0xaa, 0x99)).unwrap();

        let unit = manager.tx_data(l1_tip()).unwrap().expect("unit ready");
        let first_id = unit.id();
        manager.tx_failed(&first_id);
        assert_eq!(manager.pending_units(), 0);

        let retried = manager.tx_data(l1_tip()).unwrap().expect("requeued unit");
        assert_ne!(retried.id(), first_id);
        assert_eq!(retried.call_data(), unit.call_data());
    }

    #[test]
    fn confirmed_unit_is_settled() {
        let manager = ChannelManager::new(settings(1024, 1));
        manager.add_l2_block(&block(100, 0xaa, 0x99)).unwrap();

        let unit = manager.tx_data(l1_tip()).unwrap().expect("unit ready");
        manager.tx_confirmed(&unit.id(), l1_tip());

        assert_eq!(manager.pending_units(), 0);
        assert!(manager.tx_data(l1_tip()).unwrap().is_none());
    }

    #[test]
    fn close_with_buffered_data_warns_pending() {
        let manager = ChannelManager::new(settings(1024, 1));
        manager.add_l2_block(&block(100, 0xaa, 0x99)).unwrap();

        assert_eq!(manager.close().unwrap_err(), ChannelError::PendingAfterClose);

        // Closed managers still drain their buffered data.
        assert!(manager.tx_data(l1_tip()).unwrap().is_some());
    }

    #[test]
    fn close_when_empty_is_clean() {
        let manager = ChannelManager::new(settings(1024, 1));
        assert!(manager.close().is_ok());
    }

    #[test]
    fn closed_manager_refuses_new_blocks() {
        let manager = ChannelManager::new(settings(1024, 1));
        manager.close().unwrap();

        let err = manager.add_l2_block(&block(100, 0xaa, 0x99)).unwrap_err();
        assert_eq!(err, ChannelError::Closed);

        // A clear re-opens the manager.
        manager.clear();
        manager.add_l2_block(&block(100, 0xaa, 0x99)).unwrap();
    }

    #[test]
    fn clear_resets_all_state() {
        let manager = ChannelManager::new(settings(1024, 1));
        manager.add_l2_block(&block(100, 0xaa, 0x99)).unwrap();
        let unit = manager.tx_data(l1_tip()).unwrap().expect("unit ready");

        manager.clear();

        assert_eq!(manager.buffered_blocks(), 0);
        assert_eq!(manager.ready_frames(), 0);
        assert_eq!(manager.pending_units(), 0);

        // A block at a different height is accepted after a clear.
        manager.add_l2_block(&block(100, 0xdd, 0x13)).unwrap();
        let fresh = manager.tx_data(l1_tip()).unwrap().expect("unit ready");
        assert_ne!(fresh.id(), unit.id());
    }

    #[test]
    fn calldata_of_single_frame_unit_is_the_frame_payload() {
        let manager = ChannelManager::new(settings(1024, 1));
        manager.add_l2_block(&block(100, 0xaa, 0x99)).unwrap();

        let unit = manager.tx_data(l1_tip()).unwrap().expect("unit ready");
        assert_eq!(unit.frame_count(), 1);
        assert_eq!(unit.call_data().len(), unit.len());
        assert_eq!(unit.last_frame_len(), unit.len());
    }
}
