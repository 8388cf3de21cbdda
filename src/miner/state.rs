//! Current block state, readable lock-free from every request worker.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Serialize, Serializer};

use crate::config::MiningConfig;

/// Snapshot of the block currently being mined.
///
/// Serializes to the wire form downstream miners expect from
/// `getMiningInfo`. The base target travels as a decimal string.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MiningInfo {
    #[serde(serialize_with = "as_decimal_string")]
    pub base_target: u64,
    pub generation_signature: String,
    pub target_deadline: u64,
    pub height: u64,
}

fn as_decimal_string<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

impl From<&MiningConfig> for MiningInfo {
    fn from(config: &MiningConfig) -> Self {
        Self {
            base_target: config.base_target,
            generation_signature: config.generation_signature.clone(),
            target_deadline: config.target_deadline,
            height: config.height,
        }
    }
}

impl MiningInfo {
    /// Wire-form JSON body for `getMiningInfo` and socket pushes.
    pub fn to_json(&self) -> String {
        // Serialization of this struct cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Shared handle to the current [`MiningInfo`], swapped atomically on
/// every block change.
#[derive(Debug, Clone)]
pub struct MinerState {
    info: Arc<ArcSwap<MiningInfo>>,
}

impl MinerState {
    pub fn new(initial: MiningInfo) -> Self {
        Self {
            info: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// Snapshot of the current block.
    pub fn current(&self) -> Arc<MiningInfo> {
        self.info.load_full()
    }

    /// Height of the current block.
    pub fn height(&self) -> u64 {
        self.info.load().height
    }

    /// Replace the current block snapshot.
    pub fn update(&self, info: MiningInfo) {
        self.info.store(Arc::new(info));
    }

    /// Advance to a new height, keeping the other fields.
    pub fn advance_to_height(&self, height: u64) {
        let current = self.info.load_full();
        self.info.store(Arc::new(MiningInfo {
            height,
            ..(*current).clone()
        }));
    }
}
