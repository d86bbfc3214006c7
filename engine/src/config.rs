//! Engine configuration.
//!
//! Everything the engine would otherwise read from ambient chain state
//! (governance authority, genesis lanes, auction params, lane settings)
//! lives here and is threaded explicitly into each call. Loadable from
//! JSON; addresses are `0x`-hex, decimals and coins are strings.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use blocklane_primitives::{
    coin::validate_denom,
    tx::{MSG_AUCTION_BID, MSG_BEGIN_REDELEGATE, MSG_DELEGATE},
    types::hex_address,
    Address, Decimal, ZERO_ADDRESS,
};

use crate::auction::ClearedBid;
use crate::error::EngineError;
use crate::params::AuctionParams;
use crate::registry::{Lane, LaneRegistry};

/// How equal-priority transactions are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Earlier arrival first. Depends on each node's arrival order.
    #[default]
    FirstSeen,
    /// Lower transaction hash first. Identical on every node.
    BidHash,
}

/// State the engine is initialised from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub lanes: Vec<Lane>,
    pub params: AuctionParams,
    /// Cleared-bid history still inside the retention window.
    #[serde(default)]
    pub cleared_bids: Vec<ClearedBid>,
}

impl Default for GenesisState {
    fn default() -> Self {
        Self {
            lanes: vec![
                Lane::new(DEFAULT_AUCTION_LANE, Decimal::from_atomics(200_000_000_000_000_000), 0),
                Lane::new(DEFAULT_FREE_LANE, Decimal::from_atomics(200_000_000_000_000_000), 1),
                Lane::new(DEFAULT_BASE_LANE, Decimal::ZERO, 2),
            ],
            params: AuctionParams::default(),
            cleared_bids: Vec::new(),
        }
    }
}

impl GenesisState {
    fn validate_cleared_bids(&self) -> Result<(), EngineError> {
        let mut seen = BTreeSet::new();
        for entry in &self.cleared_bids {
            if !entry.amount.is_valid() {
                return Err(EngineError::InvalidConfig(format!(
                    "invalid cleared bid amount {}",
                    entry.amount
                )));
            }
            if !seen.insert((entry.bidder, entry.bundle_digest)) {
                return Err(EngineError::InvalidConfig("duplicate cleared bid entry".into()));
            }
        }
        Ok(())
    }
}

pub const DEFAULT_AUCTION_LANE: &str = "mev";
pub const DEFAULT_FREE_LANE: &str = "free";
pub const DEFAULT_BASE_LANE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionLaneConfig {
    /// Registry id bound to the auction lane.
    pub id: String,
    /// Order among bids of equal amount.
    pub tie_break: TieBreak,
    /// Pending bid capacity; `0` means unbounded.
    pub max_pending_bids: usize,
}

impl Default for AuctionLaneConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_AUCTION_LANE.into(),
            tie_break: TieBreak::FirstSeen,
            max_pending_bids: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeLaneConfig {
    pub id: String,
    /// Message type urls exempt from fees. A transaction is free only if
    /// every one of its messages is listed.
    pub exempt_msg_types: Vec<String>,
    /// Per-block transaction cap; `0` means no cap.
    pub max_txs: usize,
}

impl Default for FreeLaneConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_FREE_LANE.into(),
            exempt_msg_types: vec![MSG_DELEGATE.into(), MSG_BEGIN_REDELEGATE.into()],
            max_txs: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseLaneConfig {
    pub id: String,
    /// Per-block transaction cap; `0` means no cap.
    pub max_txs: usize,
    /// Order among transactions paying the same fee.
    pub tie_break: TieBreak,
}

impl Default for BaseLaneConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_BASE_LANE.into(),
            max_txs: 0,
            tie_break: TieBreak::FirstSeen,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Governance account allowed to change lanes and params.
    #[serde(with = "hex_address")]
    pub authority: Address,
    pub genesis: GenesisState,
    /// Denom in which base-lane fees are ranked; other denoms rank as zero.
    pub fee_denom: String,
    pub auction_lane: AuctionLaneConfig,
    pub free_lane: FreeLaneConfig,
    pub base_lane: BaseLaneConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            authority: ZERO_ADDRESS,
            genesis: GenesisState::default(),
            fee_denom: "stake".into(),
            auction_lane: AuctionLaneConfig::default(),
            free_lane: FreeLaneConfig::default(),
            base_lane: BaseLaneConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |e: EngineError| EngineError::InvalidConfig(e.to_string());
        self.genesis.params.validate().map_err(invalid)?;
        LaneRegistry::from_genesis(self.genesis.lanes.clone()).map_err(invalid)?;
        self.genesis.validate_cleared_bids()?;

        if !validate_denom(&self.fee_denom) {
            return Err(EngineError::InvalidConfig(format!(
                "invalid fee denom {:?}",
                self.fee_denom
            )));
        }

        let ids = [&self.auction_lane.id, &self.free_lane.id, &self.base_lane.id];
        let distinct: BTreeSet<&String> = ids.iter().copied().collect();
        if distinct.len() != ids.len() {
            return Err(EngineError::InvalidConfig(format!(
                "auction, free and base lanes need distinct ids, got {:?}",
                ids
            )));
        }

        if self.free_lane.exempt_msg_types.iter().any(|t| t == MSG_AUCTION_BID) {
            return Err(EngineError::InvalidConfig("auction bids cannot be fee exempt".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklane_primitives::Coin;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.genesis.lanes.len(), 3);
        assert_eq!(config.auction_lane.tie_break, TieBreak::FirstSeen);
        assert_eq!(config.free_lane.exempt_msg_types.len(), 2);
    }

    #[test]
    fn test_json_with_defaults() {
        let json = r#"{
            "authority": "0x0101010101010101010101010101010101010101010101010101010101010101",
            "auction_lane": { "tie_break": "bid_hash" }
        }"#;
        let config = EngineConfig::from_json_str(json).unwrap();
        assert_eq!(config.authority, [1u8; 32]);
        assert_eq!(config.auction_lane.tie_break, TieBreak::BidHash);
        assert_eq!(config.auction_lane.id, "mev");
        assert_eq!(config.fee_denom, "stake");
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig::default();
        let json = config.to_json_string().unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_unparseable_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_bad_genesis_lanes() {
        let mut config = EngineConfig::default();
        config.genesis.lanes[2].order = 7;
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_shared_lane_ids() {
        let mut config = EngineConfig::default();
        config.free_lane.id = "default".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_exempt_bids() {
        let mut config = EngineConfig::default();
        config.free_lane.exempt_msg_types.push(MSG_AUCTION_BID.into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cleared_bids_round_trip() {
        let mut config = EngineConfig::default();
        config.genesis.cleared_bids.push(ClearedBid {
            bidder: [0xb1; 32],
            bundle_digest: [0xd1; 32],
            amount: Coin::new(100, "stake"),
            height: 9,
        });
        let json = config.to_json_string().unwrap();
        assert!(json.contains("0xd1d1"));
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_duplicate_cleared_bids() {
        let mut config = EngineConfig::default();
        let entry = ClearedBid {
            bidder: [0xb1; 32],
            bundle_digest: [0xd1; 32],
            amount: Coin::new(100, "stake"),
            height: 9,
        };
        config.genesis.cleared_bids = vec![entry.clone(), entry];
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_params() {
        let mut config = EngineConfig::default();
        config.genesis.params.max_bundle_size = 0;
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }
}
