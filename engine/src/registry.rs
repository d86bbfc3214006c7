//! Lane registry: the ordered, validated set of lanes.
//!
//! Lanes are created at genesis or through governance and are read on
//! every proposal. Orders form the contiguous range `0..len()`, so a new
//! lane always takes the next order. After creation only the block-space
//! fraction can change. Every mutation validates first and writes last,
//! so a failed call leaves the registry as it was.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use blocklane_primitives::{Address, Decimal};

use crate::error::EngineError;

/// Maximum lane id length.
pub const MAX_LANE_ID_LEN: usize = 32;

/// One partition of block space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub id: String,
    /// Share of the block this lane may fill. `0` means no share of its
    /// own: the lane may use whatever space is left.
    pub block_space_fraction: Decimal,
    /// Position in the block; lower orders are filled first.
    pub order: u32,
}

impl Lane {
    pub fn new(id: impl Into<String>, block_space_fraction: Decimal, order: u32) -> Self {
        Self {
            id: id.into(),
            block_space_fraction,
            order,
        }
    }

    /// Checks the per-lane invariants.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.id.is_empty() {
            return Err(EngineError::InvalidLane("lane id is empty".into()));
        }
        if self.id.len() > MAX_LANE_ID_LEN {
            return Err(EngineError::InvalidLane(format!(
                "lane id {:?} longer than {} chars",
                self.id, MAX_LANE_ID_LEN
            )));
        }
        let well_formed = self
            .id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
        if !well_formed {
            return Err(EngineError::InvalidLane(format!(
                "lane id {:?} must match [a-z0-9_-]",
                self.id
            )));
        }
        if !self.block_space_fraction.is_unit_interval() {
            return Err(EngineError::InvalidLane(format!(
                "lane {:?}: block space fraction {} outside [0, 1]",
                self.id, self.block_space_fraction
            )));
        }
        Ok(())
    }
}

/// Fails with `Unauthorized` unless `caller` is the configured authority.
pub fn ensure_authority(authority: &Address, caller: &Address) -> Result<(), EngineError> {
    if caller != authority {
        return Err(EngineError::Unauthorized { caller: *caller });
    }
    Ok(())
}

/// Lanes keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneRegistry {
    lanes: BTreeMap<String, Lane>,
}

impl LaneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a complete lane set, in any order.
    ///
    /// The set must satisfy every invariant once assembled.
    pub fn from_genesis(lanes: Vec<Lane>) -> Result<Self, EngineError> {
        let mut by_id = BTreeMap::new();
        for lane in lanes {
            lane.validate()?;
            if by_id.contains_key(&lane.id) {
                return Err(EngineError::InvalidLane(format!("duplicate lane id {:?}", lane.id)));
            }
            by_id.insert(lane.id.clone(), lane);
        }

        let mut orders: Vec<u32> = by_id.values().map(|l| l.order).collect();
        orders.sort_unstable();
        for (expected, order) in orders.iter().enumerate() {
            if *order as usize != expected {
                return Err(EngineError::InvalidLane(format!(
                    "lane orders must be contiguous from 0, found {:?}",
                    orders
                )));
            }
        }

        let registry = Self { lanes: by_id };
        registry.check_total_fraction(None)?;
        Ok(registry)
    }

    /// Add a new lane. Its order must be `len()`.
    pub fn register(
        &mut self,
        authority: &Address,
        caller: &Address,
        lane: Lane,
    ) -> Result<(), EngineError> {
        ensure_authority(authority, caller)?;
        lane.validate()?;
        if self.lanes.contains_key(&lane.id) {
            return Err(EngineError::InvalidLane(format!(
                "lane {:?} already registered",
                lane.id
            )));
        }
        if lane.order as usize != self.lanes.len() {
            return Err(EngineError::InvalidLane(format!(
                "lane {:?}: order {} breaks contiguity, next order is {}",
                lane.id,
                lane.order,
                self.lanes.len()
            )));
        }
        self.check_total_fraction(Some(&lane))?;

        info!(
            lane = %lane.id,
            order = lane.order,
            fraction = %lane.block_space_fraction,
            "lane registered"
        );
        self.lanes.insert(lane.id.clone(), lane);
        Ok(())
    }

    /// Change an existing lane's block-space fraction.
    pub fn update(
        &mut self,
        authority: &Address,
        caller: &Address,
        lane: Lane,
    ) -> Result<(), EngineError> {
        ensure_authority(authority, caller)?;
        lane.validate()?;
        let stored = self
            .lanes
            .get(&lane.id)
            .ok_or_else(|| EngineError::NotFound(format!("lane {:?}", lane.id)))?;
        if stored.order != lane.order {
            return Err(EngineError::OrderImmutable {
                id: lane.id.clone(),
                stored: stored.order,
                submitted: lane.order,
            });
        }
        self.check_total_fraction(Some(&lane))?;

        info!(lane = %lane.id, fraction = %lane.block_space_fraction, "lane updated");
        self.lanes.insert(lane.id.clone(), lane);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&Lane, EngineError> {
        self.lanes
            .get(id)
            .ok_or_else(|| EngineError::NotFound(format!("lane {:?}", id)))
    }

    /// All lanes by ascending order.
    pub fn list(&self) -> Vec<Lane> {
        let mut lanes: Vec<Lane> = self.lanes.values().cloned().collect();
        lanes.sort_by_key(|l| l.order);
        lanes
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Persisted layout: lanes keyed by id.
    pub fn export(&self) -> BTreeMap<String, Lane> {
        self.lanes.clone()
    }

    /// Sum of all fractions, with `candidate` replacing or joining the
    /// stored lane of the same id, must not exceed one.
    fn check_total_fraction(&self, candidate: Option<&Lane>) -> Result<(), EngineError> {
        let mut total = Decimal::ZERO;
        let stored = self
            .lanes
            .values()
            .filter(|l| candidate.map_or(true, |c| c.id != l.id));
        for lane in stored.chain(candidate) {
            total = total
                .checked_add(lane.block_space_fraction)
                .ok_or_else(|| EngineError::InvalidLane("block space fractions overflow".into()))?;
        }
        if !total.is_unit_interval() {
            return Err(EngineError::InvalidLane(format!(
                "block space fractions sum to {}, above 1",
                total
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOV: Address = [0x60; 32];
    const MALLORY: Address = [0x66; 32];

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn three_lanes() -> LaneRegistry {
        LaneRegistry::from_genesis(vec![
            Lane::new("default", Decimal::ZERO, 2),
            Lane::new("mev", dec("0.2"), 0),
            Lane::new("free", dec("0.2"), 1),
        ])
        .unwrap()
    }

    // ── Genesis ──

    #[test]
    fn test_genesis_lists_by_order() {
        let registry = three_lanes();
        let ids: Vec<String> = registry.list().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["mev", "free", "default"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_genesis_rejects_gap_in_orders() {
        let err = LaneRegistry::from_genesis(vec![
            Lane::new("mev", dec("0.2"), 0),
            Lane::new("default", Decimal::ZERO, 2),
        ])
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidLane(_)));
    }

    #[test]
    fn test_genesis_rejects_duplicate_order_and_id() {
        assert!(LaneRegistry::from_genesis(vec![
            Lane::new("a", Decimal::ZERO, 0),
            Lane::new("b", Decimal::ZERO, 0),
        ])
        .is_err());
        assert!(LaneRegistry::from_genesis(vec![
            Lane::new("a", Decimal::ZERO, 0),
            Lane::new("a", Decimal::ZERO, 1),
        ])
        .is_err());
    }

    #[test]
    fn test_genesis_rejects_fractions_above_one() {
        let err = LaneRegistry::from_genesis(vec![
            Lane::new("a", dec("0.6"), 0),
            Lane::new("b", dec("0.5"), 1),
        ])
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidLane(_)));
    }

    // ── Register ──

    #[test]
    fn test_register_then_get_returns_stored_lane() {
        let mut registry = three_lanes();
        let lane = Lane::new("oracle", dec("0.1"), 3);
        registry.register(&GOV, &GOV, lane.clone()).unwrap();
        assert_eq!(registry.get("oracle").unwrap(), &lane);
        assert_eq!(registry.list().last(), Some(&lane));
    }

    #[test]
    fn test_register_requires_authority_first() {
        let mut registry = three_lanes();
        // Invalid lane from the wrong caller reports the authority failure.
        let err = registry
            .register(&GOV, &MALLORY, Lane::new("", dec("2"), 9))
            .unwrap_err();
        assert_eq!(err, EngineError::Unauthorized { caller: MALLORY });
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_register_rejects_invalid_lanes() {
        let mut registry = three_lanes();
        for lane in [
            Lane::new("", Decimal::ZERO, 3),
            Lane::new("Upper", Decimal::ZERO, 3),
            Lane::new("x".repeat(33), Decimal::ZERO, 3),
            Lane::new("big", dec("1.01"), 3),
            Lane::new("gap", Decimal::ZERO, 5),
            Lane::new("mev", Decimal::ZERO, 3),
            Lane::new("greedy", dec("0.7"), 3),
        ] {
            let err = registry.register(&GOV, &GOV, lane.clone()).unwrap_err();
            assert!(matches!(err, EngineError::InvalidLane(_)), "{:?} accepted", lane);
        }
        assert_eq!(registry, three_lanes());
    }

    // ── Update ──

    #[test]
    fn test_update_changes_fraction_only() {
        let mut registry = three_lanes();
        registry.update(&GOV, &GOV, Lane::new("free", dec("0.3"), 1)).unwrap();
        assert_eq!(registry.get("free").unwrap().block_space_fraction, dec("0.3"));
    }

    #[test]
    fn test_update_order_is_immutable() {
        let mut registry = three_lanes();
        let err = registry
            .update(&GOV, &GOV, Lane::new("free", dec("0.3"), 0))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::OrderImmutable {
                id: "free".into(),
                stored: 1,
                submitted: 0
            }
        );
        assert_eq!(registry.get("free").unwrap(), &Lane::new("free", dec("0.2"), 1));
    }

    #[test]
    fn test_update_unknown_lane() {
        let mut registry = three_lanes();
        let err = registry
            .update(&GOV, &GOV, Lane::new("nope", Decimal::ZERO, 0))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_update_fraction_sum_excludes_old_value() {
        let mut registry = three_lanes();
        // 0.8 + 0.2 = 1 once the old 0.2 for "mev" is replaced.
        registry.update(&GOV, &GOV, Lane::new("mev", dec("0.8"), 0)).unwrap();
        assert!(registry.update(&GOV, &GOV, Lane::new("mev", dec("0.81"), 0)).is_err());
    }

    #[test]
    fn test_update_unauthorized() {
        let mut registry = three_lanes();
        let err = registry
            .update(&GOV, &MALLORY, Lane::new("free", dec("0.3"), 1))
            .unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized { .. }));
    }

    #[test]
    fn test_get_unknown() {
        assert!(matches!(three_lanes().get("x"), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_export_keyed_by_id() {
        let exported = three_lanes().export();
        assert_eq!(exported.keys().cloned().collect::<Vec<_>>(), vec!["default", "free", "mev"]);
        assert_eq!(exported["mev"].order, 0);
    }
}
