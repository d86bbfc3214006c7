//! Block space accounting in bytes and gas.

use blocklane_primitives::{BlockTx, Decimal};

/// An amount of block space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockSpace {
    pub bytes: u64,
    pub gas: u64,
}

impl BlockSpace {
    pub const ZERO: BlockSpace = BlockSpace { bytes: 0, gas: 0 };

    pub fn new(bytes: u64, gas: u64) -> Self {
        Self { bytes, gas }
    }

    /// Block ceiling from consensus limits. A gas limit of `0` means
    /// unlimited.
    pub fn block_limits(max_bytes: u64, max_gas: u64) -> Self {
        let gas = if max_gas == 0 { u64::MAX } else { max_gas };
        Self::new(max_bytes, gas)
    }

    pub fn of_tx(tx: &BlockTx) -> Self {
        Self::new(tx.bytes(), tx.gas)
    }

    pub fn of_txs<'a, I>(txs: I) -> Self
    where
        I: IntoIterator<Item = &'a BlockTx>,
    {
        txs.into_iter()
            .fold(Self::ZERO, |acc, tx| acc.saturating_add(Self::of_tx(tx)))
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self::new(
            self.bytes.saturating_add(other.bytes),
            self.gas.saturating_add(other.gas),
        )
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self::new(
            self.bytes.saturating_sub(other.bytes),
            self.gas.saturating_sub(other.gas),
        )
    }

    pub fn min(self, other: Self) -> Self {
        Self::new(self.bytes.min(other.bytes), self.gas.min(other.gas))
    }

    /// True if neither dimension exceeds `limit`.
    pub fn fits_within(&self, limit: &Self) -> bool {
        self.bytes <= limit.bytes && self.gas <= limit.gas
    }

    /// `floor(self * fraction)` per dimension, for fractions in `[0, 1]`.
    pub fn fraction(&self, fraction: Decimal) -> Self {
        Self::new(
            fraction.mul_floor_u64(self.bytes).unwrap_or(self.bytes),
            fraction.mul_floor_u64(self.gas).unwrap_or(self.gas),
        )
    }
}

/// Space a lane may use: its fraction of the block, capped by what is
/// left. A zero fraction takes everything that is left.
pub fn lane_budget(limits: BlockSpace, used: BlockSpace, fraction: Decimal) -> BlockSpace {
    let remaining = limits.saturating_sub(used);
    if fraction.is_zero() {
        remaining
    } else {
        limits.fraction(fraction).min(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_zero_gas_is_unlimited() {
        let limits = BlockSpace::block_limits(1000, 0);
        assert_eq!(limits.gas, u64::MAX);
        assert!(BlockSpace::new(10, u64::MAX - 1).fits_within(&limits));
    }

    #[test]
    fn test_fraction_floors() {
        let space = BlockSpace::new(999, 101);
        assert_eq!(space.fraction(dec("0.25")), BlockSpace::new(249, 25));
        assert_eq!(space.fraction(Decimal::ONE), space);
    }

    #[test]
    fn test_lane_budget_capped_by_remaining() {
        let limits = BlockSpace::new(1000, 1000);
        assert_eq!(lane_budget(limits, BlockSpace::ZERO, dec("0.2")), BlockSpace::new(200, 200));
        assert_eq!(
            lane_budget(limits, BlockSpace::new(900, 100), dec("0.2")),
            BlockSpace::new(100, 200)
        );
    }

    #[test]
    fn test_zero_fraction_takes_rest() {
        let limits = BlockSpace::new(1000, 1000);
        assert_eq!(
            lane_budget(limits, BlockSpace::new(300, 50), Decimal::ZERO),
            BlockSpace::new(700, 950)
        );
    }

    #[test]
    fn test_of_txs_sums() {
        let txs = vec![BlockTx::new(vec![0; 10], 5), BlockTx::new(vec![0; 20], 7)];
        assert_eq!(BlockSpace::of_txs(&txs), BlockSpace::new(30, 12));
    }
}
