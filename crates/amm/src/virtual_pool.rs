//! Synthetic one-hop pools derived from two real pools sharing a common
//! token, enabling pricing for pairs that have no direct pool.

use {crate::constant_product, alloy_primitives::U256};

/// One leg of a virtual pool: a real pool's reserves oriented as
/// (traded token, common token).
#[derive(Clone, Copy, Debug)]
pub struct Leg {
    /// Reserve of the token this leg trades (`j` or `i`).
    pub base: U256,
    /// Reserve of the token shared by both legs (`k`).
    pub common: U256,
    /// Swap fee of the underlying pool, in basis points.
    pub fee: u32,
}

/// A derived `i ↔ j` pool. Priced with the regular constant-product math;
/// never cached, recomputed per request from two same-block snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VirtualPool {
    pub reserve_in: U256,
    pub reserve_out: U256,
    pub fee: u32,
}

impl VirtualPool {
    /// Derives the synthetic `in ↔ out` pool from the `out ↔ k` leg (`jk`)
    /// and the `in ↔ k` leg (`ik`). The `ik` leg is scaled so its common
    /// token reserve matches the `jk` leg's, then both `k` legs are
    /// dropped. The synthetic fee is the worse of the two legs' fees.
    ///
    /// Returns `None` when either pool is degenerate or the scaling
    /// overflows; callers skip the virtual pool in that case.
    pub fn derive(jk: &Leg, ik: &Leg) -> Option<Self> {
        if jk.common.is_zero() || ik.common.is_zero() || ik.base.is_zero() {
            return None;
        }
        let reserve_in = ik.base.checked_mul(jk.common)? / ik.common;
        if reserve_in.is_zero() {
            return None;
        }
        Some(Self {
            reserve_in,
            reserve_out: jk.base,
            fee: jk.fee.max(ik.fee),
        })
    }

    pub fn get_amount_out(&self, amount_in: U256) -> U256 {
        constant_product::get_amount_out(amount_in, self.reserve_in, self.reserve_out, self.fee)
    }

    pub fn get_amount_in(&self, amount_out: U256) -> U256 {
        constant_product::get_amount_in(amount_out, self.reserve_in, self.reserve_out, self.fee)
    }
}
