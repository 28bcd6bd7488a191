//! Big-integer quote math for constant-product pools and for synthetic
//! "virtual" pools derived from two real pools sharing a common token.
//!
//! All math here is pure and contract-exact: rounding, the `1 +` round-up
//! on buy quotes and the uint112 reserve overflow guard mirror the behavior
//! of the on-chain pair contracts. Anything that would overflow or divide
//! by zero yields a 0 quote instead of an error; callers treat 0 as "no
//! quote for this amount".

pub mod constant_product;
pub mod virtual_pool;

pub use {
    constant_product::{FEE_DENOMINATOR, RESERVE_LIMIT, get_amount_in, get_amount_out},
    virtual_pool::VirtualPool,
};
