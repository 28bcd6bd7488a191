//! Concrete venue adapters. Every adapter implements the same capability
//! surface; they differ in where their prices come from: event-backed
//! constant-product pools, a fixed 1:1 wrap, or an out-of-band rate feed.

pub mod constant_product;
pub mod external_rate;
pub mod wrapped_native;
