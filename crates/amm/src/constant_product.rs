//! The famous `x · y = k` constant-product formula with fee-on-input, as
//! implemented by Uniswap V2 and its many forks.

use alloy_primitives::U256;

/// Fees are expressed in basis points against this denominator.
pub const FEE_DENOMINATOR: u32 = 10_000;

/// Pair contracts store reserves as `uint112`. Trades that would push a
/// reserve past this value revert on-chain, so they quote as 0 here.
pub const RESERVE_LIMIT: U256 = U256::from_limbs([u64::MAX, 0x0000_ffff_ffff_ffff, 0, 0]);

/// Computes the output amount for a swap of `amount_in`, rounding down:
///
/// `(x·(F−fee)·r_out) / (r_in·F + x·(F−fee))`
///
/// Returns 0 for empty pools, a zero denominator, or when the trade would
/// overflow the pair's `uint112` reserve slot.
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256, fee: u32) -> U256 {
    if fee >= FEE_DENOMINATOR {
        return U256::ZERO;
    }
    match reserve_in.checked_add(amount_in) {
        Some(new_reserve) if new_reserve <= RESERVE_LIMIT => (),
        _ => return U256::ZERO,
    }

    let amount_with_fee = amount_in * U256::from(FEE_DENOMINATOR - fee);
    let numerator = match amount_with_fee.checked_mul(reserve_out) {
        Some(numerator) => numerator,
        None => return U256::ZERO,
    };
    let denominator = match reserve_in
        .checked_mul(U256::from(FEE_DENOMINATOR))
        .and_then(|scaled| scaled.checked_add(amount_with_fee))
    {
        Some(denominator) if !denominator.is_zero() => denominator,
        _ => return U256::ZERO,
    };

    numerator / denominator
}

/// Computes the input amount required to receive `amount_out`, rounding up:
///
/// `1 + (r_in·y·F) / ((F−fee)·(r_out − y))`
///
/// The `1 +` matches the pair contract's router math exactly. Returns 0
/// when the pool cannot provide `amount_out` (denominator ≤ 0) or when the
/// requested output is 0 (numerator 0).
pub fn get_amount_in(amount_out: U256, reserve_in: U256, reserve_out: U256, fee: u32) -> U256 {
    if amount_out.is_zero() || fee >= FEE_DENOMINATOR || amount_out >= reserve_out {
        return U256::ZERO;
    }

    let numerator = match reserve_in
        .checked_mul(amount_out)
        .and_then(|product| product.checked_mul(U256::from(FEE_DENOMINATOR)))
    {
        Some(numerator) => numerator,
        None => return U256::ZERO,
    };
    let denominator = (reserve_out - amount_out) * U256::from(FEE_DENOMINATOR - fee);
    if denominator.is_zero() {
        return U256::ZERO;
    }

    U256::from(1) + numerator / denominator
}

/// One hop of a multi-pool path, oriented in trade direction.
#[derive(Clone, Copy, Debug)]
pub struct Hop {
    pub reserve_in: U256,
    pub reserve_out: U256,
    pub fee: u32,
}

/// Sells `amount_in` along `path`, composing hops left to right on the
/// input side. A 0 quote on any hop short-circuits to 0.
pub fn sell_along_path(amount_in: U256, path: &[Hop]) -> U256 {
    path.iter().fold(amount_in, |amount, hop| {
        if amount.is_zero() {
            return U256::ZERO;
        }
        get_amount_out(amount, hop.reserve_in, hop.reserve_out, hop.fee)
    })
}

/// Computes the input required to buy `amount_out` through `path`,
/// composing hops right to left on the output side.
pub fn buy_along_path(amount_out: U256, path: &[Hop]) -> U256 {
    path.iter().rev().fold(amount_out, |amount, hop| {
        if amount.is_zero() {
            return U256::ZERO;
        }
        get_amount_in(amount, hop.reserve_in, hop.reserve_out, hop.fee)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u256(value: u128) -> U256 {
        U256::from(value)
    }

    #[test]
    fn amount_out_matches_pair_contract() {
        // 1000 in against (1_000_000, 2_000_000) reserves at 30 bps:
        // (1000·9970·2000000) / (1000000·10000 + 1000·9970) = 1993
        assert_eq!(
            get_amount_out(u256(1_000), u256(1_000_000), u256(2_000_000), 30),
            u256(1_993),
        );
        // One whole unit floors to 1.
        assert_eq!(
            get_amount_out(u256(1), u256(1_000_000), u256(2_000_000), 30),
            u256(1),
        );
    }

    #[test]
    fn amount_out_zero_cases() {
        assert_eq!(get_amount_out(u256(0), u256(100), u256(100), 30), U256::ZERO);
        assert_eq!(get_amount_out(u256(100), u256(100), u256(0), 30), U256::ZERO);
        // Zero denominator (empty pool, zero input).
        assert_eq!(get_amount_out(u256(0), u256(0), u256(100), 30), U256::ZERO);
        // Fee eats the entire input.
        assert_eq!(
            get_amount_out(u256(100), u256(100), u256(100), FEE_DENOMINATOR),
            U256::ZERO,
        );
    }

    #[test]
    fn amount_out_respects_reserve_limit() {
        let reserve = RESERVE_LIMIT - u256(10);
        assert_eq!(get_amount_out(u256(10), reserve, u256(1_000), 30), u256(0));
        assert_eq!(
            get_amount_out(u256(11), reserve, u256(1_000_000_000), 30),
            U256::ZERO,
        );
    }

    #[test]
    fn amount_in_rounds_up() {
        // Buying back the 1993 quote from above costs at least the original
        // 1000 input, and the quoted input is always sufficient.
        let amount_in = get_amount_in(u256(1_993), u256(1_000_000), u256(2_000_000), 30);
        assert!(amount_in >= u256(1_000));
        assert!(get_amount_out(amount_in, u256(1_000_000), u256(2_000_000), 30) >= u256(1_993));
    }

    #[test]
    fn amount_in_zero_cases() {
        assert_eq!(get_amount_in(u256(0), u256(100), u256(100), 30), U256::ZERO);
        // Output exceeding reserves is unfillable.
        assert_eq!(get_amount_in(u256(100), u256(100), u256(100), 30), U256::ZERO);
        assert_eq!(get_amount_in(u256(101), u256(100), u256(100), 30), U256::ZERO);
    }

    #[test]
    fn buy_then_sell_never_profits() {
        // getAmountIn(getAmountOut(x)) ≥ x for all valid inputs.
        for (x, r0, r1, fee) in [
            (1_000u128, 1_000_000u128, 2_000_000u128, 30u32),
            (1, 1_000, 1_000, 0),
            (123_456, 777_777, 55_555, 100),
            (5, 10, 10_000_000, 9_999),
        ] {
            let out = get_amount_out(u256(x), u256(r0), u256(r1), fee);
            if out.is_zero() {
                continue;
            }
            let back = get_amount_in(out, u256(r0), u256(r1), fee);
            assert!(back >= u256(x), "x={x} out={out} back={back}");
        }
    }

    #[test]
    fn path_composition() {
        let path = [
            Hop {
                reserve_in: u256(1_000_000),
                reserve_out: u256(2_000_000),
                fee: 30,
            },
            Hop {
                reserve_in: u256(2_000_000),
                reserve_out: u256(1_000_000),
                fee: 30,
            },
        ];
        let sold = sell_along_path(u256(1_000), &path);
        // Two hops at 30 bps round-trip back below the input.
        assert!(sold < u256(1_000));
        assert!(!sold.is_zero());

        let bought = buy_along_path(sold, &path);
        assert!(bought >= u256(1_000) - u256(2));

        assert_eq!(sell_along_path(U256::ZERO, &path), U256::ZERO);
        assert_eq!(buy_along_path(U256::ZERO, &path), U256::ZERO);
    }
}
