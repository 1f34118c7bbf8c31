//! Exposure and move-amount calculation.
//!
//! The move amount is the base asset which, swapped at the current pool
//! price, brings the pooled-asset share of total holdings up to
//! `max_move_percent`:
//!
//! ```text
//! target_move = max_move_percent * (total_base + pooled_value_in_base) - pooled_value_in_base
//! ```
//!
//! bounded by `max_per_execution`, by what the own address can spend and,
//! when configured, by the pool price-impact cap. All amounts are exact
//! decimals; any intermediate that overflows is rejected as invalid input.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{RebalanceError, Result};
use crate::types::{BalanceSnapshot, MoveLimit, PoolState, RebalanceDecision};

/// Numeric limits applied to every run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RebalanceLimits {
    /// Most base asset swapped in one run
    pub max_per_execution: Decimal,
    /// Highest allowed pooled-asset share of holdings, in [0, 1]
    pub max_move_percent: Decimal,
    /// Base asset kept as UTXOs on the own address
    pub reserve: Decimal,
    /// Largest relative pool price move one swap may cause
    pub max_price_impact: Option<Decimal>,
}

impl RebalanceLimits {
    pub fn validate(&self) -> Result<()> {
        if self.max_per_execution < Decimal::ZERO {
            return Err(RebalanceError::InvalidInput(format!(
                "maxPerExecution must not be negative, got {}",
                self.max_per_execution
            )));
        }
        if self.max_move_percent < Decimal::ZERO || self.max_move_percent > Decimal::ONE {
            return Err(RebalanceError::InvalidInput(format!(
                "maxMovePercent must be within [0, 1], got {}",
                self.max_move_percent
            )));
        }
        if self.reserve < Decimal::ZERO {
            return Err(RebalanceError::InvalidInput(format!(
                "reserve must not be negative, got {}",
                self.reserve
            )));
        }
        if let Some(impact) = self.max_price_impact {
            if impact <= Decimal::ZERO {
                return Err(RebalanceError::InvalidInput(format!(
                    "maxPriceImpact must be positive, got {}",
                    impact
                )));
            }
        }
        Ok(())
    }
}

fn check_amount(what: &str, owner: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(RebalanceError::InvalidInput(format!(
            "{} of {} must not be negative, got {}",
            what, owner, value
        )));
    }
    Ok(())
}

fn validate_snapshot(snapshot: &BalanceSnapshot, pool: &PoolState) -> Result<()> {
    check_amount("UTXO balance", &snapshot.address, snapshot.base_amount)?;
    for token_id in [&pool.base_token_id, &pool.pooled_token_id] {
        check_amount(
            &format!("token {}", token_id),
            &snapshot.address,
            snapshot.token_amount(token_id),
        )?;
    }
    Ok(())
}

fn validate_pool(pool: &PoolState) -> Result<()> {
    for (what, value) in [
        ("price ratio", pool.price_ratio),
        ("base reserve", pool.base_reserve),
        ("pooled reserve", pool.pooled_reserve),
    ] {
        check_amount(what, &pool.symbol, value)?;
    }
    Ok(())
}

fn overflow(what: &str) -> RebalanceError {
    RebalanceError::InvalidInput(format!("{} is out of range", what))
}

fn sum(what: &str, values: impl IntoIterator<Item = Decimal>) -> Result<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| overflow(what))
}

/// Base amount whose swap moves the pool price by at most `impact`:
/// `base_reserve * (sqrt(1 + impact) - 1)`.
fn price_impact_cap(base_reserve: Decimal, impact: Decimal) -> Result<Decimal> {
    impact
        .to_f64()
        .map(|p| (1.0 + p).sqrt() - 1.0)
        .and_then(Decimal::from_f64_retain)
        .and_then(|factor| base_reserve.checked_mul(factor))
        .ok_or_else(|| overflow("price impact cap"))
}

/// Computes exposure and move amount from the balances of the controlled and
/// own addresses. `community_base` is base asset held for the fund outside
/// both addresses (zero when not counted). Pure: identical inputs give
/// identical decisions.
pub fn compute_decision(
    controlled: &BalanceSnapshot,
    own: &BalanceSnapshot,
    community_base: Decimal,
    pool: &PoolState,
    limits: &RebalanceLimits,
) -> Result<RebalanceDecision> {
    limits.validate()?;
    validate_pool(pool)?;
    validate_snapshot(controlled, pool)?;
    validate_snapshot(own, pool)?;
    check_amount("community balance", "the fund", community_base)?;

    let base_id = pool.base_token_id.as_str();
    let pooled_id = pool.pooled_token_id.as_str();

    let total_base = sum(
        "total base",
        [
            controlled.base_amount,
            controlled.token_amount(base_id),
            own.base_amount,
            own.token_amount(base_id),
            community_base,
        ],
    )?;
    let total_pooled = sum(
        "total pooled",
        [controlled.token_amount(pooled_id), own.token_amount(pooled_id)],
    )?;

    let pooled_value_in_base = total_pooled
        .checked_mul(pool.price_ratio)
        .ok_or_else(|| overflow("pooled value"))?;
    let holdings = pooled_value_in_base
        .checked_add(total_base)
        .ok_or_else(|| overflow("holdings"))?;
    let exposure_ratio = if holdings > Decimal::ZERO {
        pooled_value_in_base
            .checked_div(holdings)
            .ok_or_else(|| overflow("exposure ratio"))?
            .clamp(Decimal::ZERO, Decimal::ONE)
    } else {
        Decimal::ZERO
    };

    if exposure_ratio >= limits.max_move_percent {
        return Ok(RebalanceDecision {
            total_base,
            community_base,
            total_pooled,
            pooled_value_in_base,
            exposure_ratio,
            target_move: Decimal::ZERO,
            move_amount: Decimal::ZERO,
            limited_by: MoveLimit::ExposureCap,
        });
    }

    let target_move = limits
        .max_move_percent
        .checked_mul(holdings)
        .and_then(|capped| capped.checked_sub(pooled_value_in_base))
        .ok_or_else(|| overflow("target move"))?;
    // UTXOs above the reserve are consolidated into the account before the swap
    let available = own
        .token_amount(base_id)
        .checked_add((own.base_amount - limits.reserve).max(Decimal::ZERO))
        .ok_or_else(|| overflow("spendable base"))?;

    let mut bounds = vec![
        (target_move, MoveLimit::Target),
        (limits.max_per_execution, MoveLimit::PerExecution),
        (available, MoveLimit::Available),
    ];
    if let Some(impact) = limits.max_price_impact {
        bounds.push((
            price_impact_cap(pool.base_reserve, impact)?,
            MoveLimit::PriceImpact,
        ));
    }

    let (bound, limited_by) = bounds
        .into_iter()
        .fold(None, |best: Option<(Decimal, MoveLimit)>, candidate| match best {
            Some(b) if b.0 <= candidate.0 => Some(b),
            _ => Some(candidate),
        })
        .unwrap_or((Decimal::ZERO, MoveLimit::Target));

    Ok(RebalanceDecision {
        total_base,
        community_base,
        total_pooled,
        pooled_value_in_base,
        exposure_ratio,
        target_move,
        move_amount: utils::floor_amount(bound).max(Decimal::ZERO),
        limited_by,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    const DFI: &str = "0";
    const DUSD: &str = "15";

    fn pool(price_ratio: Decimal) -> PoolState {
        PoolState {
            symbol: "DUSD-DFI".to_string(),
            base_token_id: DFI.to_string(),
            pooled_token_id: DUSD.to_string(),
            price_ratio,
            base_reserve: dec!(1000000),
            pooled_reserve: dec!(1000000).checked_div(price_ratio).unwrap_or_default(),
        }
    }

    fn snapshot(address: &str, utxo: Decimal, dfi: Decimal, dusd: Decimal) -> BalanceSnapshot {
        let mut tokens = BTreeMap::new();
        if dfi > Decimal::ZERO {
            tokens.insert(DFI.to_string(), dfi);
        }
        if dusd > Decimal::ZERO {
            tokens.insert(DUSD.to_string(), dusd);
        }
        BalanceSnapshot {
            address: address.to_string(),
            base_amount: utxo,
            tokens,
        }
    }

    fn limits(max_per_execution: Decimal, max_move_percent: Decimal) -> RebalanceLimits {
        RebalanceLimits {
            max_per_execution,
            max_move_percent,
            reserve: Decimal::ONE,
            max_price_impact: None,
        }
    }

    fn decide(
        cf: &BalanceSnapshot,
        own: &BalanceSnapshot,
        price: Decimal,
        l: &RebalanceLimits,
    ) -> Result<RebalanceDecision> {
        compute_decision(cf, own, Decimal::ZERO, &pool(price), l)
    }

    #[test]
    fn no_pooled_holdings_means_zero_exposure() {
        let cf = snapshot("cf", dec!(60), dec!(40), Decimal::ZERO);
        let own = BalanceSnapshot {
            address: "own".to_string(),
            ..Default::default()
        };
        let d = decide(&cf, &own, dec!(2), &limits(dec!(1000), Decimal::ZERO)).unwrap();
        assert_eq!(d.total_base, dec!(100));
        assert_eq!(d.exposure_ratio, Decimal::ZERO);
        assert_eq!(d.move_amount, Decimal::ZERO);
    }

    #[test]
    fn already_over_cap_moves_nothing() {
        let cf = snapshot("cf", Decimal::ZERO, Decimal::ZERO, dec!(50));
        let own = snapshot("own", Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        let d = decide(&cf, &own, Decimal::ONE, &limits(dec!(1000), dec!(0.3))).unwrap();
        assert_eq!(d.exposure_ratio, Decimal::ONE);
        assert_eq!(d.move_amount, Decimal::ZERO);
        assert_eq!(d.limited_by, MoveLimit::ExposureCap);
    }

    #[test]
    fn below_cap_moves_towards_target() {
        let cf = snapshot("cf", dec!(200), Decimal::ZERO, dec!(100));
        let own = snapshot("own", Decimal::ZERO, dec!(500), Decimal::ZERO);
        let d = decide(&cf, &own, Decimal::ONE, &limits(dec!(1000), dec!(0.3))).unwrap();
        assert_eq!(d.total_base, dec!(700));
        assert_eq!(d.exposure_ratio, dec!(0.125));
        // 0.3 * 800 - 100
        assert_eq!(d.move_amount, dec!(140));
        assert_eq!(d.limited_by, MoveLimit::Target);
    }

    #[test]
    fn per_execution_cap_applies() {
        let cf = snapshot("cf", dec!(200), Decimal::ZERO, dec!(100));
        let own = snapshot("own", Decimal::ZERO, dec!(500), Decimal::ZERO);
        let d = decide(&cf, &own, Decimal::ONE, &limits(dec!(25), dec!(0.3))).unwrap();
        assert_eq!(d.move_amount, dec!(25));
        assert_eq!(d.limited_by, MoveLimit::PerExecution);
    }

    #[test]
    fn spendable_own_base_keeps_the_reserve() {
        let cf = snapshot("cf", dec!(700), Decimal::ZERO, dec!(100));
        // 5 UTXO - 1 reserve + 3 account = 7 spendable
        let own = snapshot("own", dec!(5), dec!(3), Decimal::ZERO);
        let d = decide(&cf, &own, Decimal::ONE, &limits(dec!(1000), dec!(0.3))).unwrap();
        assert_eq!(d.move_amount, dec!(7));
        assert_eq!(d.limited_by, MoveLimit::Available);
    }

    #[test]
    fn spendable_amount_keeps_every_satoshi() {
        let cf = snapshot("cf", dec!(100000), Decimal::ZERO, Decimal::ZERO);
        let own = snapshot("own", dec!(683.14727877), Decimal::ZERO, Decimal::ZERO);
        let d = decide(&cf, &own, Decimal::ONE, &limits(dec!(1000), dec!(0.3))).unwrap();
        assert_eq!(d.limited_by, MoveLimit::Available);
        assert_eq!(d.move_amount, dec!(682.14727877));
    }

    #[test]
    fn price_impact_cap_applies() {
        let cf = snapshot("cf", dec!(200), Decimal::ZERO, dec!(100));
        let own = snapshot("own", Decimal::ZERO, dec!(500), Decimal::ZERO);
        let mut l = limits(dec!(1000), dec!(0.3));
        l.max_price_impact = Some(dec!(0.0001));
        let d = decide(&cf, &own, Decimal::ONE, &l).unwrap();
        // 1_000_000 * (sqrt(1.0001) - 1) ~ 49.99875
        assert_eq!(d.limited_by, MoveLimit::PriceImpact);
        assert!((d.move_amount - dec!(49.99875)).abs() < dec!(0.001));
    }

    #[test]
    fn community_balance_counts_as_fund_base() {
        let cf = snapshot("cf", dec!(200), Decimal::ZERO, dec!(100));
        let own = snapshot("own", Decimal::ZERO, dec!(500), Decimal::ZERO);
        let l = limits(dec!(1000), dec!(0.3));

        let without = decide(&cf, &own, Decimal::ONE, &l).unwrap();
        let with = compute_decision(&cf, &own, dec!(200), &pool(Decimal::ONE), &l).unwrap();
        assert_eq!(with.community_base, dec!(200));
        assert_eq!(with.total_base, without.total_base + dec!(200));
        assert_eq!(with.exposure_ratio, dec!(0.1));
        // 0.3 * 1000 - 100
        assert_eq!(with.move_amount, dec!(200));

        let err = compute_decision(&cf, &own, dec!(-1), &pool(Decimal::ONE), &l).unwrap_err();
        assert!(matches!(err, RebalanceError::InvalidInput(_)));
    }

    #[test]
    fn token_lookup_defaults_to_zero() {
        let cf = BalanceSnapshot {
            address: "cf".to_string(),
            base_amount: dec!(10),
            tokens: BTreeMap::from([("2".to_string(), dec!(99))]),
        };
        let own = snapshot("own", Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        let d = decide(&cf, &own, Decimal::ONE, &limits(dec!(1000), dec!(0.3))).unwrap();
        assert_eq!(d.total_base, dec!(10));
        assert_eq!(d.total_pooled, Decimal::ZERO);
    }

    #[test]
    fn empty_holdings_do_not_divide_by_zero() {
        let cf = snapshot("cf", Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        let own = snapshot("own", Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        let d = decide(&cf, &own, Decimal::ONE, &limits(dec!(1000), dec!(0.3))).unwrap();
        assert_eq!(d.exposure_ratio, Decimal::ZERO);
        assert_eq!(d.move_amount, Decimal::ZERO);
    }

    #[test]
    fn rejects_negative_inputs() {
        let good = snapshot("own", Decimal::ONE, Decimal::ZERO, Decimal::ZERO);
        let bad = snapshot("cf", dec!(-0.5), Decimal::ZERO, Decimal::ZERO);
        assert!(matches!(
            decide(&bad, &good, Decimal::ONE, &limits(dec!(10), dec!(0.3))),
            Err(RebalanceError::InvalidInput(_))
        ));

        let mut negative = snapshot("cf", Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        negative.tokens.insert(DUSD.to_string(), dec!(-1));
        assert!(decide(&negative, &good, Decimal::ONE, &limits(dec!(10), dec!(0.3))).is_err());

        let cf = snapshot("cf", Decimal::ONE, Decimal::ZERO, Decimal::ZERO);
        assert!(decide(&cf, &good, dec!(-1), &limits(dec!(10), dec!(0.3))).is_err());
    }

    #[test]
    fn overflowing_holdings_are_invalid_input() {
        let cf = snapshot("cf", Decimal::ONE, Decimal::ZERO, Decimal::MAX);
        let own = snapshot("own", Decimal::ZERO, Decimal::ONE, Decimal::ZERO);
        let err = decide(&cf, &own, dec!(10000000000), &limits(dec!(10), dec!(0.3))).unwrap_err();
        assert!(matches!(err, RebalanceError::InvalidInput(_)));

        let cf = snapshot("cf", Decimal::MAX, Decimal::MAX, Decimal::ZERO);
        let err = decide(&cf, &own, Decimal::ONE, &limits(dec!(10), dec!(0.3))).unwrap_err();
        assert!(matches!(err, RebalanceError::InvalidInput(_)));
    }

    #[test]
    fn rejects_limits_out_of_range() {
        let cf = snapshot("cf", Decimal::ONE, Decimal::ZERO, Decimal::ZERO);
        let own = snapshot("own", Decimal::ONE, Decimal::ZERO, Decimal::ZERO);
        assert!(decide(&cf, &own, Decimal::ONE, &limits(dec!(-1), dec!(0.3))).is_err());
        assert!(decide(&cf, &own, Decimal::ONE, &limits(dec!(10), dec!(1.5))).is_err());
        let mut l = limits(dec!(10), dec!(0.3));
        l.max_price_impact = Some(Decimal::ZERO);
        assert!(decide(&cf, &own, Decimal::ONE, &l).is_err());
    }

    fn satoshis(max: i64) -> impl Strategy<Value = Decimal> {
        (0..max).prop_map(|sats| Decimal::new(sats, 8))
    }

    proptest! {
        #[test]
        fn decision_respects_invariants(
            cf_utxo in satoshis(1_000_000_000_000_000),
            cf_dusd in satoshis(1_000_000_000_000_000),
            own_utxo in satoshis(10_000_000_000_000),
            own_dfi in satoshis(10_000_000_000_000),
            price in (0i64..1_000_000).prop_map(|p| Decimal::new(p, 4)),
            max_per_execution in satoshis(100_000_000_000_000),
            max_move_percent in (0i64..=10_000).prop_map(|p| Decimal::new(p, 4)),
        ) {
            let cf = snapshot("cf", cf_utxo, Decimal::ZERO, cf_dusd);
            let own = snapshot("own", own_utxo, own_dfi, Decimal::ZERO);
            let l = limits(max_per_execution, max_move_percent);
            let d = decide(&cf, &own, price, &l).unwrap();

            prop_assert!(d.exposure_ratio >= Decimal::ZERO && d.exposure_ratio <= Decimal::ONE);
            prop_assert!(d.move_amount >= Decimal::ZERO);
            prop_assert!(d.move_amount <= max_per_execution);
            prop_assert_eq!(d.move_amount, utils::floor_amount(d.move_amount));
            if d.exposure_ratio >= max_move_percent {
                prop_assert_eq!(d.move_amount, Decimal::ZERO);
            }
            if cf_dusd.is_zero() {
                prop_assert_eq!(d.exposure_ratio, Decimal::ZERO);
            }

            let again = decide(&cf, &own, price, &l).unwrap();
            prop_assert_eq!(d, again);
        }
    }
}
