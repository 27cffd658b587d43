//! Snapshot reconciler
//!
//! Pure functions that re-derive a consistent investment snapshot from its
//! inputs. Every snapshot write in the crate goes through here, so the
//! following always hold for persisted rows:
//!
//! - `total_deposited == initial_deposit + monthly_topup`
//! - `current_balance == total_deposited + current_profit`
//! - `progress_percentage == clamp(current_balance / target_cash * 100, 0, 100)`
//!   rounded to two decimals, or `0` when `target_cash` is zero
//!
//! Persisting the result and serializing concurrent writers is the ledger
//! store's job.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::entities::investment_snapshots;
use crate::error::LedgerError;
use crate::models::ledger::TransactionType;
use crate::services::money_utils::{
    to_cents, validate_non_negative_amount, validate_positive_amount, MAX_AMOUNT,
};

/// Target applied when a user has no snapshot yet
pub const DEFAULT_TARGET_CASH: Decimal = dec!(500000.00);

const HUNDRED: Decimal = dec!(100);

/// The money figures of a snapshot, detached from storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFigures {
    pub initial_deposit: Decimal,
    pub monthly_topup: Decimal,
    pub total_deposited: Decimal,
    pub current_profit: Decimal,
    pub target_cash: Decimal,
    pub current_balance: Decimal,
    pub progress_percentage: Decimal,
}

impl Default for SnapshotFigures {
    /// Figures of a freshly registered user
    fn default() -> Self {
        derive(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, DEFAULT_TARGET_CASH)
    }
}

impl From<&investment_snapshots::Model> for SnapshotFigures {
    fn from(model: &investment_snapshots::Model) -> Self {
        Self {
            initial_deposit: to_cents(model.initial_deposit),
            monthly_topup: to_cents(model.monthly_topup),
            total_deposited: to_cents(model.total_deposited),
            current_profit: to_cents(model.current_profit),
            target_cash: to_cents(model.target_cash),
            current_balance: to_cents(model.current_balance),
            progress_percentage: to_cents(model.progress_percentage),
        }
    }
}

/// Absolute overrides; `None` keeps the current (or default) value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotOverrides {
    pub initial_deposit: Option<Decimal>,
    pub monthly_topup: Option<Decimal>,
    pub current_profit: Option<Decimal>,
    pub target_cash: Option<Decimal>,
}

impl SnapshotOverrides {
    pub fn is_empty(&self) -> bool {
        self.initial_deposit.is_none()
            && self.monthly_topup.is_none()
            && self.current_profit.is_none()
            && self.target_cash.is_none()
    }
}

/// Apply absolute overrides to the current snapshot (or the defaults when
/// there is none) and re-derive the dependent fields.
pub fn reconcile(
    current: Option<&SnapshotFigures>,
    overrides: &SnapshotOverrides,
) -> Result<SnapshotFigures, LedgerError> {
    if let Some(target) = overrides.target_cash {
        if target.is_sign_negative() && !target.is_zero() {
            return Err(LedgerError::InvalidTarget);
        }
    }

    let base = current.cloned().unwrap_or_default();

    let initial_deposit = pick("initialDeposit", overrides.initial_deposit, base.initial_deposit)?;
    let monthly_topup = pick("monthlyTopup", overrides.monthly_topup, base.monthly_topup)?;
    let current_profit = pick("currentProfit", overrides.current_profit, base.current_profit)?;
    let target_cash = pick("targetCash", overrides.target_cash, base.target_cash)?;

    derive_checked(initial_deposit, monthly_topup, current_profit, target_cash)
}

/// Debit `amount` from the balance for an approved withdrawal.
///
/// The balance drops by exactly `amount`. The debit is drawn from profit
/// first, then top-ups, then the initial deposit, so no component goes
/// negative and the sum invariants keep holding.
pub fn apply_withdrawal(
    current: &SnapshotFigures,
    amount: Decimal,
) -> Result<SnapshotFigures, LedgerError> {
    let amount = validate_positive_amount(amount)?;
    if amount > current.current_balance {
        return Err(LedgerError::InsufficientBalance);
    }

    let mut remaining = amount;
    let current_profit = draw(current.current_profit, &mut remaining);
    let monthly_topup = draw(current.monthly_topup, &mut remaining);
    let initial_deposit = draw(current.initial_deposit, &mut remaining);

    if !remaining.is_zero() {
        // Only reachable if the stored components disagree with the balance
        return Err(LedgerError::InsufficientBalance);
    }

    derive_checked(initial_deposit, monthly_topup, current_profit, current.target_cash)
}

/// Figures the snapshot would show after crediting a deposit or top-up of
/// `amount`. Used for deposit slips; nothing is persisted.
pub fn project_deposit(
    current: Option<&SnapshotFigures>,
    kind: TransactionType,
    amount: Decimal,
) -> Result<SnapshotFigures, LedgerError> {
    let amount = validate_positive_amount(amount)?;
    let base = current.cloned().unwrap_or_default();

    let overrides = match kind {
        TransactionType::Deposit => SnapshotOverrides {
            initial_deposit: Some(base.initial_deposit + amount),
            ..Default::default()
        },
        TransactionType::Topup => SnapshotOverrides {
            monthly_topup: Some(base.monthly_topup + amount),
            ..Default::default()
        },
        other => return Err(LedgerError::InvalidType(other.to_string())),
    };

    reconcile(Some(&base), &overrides)
}

/// `balance / target * 100`, clamped to [0, 100] and rounded half away from
/// zero to two decimals. A zero target yields zero.
pub fn progress_percentage(balance: Decimal, target: Decimal) -> Decimal {
    if target <= Decimal::ZERO {
        return to_cents(Decimal::ZERO);
    }
    let raw = balance
        .checked_mul(HUNDRED)
        .and_then(|scaled| scaled.checked_div(target))
        .unwrap_or(HUNDRED);
    let clamped = raw.max(Decimal::ZERO).min(HUNDRED);
    to_cents(clamped.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

fn derive(
    initial_deposit: Decimal,
    monthly_topup: Decimal,
    current_profit: Decimal,
    target_cash: Decimal,
) -> SnapshotFigures {
    let total_deposited = initial_deposit + monthly_topup;
    let current_balance = total_deposited + current_profit;
    SnapshotFigures {
        initial_deposit: to_cents(initial_deposit),
        monthly_topup: to_cents(monthly_topup),
        total_deposited: to_cents(total_deposited),
        current_profit: to_cents(current_profit),
        target_cash: to_cents(target_cash),
        current_balance: to_cents(current_balance),
        progress_percentage: progress_percentage(current_balance, target_cash),
    }
}

/// Derived totals share the DECIMAL(15, 2) columns of their inputs
fn derive_checked(
    initial_deposit: Decimal,
    monthly_topup: Decimal,
    current_profit: Decimal,
    target_cash: Decimal,
) -> Result<SnapshotFigures, LedgerError> {
    let figures = derive(initial_deposit, monthly_topup, current_profit, target_cash);
    if figures.total_deposited > MAX_AMOUNT {
        return Err(LedgerError::InvalidAmount(
            "Total deposited is too large".to_string(),
        ));
    }
    if figures.current_balance > MAX_AMOUNT {
        return Err(LedgerError::InvalidAmount(
            "Current balance is too large".to_string(),
        ));
    }
    Ok(figures)
}

fn pick(field: &str, value: Option<Decimal>, fallback: Decimal) -> Result<Decimal, LedgerError> {
    match value {
        Some(v) => validate_non_negative_amount(field, v),
        None => Ok(fallback),
    }
}

fn draw(component: Decimal, remaining: &mut Decimal) -> Decimal {
    let taken = component.min(*remaining).max(Decimal::ZERO);
    *remaining -= taken;
    component - taken
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figures(initial: Decimal, topup: Decimal, profit: Decimal, target: Decimal) -> SnapshotFigures {
        reconcile(
            None,
            &SnapshotOverrides {
                initial_deposit: Some(initial),
                monthly_topup: Some(topup),
                current_profit: Some(profit),
                target_cash: Some(target),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_reference_scenario() {
        let s = figures(dec!(10000), dec!(1500), dec!(2340), dec!(500000));
        assert_eq!(s.total_deposited, dec!(11500));
        assert_eq!(s.current_balance, dec!(13840));
        assert_eq!(s.progress_percentage, dec!(2.77));
    }

    #[test]
    fn test_defaults_without_snapshot() {
        let s = reconcile(None, &SnapshotOverrides::default()).unwrap();
        assert_eq!(s.target_cash, dec!(500000));
        assert_eq!(s.current_balance, Decimal::ZERO);
        assert_eq!(s.progress_percentage, Decimal::ZERO);
    }

    #[test]
    fn test_missing_fields_keep_current_values() {
        let current = figures(dec!(1000), dec!(200), dec!(50), dec!(10000));
        let updated = reconcile(
            Some(&current),
            &SnapshotOverrides {
                current_profit: Some(dec!(300)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.initial_deposit, dec!(1000));
        assert_eq!(updated.monthly_topup, dec!(200));
        assert_eq!(updated.current_balance, dec!(1500));
        assert_eq!(updated.progress_percentage, dec!(15));
    }

    #[test]
    fn test_progress_clamped_to_hundred() {
        let s = figures(dec!(600000), Decimal::ZERO, dec!(1), dec!(500000));
        assert_eq!(s.progress_percentage, dec!(100));

        let exact = figures(dec!(500000), Decimal::ZERO, Decimal::ZERO, dec!(500000));
        assert_eq!(exact.progress_percentage, dec!(100));
    }

    #[test]
    fn test_zero_target_yields_zero_progress() {
        let s = figures(dec!(100), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        assert_eq!(s.progress_percentage, Decimal::ZERO);
    }

    #[test]
    fn test_negative_override_rejected() {
        let err = reconcile(
            None,
            &SnapshotOverrides {
                monthly_topup: Some(dec!(-1)),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }

    #[test]
    fn test_negative_target_rejected() {
        let err = reconcile(
            None,
            &SnapshotOverrides {
                target_cash: Some(dec!(-500)),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTarget));
    }

    #[test]
    fn test_cents_are_exact() {
        let s = figures(dec!(0.10), dec!(0.20), dec!(0.05), dec!(100));
        assert_eq!(s.total_deposited, dec!(0.30));
        assert_eq!(s.current_balance, dec!(0.35));
        assert_eq!(s.progress_percentage, dec!(0.35));
    }

    #[test]
    fn test_withdrawal_debits_balance_exactly() {
        let s = figures(dec!(400), dec!(50), dec!(50), dec!(1000));
        let after = apply_withdrawal(&s, dec!(100)).unwrap();
        assert_eq!(after.current_balance, dec!(400));
        assert_eq!(after.current_profit, Decimal::ZERO);
        assert_eq!(after.monthly_topup, Decimal::ZERO);
        assert_eq!(after.initial_deposit, dec!(400));
        assert_eq!(after.total_deposited, after.initial_deposit + after.monthly_topup);
        assert_eq!(after.current_balance, after.total_deposited + after.current_profit);
        assert_eq!(after.progress_percentage, dec!(40));
    }

    #[test]
    fn test_withdrawal_of_full_balance() {
        let s = figures(dec!(100), dec!(25.50), dec!(10.25), dec!(1000));
        let after = apply_withdrawal(&s, dec!(135.75)).unwrap();
        assert_eq!(after.current_balance, Decimal::ZERO);
        assert_eq!(after.progress_percentage, Decimal::ZERO);
    }

    #[test]
    fn test_withdrawal_over_balance_rejected() {
        let s = figures(dec!(150), Decimal::ZERO, Decimal::ZERO, dec!(1000));
        assert!(matches!(
            apply_withdrawal(&s, dec!(200)),
            Err(LedgerError::InsufficientBalance)
        ));
    }

    #[test]
    fn test_project_deposit_does_not_touch_profit() {
        let s = figures(dec!(10000), dec!(1500), dec!(2340), dec!(500000));
        let projected = project_deposit(Some(&s), TransactionType::Topup, dec!(500)).unwrap();
        assert_eq!(projected.monthly_topup, dec!(2000));
        assert_eq!(projected.total_deposited, dec!(12000));
        assert_eq!(projected.current_balance, dec!(14340));
        assert_eq!(projected.current_profit, dec!(2340));

        assert!(matches!(
            project_deposit(Some(&s), TransactionType::Profit, dec!(1)),
            Err(LedgerError::InvalidType(_))
        ));
    }

    #[test]
    fn test_invariants_hold_over_a_grid() {
        let values = [dec!(0), dec!(0.01), dec!(99.99), dec!(1500), dec!(250000.55)];
        for initial in values {
            for topup in values {
                for profit in values {
                    for target in [dec!(0), dec!(1), dec!(500000)] {
                        let s = figures(initial, topup, profit, target);
                        assert_eq!(s.total_deposited, s.initial_deposit + s.monthly_topup);
                        assert_eq!(s.current_balance, s.total_deposited + s.current_profit);
                        assert!(s.progress_percentage >= Decimal::ZERO);
                        assert!(s.progress_percentage <= dec!(100));
                        if target > Decimal::ZERO && s.current_balance >= target {
                            assert_eq!(s.progress_percentage, dec!(100));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_derived_totals_beyond_column_range_rejected() {
        let err = reconcile(
            None,
            &SnapshotOverrides {
                initial_deposit: Some(MAX_AMOUNT),
                monthly_topup: Some(MAX_AMOUNT),
                current_profit: Some(MAX_AMOUNT),
                target_cash: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        let near = figures(dec!(9999999999000), Decimal::ZERO, dec!(999.99), dec!(500000));
        assert_eq!(near.current_balance, MAX_AMOUNT);
        assert!(matches!(
            reconcile(
                Some(&near),
                &SnapshotOverrides {
                    current_profit: Some(dec!(1000)),
                    ..Default::default()
                },
            ),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            project_deposit(Some(&near), TransactionType::Topup, dec!(0.01)),
            Err(LedgerError::InvalidAmount(_))
        ));
    }
}
