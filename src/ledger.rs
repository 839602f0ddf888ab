//! Cashback accounting.
//!
//! Everything here is free of I/O. Repositories call into these functions while
//! holding the relevant database locks, so the rules are evaluated against a
//! consistent view of the user's ledger.

use crate::models::{
    transactions::TransactionStatus,
    wallet::{Wallet, WalletTotals},
    CashbackRule, CashbackType,
};

/// Upper bound for percentage rules, in basis points.
pub const MAX_PERCENTAGE_BPS: i64 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Cannot move transaction from {from} to {to}")]
    InvalidTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },
    #[error("Withdrawal amount must be positive")]
    NonPositiveAmount,
    #[error("Withdrawal amount {amount} is below the minimum of {minimum}")]
    BelowMinimum { amount: i64, minimum: i64 },
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: i64, available: i64 },
}

/// Cashback owed on an order of `order_amount_in_cents` under `rule`.
///
/// Percentages round down to the cent. A flat amount never exceeds the order value.
pub fn compute_cashback(rule: CashbackRule, order_amount_in_cents: i64) -> i64 {
    if order_amount_in_cents <= 0 || rule.value <= 0 {
        return 0;
    }

    match rule.cashback_type {
        CashbackType::Percentage => {
            let bps = rule.value.min(MAX_PERCENTAGE_BPS) as i128;
            ((order_amount_in_cents as i128 * bps) / MAX_PERCENTAGE_BPS as i128) as i64
        }
        CashbackType::Flat => rule.value.min(order_amount_in_cents),
    }
}

/// Validates a rule before it is stored on a merchant or offer.
pub fn validate_rule(rule: CashbackRule) -> Result<(), String> {
    if rule.value <= 0 {
        return Err("Cashback value must be positive.".to_string());
    }
    if rule.cashback_type == CashbackType::Percentage && rule.value > MAX_PERCENTAGE_BPS {
        return Err(format!(
            "Percentage cashback cannot exceed {} basis points.",
            MAX_PERCENTAGE_BPS
        ));
    }

    Ok(())
}

/// Pending transactions may move anywhere; confirmed and cancelled are terminal.
pub fn check_transition(
    from: TransactionStatus,
    to: TransactionStatus,
) -> Result<(), LedgerError> {
    match (from, to) {
        (TransactionStatus::Pending, _) => Ok(()),
        (a, b) if a == b => Ok(()),
        (from, to) => Err(LedgerError::InvalidTransition { from, to }),
    }
}

/// True when applying `to` on top of `from` is the first confirmation.
pub fn is_first_confirmation(from: Option<TransactionStatus>, to: TransactionStatus) -> bool {
    to == TransactionStatus::Confirmed && from != Some(TransactionStatus::Confirmed)
}

/// A referrer earns a bonus once, on the first confirmed purchase of the referred user.
pub fn referral_bonus_due(
    referred_by: Option<&str>,
    bonus_already_paid: bool,
    first_confirmation: bool,
) -> bool {
    referred_by.is_some() && !bonus_already_paid && first_confirmation
}

impl Wallet {
    pub fn from_totals(totals: WalletTotals) -> Self {
        let available = (totals.confirmed + totals.referral - totals.withdrawn).max(0);

        Wallet {
            pending: totals.pending,
            confirmed: totals.confirmed,
            referral: totals.referral,
            withdrawn: totals.withdrawn,
            paid: totals.paid,
            available,
        }
    }
}

/// Gate a withdrawal request against the wallet.
pub fn check_withdrawal(
    wallet: &Wallet,
    amount_in_cents: i64,
    minimum_in_cents: i64,
) -> Result<(), LedgerError> {
    if amount_in_cents <= 0 {
        return Err(LedgerError::NonPositiveAmount);
    }
    if amount_in_cents < minimum_in_cents {
        return Err(LedgerError::BelowMinimum {
            amount: amount_in_cents,
            minimum: minimum_in_cents,
        });
    }
    if amount_in_cents > wallet.available {
        return Err(LedgerError::InsufficientBalance {
            requested: amount_in_cents,
            available: wallet.available,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(bps: i64) -> CashbackRule {
        CashbackRule {
            cashback_type: CashbackType::Percentage,
            value: bps,
        }
    }

    fn flat(cents: i64) -> CashbackRule {
        CashbackRule {
            cashback_type: CashbackType::Flat,
            value: cents,
        }
    }

    #[test]
    fn percentage_cashback_rounds_down() {
        assert_eq!(compute_cashback(pct(250), 10_000), 250);
        assert_eq!(compute_cashback(pct(250), 999), 24);
        assert_eq!(compute_cashback(pct(10_000), 1_234), 1_234);
    }

    #[test]
    fn flat_cashback_is_capped_by_order() {
        assert_eq!(compute_cashback(flat(500), 10_000), 500);
        assert_eq!(compute_cashback(flat(500), 300), 300);
    }

    #[test]
    fn no_cashback_on_empty_orders() {
        assert_eq!(compute_cashback(pct(500), 0), 0);
        assert_eq!(compute_cashback(flat(500), -10), 0);
        assert_eq!(compute_cashback(pct(0), 1_000), 0);
    }

    #[test]
    fn large_orders_do_not_overflow() {
        assert_eq!(compute_cashback(pct(5_000), i64::MAX), i64::MAX / 2);
    }

    #[test]
    fn rule_validation() {
        assert!(validate_rule(pct(250)).is_ok());
        assert!(validate_rule(pct(10_001)).is_err());
        assert!(validate_rule(flat(0)).is_err());
        assert!(validate_rule(flat(50_000)).is_ok());
    }

    #[test]
    fn transitions() {
        use TransactionStatus::*;

        assert!(check_transition(Pending, Confirmed).is_ok());
        assert!(check_transition(Pending, Cancelled).is_ok());
        assert!(check_transition(Pending, Pending).is_ok());
        assert!(check_transition(Confirmed, Confirmed).is_ok());
        assert!(check_transition(Cancelled, Cancelled).is_ok());
        assert_eq!(
            check_transition(Confirmed, Cancelled),
            Err(LedgerError::InvalidTransition {
                from: Confirmed,
                to: Cancelled
            })
        );
        assert!(check_transition(Cancelled, Confirmed).is_err());
        assert!(check_transition(Confirmed, Pending).is_err());
    }

    #[test]
    fn first_confirmation_only_once() {
        use TransactionStatus::*;

        assert!(is_first_confirmation(None, Confirmed));
        assert!(is_first_confirmation(Some(Pending), Confirmed));
        assert!(!is_first_confirmation(Some(Confirmed), Confirmed));
        assert!(!is_first_confirmation(Some(Pending), Cancelled));
    }

    #[test]
    fn referral_bonus_rules() {
        assert!(referral_bonus_due(Some("referrer"), false, true));
        assert!(!referral_bonus_due(None, false, true));
        assert!(!referral_bonus_due(Some("referrer"), true, true));
        assert!(!referral_bonus_due(Some("referrer"), false, false));
    }

    #[test]
    fn wallet_available_balance() {
        let wallet = Wallet::from_totals(WalletTotals {
            pending: 700,
            confirmed: 1_000,
            referral: 500,
            withdrawn: 600,
            paid: 200,
        });

        assert_eq!(wallet.available, 900);
        assert_eq!(wallet.pending, 700);
        assert_eq!(wallet.paid, 200);
    }

    #[test]
    fn wallet_never_shows_negative_available() {
        let wallet = Wallet::from_totals(WalletTotals {
            confirmed: 100,
            withdrawn: 300,
            ..Default::default()
        });

        assert_eq!(wallet.available, 0);
    }

    #[test]
    fn withdrawal_gate() {
        let wallet = Wallet::from_totals(WalletTotals {
            confirmed: 2_000,
            referral: 500,
            withdrawn: 1_000,
            ..Default::default()
        });

        assert!(check_withdrawal(&wallet, 1_500, 1_000).is_ok());
        assert_eq!(
            check_withdrawal(&wallet, 1_501, 1_000),
            Err(LedgerError::InsufficientBalance {
                requested: 1_501,
                available: 1_500
            })
        );
        assert_eq!(
            check_withdrawal(&wallet, 999, 1_000),
            Err(LedgerError::BelowMinimum {
                amount: 999,
                minimum: 1_000
            })
        );
        assert_eq!(
            check_withdrawal(&wallet, 0, 0),
            Err(LedgerError::NonPositiveAmount)
        );
    }

    #[test]
    fn pending_cashback_is_not_withdrawable() {
        let wallet = Wallet::from_totals(WalletTotals {
            pending: 10_000,
            ..Default::default()
        });

        assert!(matches!(
            check_withdrawal(&wallet, 100, 0),
            Err(LedgerError::InsufficientBalance { .. })
        ));
    }
}
