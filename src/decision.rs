use crate::models::LoanStatus;
use bigdecimal::{BigDecimal, Zero};
use std::str::FromStr;

/// Minimum score below which an application is always rejected.
const MIN_APPROVABLE_SCORE: i32 = 400;
/// Score required to approve amounts above the repayment-capacity cap.
const CAPACITY_OVERRIDE_SCORE: i32 = 650;
/// Minimum requestable amount.
const MIN_LOAN_AMOUNT: i64 = 100_000;
/// Daily disbursement limit of the simulated payment rail.
const DAILY_DISBURSEMENT_LIMIT: i64 = 50_000_000;

/// Outcome of the approval rules: terminal status plus rationale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub status: LoanStatus,
    pub reason: String,
}

/// Parses a loan-data amount value, defaulting to zero when absent or
/// unparseable.
pub fn parse_amount(value: Option<&str>) -> BigDecimal {
    value
        .and_then(|v| BigDecimal::from_str(v.trim()).ok())
        .unwrap_or_else(BigDecimal::zero)
}

/// Half the monthly income: the repayment-capacity ceiling.
fn capacity_limit(monthly_income: &BigDecimal) -> BigDecimal {
    monthly_income.clone() / BigDecimal::from(2)
}

/// Applies the approval rules in order; the first matching rule wins.
pub fn evaluate_approval(
    credit_score: i32,
    identity_verified: bool,
    requested_amount: &BigDecimal,
    monthly_income: &BigDecimal,
) -> DecisionOutcome {
    if !identity_verified {
        return DecisionOutcome {
            status: LoanStatus::Rejected,
            reason: "Application rejected: identity verification failed".to_string(),
        };
    }

    if credit_score < MIN_APPROVABLE_SCORE {
        return DecisionOutcome {
            status: LoanStatus::Rejected,
            reason: format!("Application rejected: credit score too low ({})", credit_score),
        };
    }

    if *requested_amount > capacity_limit(monthly_income)
        && credit_score < CAPACITY_OVERRIDE_SCORE
    {
        return DecisionOutcome {
            status: LoanStatus::Rejected,
            reason:
                "Application rejected: requested amount exceeds repayment capacity and insufficient score"
                    .to_string(),
        };
    }

    if *requested_amount < BigDecimal::from(MIN_LOAN_AMOUNT) {
        return DecisionOutcome {
            status: LoanStatus::Rejected,
            reason: "Application rejected: minimum amount not met".to_string(),
        };
    }

    // Approved; the score band only changes the wording.
    let reason = if credit_score >= 700 {
        format!("Application approved: excellent credit score ({})", credit_score)
    } else if credit_score >= 600 {
        format!("Application approved: good credit score ({})", credit_score)
    } else if credit_score >= 500 {
        format!("Application approved: acceptable credit score ({})", credit_score)
    } else {
        format!(
            "Application approved: credit score low but within acceptable range ({})",
            credit_score
        )
    };

    DecisionOutcome {
        status: LoanStatus::Approved,
        reason,
    }
}

/// The amount actually approved: the requested amount, capped at half the
/// monthly income.
pub fn approved_amount(
    requested_amount: &BigDecimal,
    monthly_income: &BigDecimal,
) -> BigDecimal {
    let limit = capacity_limit(monthly_income);
    if *requested_amount <= limit {
        requested_amount.clone()
    } else {
        limit
    }
}

/// Simulates the fund transfer to the borrower.
///
/// Fails on non-positive amounts and above the daily limit. A user id
/// ending in digit 0 also fails: a deterministic hook standing in for
/// occasional payment-rail outages, kept for test repeatability.
pub fn simulate_disbursement(user_id: i64, amount: &BigDecimal) -> bool {
    if *amount <= BigDecimal::zero() {
        return false;
    }

    if *amount > BigDecimal::from(DAILY_DISBURSEMENT_LIMIT) {
        return false;
    }

    user_id % 10 != 0
}
