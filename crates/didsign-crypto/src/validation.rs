// Validation gates that run before anything is signed.
//
// Two independent families: bond status membership, and bounds on the
// payments configuration. Both report problems as [`Violation`]s.

use std::fmt;

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use crate::bond::BondStatus;
use crate::params::{Coin, PaymentParamsInput};

/// A single broken invariant: which field, the offending value, and why.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub value: String,
    pub reason: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}, is '{}'", self.field, self.reason, self.value)
    }
}

/// True iff `candidate` is exactly one of the six bond status literals.
///
/// Membership only: lifecycle transitions are not checked here.
pub fn is_legal_status(candidate: &str) -> bool {
    candidate.parse::<BondStatus>().is_ok()
}

/// Optional upper limits for the payments configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamLimits {
    /// Inclusive upper bound applied to every percentage field.
    pub max_percentage: BigDecimal,
}

impl Default for ParamLimits {
    fn default() -> Self {
        Self {
            max_percentage: BigDecimal::from(1),
        }
    }
}

/// Every lower-bound violation in a payments configuration, in field order.
///
/// Reports all violations, not just the first.
pub fn validate_params(params: &PaymentParamsInput) -> Vec<Violation> {
    let mut violations = Vec::new();

    check_non_negative_dec(&mut violations, "IxoFactor", &params.ixo_factor);
    check_non_negative_coins(&mut violations, "ClaimFeeAmount", &params.claim_fee_amount);
    check_non_negative_coins(&mut violations, "EvaluationFeeAmount", &params.evaluation_fee_amount);
    for (field, value) in params.percentages() {
        check_non_negative_dec(&mut violations, field, value);
    }

    violations
}

/// [`validate_params`] plus an upper bound on the percentage fields.
pub fn validate_params_with_limits(params: &PaymentParamsInput, limits: &ParamLimits) -> Vec<Violation> {
    let mut violations = validate_params(params);

    for (field, value) in params.percentages() {
        if *value > limits.max_percentage {
            violations.push(Violation::new(
                field,
                value.to_string(),
                format!("should be at most {}", limits.max_percentage),
            ));
        }
    }

    violations
}

fn check_non_negative_dec(violations: &mut Vec<Violation>, field: &str, value: &BigDecimal) {
    if *value < BigDecimal::zero() {
        violations.push(Violation::new(field, value.to_string(), "should be positive"));
    }
}

fn check_non_negative_coins(violations: &mut Vec<Violation>, field: &str, coins: &[Coin]) {
    if coins.iter().any(|coin| coin.amount < BigDecimal::zero()) {
        violations.push(Violation::new(field, Coin::display_list(coins), "should be positive"));
    }
}
