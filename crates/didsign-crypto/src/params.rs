// Payments configuration: fee amounts and fee percentages.
//
// [`PaymentParamsInput`] is the raw, possibly invalid shape read from JSON.
// [`PaymentParams`] can only be obtained after every lower bound has been
// checked.

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

use crate::error::{Error, Result};
use crate::validation::validate_params;

/// Denomination of the ledger's native token (micro units).
pub const NATIVE_DENOM: &str = "uixo";

/// An amount of a single denomination. Amounts are exact decimals encoded as strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    #[serde(deserialize_with = "exact_decimal")]
    pub amount: BigDecimal,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: BigDecimal) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// `60000000uixo,5uatom` style listing.
    pub fn display_list(coins: &[Coin]) -> String {
        coins
            .iter()
            .map(|coin| coin.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Unvalidated payments configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentParamsInput {
    #[serde(deserialize_with = "exact_decimal")]
    pub ixo_factor: BigDecimal,
    pub claim_fee_amount: Vec<Coin>,
    pub evaluation_fee_amount: Vec<Coin>,
    #[serde(deserialize_with = "exact_decimal")]
    pub node_fee_percentage: BigDecimal,
    #[serde(deserialize_with = "exact_decimal")]
    pub evaluation_pay_fee_percentage: BigDecimal,
    #[serde(deserialize_with = "exact_decimal")]
    pub evaluation_pay_node_fee_percentage: BigDecimal,
}

impl PaymentParamsInput {
    /// Parses caller JSON; bad JSON is `MalformedInput`, bounds are not checked here.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::MalformedInput(format!("Could not parse payments params: {}", e)))
    }

    pub(crate) fn percentages(&self) -> [(&'static str, &BigDecimal); 3] {
        [
            ("NodeFeePercentage", &self.node_fee_percentage),
            ("EvaluationPayFeePercentage", &self.evaluation_pay_fee_percentage),
            ("EvaluationPayNodeFeePercentage", &self.evaluation_pay_node_fee_percentage),
        ]
    }
}

impl Default for PaymentParamsInput {
    fn default() -> Self {
        Self {
            ixo_factor: BigDecimal::from(1),
            // 60 and 40 whole tokens
            claim_fee_amount: vec![Coin::new(NATIVE_DENOM, BigDecimal::from(60_000_000))],
            evaluation_fee_amount: vec![Coin::new(NATIVE_DENOM, BigDecimal::from(40_000_000))],
            node_fee_percentage: decimal("0.5"),
            evaluation_pay_fee_percentage: decimal("0.1"),
            evaluation_pay_node_fee_percentage: decimal("0.2"),
        }
    }
}

/// Reads a decimal from either a JSON string or a JSON number token.
///
/// Number tokens are parsed from their source text, never through `f64`.
fn exact_decimal<'de, D>(deserializer: D) -> std::result::Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Box::<RawValue>::deserialize(deserializer)?;
    let token = raw.get().trim();
    let literal = if token.starts_with('"') {
        serde_json::from_str::<String>(token).map_err(serde::de::Error::custom)?
    } else {
        token.to_string()
    };
    BigDecimal::from_str(&literal)
        .map_err(|e| serde::de::Error::custom(format!("invalid decimal '{}': {}", literal, e)))
}

fn decimal(literal: &'static str) -> BigDecimal {
    BigDecimal::from_str(literal).unwrap_or_default()
}

/// A payments configuration whose numeric fields are all non-negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "PaymentParamsInput", into = "PaymentParamsInput")]
pub struct PaymentParams(PaymentParamsInput);

impl PaymentParams {
    pub fn ixo_factor(&self) -> &BigDecimal {
        &self.0.ixo_factor
    }

    pub fn claim_fee_amount(&self) -> &[Coin] {
        &self.0.claim_fee_amount
    }

    pub fn evaluation_fee_amount(&self) -> &[Coin] {
        &self.0.evaluation_fee_amount
    }

    pub fn node_fee_percentage(&self) -> &BigDecimal {
        &self.0.node_fee_percentage
    }

    pub fn evaluation_pay_fee_percentage(&self) -> &BigDecimal {
        &self.0.evaluation_pay_fee_percentage
    }

    pub fn evaluation_pay_node_fee_percentage(&self) -> &BigDecimal {
        &self.0.evaluation_pay_node_fee_percentage
    }
}

impl Default for PaymentParams {
    fn default() -> Self {
        PaymentParams(PaymentParamsInput::default())
    }
}

impl TryFrom<PaymentParamsInput> for PaymentParams {
    type Error = Error;

    fn try_from(input: PaymentParamsInput) -> Result<Self> {
        let violations = validate_params(&input);
        if violations.is_empty() {
            Ok(PaymentParams(input))
        } else {
            Err(Error::ValidationFailed(violations))
        }
    }
}

impl From<PaymentParams> for PaymentParamsInput {
    fn from(params: PaymentParams) -> Self {
        params.0
    }
}

impl fmt::Display for PaymentParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Payments Params:")?;
        writeln!(f, "  Ixo Factor:                          {}", self.0.ixo_factor)?;
        writeln!(f, "  Claim Fee Amount:                    {}", Coin::display_list(&self.0.claim_fee_amount))?;
        writeln!(f, "  Evaluation Fee Amount:               {}", Coin::display_list(&self.0.evaluation_fee_amount))?;
        writeln!(f, "  Node Fee Percentage:                 {}", self.0.node_fee_percentage)?;
        writeln!(f, "  Evaluation Pay Fee Percentage:       {}", self.0.evaluation_pay_fee_percentage)?;
        write!(f, "  Evaluation Pay Node Fee Percentage:  {}", self.0.evaluation_pay_node_fee_percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_JSON: &str = r#"{
        "ixo_factor": "1.0",
        "claim_fee_amount": [{"denom": "uixo", "amount": "60000000"}],
        "evaluation_fee_amount": [{"denom": "uixo", "amount": "40000000"}],
        "node_fee_percentage": "0.5",
        "evaluation_pay_fee_percentage": "0.1",
        "evaluation_pay_node_fee_percentage": "0.2"
    }"#;

    #[test]
    fn test_default_values() {
        let params = PaymentParams::default();
        assert_eq!(params.ixo_factor(), &BigDecimal::from(1));
        assert_eq!(params.claim_fee_amount()[0].amount, BigDecimal::from(60_000_000));
        assert_eq!(params.evaluation_fee_amount()[0].denom, "uixo");
        assert_eq!(params.node_fee_percentage(), &decimal("0.5"));
        assert_eq!(params.evaluation_pay_fee_percentage(), &decimal("0.1"));
        assert_eq!(params.evaluation_pay_node_fee_percentage(), &decimal("0.2"));
    }

    #[test]
    fn test_parse_default_json() {
        let params: PaymentParams = serde_json::from_str(DEFAULT_JSON).unwrap();
        assert_eq!(params, PaymentParams::default());
    }

    #[test]
    fn test_invalid_json_values_cannot_become_params() {
        let json = DEFAULT_JSON.replace("\"0.5\"", "\"-0.1\"");
        let err = serde_json::from_str::<PaymentParams>(&json).unwrap_err();
        assert!(err.to_string().contains("NodeFeePercentage"));

        let input = PaymentParamsInput::from_json(&json).unwrap();
        match PaymentParams::try_from(input) {
            Err(Error::ValidationFailed(violations)) => assert_eq!(violations.len(), 1),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_decimals_roundtrip_exactly() {
        let json = DEFAULT_JSON.replace("\"0.1\"", "\"0.123456789012345678901234567890\"");
        let params: PaymentParams = serde_json::from_str(&json).unwrap();

        let encoded = serde_json::to_string(&params).unwrap();
        let decoded: PaymentParams = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, params);
        assert_eq!(
            decoded.evaluation_pay_fee_percentage().to_string(),
            "0.123456789012345678901234567890"
        );
    }

    #[test]
    fn test_numeric_decimals_keep_their_text() {
        let json = r#"{
            "ixo_factor": 1,
            "claim_fee_amount": [{"denom": "uixo", "amount": 60000000}],
            "evaluation_fee_amount": [{"denom": "uixo", "amount": "40000000"}],
            "node_fee_percentage": -0.1,
            "evaluation_pay_fee_percentage": 0.1,
            "evaluation_pay_node_fee_percentage": 2e-1
        }"#;

        let input = PaymentParamsInput::from_json(json).unwrap();
        assert_eq!(input.evaluation_pay_fee_percentage.to_string(), "0.1");
        assert_eq!(input.evaluation_pay_node_fee_percentage, decimal("0.2"));
        assert_eq!(input.claim_fee_amount[0].amount, BigDecimal::from(60_000_000));

        let violations = validate_params(&input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "NodeFeePercentage");
        assert_eq!(violations[0].value, "-0.1");
    }

    #[test]
    fn test_non_decimal_values_are_malformed_input() {
        let json = DEFAULT_JSON.replace("\"0.5\"", "\"half\"");
        let err = PaymentParamsInput::from_json(&json).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(ref m) if m.contains("invalid decimal 'half'")));

        let json = DEFAULT_JSON.replace("\"0.5\"", "true");
        assert!(matches!(
            PaymentParamsInput::from_json(&json),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_malformed_input() {
        let err = PaymentParamsInput::from_json("{").unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn test_display() {
        let text = PaymentParams::default().to_string();
        assert!(text.contains("Claim Fee Amount:                    60000000uixo"));
        assert!(text.contains("Node Fee Percentage:                 0.5"));
    }
}
