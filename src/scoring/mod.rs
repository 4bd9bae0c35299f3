//! Deterministic risk scoring.
//!
//! [`score`] is a pure function of its inputs: no I/O, no clock, no
//! randomness, and rules are always visited in list order. The same input
//! against the same [`RuleConfig`] yields bit-identical output across calls
//! and process restarts, which is what lets audit records be compared.
//!
//! Evaluation order (affects only the order of `reasons`):
//! 1. channel weight (`channel_<name>`, only when the weight is non-zero)
//! 2. price rules, first match wins
//! 3. units rules, first match wins
//! 4. text rules, every match contributes once
//!
//! The sum is clamped to `[0, 1]`, then rounded to six decimal places.

pub mod rules;

pub use rules::{
    Comparator, Comparison, NumericField, NumericRule, RiskThresholds, RuleConfig, TextRule,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, TriadError};

/// Decimal places kept in a final score.
const SCORE_DECIMALS: usize = 6;

/// Risk band assigned to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    LowRisk,
    MediumRisk,
    HighRisk,
}

impl RiskLabel {
    /// Classify a final score. Boundaries are inclusive on the lower band.
    pub fn classify(score: f64, thresholds: &RiskThresholds) -> Self {
        if score <= thresholds.low_risk_max {
            Self::LowRisk
        } else if score <= thresholds.medium_risk_max {
            Self::MediumRisk
        } else {
            Self::HighRisk
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LowRisk => "low_risk",
            Self::MediumRisk => "medium_risk",
            Self::HighRisk => "high_risk",
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scoring one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub score: f64,
    pub label: RiskLabel,
    pub reasons: Vec<String>,
}

/// Contribution and reasons collected from one rule family.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contribution {
    pub amount: f64,
    pub reasons: Vec<String>,
}

/// Evaluate a numeric rule list: the first matching rule contributes, the
/// rest are never consulted.
pub fn evaluate_numeric_rules(value: f64, rules: &[NumericRule]) -> Contribution {
    let mut contribution = Contribution::default();
    if let Some(rule) = rules.iter().find(|r| r.comparator.matches(value)) {
        contribution.amount += rule.add;
        contribution.reasons.push(rule.reason.clone());
    }
    contribution
}

/// Evaluate text rules against lowercased text: every matching rule
/// contributes exactly once.
pub fn evaluate_text_rules(text_lower: &str, rules: &[TextRule]) -> Contribution {
    let mut contribution = Contribution::default();
    for rule in rules.iter().filter(|r| r.matches(text_lower)) {
        contribution.amount += rule.add;
        contribution.reasons.push(rule.reason.clone());
    }
    contribution
}

/// Score a single input against a compiled rule configuration.
///
/// Fails with [`TriadError::RuleEvaluation`] when `price` is not finite,
/// since no comparison against it would be meaningful.
pub fn score(text: &str, price: f64, units: i64, channel: &str, rules: &RuleConfig) -> Result<Score> {
    if !price.is_finite() {
        return Err(TriadError::RuleEvaluation(format!(
            "price must be a finite number, got {price}"
        )));
    }

    let mut reasons = Vec::new();

    let channel = channel.to_lowercase();
    let channel_amount = rules.channel_weights.get(&channel).copied().unwrap_or(0.0);
    if channel_amount != 0.0 {
        reasons.push(format!("channel_{channel}"));
    }

    let price_part = evaluate_numeric_rules(price, &rules.price_rules);
    let units_part = evaluate_numeric_rules(units as f64, &rules.units_rules);
    let text_part = evaluate_text_rules(&text.to_lowercase(), &rules.text_rules);

    let raw = rules.base_score
        + channel_amount
        + price_part.amount
        + units_part.amount
        + text_part.amount;

    reasons.extend(price_part.reasons);
    reasons.extend(units_part.reasons);
    reasons.extend(text_part.reasons);

    let score = round_score(raw.clamp(0.0, 1.0))?;
    Ok(Score {
        score,
        label: RiskLabel::classify(score, &rules.thresholds),
        reasons,
    })
}

/// Compile a raw rule configuration and score one input against it.
pub fn score_value(
    text: &str,
    price: f64,
    units: i64,
    channel: &str,
    rule_config: &Value,
) -> Result<Score> {
    let rules = RuleConfig::compile(rule_config)?;
    score(text, price, units, channel, &rules)
}

/// Round to [`SCORE_DECIMALS`] places to drop floating point noise.
///
/// Goes through decimal formatting, which rounds the exact binary value,
/// so `0.5414125` (stored just below the tie) becomes `0.541412`.
fn round_score(value: f64) -> Result<f64> {
    format!("{value:.SCORE_DECIMALS$}").parse::<f64>().map_err(|e| {
        TriadError::RuleEvaluation(format!("cannot round score {value}: {e}"))
    })
}
