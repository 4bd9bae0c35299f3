//! Rule configuration: on-disk shapes and their canonical compiled form.
//!
//! Artifacts written by older tooling use a different rule vocabulary than
//! current ones. Both are accepted here and compiled once into a single
//! canonical representation; evaluation never looks at the raw shapes.
//!
//! Numeric rules (`price_rules`, `units_rules`):
//!
//! ```json
//! {"condition": "price >= 80", "contribution": 0.35, "reason": "high_price"}
//! {"if_price_gte": 80, "add": 0.4, "reason": "high_price"}
//! ```
//!
//! Text rules:
//!
//! ```json
//! {"keyword": "chargeback", "contribution": 0.25, "reason": "negative_signal_text"}
//! {"keywords_any": ["chargeback", "refund"], "add": 0.35, "reason": "negative_signal_text"}
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{Result, TriadError};

/// Comparison operator of a numeric rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

impl Comparison {
    /// Parse a legacy condition operator token.
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            "==" => Some(Self::Eq),
            _ => None,
        }
    }

    /// Parse the suffix of a current-shape threshold key (`if_price_gte` → `gte`).
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Eq => "==",
        }
    }
}

/// A structured predicate: `value <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparator {
    pub op: Comparison,
    pub threshold: f64,
}

impl Comparator {
    pub fn new(op: Comparison, threshold: f64) -> Self {
        Self { op, threshold }
    }

    /// Whether `value` satisfies the predicate.
    pub fn matches(&self, value: f64) -> bool {
        match self.op {
            Comparison::Gt => value > self.threshold,
            Comparison::Gte => value >= self.threshold,
            Comparison::Lt => value < self.threshold,
            Comparison::Lte => value <= self.threshold,
            Comparison::Eq => value == self.threshold,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.symbol(), self.threshold)
    }
}

/// Which feature a numeric rule list applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    Price,
    Units,
}

impl NumericField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Units => "units",
        }
    }

    fn list_name(self) -> &'static str {
        match self {
            Self::Price => "price_rules",
            Self::Units => "units_rules",
        }
    }
}

/// Canonical numeric rule (price or units). First match in a list wins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericRule {
    pub comparator: Comparator,
    pub add: f64,
    pub reason: String,
}

/// Canonical text rule. Every matching rule contributes, each at most once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRule {
    /// Lowercased keywords; any one appearing as a substring matches.
    pub keywords: Vec<String>,
    pub add: f64,
    pub reason: String,
}

impl TextRule {
    /// Whether the (already lowercased) text contains any keyword.
    pub fn matches(&self, text_lower: &str) -> bool {
        self.keywords.iter().any(|k| text_lower.contains(k.as_str()))
    }
}

/// Label boundaries. Scores equal to a boundary fall into the lower band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub low_risk_max: f64,
    pub medium_risk_max: f64,
}

/// Compiled rule configuration driving the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleConfig {
    pub base_score: f64,
    pub channel_weights: BTreeMap<String, f64>,
    pub price_rules: Vec<NumericRule>,
    pub units_rules: Vec<NumericRule>,
    pub text_rules: Vec<TextRule>,
    pub thresholds: RiskThresholds,
}

// ============================================================================
// On-disk shapes
// ============================================================================

#[derive(Deserialize)]
struct RawRuleConfig {
    base_score: f64,
    #[serde(default)]
    channel_weights: BTreeMap<String, f64>,
    #[serde(default)]
    price_rules: Vec<Value>,
    #[serde(default)]
    units_rules: Vec<Value>,
    #[serde(default)]
    text_rules: Vec<Value>,
    #[serde(default)]
    risk_thresholds: Option<Value>,
    #[serde(default)]
    thresholds: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumericRule {
    /// `{"condition": "price >= 80", "contribution": .., "reason": ..}`
    Legacy {
        condition: String,
        contribution: f64,
        reason: String,
    },
    /// `{"if_price_gte": 80, "add": .., "reason": ..}`
    Current {
        add: f64,
        reason: String,
        #[serde(flatten)]
        bounds: BTreeMap<String, Value>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTextRule {
    Legacy {
        keyword: String,
        contribution: f64,
        reason: String,
    },
    Current {
        keywords_any: Vec<String>,
        add: f64,
        reason: String,
    },
}

// ============================================================================
// Compilation
// ============================================================================

impl RuleConfig {
    /// Compile a raw rule configuration into canonical form.
    ///
    /// Any malformed entry rejects the whole configuration with
    /// [`TriadError::RuleEvaluation`], naming the offending list and index.
    pub fn compile(value: &Value) -> Result<Self> {
        let raw = RawRuleConfig::deserialize(value)
            .map_err(|e| TriadError::RuleEvaluation(format!("rule config: {e}")))?;

        let price_rules = compile_numeric_rules(NumericField::Price, &raw.price_rules)?;
        let units_rules = compile_numeric_rules(NumericField::Units, &raw.units_rules)?;
        let text_rules = raw
            .text_rules
            .iter()
            .enumerate()
            .map(|(i, v)| compile_text_rule(i, v))
            .collect::<Result<Vec<_>>>()?;

        let thresholds_value = [raw.risk_thresholds, raw.thresholds]
            .into_iter()
            .flatten()
            .find(|v| !is_empty_value(v))
            .ok_or_else(|| {
                TriadError::RuleEvaluation(
                    "rule config: missing risk_thresholds".to_string(),
                )
            })?;
        let thresholds = RiskThresholds::deserialize(&thresholds_value)
            .map_err(|e| TriadError::RuleEvaluation(format!("risk_thresholds: {e}")))?;
        if thresholds.low_risk_max > thresholds.medium_risk_max {
            warn!(
                low_risk_max = thresholds.low_risk_max,
                medium_risk_max = thresholds.medium_risk_max,
                "low_risk_max exceeds medium_risk_max; medium_risk label is unreachable"
            );
        }

        Ok(Self {
            base_score: raw.base_score,
            channel_weights: raw.channel_weights,
            price_rules,
            units_rules,
            text_rules,
            thresholds,
        })
    }
}

/// `null`, `{}` and `[]` count as absent when choosing a threshold block.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn compile_numeric_rules(field: NumericField, rules: &[Value]) -> Result<Vec<NumericRule>> {
    rules
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let context = |msg: String| {
                TriadError::RuleEvaluation(format!("{}[{index}]: {msg}", field.list_name()))
            };
            let raw = RawNumericRule::deserialize(value).map_err(|_| {
                context(
                    "expected {condition, contribution, reason} or {if_<field>_<op>, add, reason}"
                        .to_string(),
                )
            })?;
            match raw {
                RawNumericRule::Legacy {
                    condition,
                    contribution,
                    reason,
                } => Ok(NumericRule {
                    comparator: parse_condition(field, &condition).map_err(context)?,
                    add: contribution,
                    reason,
                }),
                RawNumericRule::Current {
                    add,
                    reason,
                    bounds,
                } => Ok(NumericRule {
                    comparator: parse_bounds(field, &bounds).map_err(context)?,
                    add,
                    reason,
                }),
            }
        })
        .collect()
}

/// Parse a three-token legacy condition such as `"price >= 80"`.
fn parse_condition(field: NumericField, condition: &str) -> std::result::Result<Comparator, String> {
    let parts: Vec<&str> = condition.split_whitespace().collect();
    let [subject, op, threshold] = parts.as_slice() else {
        return Err(format!("condition {condition:?} must have three tokens"));
    };
    if *subject != field.as_str() {
        return Err(format!(
            "condition {condition:?} must test {}",
            field.as_str()
        ));
    }
    let op = Comparison::from_symbol(op)
        .ok_or_else(|| format!("unknown operator {op:?} in condition {condition:?}"))?;
    let threshold: f64 = threshold
        .parse()
        .ok()
        .filter(|t: &f64| t.is_finite())
        .ok_or_else(|| format!("invalid threshold in condition {condition:?}"))?;
    Ok(Comparator::new(op, threshold))
}

/// Extract the single `if_<field>_<op>` threshold from a current-shape rule.
fn parse_bounds(
    field: NumericField,
    bounds: &BTreeMap<String, Value>,
) -> std::result::Result<Comparator, String> {
    let prefix = format!("if_{}_", field.as_str());
    let mut found = None;
    for (key, value) in bounds.iter().filter(|(k, _)| k.starts_with("if_")) {
        let op = key
            .strip_prefix(&prefix)
            .and_then(Comparison::from_suffix)
            .ok_or_else(|| format!("unknown threshold key {key:?}"))?;
        let threshold = value
            .as_f64()
            .filter(|t| t.is_finite())
            .ok_or_else(|| format!("threshold {key:?} must be a number"))?;
        if found.is_some() {
            return Err("more than one threshold key".to_string());
        }
        found = Some(Comparator::new(op, threshold));
    }
    found.ok_or_else(|| format!("missing {prefix}{{gte,gt,lt,lte}} threshold"))
}

fn compile_text_rule(index: usize, value: &Value) -> Result<TextRule> {
    let context = |msg: &str| TriadError::RuleEvaluation(format!("text_rules[{index}]: {msg}"));
    let raw = RawTextRule::deserialize(value).map_err(|_| {
        context("expected {keyword, contribution, reason} or {keywords_any, add, reason}")
    })?;
    let (keywords, add, reason) = match raw {
        RawTextRule::Legacy {
            keyword,
            contribution,
            reason,
        } => (vec![keyword], contribution, reason),
        RawTextRule::Current {
            keywords_any,
            add,
            reason,
        } => (keywords_any, add, reason),
    };
    if keywords.is_empty() {
        return Err(context("no keywords"));
    }
    if keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(context("blank keyword"));
    }
    Ok(TextRule {
        keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        add,
        reason,
    })
}
