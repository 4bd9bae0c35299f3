//! End-to-end scoring against compiled rule configurations.

use serde_json::{Value, json};

use triad::{RiskLabel, RuleConfig, TriadError, score, score_value};

fn end_to_end_rules() -> Value {
    json!({
        "base_score": 0.1,
        "channel_weights": {"amazon": 0.1},
        "price_rules": [{"if_price_gte": 200, "add": 0.3, "reason": "high_price"}],
        "text_rules": [{"keywords_any": ["chargeback"], "add": 0.4, "reason": "negative_signal"}],
        "risk_thresholds": {"low_risk_max": 0.3, "medium_risk_max": 0.6}
    })
}

#[test]
fn end_to_end_example() {
    let result = score_value("routine order", 250.0, 10, "amazon", &end_to_end_rules()).unwrap();
    assert_eq!(result.score, 0.5);
    assert_eq!(result.label, RiskLabel::MediumRisk);
    assert_eq!(result.reasons, vec!["channel_amazon", "high_price"]);
}

#[test]
fn legacy_and_current_shapes_score_identically() {
    let legacy = RuleConfig::compile(&json!({
        "base_score": 0.1,
        "channel_weights": {"amazon": 0.1},
        "price_rules": [
            {"condition": "price >= 200", "contribution": 0.3, "reason": "high_price"},
            {"condition": "price > 50", "contribution": 0.1, "reason": "mid_price"}
        ],
        "units_rules": [{"condition": "units < 2", "contribution": 0.05, "reason": "single_unit"}],
        "text_rules": [{"keyword": "Chargeback", "contribution": 0.4, "reason": "negative_signal"}],
        "thresholds": {"low_risk_max": 0.3, "medium_risk_max": 0.6}
    }))
    .unwrap();
    let current = RuleConfig::compile(&json!({
        "base_score": 0.1,
        "channel_weights": {"amazon": 0.1},
        "price_rules": [
            {"if_price_gte": 200, "add": 0.3, "reason": "high_price"},
            {"if_price_gt": 50, "add": 0.1, "reason": "mid_price"}
        ],
        "units_rules": [{"if_units_lt": 2, "add": 0.05, "reason": "single_unit"}],
        "text_rules": [{"keywords_any": ["chargeback"], "add": 0.4, "reason": "negative_signal"}],
        "risk_thresholds": {"low_risk_max": 0.3, "medium_risk_max": 0.6}
    }))
    .unwrap();

    let inputs = [
        ("routine order", 250.0, 10, "amazon"),
        ("CHARGEBACK filed", 75.0, 1, "Amazon"),
        ("hello", 10.0, 5, "direct"),
        ("chargeback", 0.0, 0, "ebay"),
    ];
    for (text, price, units, channel) in inputs {
        assert_eq!(
            score(text, price, units, channel, &legacy).unwrap(),
            score(text, price, units, channel, &current).unwrap(),
            "input {text:?}"
        );
    }
}

#[test]
fn text_rule_keyword_counts_once() {
    let rules = RuleConfig::compile(&json!({
        "base_score": 0.0,
        "text_rules": [
            {"keywords_any": ["refund"], "add": 0.2, "reason": "r1"},
            {"keywords_any": ["refund", "chargeback"], "add": 0.3, "reason": "r2"}
        ],
        "risk_thresholds": {"low_risk_max": 0.3, "medium_risk_max": 0.7}
    }))
    .unwrap();
    let result = score("refund then chargeback and another refund", 0.0, 0, "direct", &rules).unwrap();
    assert_eq!(result.score, 0.5);
    assert_eq!(result.reasons, vec!["r1", "r2"]);
    assert_eq!(result.label, RiskLabel::MediumRisk);
}

#[test]
fn bundled_artifact_rules_compile() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("model_artifacts")
        .join("model_v1.json");
    let body: Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    let rules = RuleConfig::compile(&body["config"]).unwrap();
    let result = score("URGENT chargeback", 150.0, 120, "ebay", &rules).unwrap();
    // 0.1 + 0.15 + 0.15 + 0.2 + 0.4 + 0.1 clamps to 1.0
    assert_eq!(result.score, 1.0);
    assert_eq!(result.label, RiskLabel::HighRisk);
    assert_eq!(
        result.reasons,
        vec![
            "channel_ebay",
            "elevated_price",
            "bulk_units",
            "negative_signal",
            "urgency_signal"
        ]
    );
}

#[test]
fn missing_required_keys_fail_compilation() {
    for bad in [
        json!({"risk_thresholds": {"low_risk_max": 0.3, "medium_risk_max": 0.7}}),
        json!({"base_score": 0.1}),
        json!({
            "base_score": 0.1,
            "price_rules": [{"if_price_gte": 10, "reason": "no_add"}],
            "risk_thresholds": {"low_risk_max": 0.3, "medium_risk_max": 0.7}
        }),
        json!({
            "base_score": 0.1,
            "text_rules": [{"add": 0.1, "reason": "no_keywords"}],
            "risk_thresholds": {"low_risk_max": 0.3, "medium_risk_max": 0.7}
        }),
    ] {
        assert!(
            matches!(RuleConfig::compile(&bad), Err(TriadError::RuleEvaluation(_))),
            "accepted {bad}"
        );
    }
}

#[test]
fn sum_on_a_rounding_tie_rounds_like_exact_decimal() {
    // 0.5 + 0.0414125 is stored just below the seventh-digit tie.
    let rules = json!({
        "base_score": 0.5,
        "price_rules": [{"if_price_gte": 0, "add": 0.0414125, "reason": "p"}],
        "risk_thresholds": {"low_risk_max": 0.541412, "medium_risk_max": 0.8}
    });
    let plain = json!({
        "base_score": 0.5414125,
        "risk_thresholds": {"low_risk_max": 0.541412, "medium_risk_max": 0.8}
    });

    let result = score_value("routine order", 0.0, 0, "direct", &plain).unwrap();
    assert_eq!(result.score, 0.541412);
    assert_eq!(result.label, RiskLabel::LowRisk);

    let summed = score_value("routine order", 0.0, 0, "direct", &rules).unwrap();
    assert_eq!(summed.score, 0.541412);
    assert_eq!(summed.reasons, vec!["p".to_string()]);
    assert_eq!(summed.label, RiskLabel::LowRisk);
}

#[test]
fn blank_keyword_lists_fail_compilation() {
    for keywords in [json!([]), json!([" "]), json!(["refund", "\t"])] {
        let err = RuleConfig::compile(&json!({
            "base_score": 0.1,
            "text_rules": [{"keywords_any": keywords, "add": 0.4, "reason": "t"}],
            "risk_thresholds": {"low_risk_max": 0.3, "medium_risk_max": 0.6}
        }))
        .unwrap_err();
        assert!(matches!(err, TriadError::RuleEvaluation(_)), "{keywords}");
    }
}
