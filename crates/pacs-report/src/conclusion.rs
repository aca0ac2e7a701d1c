//! 结论与建议推导
//!
//! 结论按优先级规则列表依次判定，第一条命中的规则决定结论内容。

use pacs_core::Finding;
use std::collections::HashSet;

/// 结论规则
struct ConclusionRule {
    /// 规则名称
    name: &'static str,
    /// 命中条件
    matches: fn(&Finding) -> bool,
    /// 结论内容，参数为命中数量
    message: fn(usize) -> String,
}

const CONCLUSION_RULES: [ConclusionRule; 2] = [
    ConclusionRule {
        name: "critical",
        matches: is_critical_finding,
        message: critical_message,
    },
    ConclusionRule {
        name: "abnormal",
        matches: is_abnormal_finding,
        message: abnormal_message,
    },
];

fn is_critical_finding(finding: &Finding) -> bool {
    finding.is_critical()
}

fn is_abnormal_finding(finding: &Finding) -> bool {
    finding.finding_type.is_abnormal()
}

fn critical_message(count: usize) -> String {
    format!(
        "Critical findings detected: {} finding(s) of high or critical severity \
         require immediate clinical attention.",
        count
    )
}

fn abnormal_message(count: usize) -> String {
    format!("{} abnormal finding(s) identified. Further evaluation is recommended.", count)
}

const ROUTINE_CONCLUSION: &str =
    "No significant abnormalities detected. Routine follow-up is recommended.";

/// 推导报告结论
pub fn derive_conclusion(findings: &[Finding]) -> String {
    for rule in &CONCLUSION_RULES {
        let count = findings.iter().filter(|f| (rule.matches)(f)).count();
        if count > 0 {
            tracing::debug!("结论规则 {} 命中 {} 条发现", rule.name, count);
            return (rule.message)(count);
        }
    }
    ROUTINE_CONCLUSION.to_string()
}

/// 推导建议列表：按首次出现顺序去重
pub fn derive_recommendations(findings: &[Finding]) -> Vec<String> {
    let mut seen = HashSet::new();
    findings
        .iter()
        .flat_map(|finding| finding.recommendations.iter())
        .filter(|recommendation| seen.insert(recommendation.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacs_core::{FindingType, Severity};
    use proptest::prelude::*;

    fn finding(finding_type: FindingType, severity: Option<Severity>) -> Finding {
        let finding = Finding::new("test", finding_type, 0.9);
        match severity {
            Some(severity) => finding.with_severity(severity),
            None => finding,
        }
    }

    #[test]
    fn test_critical_rule_counts_high_and_critical() {
        let findings = vec![
            finding(FindingType::Anomaly, Some(Severity::Critical)),
            finding(FindingType::Normal, Some(Severity::High)),
            finding(FindingType::Anomaly, Some(Severity::Moderate)),
        ];

        let conclusion = derive_conclusion(&findings);
        assert!(conclusion.starts_with("Critical findings detected: 2 "));
    }

    #[test]
    fn test_abnormal_rule() {
        let findings = vec![
            finding(FindingType::Anomaly, Some(Severity::Low)),
            finding(FindingType::AttentionRequired, None),
            finding(FindingType::Normal, None),
        ];

        assert_eq!(
            derive_conclusion(&findings),
            "2 abnormal finding(s) identified. Further evaluation is recommended."
        );
    }

    #[test]
    fn test_routine_conclusion() {
        assert_eq!(derive_conclusion(&[]), ROUTINE_CONCLUSION);

        let findings = vec![finding(FindingType::Normal, Some(Severity::Moderate))];
        assert_eq!(derive_conclusion(&findings), ROUTINE_CONCLUSION);
    }

    #[test]
    fn test_recommendations_dedup_in_order() {
        let findings = vec![
            Finding::new("a", FindingType::Anomaly, 0.5).with_recommendations(["a", "b"]),
            Finding::new("b", FindingType::Normal, 0.5),
            Finding::new("c", FindingType::Anomaly, 0.5).with_recommendations(["b", "c"]),
        ];

        assert_eq!(derive_recommendations(&findings), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_recommendations_are_exact_match() {
        let findings = vec![Finding::new("a", FindingType::Anomaly, 0.5)
            .with_recommendations(["MRI", "mri", "MRI"])];
        assert_eq!(derive_recommendations(&findings), vec!["MRI", "mri"]);
    }

    fn finding_strategy() -> impl Strategy<Value = Finding> {
        let finding_type = prop_oneof![
            Just(FindingType::Anomaly),
            Just(FindingType::AttentionRequired),
            Just(FindingType::Normal),
        ];
        let severity = proptest::option::of(prop_oneof![
            Just(Severity::None),
            Just(Severity::Low),
            Just(Severity::Moderate),
            Just(Severity::High),
            Just(Severity::Critical),
        ]);
        let recommendations = proptest::collection::vec("[a-d]", 0..4);

        (finding_type, severity, recommendations).prop_map(
            |(finding_type, severity, recommendations)| Finding {
                description: "generated".to_string(),
                finding_type,
                severity,
                confidence: 0.5,
                recommendations,
            },
        )
    }

    proptest! {
        #[test]
        fn prop_any_critical_selects_critical_rule(
            mut findings in proptest::collection::vec(finding_strategy(), 0..10),
            severity in prop_oneof![Just(Severity::High), Just(Severity::Critical)],
            position in 0usize..10,
        ) {
            let position = position.min(findings.len());
            findings.insert(position, finding(FindingType::Normal, Some(severity)));

            prop_assert!(derive_conclusion(&findings).starts_with("Critical findings detected"));
        }

        #[test]
        fn prop_recommendations_unique_and_complete(
            findings in proptest::collection::vec(finding_strategy(), 0..10)
        ) {
            let recommendations = derive_recommendations(&findings);
            let unique: HashSet<_> = recommendations.iter().collect();
            prop_assert_eq!(unique.len(), recommendations.len());

            for finding in &findings {
                for recommendation in &finding.recommendations {
                    prop_assert!(recommendations.contains(recommendation));
                }
            }
        }
    }
}
