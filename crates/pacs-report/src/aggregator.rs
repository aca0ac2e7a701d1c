//! 发现聚合
//!
//! 按影像顺序合并各影像的发现、引用和摘要，并推导检查类型

use pacs_core::{Citation, Finding, MedicalImage, PacsError, Result, ResultsById};
use tracing::debug;

/// 多种影像类型混合时的检查类型
pub const MULTI_MODAL_STUDY: &str = "Multi-Modal Study";

/// 聚合结果
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub findings: Vec<Finding>,
    pub summary: String,
    pub study_type: String,
    pub citations: Vec<Citation>,
}

/// 聚合已完成影像的分析结果
///
/// 没有对应结果的影像不贡献任何内容。影像列表为空时返回 `EmptyBatch`。
pub fn aggregate(images: &[&MedicalImage], results: &ResultsById) -> Result<Aggregation> {
    let study_type = derive_study_type(images.iter().map(|image| image.modality.as_str()))?;

    let mut aggregation = Aggregation {
        study_type,
        ..Default::default()
    };
    let mut sections = Vec::new();

    for image in images {
        let Some(result) = results.get(&image.id) else {
            debug!("影像 {} 暂无分析结果", image.id);
            continue;
        };

        aggregation.findings.extend(result.findings.iter().cloned());
        aggregation.citations.extend(result.citations.iter().cloned());
        sections.push(format!("### {}\n\n{}", image.display_name(), result.summary));
    }

    aggregation.summary = sections.join("\n\n");

    debug!(
        "聚合完成: {} 张影像, {} 条发现, 检查类型 {}",
        images.len(),
        aggregation.findings.len(),
        aggregation.study_type
    );
    Ok(aggregation)
}

/// 推导检查类型：只有一种影像类型时原样使用，否则为多模态检查
pub fn derive_study_type<'a>(modalities: impl IntoIterator<Item = &'a str>) -> Result<String> {
    let mut distinct: Vec<&str> = Vec::new();
    for modality in modalities {
        if !distinct.contains(&modality) {
            distinct.push(modality);
        }
    }

    match distinct.as_slice() {
        [] => Err(PacsError::EmptyBatch),
        [single] => Ok(single.to_string()),
        _ => Ok(MULTI_MODAL_STUDY.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacs_core::{AnalysisResult, FileMetadata, FindingType, ImageStatus};

    fn completed(name: &str, modality: &str) -> MedicalImage {
        MedicalImage::new(FileMetadata::new(name, 10, "image/png"), modality)
            .with_status(ImageStatus::Completed)
    }

    fn result(summary: &str, descriptions: &[&str]) -> AnalysisResult {
        AnalysisResult {
            findings: descriptions
                .iter()
                .map(|d| Finding::new(*d, FindingType::Normal, 0.9))
                .collect(),
            summary: summary.to_string(),
            citations: vec![Citation {
                title: format!("ref for {}", summary),
                source: None,
                url: None,
            }],
        }
    }

    #[test]
    fn test_flattens_in_image_order() {
        let a = completed("a.png", "CT");
        let b = completed("b.png", "CT");
        let mut results = ResultsById::new();
        results.insert(b.id, result("second", &["b1"]));
        results.insert(a.id, result("first", &["a1", "a2"]));

        let aggregation = aggregate(&[&a, &b], &results).unwrap();

        let descriptions: Vec<_> = aggregation
            .findings
            .iter()
            .map(|f| f.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["a1", "a2", "b1"]);
        assert_eq!(aggregation.summary, "### a.png\n\nfirst\n\n### b.png\n\nsecond");
        assert_eq!(aggregation.citations.len(), 2);
        assert_eq!(aggregation.citations[0].title, "ref for first");
        assert_eq!(aggregation.study_type, "CT");
    }

    #[test]
    fn test_missing_result_contributes_nothing() {
        let a = completed("a.png", "CT");
        let b = completed("b.png", "MR");
        let mut results = ResultsById::new();
        results.insert(b.id, result("only b", &["b1"]));

        let aggregation = aggregate(&[&a, &b], &results).unwrap();
        assert_eq!(aggregation.findings.len(), 1);
        assert_eq!(aggregation.summary, "### b.png\n\nonly b");
        assert_eq!(aggregation.study_type, MULTI_MODAL_STUDY);
    }

    #[test]
    fn test_synthetic_image_summary_header() {
        let image = MedicalImage::synthetic("X-Ray").with_status(ImageStatus::Completed);
        let mut results = ResultsById::new();
        results.insert(image.id, result("重建影像", &[]));

        let aggregation = aggregate(&[&image], &results).unwrap();
        assert!(aggregation.summary.starts_with(&format!("### Image {}", image.id)));
    }

    #[test]
    fn test_empty_batch_is_error() {
        let results = ResultsById::new();
        assert!(matches!(aggregate(&[], &results), Err(PacsError::EmptyBatch)));
    }

    #[test]
    fn test_derive_study_type() {
        assert_eq!(derive_study_type(["CT", "CT"]).unwrap(), "CT");
        assert_eq!(derive_study_type(["CT", "MR", "CT"]).unwrap(), MULTI_MODAL_STUDY);
        assert!(derive_study_type(Vec::<&str>::new()).is_err());
    }
}
