//! 分析结果接入
//!
//! 外部分析服务的返回在这里解析并校验，之后的聚合流程只处理已校验的结构。

use pacs_core::{AnalysisResult, PacsError, Result};
use std::collections::HashMap;
use tracing::debug;

/// 解析并校验单个分析结果
pub fn parse_analysis_result(json: &str) -> Result<AnalysisResult> {
    let result: AnalysisResult = serde_json::from_str(json)?;
    validate_analysis_result(result)
}

/// 解析按文件名索引的分析结果文档
///
/// 格式为 `{ "文件名": AnalysisResult, ... }`，任一条目无效则整体失败。
pub fn parse_results_by_name(json: &str) -> Result<HashMap<String, AnalysisResult>> {
    let raw: HashMap<String, AnalysisResult> = serde_json::from_str(json)?;

    raw.into_iter()
        .map(|(name, result)| -> Result<(String, AnalysisResult)> {
            let result = validate_analysis_result(result)
                .map_err(|e| PacsError::Validation(format!("{}: {}", name, e)))?;
            Ok((name, result))
        })
        .collect()
}

/// 校验分析结果
///
/// 置信度必须在 [0, 1] 内，描述不能为空；空白建议会被丢弃。
pub fn validate_analysis_result(mut result: AnalysisResult) -> Result<AnalysisResult> {
    for (index, finding) in result.findings.iter_mut().enumerate() {
        if finding.description.trim().is_empty() {
            return Err(PacsError::Validation(format!("第 {} 条发现缺少描述", index + 1)));
        }

        if !finding.confidence.is_finite() || !(0.0..=1.0).contains(&finding.confidence) {
            return Err(PacsError::Validation(format!(
                "第 {} 条发现置信度超出范围: {}",
                index + 1,
                finding.confidence
            )));
        }

        finding.recommendations = std::mem::take(&mut finding.recommendations)
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
    }

    debug!("分析结果校验通过: {} 条发现", result.findings.len());
    Ok(result)
}
