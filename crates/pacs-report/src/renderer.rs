//! Markdown 报告渲染

use chrono::{Datelike, Local, NaiveDate};
use pacs_core::{Finding, MedicalImage};
use std::fmt::Write;

const REPORT_TITLE: &str = "# Medical Imaging Analysis Report";
const MISSING_SEVERITY: &str = "N/A";

/// 渲染报告，生成日期为当天本地日期
pub fn render<'a, I>(images: I, findings: &[Finding]) -> String
where
    I: IntoIterator<Item = &'a MedicalImage>,
{
    render_on(images, findings, Local::now().date_naive())
}

/// 按指定生成日期渲染报告
pub fn render_on<'a, I>(images: I, findings: &[Finding], generated_on: NaiveDate) -> String
where
    I: IntoIterator<Item = &'a MedicalImage>,
{
    let mut out = String::new();

    let _ = writeln!(out, "{}\n", REPORT_TITLE);
    let _ = writeln!(out, "Generated: {}\n", format_date(generated_on));

    out.push_str("## Images Analyzed\n\n");
    for (index, image) in images.into_iter().enumerate() {
        let _ = writeln!(out, "{}. {} ({})", index + 1, image.display_name(), image.modality);
    }
    out.push('\n');

    out.push_str("## Findings\n\n");
    if findings.is_empty() {
        out.push_str("No findings reported.\n");
    }
    for (index, finding) in findings.iter().enumerate() {
        let severity = finding
            .severity
            .map(|s| s.to_string())
            .unwrap_or_else(|| MISSING_SEVERITY.to_string());

        let _ = writeln!(out, "### Finding {}\n", index + 1);
        let _ = writeln!(out, "- **Description:** {}", finding.description);
        let _ = writeln!(out, "- **Type:** {}", finding.finding_type);
        let _ = writeln!(out, "- **Severity:** {}", severity);
        let _ = writeln!(out, "- **Confidence:** {}%\n", confidence_percent(finding.confidence));
    }

    out
}

/// 置信度百分比，`confidence * 100` 四舍五入到整数
///
/// 0.995 得到 100 而不是截断的 99。
pub fn confidence_percent(confidence: f64) -> u32 {
    if !confidence.is_finite() {
        return 0;
    }
    (confidence * 100.0).round().clamp(0.0, 100.0) as u32
}

fn format_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.year(), date.month(), date.day())
}
