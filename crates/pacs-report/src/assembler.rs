//! 报告组装
//!
//! 批次就绪时依次执行聚合、结论推导和渲染，生成不可变的报告对象并通知调用方

use crate::aggregator::aggregate;
use crate::conclusion::{derive_conclusion, derive_recommendations};
use crate::renderer::render;
use crate::tracker::{completed_images, BatchProgress};
use chrono::Utc;
use pacs_core::utils::generate_report_id;
use pacs_core::{MedicalImage, MedicalReport, Result, ResultsById};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// 缺少患者ID时使用的值
pub const UNKNOWN_PATIENT_ID: &str = "unknown";
/// 缺少患者姓名时使用的值
pub const UNKNOWN_PATIENT_NAME: &str = "Unknown Patient";

/// 报告接收方
pub trait ReportListener {
    /// 发布新生成的报告
    fn publish_report(&mut self, report: Arc<MedicalReport>);

    /// 显示或隐藏报告查看器
    fn reveal_viewer(&mut self, show: bool);
}

/// 患者信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientContext {
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
}

impl PatientContext {
    pub fn new(patient_id: Option<String>, patient_name: Option<String>) -> Self {
        Self {
            patient_id,
            patient_name,
        }
    }

    fn resolved_id(&self) -> String {
        non_blank(&self.patient_id).unwrap_or(UNKNOWN_PATIENT_ID).to_string()
    }

    fn resolved_name(&self) -> String {
        non_blank(&self.patient_name).unwrap_or(UNKNOWN_PATIENT_NAME).to_string()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// 报告组装器
#[derive(Debug, Default)]
pub struct ReportAssembler;

impl ReportAssembler {
    pub fn new() -> Self {
        Self
    }

    /// 批次就绪时生成报告
    ///
    /// 未就绪返回 `None` 且不调用接收方；就绪时依次调用 `publish_report` 和 `reveal_viewer(true)`。
    pub fn maybe_generate_report(
        &self,
        images: &[MedicalImage],
        results: &ResultsById,
        patient: &PatientContext,
        listener: &mut dyn ReportListener,
    ) -> Result<Option<Arc<MedicalReport>>> {
        let progress = BatchProgress::from_images(images);
        if !progress.is_ready() {
            debug!(
                "批次未就绪: 完成 {}/{}，失败 {}",
                progress.completed,
                progress.active(),
                progress.errored
            );
            return Ok(None);
        }

        let report = Arc::new(self.assemble(images, results, patient)?);

        info!(
            "报告 {} 已生成: {} 张影像, {} 条发现, {} 条危急",
            report.id,
            report.images.len(),
            report.findings.len(),
            report.critical_count()
        );

        listener.publish_report(Arc::clone(&report));
        listener.reveal_viewer(true);

        Ok(Some(report))
    }

    /// 组装报告，不检查批次是否就绪
    fn assemble(
        &self,
        images: &[MedicalImage],
        results: &ResultsById,
        patient: &PatientContext,
    ) -> Result<MedicalReport> {
        let completed = completed_images(images);
        let aggregation = aggregate(&completed, results)?;

        let conclusion = derive_conclusion(&aggregation.findings);
        let recommendations = derive_recommendations(&aggregation.findings);
        let markdown = render(completed.iter().copied(), &aggregation.findings);

        let now = Utc::now();
        Ok(MedicalReport {
            id: generate_report_id(now),
            patient_id: patient.resolved_id(),
            patient_name: patient.resolved_name(),
            created_at: now,
            updated_at: now,
            study_type: aggregation.study_type,
            images: completed.iter().map(|image| image.normalized()).collect(),
            findings: aggregation.findings,
            summary: aggregation.summary,
            conclusion,
            recommendations,
            markdown,
            citations: aggregation.citations,
        })
    }
}
