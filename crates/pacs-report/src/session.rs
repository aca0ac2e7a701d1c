//! 报告会话
//!
//! 持有一个批次的影像和分析结果，每次状态转换后重新判定批次是否就绪。
//! 只在批次从未就绪变为就绪时生成报告，保证每次批次完成只生成一份报告。

use crate::assembler::{PatientContext, ReportAssembler, ReportListener};
use crate::state_machine::{ImageEvent, ImageStateMachine};
use crate::tracker::{is_ready, BatchProgress};
use pacs_core::{
    AnalysisResult, FileMetadata, MedicalImage, MedicalReport, PacsError, Result, ResultsById,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// 报告会话
#[derive(Debug)]
pub struct ReportSession<L: ReportListener> {
    images: Vec<MedicalImage>,
    results: ResultsById,
    patient: PatientContext,
    state_machine: ImageStateMachine,
    assembler: ReportAssembler,
    listener: L,
    was_ready: bool,
    latest_report: Option<Arc<MedicalReport>>,
}

impl<L: ReportListener> ReportSession<L> {
    /// 创建新的报告会话
    pub fn new(patient: PatientContext, listener: L) -> Self {
        Self {
            images: Vec::new(),
            results: ResultsById::new(),
            patient,
            state_machine: ImageStateMachine::new(),
            assembler: ReportAssembler::new(),
            listener,
            was_ready: false,
            latest_report: None,
        }
    }

    /// 添加上传文件，初始状态为上传中
    pub fn add_file(&mut self, file: FileMetadata, modality: impl Into<String>) -> Uuid {
        self.push_image(MedicalImage::new(file, modality))
    }

    /// 添加没有原始文件的合成影像
    pub fn add_synthetic(&mut self, modality: impl Into<String>) -> Uuid {
        self.push_image(MedicalImage::synthetic(modality))
    }

    fn push_image(&mut self, image: MedicalImage) -> Uuid {
        let id = image.id;
        info!("批次新增影像 {} ({})", image.display_name(), image.modality);
        self.images.push(image);
        // 新的在途影像使批次回到未就绪
        self.was_ready = is_ready(&self.images);
        id
    }

    /// 设置预览
    pub fn attach_preview(&mut self, id: Uuid, preview: String) -> Result<()> {
        self.image_mut(id)?.preview = Some(preview);
        Ok(())
    }

    /// 设置上传进度 (0-100)
    pub fn set_progress(&mut self, id: Uuid, progress: u8) -> Result<()> {
        self.image_mut(id)?.progress = Some(progress.min(100));
        Ok(())
    }

    /// 上传完成，进入分析
    pub fn mark_processing(&mut self, id: Uuid) -> Result<Option<Arc<MedicalReport>>> {
        self.apply(id, ImageEvent::UploadFinished)
    }

    /// 分析完成，记录结果
    pub fn complete(
        &mut self,
        id: Uuid,
        result: AnalysisResult,
    ) -> Result<Option<Arc<MedicalReport>>> {
        let status = self.image_mut(id)?.status;
        self.state_machine.transition(status, ImageEvent::AnalysisCompleted)?;

        self.results.insert(id, result);
        self.apply(id, ImageEvent::AnalysisCompleted)
    }

    /// 上传或分析失败
    pub fn fail(&mut self, id: Uuid, reason: &str) -> Result<Option<Arc<MedicalReport>>> {
        warn!("影像 {} 处理失败: {}", id, reason);
        self.apply(id, ImageEvent::Failed)
    }

    /// 重新生成报告，得到新的报告ID
    pub fn regenerate(&mut self) -> Result<Option<Arc<MedicalReport>>> {
        self.generate()
    }

    fn apply(&mut self, id: Uuid, event: ImageEvent) -> Result<Option<Arc<MedicalReport>>> {
        let current = self.image_mut(id)?.status;
        let next = self.state_machine.transition(current, event)?;
        self.image_mut(id)?.status = next;

        let ready = is_ready(&self.images);
        let became_ready = ready && !self.was_ready;
        self.was_ready = ready;

        if became_ready {
            self.generate()
        } else {
            Ok(None)
        }
    }

    fn generate(&mut self) -> Result<Option<Arc<MedicalReport>>> {
        let report = self.assembler.maybe_generate_report(
            &self.images,
            &self.results,
            &self.patient,
            &mut self.listener,
        )?;
        if let Some(report) = &report {
            self.latest_report = Some(Arc::clone(report));
        }
        Ok(report)
    }

    fn image_mut(&mut self, id: Uuid) -> Result<&mut MedicalImage> {
        self.images
            .iter_mut()
            .find(|image| image.id == id)
            .ok_or_else(|| PacsError::NotFound(format!("影像 {}", id)))
    }

    pub fn images(&self) -> &[MedicalImage] {
        &self.images
    }

    pub fn results(&self) -> &ResultsById {
        &self.results
    }

    /// 获取影像的分析结果
    ///
    /// 影像不存在返回 `NotFound`，尚无结果返回 `MissingResult`。
    pub fn result(&self, id: Uuid) -> Result<&AnalysisResult> {
        if !self.images.iter().any(|image| image.id == id) {
            return Err(PacsError::NotFound(format!("影像 {}", id)));
        }
        self.results.get(&id).ok_or(PacsError::MissingResult(id))
    }

    pub fn progress(&self) -> BatchProgress {
        BatchProgress::from_images(&self.images)
    }

    pub fn latest_report(&self) -> Option<&Arc<MedicalReport>> {
        self.latest_report.as_ref()
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn into_listener(self) -> L {
        self.listener
    }
}
