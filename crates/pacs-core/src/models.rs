//! 核心数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// 默认最大文件大小 (100MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// 上传文件的元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub size: u64,
    pub media_type: String, // 声明的MIME类型，可能为空
}

impl FileMetadata {
    pub fn new(name: impl Into<String>, size: u64, media_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            media_type: media_type.into(),
        }
    }
}

/// 影像对应的文件引用
///
/// 重建或合成的影像没有原始文件，只有一个占位名称。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageFile {
    Present(FileMetadata),
    Placeholder { name: String },
}

impl ImageFile {
    /// 文件名，占位文件返回占位名称
    pub fn name(&self) -> &str {
        match self {
            ImageFile::Present(meta) => &meta.name,
            ImageFile::Placeholder { name } => name,
        }
    }

    pub fn metadata(&self) -> Option<&FileMetadata> {
        match self {
            ImageFile::Present(meta) => Some(meta),
            ImageFile::Placeholder { .. } => None,
        }
    }
}

/// 影像处理状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Uploading,  // 上传中
    Processing, // 分析中
    Completed,  // 已完成
    Error,      // 失败
}

impl ImageStatus {
    /// 终止状态不会再发生转换
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImageStatus::Completed | ImageStatus::Error)
    }
}

/// 上传的医学影像
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalImage {
    pub id: Uuid,
    pub file: ImageFile,
    pub modality: String, // 影像类型 (CT, MR, X-Ray等)
    pub status: ImageStatus,
    pub progress: Option<u8>,
    pub uploaded_at: DateTime<Utc>,
    pub preview: Option<String>, // data URL
}

impl MedicalImage {
    /// 为上传的文件创建影像记录
    pub fn new(file: FileMetadata, modality: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file: ImageFile::Present(file),
            modality: modality.into(),
            status: ImageStatus::Uploading,
            progress: None,
            uploaded_at: Utc::now(),
            preview: None,
        }
    }

    /// 创建没有原始文件的合成影像记录
    pub fn synthetic(modality: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            file: ImageFile::Placeholder {
                name: placeholder_name(&id),
            },
            modality: modality.into(),
            status: ImageStatus::Uploading,
            progress: None,
            uploaded_at: Utc::now(),
            preview: None,
        }
    }

    pub fn with_status(mut self, status: ImageStatus) -> Self {
        self.status = status;
        self
    }

    /// 显示名称：优先使用文件名，否则为 "Image {id}"
    pub fn display_name(&self) -> String {
        match self.file.name() {
            "" => placeholder_name(&self.id),
            name => name.to_string(),
        }
    }

    /// 保证文件引用带有可用名称
    pub fn normalized(&self) -> MedicalImage {
        let mut image = self.clone();
        if image.file.name().is_empty() {
            image.file = match image.file {
                ImageFile::Present(mut meta) => {
                    meta.name = placeholder_name(&image.id);
                    ImageFile::Present(meta)
                }
                ImageFile::Placeholder { .. } => ImageFile::Placeholder {
                    name: placeholder_name(&image.id),
                },
            };
        }
        image
    }
}

fn placeholder_name(id: &Uuid) -> String {
    format!("Image {}", id)
}

/// 发现类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FindingType {
    Anomaly,
    AttentionRequired,
    Normal,
}

impl FindingType {
    /// 异常或需关注
    pub fn is_abnormal(&self) -> bool {
        matches!(self, FindingType::Anomaly | FindingType::AttentionRequired)
    }
}

impl fmt::Display for FindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingType::Anomaly => write!(f, "anomaly"),
            FindingType::AttentionRequired => write!(f, "attention_required"),
            FindingType::Normal => write!(f, "normal"),
        }
    }
}

/// 严重程度，按声明顺序递增
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    /// 只有 high 和 critical 视为危急
    pub fn is_critical(&self) -> bool {
        *self >= Severity::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::None => write!(f, "none"),
            Severity::Low => write!(f, "low"),
            Severity::Moderate => write!(f, "moderate"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// 单张影像的一条分析发现
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub description: String,
    #[serde(rename = "type")]
    pub finding_type: FindingType,
    #[serde(default)]
    pub severity: Option<Severity>,
    pub confidence: f64, // [0, 1]
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl Finding {
    pub fn new(description: impl Into<String>, finding_type: FindingType, confidence: f64) -> Self {
        Self {
            description: description.into(),
            finding_type,
            severity: None,
            confidence,
            recommendations: Vec::new(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_recommendations<I, S>(mut self, recommendations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recommendations = recommendations.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity.map_or(false, |s| s.is_critical())
    }
}

/// 支持发现的参考文献，聚合时不做解释
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// 外部分析服务返回的单张影像结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

/// 按影像ID索引的分析结果
pub type ResultsById = HashMap<Uuid, AnalysisResult>;

/// 汇总后的医学影像报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalReport {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub study_type: String,
    pub images: Vec<MedicalImage>,
    pub findings: Vec<Finding>,
    pub summary: String,
    pub conclusion: String,
    pub recommendations: Vec<String>,
    pub markdown: String,
    pub citations: Vec<Citation>,
}

impl MedicalReport {
    /// 危急发现数量
    pub fn critical_count(&self) -> usize {
        self.findings.iter().filter(|f| f.is_critical()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_file_name() {
        let image = MedicalImage::new(FileMetadata::new("chest.png", 10, "image/png"), "X-Ray");
        assert_eq!(image.display_name(), "chest.png");

        let synthetic = MedicalImage::synthetic("CT");
        assert_eq!(synthetic.display_name(), format!("Image {}", synthetic.id));
    }

    #[test]
    fn test_normalized_fills_empty_name() {
        let mut image = MedicalImage::synthetic("CT");
        image.file = ImageFile::Placeholder { name: String::new() };

        let normalized = image.normalized();
        assert_eq!(normalized.file.name(), format!("Image {}", image.id));
        assert!(normalized.file.metadata().is_none());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::None < Severity::Low);
        assert!(Severity::Moderate < Severity::High);
        assert!(Severity::Critical.is_critical());
        assert!(Severity::High.is_critical());
        assert!(!Severity::Moderate.is_critical());
    }

    #[test]
    fn test_finding_wire_format() {
        let json = r#"{
            "description": "结节",
            "type": "attention_required",
            "severity": "high",
            "confidence": 0.8
        }"#;
        let finding: Finding = serde_json::from_str(json).unwrap();

        assert_eq!(finding.finding_type, FindingType::AttentionRequired);
        assert_eq!(finding.severity, Some(Severity::High));
        assert!(finding.recommendations.is_empty());
    }
}
