//! 错误定义模块

use thiserror::Error;
use uuid::Uuid;

/// PACS报告系统统一错误类型
#[derive(Error, Debug)]
pub enum PacsError {
    #[error("文件过大，最大允许 {max_mb}MB")]
    FileTooLarge { max_mb: f64 },

    #[error("不支持的文件类型: {0}")]
    UnsupportedType(String),

    #[error("文件名包含非法字符: {0}")]
    UnsafeFilename(String),

    #[error("文件名与批次中已接收的文件重复: {0}")]
    DuplicateFilename(String),

    #[error("文件读取失败: {0}")]
    ReadFailed(String),

    #[error("文件内容不是有效的图像数据")]
    InvalidImageData,

    #[error("影像列表为空，无法生成报告")]
    EmptyBatch,

    #[error("影像 {0} 缺少分析结果")]
    MissingResult(Uuid),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效状态转换: 从 {from} 到 {event}")]
    InvalidStateTransition { from: String, event: String },
}

impl PacsError {
    /// 是否为文件校验阶段的错误
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            PacsError::FileTooLarge { .. }
                | PacsError::UnsupportedType(_)
                | PacsError::UnsafeFilename(_)
                | PacsError::DuplicateFilename(_)
        )
    }

    /// 是否为预览读取阶段的错误
    pub fn is_preview_error(&self) -> bool {
        matches!(self, PacsError::ReadFailed(_) | PacsError::InvalidImageData)
    }
}

/// PACS报告系统统一结果类型
pub type Result<T> = std::result::Result<T, PacsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_too_large_message() {
        let err = PacsError::FileTooLarge { max_mb: 100.0 };
        assert!(err.to_string().contains("100MB"));

        let err = PacsError::FileTooLarge { max_mb: 0.5 };
        assert!(err.to_string().contains("0.5MB"));
    }

    #[test]
    fn test_error_categories() {
        assert!(PacsError::UnsafeFilename("a/b".into()).is_validation_error());
        assert!(!PacsError::UnsafeFilename("a/b".into()).is_preview_error());
        assert!(PacsError::InvalidImageData.is_preview_error());
        assert!(!PacsError::EmptyBatch.is_validation_error());
        assert!(PacsError::DuplicateFilename("scan.png".into()).is_validation_error());
        assert!(!PacsError::MissingResult(Uuid::nil()).is_preview_error());
    }
}
