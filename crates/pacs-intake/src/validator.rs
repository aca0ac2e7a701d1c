//! 上传文件验证模块
//!
//! 在文件进入流水线之前按固定策略检查大小、类型和文件名

use once_cell::sync::Lazy;
use pacs_core::{FileMetadata, PacsError, Result};
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

pub use pacs_core::DEFAULT_MAX_FILE_SIZE;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// 允许的MIME类型
const ALLOWED_MEDIA_TYPES: [&str; 4] = [
    "image/jpeg",
    "image/png",
    "image/dicom",
    "application/dicom",
];

/// MIME类型不匹配时允许的扩展名
const ALLOWED_EXTENSIONS: [&str; 5] = ["dcm", "dicom", "jpg", "jpeg", "png"];

/// 仅允许 ASCII 单词字符、连字符、点和空格
static SAFE_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-. ]+$").expect("filename pattern is valid"));

/// 上传文件验证器
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

impl FileValidator {
    /// 创建新的文件验证器
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// 验证单个文件
    ///
    /// 依次检查大小、类型，最后检查文件名。文件名检查在类型通过后仍然执行。
    pub fn validate(&self, file: &FileMetadata) -> Result<()> {
        self.validate_size(file)?;
        self.validate_type(file)?;
        self.validate_filename(file)?;

        debug!("文件验证通过: {}", file.name);
        Ok(())
    }

    /// 验证一批文件，单个文件失败不影响其他文件
    ///
    /// 分析结果按文件名关联，与之前已通过的文件同名的文件返回 `DuplicateFilename`。
    pub fn validate_batch<'a>(&self, files: &'a [FileMetadata]) -> Vec<(&'a str, Result<()>)> {
        let mut accepted = HashSet::new();
        files
            .iter()
            .map(|file| {
                let outcome = self.validate(file).and_then(|()| {
                    if accepted.insert(file.name.as_str()) {
                        Ok(())
                    } else {
                        Err(PacsError::DuplicateFilename(file.name.clone()))
                    }
                });
                if let Err(e) = &outcome {
                    warn!("文件 {} 未通过验证: {}", file.name, e);
                }
                (file.name.as_str(), outcome)
            })
            .collect()
    }

    fn validate_size(&self, file: &FileMetadata) -> Result<()> {
        if file.size > self.max_file_size {
            return Err(PacsError::FileTooLarge {
                max_mb: self.max_file_size as f64 / BYTES_PER_MB,
            });
        }
        Ok(())
    }

    fn validate_type(&self, file: &FileMetadata) -> Result<()> {
        if ALLOWED_MEDIA_TYPES.contains(&file.media_type.as_str()) {
            return Ok(());
        }

        let extension = file_extension(&file.name);
        if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            debug!("文件 {} 通过扩展名 .{} 识别", file.name, extension);
            return Ok(());
        }

        Err(PacsError::UnsupportedType(if file.media_type.is_empty() {
            format!(".{}", extension)
        } else {
            file.media_type.clone()
        }))
    }

    fn validate_filename(&self, file: &FileMetadata) -> Result<()> {
        if SAFE_FILENAME.is_match(&file.name) {
            Ok(())
        } else {
            Err(PacsError::UnsafeFilename(file.name.clone()))
        }
    }
}

/// 按默认策略之外的最大大小验证文件
pub fn validate_file(file: &FileMetadata, max_file_size: u64) -> Result<()> {
    FileValidator::new(max_file_size).validate(file)
}

/// 最后一个 `.` 之后的小写扩展名；没有 `.` 时为整个文件名
fn file_extension(name: &str) -> String {
    name.rsplit('.').next().unwrap_or_default().to_lowercase()
}
