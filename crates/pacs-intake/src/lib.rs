//! # PACS影像接收模块
//!
//! 负责不可信上传文件进入报告流水线之前的处理：
//! - 文件校验：大小、类型白名单和文件名安全检查
//! - 安全预览读取：异步编码为 data URL，拒绝非图像数据
//! - 分析结果接入：在边界处校验外部分析服务的返回

pub mod ingest;
pub mod preview;
pub mod validator;

pub use ingest::{parse_analysis_result, parse_results_by_name, validate_analysis_result};
pub use preview::{read_preview, read_previews, DiskFile, FileSource, InMemoryFile};
pub use validator::{validate_file, FileValidator, DEFAULT_MAX_FILE_SIZE};
