//! # PACS报告模块
//!
//! 将一个批次中各影像的分析结果汇总为一份结构化报告，包括：
//! - 批次完成判定：所有未失败的影像都完成且至少一张完成
//! - 发现聚合：合并发现、引用和摘要，推导检查类型
//! - 结论与建议推导：按优先级规则生成结论，建议去重
//! - Markdown 渲染
//! - 报告组装与会话管理

pub mod aggregator;
pub mod assembler;
pub mod conclusion;
pub mod config;
pub mod renderer;
pub mod session;
pub mod state_machine;
pub mod tracker;

// 重新导出主要类型
pub use aggregator::{aggregate, Aggregation, MULTI_MODAL_STUDY};
pub use assembler::{PatientContext, ReportAssembler, ReportListener};
pub use conclusion::{derive_conclusion, derive_recommendations};
pub use self::config::{ConfigManager, ReporterConfig};
pub use renderer::{confidence_percent, render, render_on};
pub use session::ReportSession;
pub use state_machine::{ImageEvent, ImageStateMachine};
pub use tracker::{is_ready, BatchProgress};
