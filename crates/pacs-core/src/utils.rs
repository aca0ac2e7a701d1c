//! 通用工具函数

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 生成报告ID，由生成时间和随机后缀组成
pub fn generate_report_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("report-{}-{}", now.timestamp_millis(), &suffix[..8])
}

/// 提取报告ID中的时间戳（毫秒）
pub fn report_timestamp(report_id: &str) -> Option<i64> {
    report_id
        .strip_prefix("report-")?
        .split('-')
        .next()?
        .parse()
        .ok()
}
