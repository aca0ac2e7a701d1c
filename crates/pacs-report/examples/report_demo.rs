//! 报告生成演示程序
//!
//! 展示从文件校验、预览读取到分析结果汇总和报告生成的完整流程

use pacs_core::{AnalysisResult, Citation, Finding, FindingType, MedicalReport, Severity};
use pacs_intake::{read_preview, FileSource, FileValidator, InMemoryFile};
use pacs_report::{PatientContext, ReportListener, ReportSession};
use std::sync::Arc;

/// 打印报告的接收方
struct ConsoleListener;

impl ReportListener for ConsoleListener {
    fn publish_report(&mut self, report: Arc<MedicalReport>) {
        println!("\n📄 报告 {} 已生成", report.id);
        println!("   检查类型: {}", report.study_type);
        println!("   结论: {}", report.conclusion);
        for recommendation in &report.recommendations {
            println!("   建议: {}", recommendation);
        }
        println!("\n{}", report.markdown);
    }

    fn reveal_viewer(&mut self, show: bool) {
        println!("👀 报告查看器: {}", if show { "显示" } else { "隐藏" });
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    println!("🚀 PACS 影像报告演示\n");

    let validator = FileValidator::default();
    let uploads = vec![
        InMemoryFile::new("chest_pa.png", "image/png", vec![0x89, b'P', b'N', b'G']),
        InMemoryFile::new("head_ct.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]),
        InMemoryFile::new("../../etc/passwd", "image/png", vec![0x00]),
    ];

    let mut session = ReportSession::new(
        PatientContext::new(Some("PAT12345".to_string()), Some("张三".to_string())),
        ConsoleListener,
    );

    // 1. 校验并读取预览
    let mut accepted = Vec::new();
    for upload in &uploads {
        let metadata = upload.metadata();
        if let Err(e) = validator.validate(metadata) {
            println!("❌ {} 被拒绝: {}", metadata.name, e);
            continue;
        }

        let id = session.add_file(metadata.clone(), "CT");
        let preview = read_preview(upload).await?;
        session.attach_preview(id, preview)?;
        session.mark_processing(id)?;
        println!("✅ {} 已接收", metadata.name);
        accepted.push(id);
    }

    // 2. 模拟外部分析服务返回结果
    let results = vec![
        AnalysisResult {
            findings: vec![
                Finding::new("Small nodule in right lower lobe", FindingType::Anomaly, 0.873)
                    .with_severity(Severity::Moderate)
                    .with_recommendations(["Follow-up CT in 3 months"]),
            ],
            summary: "One pulmonary nodule identified.".to_string(),
            citations: vec![Citation {
                title: "Fleischner Society Guidelines 2017".to_string(),
                source: None,
                url: None,
            }],
        },
        AnalysisResult {
            findings: vec![
                Finding::new("Acute subdural hemorrhage", FindingType::Anomaly, 0.995)
                    .with_severity(Severity::Critical)
                    .with_recommendations([
                        "Urgent neurosurgical consult",
                        "Follow-up CT in 3 months",
                    ]),
            ],
            summary: "Acute intracranial hemorrhage.".to_string(),
            citations: Vec::new(),
        },
    ];

    for (id, result) in accepted.into_iter().zip(results) {
        session.complete(id, result)?;
    }

    let progress = session.progress();
    println!(
        "\n📊 批次统计: {} 张完成, {} 张失败",
        progress.completed, progress.errored
    );

    println!("\n🎉 演示完成!");
    Ok(())
}
