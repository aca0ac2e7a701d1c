//! PACS影像报告命令行程序
//!
//! 校验上传的影像文件，读取预览，接入外部分析结果并生成汇总报告

use anyhow::{bail, Context, Result};
use clap::Parser;
use pacs_core::{MedicalReport, PacsError};
use pacs_intake::{parse_results_by_name, read_previews, DiskFile, FileSource, FileValidator};
use pacs_report::{ConfigManager, PatientContext, ReportListener, ReportSession};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "pacs-reporter")]
#[command(about = "PACS 影像分析报告生成工具")]
struct Args {
    /// 待分析的影像文件
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// 分析结果文件 (JSON，按文件名索引)
    #[arg(short, long)]
    results: PathBuf,

    /// 影像类型，默认取配置值
    #[arg(short, long)]
    modality: Option<String>,

    /// 患者ID
    #[arg(long)]
    patient_id: Option<String>,

    /// 患者姓名
    #[arg(long)]
    patient_name: Option<String>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别，默认取配置值
    #[arg(short, long)]
    log_level: Option<String>,

    /// Markdown 报告输出路径，默认输出到标准输出
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON 报告输出路径
    #[arg(long)]
    json: Option<PathBuf>,
}

/// 命令行下的报告接收方
#[derive(Debug, Default)]
struct CliListener {
    report: Option<Arc<MedicalReport>>,
}

impl ReportListener for CliListener {
    fn publish_report(&mut self, report: Arc<MedicalReport>) {
        info!("收到报告 {}", report.id);
        self.report = Some(report);
    }

    fn reveal_viewer(&mut self, show: bool) {
        if show {
            info!("报告已就绪");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager = ConfigManager::load(args.config.as_deref())?;
    let config = config_manager.config().clone();

    // 初始化日志
    let log_level = args.log_level.clone().unwrap_or(config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(log_level.as_str())
        .with_writer(std::io::stderr)
        .init();

    info!("启动PACS报告生成...");
    info!("  影像文件: {}", args.files.len());
    info!("  最大文件大小: {} 字节", config.intake.max_file_size_bytes);

    let results_json = tokio::fs::read_to_string(&args.results)
        .await
        .with_context(|| format!("Failed to read results file {}", args.results.display()))?;
    let mut results_by_name =
        parse_results_by_name(&results_json).context("Invalid analysis results")?;

    let patient = PatientContext::new(
        args.patient_id.or(config.report.patient_id),
        args.patient_name.or(config.report.patient_name),
    );
    let modality = args.modality.unwrap_or(config.intake.default_modality);
    let validator = FileValidator::new(config.intake.max_file_size_bytes);
    let mut session = ReportSession::new(patient, CliListener::default());

    // 1. 校验文件，未通过的文件直接跳过
    let mut files = Vec::new();
    for path in &args.files {
        match DiskFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(e) => warn!("无法打开文件 {}: {}", path.display(), e),
        }
    }

    let metadata: Vec<_> = files.iter().map(|file| file.metadata().clone()).collect();
    let outcomes = validator.validate_batch(&metadata);

    let mut accepted: Vec<(Uuid, Arc<dyn FileSource>)> = Vec::new();
    for (file, (_, outcome)) in files.into_iter().zip(outcomes) {
        match outcome {
            Ok(()) => {
                let id = session.add_file(file.metadata().clone(), modality.clone());
                let source: Arc<dyn FileSource> = Arc::new(file);
                accepted.push((id, source));
            }
            Err(e) if e.is_validation_error() => {
                warn!("跳过文件 {}: {}", file.path().display(), e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if accepted.is_empty() {
        bail!("没有通过校验的影像文件");
    }

    // 2. 并发读取预览，预览失败不影响分析
    let sources = accepted.iter().map(|(_, source)| Arc::clone(source)).collect();
    let previews = read_previews(sources).await;
    for ((id, source), preview) in accepted.iter().zip(previews) {
        match preview {
            Ok(preview) => session.attach_preview(*id, preview)?,
            Err(e) if e.is_preview_error() => {
                debug!("影像 {} 无预览: {}", source.metadata().name, e);
            }
            Err(e) => return Err(e.into()),
        }
        session.set_progress(*id, 100)?;
        session.mark_processing(*id)?;
    }

    // 3. 接入分析结果
    for (id, source) in &accepted {
        let name = &source.metadata().name;
        match results_by_name.remove(name) {
            Some(result) => {
                session.complete(*id, result)?;
            }
            None => {
                session.fail(*id, "缺少分析结果")?;
            }
        }
    }

    for (id, source) in &accepted {
        match session.result(*id) {
            Ok(result) => info!(
                "影像 {}: {} 条发现",
                source.metadata().name,
                result.findings.len()
            ),
            Err(PacsError::MissingResult(_)) => {
                debug!("影像 {} 未纳入报告", source.metadata().name);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let progress = session.progress();
    info!(
        "批次完成: {} 张完成, {} 张失败",
        progress.completed, progress.errored
    );

    let Some(report) = session.into_listener().report else {
        bail!("没有可生成报告的影像");
    };

    // 4. 输出报告
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &report.markdown)
                .await
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Markdown 报告已写入 {}", path.display());
        }
        None => println!("{}", report.markdown),
    }

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(report.as_ref())
            .context("Failed to serialize report")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("JSON 报告已写入 {}", path.display());
    }

    info!("结论: {}", report.conclusion);
    Ok(())
}
