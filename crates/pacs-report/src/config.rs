//! 配置管理
//!
//! 从可选的配置文件和环境变量加载报告系统配置，加载后执行验证

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use pacs_core::DEFAULT_MAX_FILE_SIZE;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// 环境变量前缀，例如 `PACS_REPORTER_INTAKE__MAX_FILE_SIZE_BYTES`
const ENV_PREFIX: &str = "PACS_REPORTER";

/// 报告系统完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// 文件接收配置
    pub intake: IntakeConfig,
    /// 报告配置
    pub report: ReportConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 文件接收配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// 最大文件大小（字节）
    pub max_file_size_bytes: u64,
    /// 未指定时使用的影像类型
    pub default_modality: String,
}

/// 报告配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// 默认患者ID
    pub patient_id: Option<String>,
    /// 默认患者姓名
    pub patient_name: Option<String>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            default_modality: "X-Ray".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    config: ReporterConfig,
    validator: ConfigValidator,
}

impl ConfigManager {
    /// 加载配置，未指定配置文件时只使用默认值和环境变量
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self { config, validator })
    }

    fn load_config(config_path: Option<&str>) -> Result<ReporterConfig> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: ReporterConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        info!("配置加载完成: {}", config_path.unwrap_or("<默认配置>"));
        Ok(config)
    }

    /// 获取配置
    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// 更新配置，验证失败时保持原配置
    pub fn update_config(&mut self, new_config: ReporterConfig) -> Result<()> {
        self.validator.validate(&new_config)?;
        self.config = new_config;
        info!("配置已更新");
        Ok(())
    }
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&ReporterConfig) -> Result<()>,
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "intake.max_file_size_bytes",
                validator: |config| {
                    if config.intake.max_file_size_bytes == 0 {
                        Err(anyhow::anyhow!("Max file size cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "intake.default_modality",
                validator: |config| {
                    if config.intake.default_modality.trim().is_empty() {
                        Err(anyhow::anyhow!("Default modality cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "logging.level",
                validator: |config| {
                    if config.logging.level.trim().is_empty() {
                        Err(anyhow::anyhow!("Log level cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &ReporterConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("配置验证失败 {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("Invalid {}: {}", rule.field_path, e));
            }
        }
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
