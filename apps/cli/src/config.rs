//! CLI 配置
//!
//! 优先级：命令行参数 > 配置文件 > 内置默认值。
//! 配置文件默认位于 `<config_dir>/orientus/config.toml`，可用 `--config` 覆盖。

use anyhow::{Context, Result};
use clap::Args;
use orientus_driver::serial::DEFAULT_BAUD_RATE;
use orientus_driver::{DEFAULT_FRAME_ID, DEFAULT_PORT, OrientusBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("orientus");
    path.push("config.toml");
    Ok(path)
}

/// 配置文件内容（所有字段可选）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// 串口设备
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// 输出记录坐标系
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
    /// 启动时是否下发数据包速率配置
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configure_on_start: Option<bool>,
}

impl CliConfig {
    /// 读取配置文件；文件不存在时返回空配置
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    /// 按 `--config` 或默认路径加载
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                anyhow::ensure!(path.exists(), "配置文件不存在: {}", path.display());
                Self::load_from(path)
            },
            None => Self::load_from(&default_config_file()?),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("创建配置目录失败")?;
        }
        let content = toml::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(path, format!("# Orientus CLI Configuration\n\n{}", content))
            .context("写入配置文件失败")?;
        Ok(())
    }

    /// 带默认值的完整配置（用于 `config init`）
    pub fn with_defaults() -> Self {
        Self {
            port: Some(DEFAULT_PORT.to_string()),
            frame_id: Some(DEFAULT_FRAME_ID.to_string()),
            baud_rate: Some(DEFAULT_BAUD_RATE),
            configure_on_start: Some(true),
        }
    }
}

/// 连接参数（覆盖配置文件）
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// 串口设备（如 /dev/ttyUSB0）
    #[arg(short, long)]
    pub port: Option<String>,

    /// 输出记录坐标系
    #[arg(long)]
    pub frame_id: Option<String>,

    /// 波特率
    #[arg(short, long)]
    pub baud_rate: Option<u32>,

    /// 不下发数据包速率配置，沿用设备当前设置
    #[arg(long)]
    pub no_configure: bool,
}

/// 合并后的连接设置
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    pub port: String,
    pub frame_id: String,
    pub baud_rate: u32,
    pub configure_on_start: bool,
}

impl ConnectionArgs {
    pub fn resolve(&self, config: &CliConfig) -> ConnectionSettings {
        ConnectionSettings {
            port: self
                .port
                .clone()
                .or_else(|| config.port.clone())
                .unwrap_or_else(|| DEFAULT_PORT.to_string()),
            frame_id: self
                .frame_id
                .clone()
                .or_else(|| config.frame_id.clone())
                .unwrap_or_else(|| DEFAULT_FRAME_ID.to_string()),
            baud_rate: self.baud_rate.or(config.baud_rate).unwrap_or(DEFAULT_BAUD_RATE),
            configure_on_start: !self.no_configure && config.configure_on_start.unwrap_or(true),
        }
    }
}

impl ConnectionSettings {
    pub fn builder(&self) -> OrientusBuilder {
        OrientusBuilder::new()
            .port(self.port.as_str())
            .frame_id(self.frame_id.as_str())
            .baud_rate(self.baud_rate)
            .configure_on_start(self.configure_on_start)
    }
}
