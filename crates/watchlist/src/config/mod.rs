use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

mod clap;

pub use crate::config::clap::{version, Args, Command};

/// 全局的 CONFIG_DIR，表示配置文件夹的路径
pub static CONFIG_DIR: Lazy<PathBuf> = Lazy::new(|| {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("watchlist")
});

fn default_database_path() -> PathBuf {
    CONFIG_DIR.join("data.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 首次建表时写入的默认视频源
fn default_sources() -> Vec<String> {
    ["Disney plus", "Apple TV+", "Netflix", "Amazon prime"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 默认视频源写入时是否处于启用状态
    #[serde(default)]
    pub seed_active: bool,
    #[serde(default = "default_sources")]
    pub default_sources: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_level: default_log_level(),
            seed_active: false,
            default_sources: default_sources(),
        }
    }
}

/// 命令行指定了但并不存在的配置文件
pub fn missing_config_file(args: &Args) -> Option<&Path> {
    args.config.as_deref().filter(|path| !path.exists())
}

impl Config {
    /// 从 JSON 配置文件加载，文件不存在时使用默认配置
    ///
    /// 加载发生在日志初始化之前，文件不存在的提示由 [`missing_config_file`] 交给调用方输出
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).with_context(|| format!("读取配置文件 {} 失败", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("解析配置文件 {} 失败", path.display()))
    }

    /// 合并配置文件与命令行参数，命令行参数优先
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load_file(path)?,
            None => Self::default(),
        };
        if let Some(path) = &args.database {
            config.database_path = path.clone();
        }
        if let Some(level) = &args.log_level {
            config.log_level = level.clone();
        }
        if args.seed_active {
            config.seed_active = true;
        }
        Ok(config)
    }

    /// 简单检查配置，返回是否没有发现问题
    pub fn check(&self) -> bool {
        let mut ok = true;
        if self.default_sources.iter().any(|name| name.trim().is_empty()) {
            warn!("默认视频源中包含空名称，写入时会被忽略");
            ok = false;
        }
        let mut names = self.default_sources.iter().map(|name| name.trim()).collect::<Vec<_>>();
        names.sort_unstable();
        if names.windows(2).any(|pair| pair[0] == pair[1]) {
            warn!("默认视频源中存在重复名称，写入时只保留一个");
            ok = false;
        }
        if ok {
            info!("配置检查通过");
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use ::clap::Parser;

    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"seed_active": true}"#).unwrap();
        assert!(config.seed_active);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.default_sources, default_sources());
        assert!(config.database_path.ends_with("data.sqlite"));
    }

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from(["watchlist", "--database", "/tmp/wl.sqlite", "--log-level", "debug", "list"]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/wl.sqlite"));
        assert_eq!(config.log_level, "debug");
        assert!(!config.seed_active);
    }

    #[test]
    fn test_check_flags_duplicates() {
        let config = Config {
            default_sources: vec!["Netflix".to_string(), "Netflix ".to_string()],
            ..Default::default()
        };
        assert!(!config.check());
        assert!(Config::default().check());
    }

    #[test]
    fn test_missing_config_file_falls_back_to_defaults() {
        let missing = std::env::temp_dir().join(format!("watchlist-missing-{}.json", uuid::Uuid::new_v4()));
        let args = Args::parse_from(["watchlist", "--config", missing.to_str().unwrap(), "list"]);
        assert_eq!(missing_config_file(&args), Some(missing.as_path()));
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.default_sources, default_sources());

        let existing = std::env::temp_dir().join(format!("watchlist-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&existing, r#"{"log_level": "warn"}"#).unwrap();
        let args = Args::parse_from(["watchlist", "--config", existing.to_str().unwrap(), "list"]);
        assert_eq!(missing_config_file(&args), None);
        assert_eq!(Config::from_args(&args).unwrap().log_level, "warn");
        std::fs::remove_file(&existing).unwrap();

        let args = Args::parse_from(["watchlist", "list"]);
        assert_eq!(missing_config_file(&args), None);
    }
}
