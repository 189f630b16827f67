#[macro_use]
extern crate tracing;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use watchlist::config::{self, Args, Command, Config};
use watchlist::database::setup_database;
use watchlist::utils::init_logger;
use watchlist::{NewSource, SourceManager};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = init(&args)?;

    let connection = Arc::new(setup_database(&config).await?);
    let manager = SourceManager::new(connection);
    manager.load().await.context("加载视频源失败")?;

    run(&manager, args.command).await
}

/// 初始化日志系统，加载配置
fn init(args: &Args) -> Result<Config> {
    let config = Config::from_args(args)?;
    init_logger(&config.log_level);
    if let Some(path) = config::missing_config_file(args) {
        warn!("配置文件 {} 不存在，使用默认配置", path.display());
    }
    debug!("watchlist 版本：{}", config::version());
    debug!("数据库路径：{}", config.database_path.display());
    config.check();
    Ok(config)
}

async fn run(manager: &SourceManager, command: Command) -> Result<()> {
    match command {
        Command::List { active } => {
            let sources = if active {
                manager.active_sources()
            } else {
                manager.all_sources()
            };
            println!("{}", serde_json::to_string_pretty(sources.as_ref())?);
        }
        Command::Add { name, image } => {
            let candidate = NewSource { name, image };
            let id = manager.add_source(candidate).await.context("添加视频源失败")?;
            println!("{}", json!({ "id": id }));
        }
        Command::Remove { ids } => {
            manager.remove_sources(&ids).await.context("删除视频源失败")?;
            info!("已删除 {} 个视频源", ids.len());
        }
        Command::Activate { id, active } => {
            manager
                .change_active_state(id, active)
                .await
                .with_context(|| format!("修改视频源 {} 的启用状态失败", id))?;
        }
        Command::Reorder { orders } => {
            manager.reorder_sources(&orders).await.context("视频源排序失败")?;
        }
    }
    Ok(())
}
