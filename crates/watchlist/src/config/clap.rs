use std::path::PathBuf;

use clap::{Parser, Subcommand};
use watchlist_entity::entities::source::SourceOrder;

#[derive(Parser, Debug)]
#[command(name = "watchlist", version = version(), about = "管理片单中的视频源")]
pub struct Args {
    /// JSON 格式的配置文件
    #[arg(short, long, env = "WATCHLIST_CONFIG")]
    pub config: Option<PathBuf>,

    /// 数据库文件路径
    #[arg(short, long, env = "WATCHLIST_DATABASE")]
    pub database: Option<PathBuf>,

    #[arg(short, long, env = "WATCHLIST_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// 首次建表时将默认视频源写入为启用状态
    #[arg(long)]
    pub seed_active: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 列出视频源
    List {
        /// 只列出启用的视频源
        #[arg(long)]
        active: bool,
    },
    /// 添加视频源，新视频源排在最前面
    Add {
        name: String,
        #[arg(long)]
        image: Option<String>,
    },
    /// 删除视频源
    Remove {
        #[arg(required = true)]
        ids: Vec<i32>,
    },
    /// 修改视频源的启用状态
    Activate {
        id: i32,
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },
    /// 重新排序，参数形如 id=order
    Reorder {
        #[arg(required = true, value_parser = parse_source_order)]
        orders: Vec<SourceOrder>,
    },
}

fn parse_source_order(s: &str) -> Result<SourceOrder, String> {
    let (id, order) = s.split_once('=').ok_or_else(|| format!("「{}」应为 id=order 格式", s))?;
    let id = id.trim().parse().map_err(|_| format!("无效的视频源 id: {}", id))?;
    let order = order.trim().parse().map_err(|_| format!("无效的顺序: {}", order))?;
    Ok(SourceOrder { id, order })
}

#[allow(dead_code)]
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub fn version() -> String {
    if built_info::PROFILE == "release" {
        built_info::PKG_VERSION.to_string()
    } else {
        format!("{}-{}", built_info::PKG_VERSION, built_info::PROFILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let args = Args::parse_from(["watchlist", "reorder", "1=2", "2=0", "3=1"]);
        assert_eq!(
            args.command,
            Command::Reorder {
                orders: vec![
                    SourceOrder { id: 1, order: 2 },
                    SourceOrder { id: 2, order: 0 },
                    SourceOrder { id: 3, order: 1 },
                ]
            }
        );

        let args = Args::parse_from(["watchlist", "activate", "4", "false"]);
        assert_eq!(args.command, Command::Activate { id: 4, active: false });

        assert!(Args::try_parse_from(["watchlist", "reorder", "1:2"]).is_err());
        assert!(Args::try_parse_from(["watchlist", "remove"]).is_err());
    }
}
