use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, TransactionTrait};
use tracing::{debug, info};
use watchlist_entity::entities::pending_seed;
use watchlist_migration::{Migrator, MigratorTrait};

use crate::config::Config;
use crate::store::source_table;

fn database_url(config: &Config) -> String {
    // WAL 等参数在连接建立后通过 PRAGMA 设置
    format!("sqlite://{}?mode=rwc", config.database_path.to_string_lossy())
}

async fn database_connection(config: &Config) -> Result<DatabaseConnection> {
    let mut option = ConnectOptions::new(database_url(config));
    option
        .max_connections(8)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .sqlx_logging(false);

    let connection = Database::connect(option).await?;

    connection.execute_unprepared("PRAGMA journal_mode = WAL;").await?;
    connection.execute_unprepared("PRAGMA synchronous = NORMAL;").await?;
    connection.execute_unprepared("PRAGMA temp_store = memory;").await?;
    debug!("SQLite WAL 模式已启用");

    Ok(connection)
}

async fn migrate_database(connection: &DatabaseConnection) -> Result<()> {
    let pending = Migrator::get_pending_migrations(connection).await?;
    if !pending.is_empty() {
        info!("检测到 {} 个待应用的数据库迁移", pending.len());
    }
    Migrator::up(connection, None).await?;
    Ok(())
}

/// 写入默认视频源，返回本次是否写入
///
/// 建表时留下的标记与默认视频源在同一个事务中删除和写入，中途失败或进程退出时标记仍在，下次启动会重新写入
async fn seed_default_sources(connection: &DatabaseConnection, config: &Config) -> Result<bool> {
    let txn = connection.begin().await?;
    let claimed = pending_seed::Entity::delete_many().exec(&txn).await?.rows_affected;
    if claimed == 0 {
        return Ok(false);
    }
    let count = source_table::populate(&txn, &config.default_sources, config.seed_active)
        .await
        .context("写入默认视频源失败")?;
    txn.commit().await?;
    info!("视频源表已创建，写入 {} 个默认视频源", count);
    Ok(true)
}

/// 进行数据库迁移并获取数据库连接，供外部使用
pub async fn setup_database(config: &Config) -> Result<DatabaseConnection> {
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).with_context(|| format!("创建数据目录 {} 失败", parent.display()))?;
        }
    }
    if !config.database_path.exists() {
        info!("数据库文件不存在，将创建新的数据库: {}", config.database_path.display());
    }

    // 迁移使用单独的默认连接，避免多连接导致的迁移顺序问题
    let migrate_connection = Database::connect(database_url(config)).await?;
    migrate_database(&migrate_connection).await.context("数据库迁移失败")?;
    migrate_connection.close().await?;

    let connection = database_connection(config).await.context("获取数据库连接失败")?;
    seed_default_sources(&connection, config).await?;
    Ok(connection)
}

/// 测试用的内存数据库，只保留一个连接以保证所有查询看到同一个库
#[cfg(test)]
pub(crate) async fn setup_memory_database() -> Result<DatabaseConnection> {
    let mut option = ConnectOptions::new("sqlite::memory:");
    option.max_connections(1).min_connections(1).sqlx_logging(false);
    let connection = Database::connect(option).await?;
    Migrator::up(&connection, None).await?;
    Ok(connection)
}
