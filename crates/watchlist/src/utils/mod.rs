pub mod barrier;
pub mod broadcast;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

pub fn init_logger(log_level: &str) {
    let console_filter = build_optimized_filter(log_level);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
            "%b %d %H:%M:%S".to_owned(),
        ))
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .expect("初始化日志失败");
}

/// 构建日志过滤器，降低 sqlx 慢查询等噪音
fn build_optimized_filter(base_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::builder().parse_lossy(format!(
        "{},\
            sqlx::query=error,\
            sqlx=error,\
            sea_orm::database=error,\
            sea_orm_migration=warn",
        base_level
    ))
}
