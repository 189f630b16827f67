//! 视频源集合管理器
//!
//! 负责维护视频源的名称唯一与顺序连续，并在每次修改成功后重新读取数据库，
//! 向订阅者发布"全部视频源"与"启用的视频源"两个视图。
//!
//! 每个修改操作的流程一致：等待初始化屏障 → 获取写锁 → 在同一个事务中读取、计算、写入并重新读取 →
//! 提交 → 发布。写锁保证修改串行执行，事务保证中途失败时不会留下不连续的 order。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use watchlist_entity::entities::source::{self, ActiveStateChange, NewSource, SourceOrder};

use crate::error::SourceError;
use crate::store::source_table;
use crate::utils::barrier::InitBarrier;
use crate::utils::broadcast::{SourceList, SourceSnapshot, SourceViews, Subscription};

pub struct SourceManager {
    db: Arc<DatabaseConnection>,
    ready: InitBarrier,
    views: SourceViews,
    write_lock: Mutex<()>,
}

impl SourceManager {
    /// 创建管理器，需要调用 [`SourceManager::load`] 完成初始加载后才能执行修改操作
    pub fn new(db: Arc<DatabaseConnection>) -> Arc<Self> {
        Arc::new(Self {
            db,
            ready: InitBarrier::new(),
            views: SourceViews::new(),
            write_lock: Mutex::new(()),
        })
    }

    /// 创建管理器并在后台执行初始加载
    pub fn spawn(db: Arc<DatabaseConnection>) -> Arc<Self> {
        let manager = Self::new(db);
        let loader = manager.clone();
        tokio::spawn(async move {
            if let Err(e) = loader.load().await {
                error!("初始加载视频源失败，修改操作将一直等待: {}", e);
            }
        });
        manager
    }

    /// 首次全量读取视频源并发布视图，完成后放行所有修改操作
    pub async fn load(&self) -> Result<(), SourceError> {
        let _guard = self.write_lock.lock().await;
        self.reload().await?;
        if self.ready.signal() {
            info!("视频源初始加载完成，共 {} 个", self.views.all().len());
        }
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_signaled()
    }

    pub fn all_sources(&self) -> SourceList {
        self.views.all()
    }

    pub fn active_sources(&self) -> SourceList {
        self.views.active()
    }

    /// 同时读取两个视图，两者保证来自同一次发布
    pub fn snapshot(&self) -> SourceSnapshot {
        self.views.snapshot()
    }

    pub fn subscribe_all(&self) -> Subscription<SourceList> {
        self.views.subscribe_all()
    }

    pub fn subscribe_active(&self) -> Subscription<SourceList> {
        self.views.subscribe_active()
    }

    /// 添加视频源，新视频源启用并排在最前面，其余视频源顺序依次后移
    pub async fn add_source(&self, candidate: NewSource) -> Result<i32, SourceError> {
        if candidate.name.trim().is_empty() {
            return Err(SourceError::EmptyName);
        }
        self.ready.wait().await;
        let _guard = self.write_lock.lock().await;

        let txn = self.db.begin().await?;
        source_table::shift_orders(&txn, 1).await?;
        let id = match source_table::insert(&txn, &candidate, 0, true).await {
            Ok(id) => id,
            Err(e) => {
                // 事务未提交，丢弃时回滚之前的顺序调整
                if e.is_duplicate_name() {
                    warn!("视频源「{}」已存在，取消添加", candidate.name);
                }
                return Err(e);
            }
        };
        self.commit_and_publish(txn).await?;
        info!("添加视频源「{}」成功，id: {}", candidate.name, id);
        Ok(id)
    }

    pub async fn remove_source(&self, id: i32) -> Result<(), SourceError> {
        self.remove_sources(&[id]).await
    }

    /// 删除视频源，剩余视频源按原有相对顺序重新编号为 0..N-1
    ///
    /// 任一 id 不存在时返回 [`SourceError::NotFound`]，不会删除任何视频源
    pub async fn remove_sources(&self, ids: &[i32]) -> Result<(), SourceError> {
        self.ready.wait().await;
        let _guard = self.write_lock.lock().await;

        let targets = ids.iter().copied().collect::<HashSet<_>>();
        let txn = self.db.begin().await?;
        let current = source_table::read_all(&txn).await?;
        let existing = current.iter().map(|s| s.id).collect::<HashSet<_>>();
        if let Some(missing) = ids.iter().find(|id| !existing.contains(id)) {
            return Err(SourceError::NotFound(*missing));
        }

        let deleted = source_table::bulk_delete(&txn, &targets.iter().copied().collect::<Vec<_>>()).await?;
        let recompacted = current
            .into_iter()
            .filter(|s| !targets.contains(&s.id))
            .enumerate()
            .filter_map(|(order, mut s)| {
                let order = order as i32;
                (s.order != order).then(|| {
                    s.order = order;
                    s
                })
            })
            .collect::<Vec<_>>();
        source_table::bulk_upsert(&txn, &recompacted).await?;
        self.commit_and_publish(txn).await?;
        info!("删除 {} 个视频源，重新编号 {} 个", deleted, recompacted.len());
        Ok(())
    }

    pub async fn change_active_state(&self, id: i32, active: bool) -> Result<(), SourceError> {
        self.change_active_states(&[ActiveStateChange { id, active }]).await
    }

    /// 批量修改启用状态，不影响顺序；设置为当前值视为成功
    pub async fn change_active_states(&self, changes: &[ActiveStateChange]) -> Result<(), SourceError> {
        self.ready.wait().await;
        let _guard = self.write_lock.lock().await;

        let txn = self.db.begin().await?;
        let mut current = source_table::read_all(&txn)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect::<HashMap<_, _>>();
        let mut touched = HashSet::new();
        for change in changes {
            let source = current.get_mut(&change.id).ok_or(SourceError::NotFound(change.id))?;
            source.active = change.active;
            touched.insert(change.id);
        }
        let updated = current
            .into_values()
            .filter(|s| touched.contains(&s.id))
            .collect::<Vec<_>>();
        source_table::bulk_upsert(&txn, &updated).await?;
        self.commit_and_publish(txn).await?;
        debug!("修改 {} 个视频源的启用状态", updated.len());
        Ok(())
    }

    /// 按调用方给出的 order 重新排序
    ///
    /// 应用后全部视频源的 order 必须恰好覆盖 0..N-1，否则返回 [`SourceError::InvalidOrder`] 且不做修改
    pub async fn reorder_sources(&self, orders: &[SourceOrder]) -> Result<(), SourceError> {
        self.ready.wait().await;
        let _guard = self.write_lock.lock().await;

        let txn = self.db.begin().await?;
        let mut current = source_table::read_all(&txn).await?;
        let positions = current
            .iter()
            .enumerate()
            .map(|(index, s)| (s.id, index))
            .collect::<HashMap<_, _>>();
        let mut targets = HashSet::new();
        for item in orders {
            let index = *positions.get(&item.id).ok_or(SourceError::NotFound(item.id))?;
            current[index].order = item.order;
            targets.insert(item.id);
        }
        check_dense(&current)?;

        let updated = current
            .into_iter()
            .filter(|s| targets.contains(&s.id))
            .collect::<Vec<_>>();
        source_table::bulk_upsert(&txn, &updated).await?;
        self.commit_and_publish(txn).await?;
        debug!("重新排序 {} 个视频源", updated.len());
        Ok(())
    }

    /// 在事务内读取修改后的整张表，提交成功后再发布
    ///
    /// 返回错误时修改一定没有生效，视图也不会变化
    async fn commit_and_publish(&self, txn: DatabaseTransaction) -> Result<(), SourceError> {
        let sources = source_table::read_all(&txn).await?;
        txn.commit().await?;
        self.views.publish(sources);
        Ok(())
    }

    /// 重新读取整张表并发布视图，不使用内存中的增量结果
    async fn reload(&self) -> Result<(), SourceError> {
        let sources = source_table::read_all(self.db.as_ref()).await?;
        self.views.publish(sources);
        Ok(())
    }
}

/// 检查 order 是否恰好覆盖 0..N-1
fn check_dense(sources: &[source::Model]) -> Result<(), SourceError> {
    let mut orders = sources.iter().map(|s| s.order).collect::<Vec<_>>();
    orders.sort_unstable();
    match orders.iter().enumerate().find(|(expected, order)| **order != *expected as i32) {
        Some((expected, order)) => Err(SourceError::InvalidOrder(format!(
            "排序后的 order 应覆盖 0..{}，缺少 {}（遇到 {}）",
            orders.len(),
            expected,
            order
        ))),
        None => Ok(()),
    }
}
