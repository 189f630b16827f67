//! 视频源表的持久化适配层
//!
//! 所有函数都接受任意 [`ConnectionTrait`]，既可以直接作用于连接池，
//! 也可以放在 [`sea_orm::DatabaseTransaction`] 中组合成一个原子操作

use std::collections::HashSet;

use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::debug;
use watchlist_entity::entities::source::{self, NewSource};

use crate::error::SourceError;

/// 读取全部视频源，按 order 升序（order 相同按 id）
pub async fn read_all<C: ConnectionTrait>(conn: &C) -> Result<Vec<source::Model>, SourceError> {
    Ok(source::Entity::find()
        .order_by_asc(source::Column::Order)
        .order_by_asc(source::Column::Id)
        .all(conn)
        .await?)
}

pub async fn read_by_id<C: ConnectionTrait>(conn: &C, id: i32) -> Result<source::Model, SourceError> {
    source::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(SourceError::NotFound(id))
}

/// 插入新的视频源，返回分配的 id
///
/// 名称唯一性由数据库的唯一索引保证，冲突时返回 [`SourceError::DuplicateName`]
pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    candidate: &NewSource,
    order: i32,
    active: bool,
) -> Result<i32, SourceError> {
    let model = source::ActiveModel {
        id: NotSet,
        name: Set(candidate.name.clone()),
        image: Set(candidate.image.clone()),
        active: Set(active),
        order: Set(order),
    };
    let res = source::Entity::insert(model)
        .exec(conn)
        .await
        .map_err(|e| SourceError::from_insert(e, &candidate.name))?;
    debug!("插入视频源「{}」，id: {}", candidate.name, res.last_insert_id);
    Ok(res.last_insert_id)
}

/// 单条语句中批量写入的最大行数，避免超出 SQLite 的绑定变量上限
const UPSERT_CHUNK_SIZE: usize = 100;
const DELETE_CHUNK_SIZE: usize = 500;

/// 按 id 批量写入视频源的全部字段，行数较多时分多条语句执行
pub async fn bulk_upsert<C: ConnectionTrait>(conn: &C, records: &[source::Model]) -> Result<(), SourceError> {
    for chunk in records.chunks(UPSERT_CHUNK_SIZE) {
        let models = chunk.iter().map(|record| source::ActiveModel {
            id: Set(record.id),
            name: Set(record.name.clone()),
            image: Set(record.image.clone()),
            active: Set(record.active),
            order: Set(record.order),
        });
        source::Entity::insert_many(models)
            .on_conflict(
                OnConflict::column(source::Column::Id)
                    .update_columns([
                        source::Column::Name,
                        source::Column::Image,
                        source::Column::Active,
                        source::Column::Order,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
    }
    if !records.is_empty() {
        debug!("批量写入 {} 个视频源", records.len());
    }
    Ok(())
}

/// 将所有视频源的 order 整体平移，返回受影响的行数
pub async fn shift_orders<C: ConnectionTrait>(conn: &C, delta: i32) -> Result<u64, SourceError> {
    let res = source::Entity::update_many()
        .col_expr(source::Column::Order, Expr::col(source::Column::Order).add(delta))
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}

pub async fn delete<C: ConnectionTrait>(conn: &C, id: i32) -> Result<(), SourceError> {
    let res = source::Entity::delete_by_id(id).exec(conn).await?;
    if res.rows_affected == 0 {
        return Err(SourceError::NotFound(id));
    }
    Ok(())
}

/// 批量删除，返回实际删除的行数
pub async fn bulk_delete<C: ConnectionTrait>(conn: &C, ids: &[i32]) -> Result<u64, SourceError> {
    let mut deleted = 0;
    for chunk in ids.chunks(DELETE_CHUNK_SIZE) {
        let res = source::Entity::delete_many()
            .filter(source::Column::Id.is_in(chunk.iter().copied()))
            .exec(conn)
            .await?;
        deleted += res.rows_affected;
    }
    Ok(deleted)
}

pub async fn clear<C: ConnectionTrait>(conn: &C) -> Result<u64, SourceError> {
    let res = source::Entity::delete_many().exec(conn).await?;
    Ok(res.rows_affected)
}

/// 写入默认视频源
///
/// 名称按字节序（与 SQLite 的 BINARY 排序规则一致）排序后依次分配 order，
/// 重复的名称只保留一个
pub async fn populate<C: ConnectionTrait>(conn: &C, names: &[String], active: bool) -> Result<usize, SourceError> {
    let mut seen = HashSet::new();
    let mut names = names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty() && seen.insert(*name))
        .collect::<Vec<_>>();
    names.sort_unstable();
    for (order, name) in names.iter().enumerate() {
        insert(conn, &NewSource::new(*name), order as i32, active).await?;
    }
    Ok(names.len())
}
