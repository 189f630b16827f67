//! 视频源实体定义

use sea_orm::entity::prelude::*;
use sea_orm::ActiveModelBehavior;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Default, Serialize, Deserialize)]
#[sea_orm(table_name = "source")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// 视频源名称，唯一（SQLite BINARY 排序规则，区分大小写）
    #[sea_orm(unique)]
    pub name: String,
    /// 图标引用，通常是 data URI
    pub image: Option<String>,
    /// 是否出现在"启用的视频源"视图中
    pub active: bool,
    /// 展示顺序，静止状态下所有视频源的 order 恰好覆盖 0..N-1
    pub order: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

// 以下结构体不作为SeaORM实体，仅用于视频源的增改请求

/// 待添加的视频源
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewSource {
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// 重新排序时单个视频源的目标位置
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOrder {
    pub id: i32,
    pub order: i32,
}

/// 单个视频源的启用状态变更
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveStateChange {
    pub id: i32,
    pub active: bool,
}
