use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// 视频源管理的错误类型
///
/// 所有操作统一返回 `Result<_, SourceError>`，调用方据此展示对应的提示
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("视频源「{0}」已存在")]
    DuplicateName(String),
    #[error("视频源 {0} 不存在")]
    NotFound(i32),
    #[error("视频源名称不能为空")]
    EmptyName,
    #[error("视频源顺序无效: {0}")]
    InvalidOrder(String),
    #[error("数据库操作失败: {0}")]
    Persistence(#[from] DbErr),
}

impl SourceError {
    pub fn is_duplicate_name(&self) -> bool {
        matches!(self, SourceError::DuplicateName(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }

    /// 将插入时的数据库错误转换为领域错误，唯一约束冲突即名称重复
    pub(crate) fn from_insert(err: DbErr, name: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => SourceError::DuplicateName(name.to_string()),
            _ => SourceError::Persistence(err),
        }
    }
}
