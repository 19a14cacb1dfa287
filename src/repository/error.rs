// ==========================================
// 通用数据交换引擎 - 仓储层错误类型
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("数据库错误: {0}")]
    Database(String),

    #[error("锁获取失败: {0}")]
    LockPoisoned(String),

    #[error("记录不存在: {0}")]
    NotFound(String),

    #[error("数据损坏: {0}")]
    Corrupted(String),

    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::Database(err.to_string())
    }
}
