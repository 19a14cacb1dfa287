// ==========================================
// 通用数据交换引擎 - 任务模块错误类型
// ==========================================

use crate::exporter::error::ExportError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 任务模块错误类型
#[derive(Error, Debug)]
pub enum JobError {
    #[error("任务不存在: {0}")]
    JobNotFound(String),

    #[error("模式无法解析: {0}")]
    UnknownSchema(String),

    #[error("列 {column} 不在可用列中: {available}")]
    ColumnNotFound { column: String, available: String },

    #[error("任务队列已关闭")]
    QueueClosed,

    #[error("通知发送失败: {0}")]
    Notify(String),

    #[error("仓储错误: {0}")]
    Repository(#[from] RepositoryError),

    #[error("导入错误: {0}")]
    Import(#[from] ImportError),

    #[error("导出错误: {0}")]
    Export(#[from] ExportError),
}

/// Result 类型别名
pub type JobResult<T> = Result<T, JobError>;
