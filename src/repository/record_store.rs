// ==========================================
// 通用数据交换引擎 - 记录存储接口
// ==========================================
// 职责: 定义记录存储的外部协作契约（不包含业务逻辑）
// 红线: 存储只做数据 CRUD,唯一匹配的取舍由调用方裁决
// ==========================================

use crate::domain::record::{StoredRecord, StructuredRecord};
use crate::repository::error::RepositoryError;
use async_trait::async_trait;
use serde_json::Value;

// ==========================================
// RecordStore Trait
// ==========================================
// 用途: 上传/下载管道的记录持久化边界
// 实现者: SqliteRecordStore（参考实现）,或任意外部存储适配
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 按唯一字段析取匹配查找既有记录
    ///
    /// # 参数
    /// - schema_name: 模式名
    /// - filters: (字段, 值) 列表,任一命中即匹配（逻辑 OR）
    ///
    /// # 返回
    /// - Ok(Some(record)): 命中（多条命中时取查询顺序首条）
    /// - Ok(None): 未命中或 filters 为空
    async fn find_matching(
        &self,
        schema_name: &str,
        filters: &[(String, Value)],
    ) -> Result<Option<StoredRecord>, RepositoryError>;

    /// 创建记录
    async fn create(
        &self,
        schema_name: &str,
        data: StructuredRecord,
    ) -> Result<StoredRecord, RepositoryError>;

    /// 就地更新记录（合并语义: 提供的键覆盖,未提供的键保留）
    async fn update(
        &self,
        existing: &StoredRecord,
        data: StructuredRecord,
    ) -> Result<StoredRecord, RepositoryError>;

    /// 列出模式下全部记录
    async fn list_all(&self, schema_name: &str) -> Result<Vec<StoredRecord>, RepositoryError>;

    /// 统计模式下记录数
    async fn count(&self, schema_name: &str) -> Result<usize, RepositoryError>;
}
