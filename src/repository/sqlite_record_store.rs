// ==========================================
// 通用数据交换引擎 - SQLite 记录存储实现
// ==========================================
// 职责: 以 JSON 文档形态持久化结构化记录
// 匹配: json_extract 构造析取条件
// ==========================================

use crate::db;
use crate::domain::record::{StoredRecord, StructuredRecord};
use crate::repository::error::RepositoryError;
use crate::repository::record_store::RecordStore;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::warn;
use uuid::Uuid;

// ==========================================
// SqliteRecordStore
// ==========================================
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// 创建存储实例并初始化表结构
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, RepositoryError> {
        let conn = db::open_sqlite_connection(db_path)?;
        db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockPoisoned(e.to_string()))
    }
}

/// JSON 值 → SQL 绑定值
///
/// json_extract 对字符串返回去引号文本、整数返回 INTEGER、
/// 浮点返回 REAL、布尔返回 0/1,绑定值按相同口径转换。
fn json_to_sql_value(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::String(text) => rusqlite::types::Value::Text(text.clone()),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                rusqlite::types::Value::Integer(integer)
            } else {
                rusqlite::types::Value::Real(number.as_f64().unwrap_or(0.0))
            }
        }
        Value::Bool(flag) => rusqlite::types::Value::Integer(*flag as i64),
        other => rusqlite::types::Value::Text(other.to_string()),
    }
}

fn parse_doc(record_id: String, doc_json: &str) -> Result<StoredRecord, RepositoryError> {
    let data: StructuredRecord = serde_json::from_str(doc_json)
        .map_err(|e| RepositoryError::Corrupted(format!("记录 {} 文档非法: {}", record_id, e)))?;

    Ok(StoredRecord { record_id, data })
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn find_matching(
        &self,
        schema_name: &str,
        filters: &[(String, Value)],
    ) -> Result<Option<StoredRecord>, RepositoryError> {
        if filters.is_empty() {
            return Ok(None);
        }

        let conn = self.lock_conn()?;

        let mut sql = String::from(
            "SELECT record_id, doc_json FROM record_doc WHERE schema_name = ?1 AND (",
        );
        let mut params: Vec<rusqlite::types::Value> =
            vec![rusqlite::types::Value::Text(schema_name.to_string())];

        for (position, (field, value)) in filters.iter().enumerate() {
            if position > 0 {
                sql.push_str(" OR ");
            }
            sql.push_str(&format!(
                "json_extract(doc_json, '$.{}') = ?{}",
                field,
                position + 2
            ));
            params.push(json_to_sql_value(value));
        }

        // 取 2 条用于多命中告警,结果仍取首条
        sql.push_str(") ORDER BY created_at, record_id LIMIT 2");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut matched = Vec::new();
        for row in rows {
            matched.push(row?);
        }

        if matched.len() > 1 {
            warn!(
                schema = %schema_name,
                "唯一字段析取匹配命中多条记录,按查询顺序取首条"
            );
        }

        match matched.into_iter().next() {
            Some((record_id, doc_json)) => Ok(Some(parse_doc(record_id, &doc_json)?)),
            None => Ok(None),
        }
    }

    async fn create(
        &self,
        schema_name: &str,
        data: StructuredRecord,
    ) -> Result<StoredRecord, RepositoryError> {
        let conn = self.lock_conn()?;

        let record_id = Uuid::new_v4().to_string();
        let doc_json = serde_json::to_string(&data)?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO record_doc (record_id, schema_name, doc_json, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            rusqlite::params![record_id, schema_name, doc_json, now, now],
        )?;

        Ok(StoredRecord { record_id, data })
    }

    async fn update(
        &self,
        existing: &StoredRecord,
        data: StructuredRecord,
    ) -> Result<StoredRecord, RepositoryError> {
        let conn = self.lock_conn()?;

        // 合并语义: 提供的键覆盖,未提供的键保留
        let mut merged = existing.data.clone();
        for (key, value) in data {
            merged.insert(key, value);
        }

        let doc_json = serde_json::to_string(&merged)?;
        let now = Utc::now().to_rfc3339();

        let affected = conn.execute(
            "UPDATE record_doc SET doc_json = ?1, updated_at = ?2 WHERE record_id = ?3",
            rusqlite::params![doc_json, now, existing.record_id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound(existing.record_id.clone()));
        }

        Ok(StoredRecord {
            record_id: existing.record_id.clone(),
            data: merged,
        })
    }

    async fn list_all(&self, schema_name: &str) -> Result<Vec<StoredRecord>, RepositoryError> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT record_id, doc_json FROM record_doc
            WHERE schema_name = ?1
            ORDER BY created_at, record_id
            "#,
        )?;

        let rows = stmt.query_map([schema_name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (record_id, doc_json) = row?;
            records.push(parse_doc(record_id, &doc_json)?);
        }

        Ok(records)
    }

    async fn count(&self, schema_name: &str) -> Result<usize, RepositoryError> {
        let conn = self.lock_conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM record_doc WHERE schema_name = ?1",
            [schema_name],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }
}
