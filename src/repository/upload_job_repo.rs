// ==========================================
// 通用数据交换引擎 - 上传任务仓储
// ==========================================
// 职责: 上传任务的持久化访问（不含处理逻辑）
// 红线: 任务永不删除,保留为审计记录
// ==========================================

use crate::db;
use crate::domain::upload_job::{FieldMapping, UploadJob, UploadStatus};
use crate::repository::error::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

// ==========================================
// UploadJobRepository Trait
// ==========================================
#[async_trait]
pub trait UploadJobRepository: Send + Sync {
    /// 插入新任务
    async fn insert_job(&self, job: &UploadJob) -> Result<(), RepositoryError>;

    /// 按 ID 查询任务
    async fn get_job(&self, job_id: &str) -> Result<Option<UploadJob>, RepositoryError>;

    /// 更新任务状态
    ///
    /// 进入 Processing 时写入 processing_started_at（滞留检测依据）
    async fn update_status(
        &self,
        job_id: &str,
        status: UploadStatus,
    ) -> Result<(), RepositoryError>;

    /// 挂接结果报告
    async fn attach_report(&self, job_id: &str, report_path: &Path)
        -> Result<(), RepositoryError>;

    /// 持久化列映射
    async fn save_mappings(
        &self,
        job_id: &str,
        mappings: &[FieldMapping],
    ) -> Result<(), RepositoryError>;

    /// 最近任务列表（审计用,按创建时间倒序）
    async fn list_recent(&self, limit: usize) -> Result<Vec<UploadJob>, RepositoryError>;

    /// 回收滞留任务
    ///
    /// 处理中超过时限的任务视为工作者崩溃遗留,翻回 Pending 等待重新入队。
    ///
    /// # 返回
    /// - Ok(Vec<UploadJob>): 被回收的任务（状态已为 Pending）
    async fn requeue_stale(&self, older_than: Duration)
        -> Result<Vec<UploadJob>, RepositoryError>;
}

// ==========================================
// SqliteUploadJobRepository
// ==========================================
#[derive(Clone)]
pub struct SqliteUploadJobRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUploadJobRepository {
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

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Corrupted(format!("时间戳非法 {}: {}", raw, e)))
}

const JOB_COLUMNS: &str = "job_id, schema_name, file_path, status, field_mappings_json, \
     notify_email, report_path, processing_started_at, created_at, updated_at";

/// 原始行: 列读取留在 rusqlite 错误域,域类型解析在外层完成
struct JobRow {
    job_id: String,
    schema_name: String,
    file_path: String,
    status: String,
    field_mappings_json: String,
    notify_email: Option<String>,
    report_path: Option<String>,
    processing_started_at: Option<String>,
    created_at: String,
    updated_at: String,
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<JobRow> {
    Ok(JobRow {
        job_id: row.get(0)?,
        schema_name: row.get(1)?,
        file_path: row.get(2)?,
        status: row.get(3)?,
        field_mappings_json: row.get(4)?,
        notify_email: row.get(5)?,
        report_path: row.get(6)?,
        processing_started_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// 原始行 → UploadJob
fn hydrate_job(raw: JobRow) -> Result<UploadJob, RepositoryError> {
    let status = UploadStatus::parse(&raw.status)
        .ok_or_else(|| RepositoryError::Corrupted(format!("任务状态非法: {}", raw.status)))?;

    Ok(UploadJob {
        job_id: raw.job_id,
        schema_name: raw.schema_name,
        file_path: PathBuf::from(raw.file_path),
        field_mappings: serde_json::from_str(&raw.field_mappings_json)?,
        notify_email: raw.notify_email,
        status,
        report_path: raw.report_path.map(PathBuf::from),
        processing_started_at: raw
            .processing_started_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?,
        created_at: parse_timestamp(&raw.created_at)?,
        updated_at: parse_timestamp(&raw.updated_at)?,
    })
}

#[async_trait]
impl UploadJobRepository for SqliteUploadJobRepository {
    async fn insert_job(&self, job: &UploadJob) -> Result<(), RepositoryError> {
        let conn = self.lock_conn()?;

        let mappings_json = serde_json::to_string(&job.field_mappings)?;

        conn.execute(
            r#"
            INSERT INTO upload_job (
                job_id, schema_name, file_path, status, field_mappings_json,
                notify_email, report_path, processing_started_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            rusqlite::params![
                job.job_id,
                job.schema_name,
                job.file_path.to_string_lossy().to_string(),
                job.status.as_str(),
                mappings_json,
                job.notify_email,
                job.report_path.as_ref().map(|p| p.to_string_lossy().to_string()),
                job.processing_started_at.map(|t| t.to_rfc3339()),
                job.created_at.to_rfc3339(),
                job.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<UploadJob>, RepositoryError> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM upload_job WHERE job_id = ?1",
            JOB_COLUMNS
        ))?;

        let mut rows = stmt.query_map([job_id], job_from_row)?;

        match rows.next() {
            Some(row) => Ok(Some(hydrate_job(row?)?)),
            None => Ok(None),
        }
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: UploadStatus,
    ) -> Result<(), RepositoryError> {
        let conn = self.lock_conn()?;
        let now = Utc::now().to_rfc3339();

        let affected = if status == UploadStatus::Processing {
            conn.execute(
                "UPDATE upload_job SET status = ?1, processing_started_at = ?2, updated_at = ?2 \
                 WHERE job_id = ?3",
                rusqlite::params![status.as_str(), now, job_id],
            )?
        } else {
            conn.execute(
                "UPDATE upload_job SET status = ?1, updated_at = ?2 WHERE job_id = ?3",
                rusqlite::params![status.as_str(), now, job_id],
            )?
        };

        if affected == 0 {
            return Err(RepositoryError::NotFound(job_id.to_string()));
        }

        Ok(())
    }

    async fn attach_report(
        &self,
        job_id: &str,
        report_path: &Path,
    ) -> Result<(), RepositoryError> {
        let conn = self.lock_conn()?;
        let now = Utc::now().to_rfc3339();

        let affected = conn.execute(
            "UPDATE upload_job SET report_path = ?1, updated_at = ?2 WHERE job_id = ?3",
            rusqlite::params![report_path.to_string_lossy().to_string(), now, job_id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound(job_id.to_string()));
        }

        Ok(())
    }

    async fn save_mappings(
        &self,
        job_id: &str,
        mappings: &[FieldMapping],
    ) -> Result<(), RepositoryError> {
        let conn = self.lock_conn()?;
        let now = Utc::now().to_rfc3339();
        let mappings_json = serde_json::to_string(mappings)?;

        let affected = conn.execute(
            "UPDATE upload_job SET field_mappings_json = ?1, updated_at = ?2 WHERE job_id = ?3",
            rusqlite::params![mappings_json, now, job_id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound(job_id.to_string()));
        }

        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<UploadJob>, RepositoryError> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM upload_job ORDER BY created_at DESC LIMIT ?1",
            JOB_COLUMNS
        ))?;

        let rows = stmt.query_map([limit as i64], job_from_row)?;

        let mut jobs = Vec::new();
        for row in rows {
            jobs.push(hydrate_job(row?)?);
        }

        Ok(jobs)
    }

    async fn requeue_stale(
        &self,
        older_than: Duration,
    ) -> Result<Vec<UploadJob>, RepositoryError> {
        let conn = self.lock_conn()?;
        let cutoff = (Utc::now() - older_than).to_rfc3339();

        // 先捞出滞留任务,再逐个翻回 Pending
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM upload_job \
             WHERE status = 'PROCESSING' AND processing_started_at IS NOT NULL \
               AND processing_started_at < ?1 \
             ORDER BY processing_started_at",
            JOB_COLUMNS
        ))?;

        let rows = stmt.query_map([cutoff], job_from_row)?;

        let mut stale_jobs = Vec::new();
        for row in rows {
            stale_jobs.push(hydrate_job(row?)?);
        }
        drop(stmt);

        let now = Utc::now().to_rfc3339();
        for job in &mut stale_jobs {
            conn.execute(
                "UPDATE upload_job SET status = 'PENDING', processing_started_at = NULL, \
                 updated_at = ?1 WHERE job_id = ?2",
                rusqlite::params![now, job.job_id],
            )?;
            job.status = UploadStatus::Pending;
            job.processing_started_at = None;
        }

        if !stale_jobs.is_empty() {
            info!(count = stale_jobs.len(), "滞留任务已回收为 Pending");
        }

        Ok(stale_jobs)
    }
}
