// ==========================================
// 通用数据交换引擎 - 上传任务服务
// ==========================================
// 职责: 任务创建与列映射维护
// 约定: 列映射在创建时校验列名存在;解析阶段对陈旧映射静默跳过
// ==========================================

use crate::domain::upload_job::UploadJob;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::record_importer_trait::FileParser;
use crate::jobs::error::{JobError, JobResult};
use crate::repository::upload_job_repo::UploadJobRepository;
use std::path::Path;
use tracing::info;

// ==========================================
// UploadJobService - 任务服务
// ==========================================
pub struct UploadJobService<J>
where
    J: UploadJobRepository,
{
    jobs: J,
}

impl<J> UploadJobService<J>
where
    J: UploadJobRepository,
{
    pub fn new(jobs: J) -> Self {
        Self { jobs }
    }

    pub fn repository(&self) -> &J {
        &self.jobs
    }

    /// 创建上传任务（初始状态 Pending）
    pub async fn create_job(
        &self,
        schema_name: &str,
        file_path: impl AsRef<Path>,
        notify_email: Option<&str>,
    ) -> JobResult<UploadJob> {
        let mut job = UploadJob::new(schema_name, file_path);
        if let Some(email) = notify_email {
            job.notify_email = Some(email.to_string());
        }

        self.jobs.insert_job(&job).await?;

        info!(job_id = %job.job_id, schema = %schema_name, "上传任务已创建");
        Ok(job)
    }

    /// 追加列映射并持久化
    ///
    /// 列名必须存在于任务源文件的表头中。
    pub async fn add_field_mapping(
        &self,
        job: &mut UploadJob,
        column_name: &str,
        field_name: &str,
    ) -> JobResult<()> {
        let table = UniversalFileParser.parse_to_raw_table(&job.file_path)?;

        if !table.headers.iter().any(|header| header == column_name) {
            return Err(JobError::ColumnNotFound {
                column: column_name.to_string(),
                available: table.headers.join(", "),
            });
        }

        job.push_mapping(column_name, field_name);
        self.jobs
            .save_mappings(&job.job_id, &job.field_mappings)
            .await?;

        Ok(())
    }

    /// 最近任务列表（审计用）
    pub async fn recent_jobs(&self, limit: usize) -> JobResult<Vec<UploadJob>> {
        Ok(self.jobs.list_recent(limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::upload_job_repo::SqliteUploadJobRepository;
    use std::io::Write;

    fn temp_csv(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    fn test_service() -> (tempfile::NamedTempFile, UploadJobService<SqliteUploadJobRepository>) {
        let db_file = tempfile::NamedTempFile::new().unwrap();
        let repo = SqliteUploadJobRepository::new(db_file.path().to_str().unwrap()).unwrap();
        (db_file, UploadJobService::new(repo))
    }

    #[tokio::test]
    async fn test_create_job_persists() {
        let (_db, service) = test_service();
        let csv = temp_csv(&["name", "Ada"]);

        let job = service
            .create_job("member", csv.path(), Some("ops@example.com"))
            .await
            .unwrap();

        let loaded = service
            .repository()
            .get_job(&job.job_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.notify_email.as_deref(), Some("ops@example.com"));
    }

    #[tokio::test]
    async fn test_add_field_mapping_validates_column() {
        let (_db, service) = test_service();
        let csv = temp_csv(&["Full Name,email", "Ada,a@example.com"]);

        let mut job = service.create_job("member", csv.path(), None).await.unwrap();

        service
            .add_field_mapping(&mut job, "Full Name", "name")
            .await
            .unwrap();

        let missing = service
            .add_field_mapping(&mut job, "Nickname", "name")
            .await;
        assert!(matches!(missing, Err(JobError::ColumnNotFound { .. })));

        let loaded = service
            .repository()
            .get_job(&job.job_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.field_mappings.len(), 1);
        assert_eq!(loaded.field_mappings[0].column_name, "Full Name");
    }
}
