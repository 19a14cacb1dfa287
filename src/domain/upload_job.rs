// ==========================================
// 通用数据交换引擎 - 上传任务实体
// ==========================================
// 职责: 描述一次异步批量上传的持久化状态
// 状态机: Pending → Processing → {Success, Failed}
// 红线: 任务完成后保留为审计记录,从不自动删除
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

// ==========================================
// UploadStatus - 任务状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    Pending,    // 已创建,等待入队
    Processing, // 工作者处理中
    Failed,     // 管道无法运行（文件不可读/模式无法解析）
    Success,    // 处理完成（行级失败记录在报告中,不影响任务状态）
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Failed => "FAILED",
            Self::Success => "SUCCESS",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "FAILED" => Some(Self::Failed),
            "SUCCESS" => Some(Self::Success),
            _ => None,
        }
    }
}

// ==========================================
// FieldMapping - 列名到字段的映射
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub column_name: String, // 电子表格原始列名
    pub field_name: String,  // 目标扁平字段名（或控制动作,如 SKIP）
}

impl FieldMapping {
    pub fn new(column_name: &str, field_name: &str) -> Self {
        Self {
            column_name: column_name.to_string(),
            field_name: field_name.to_string(),
        }
    }
}

// ==========================================
// UploadJob - 上传任务
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadJob {
    // ===== 主键 =====
    pub job_id: String, // 任务标识（UUID）

    // ===== 任务输入 =====
    pub schema_name: String,                // 目标模式引用
    pub file_path: PathBuf,                 // 源文件路径
    pub field_mappings: Vec<FieldMapping>,  // 自定义列映射（有序）
    pub notify_email: Option<String>,       // 完成通知地址

    // ===== 处理状态 =====
    pub status: UploadStatus,
    pub report_path: Option<PathBuf>,                 // 结果报告（完成时写入）
    pub processing_started_at: Option<DateTime<Utc>>, // 处理开始时间（滞留检测依据）

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadJob {
    /// 创建新任务（初始状态 Pending）
    pub fn new(schema_name: &str, file_path: impl AsRef<Path>) -> Self {
        let now = Utc::now();

        Self {
            job_id: Uuid::new_v4().to_string(),
            schema_name: schema_name.to_string(),
            file_path: file_path.as_ref().to_path_buf(),
            field_mappings: Vec::new(),
            notify_email: None,
            status: UploadStatus::Pending,
            report_path: None,
            processing_started_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_notify_email(mut self, email: &str) -> Self {
        self.notify_email = Some(email.to_string());
        self
    }

    /// 追加列映射（列名存在性校验由任务服务完成）
    pub fn push_mapping(&mut self, column_name: &str, field_name: &str) {
        self.field_mappings
            .push(FieldMapping::new(column_name, field_name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            UploadStatus::Pending,
            UploadStatus::Processing,
            UploadStatus::Failed,
            UploadStatus::Success,
        ] {
            assert_eq!(UploadStatus::parse(status.as_str()), Some(status));
        }

        assert_eq!(UploadStatus::parse("UNKNOWN"), None);
    }

    #[test]
    fn test_new_job_defaults() {
        let job = UploadJob::new("member", "/tmp/members.csv");

        assert_eq!(job.status, UploadStatus::Pending);
        assert!(job.field_mappings.is_empty());
        assert!(job.report_path.is_none());
        assert!(job.processing_started_at.is_none());
        assert!(!job.job_id.is_empty());
    }

    #[test]
    fn test_push_mapping_preserves_order() {
        let mut job = UploadJob::new("member", "/tmp/members.csv");
        job.push_mapping("Tag", "tags[n].label");
        job.push_mapping("Full Name", "name");

        assert_eq!(job.field_mappings.len(), 2);
        assert_eq!(job.field_mappings[0].column_name, "Tag");
        assert_eq!(job.field_mappings[1].field_name, "name");
    }
}
