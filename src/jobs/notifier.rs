// ==========================================
// 通用数据交换引擎 - 完成通知
// ==========================================
// 职责: 任务完成后携带成功/失败计数与报告附件发出通知
// 实现: SMTP 邮件 / tracing 日志（无外联环境）
// ==========================================

use crate::jobs::error::{JobError, JobResult};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::path::Path;
use tracing::info;

// ==========================================
// Notifier Trait
// ==========================================
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 发送上传完成通知
    ///
    /// # 参数
    /// - to: 通知地址
    /// - schema_name: 模式名（用于主题）
    /// - success_count / failure_count: 行级统计
    /// - report_path: 报告文件（存在时作为附件）
    async fn send_report(
        &self,
        to: &str,
        schema_name: &str,
        success_count: usize,
        failure_count: usize,
        report_path: Option<&Path>,
    ) -> JobResult<()>;
}

// ==========================================
// LogNotifier - 日志通知（默认/测试）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_report(
        &self,
        to: &str,
        schema_name: &str,
        success_count: usize,
        failure_count: usize,
        report_path: Option<&Path>,
    ) -> JobResult<()> {
        info!(
            to = %to,
            schema = %schema_name,
            success = success_count,
            failed = failure_count,
            report = report_path.map(|p| p.display().to_string()).unwrap_or_default(),
            "上传完成通知（日志模式）"
        );
        Ok(())
    }
}

// ==========================================
// EmailNotifier - SMTP 邮件通知
// ==========================================
pub struct EmailNotifier {
    smtp: SmtpTransport,
    from_address: String,
}

impl EmailNotifier {
    /// 创建 SMTP 通知器
    ///
    /// # 参数
    /// - relay: SMTP 服务器地址
    /// - username / password: 认证凭据
    /// - from_address: 发件人地址
    pub fn new(
        relay: &str,
        username: &str,
        password: &str,
        from_address: &str,
    ) -> JobResult<Self> {
        let creds = Credentials::new(username.to_string(), password.to_string());

        let smtp = SmtpTransport::relay(relay)
            .map_err(|e| JobError::Notify(e.to_string()))?
            .credentials(creds)
            .build();

        Ok(Self {
            smtp,
            from_address: from_address.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_report(
        &self,
        to: &str,
        schema_name: &str,
        success_count: usize,
        failure_count: usize,
        report_path: Option<&Path>,
    ) -> JobResult<()> {
        let subject = format!("{} 上传报告", schema_name);
        let body = format!(
            "{} 批量上传处理完成。\n成功处理: {} 行。\n处理失败: {} 行。",
            schema_name, success_count, failure_count
        );

        let builder = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e| JobError::Notify(format!("发件人地址非法: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| JobError::Notify(format!("收件人地址非法: {}", e)))?)
            .subject(subject);

        let email = match report_path {
            Some(path) => {
                let content =
                    std::fs::read(path).map_err(|e| JobError::Notify(e.to_string()))?;
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "report.xlsx".to_string());
                let content_type = ContentType::parse(
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                )
                .map_err(|e| JobError::Notify(e.to_string()))?;

                builder
                    .multipart(
                        MultiPart::mixed()
                            .singlepart(
                                SinglePart::builder()
                                    .header(ContentType::TEXT_PLAIN)
                                    .body(body),
                            )
                            .singlepart(Attachment::new(filename).body(content, content_type)),
                    )
                    .map_err(|e| JobError::Notify(e.to_string()))?
            }
            None => builder
                .body(body)
                .map_err(|e| JobError::Notify(e.to_string()))?,
        };

        self.smtp
            .send(&email)
            .map_err(|e| JobError::Notify(e.to_string()))?;

        Ok(())
    }
}
