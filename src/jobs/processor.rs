// ==========================================
// 通用数据交换引擎 - 异步任务处理器
// ==========================================
// 职责: 消费任务队列,端到端执行上传管道并生成报告
// 状态机: Pending → Processing → {Success, Failed}
// 约定:
// - 行级失败是报告内容,不是任务失败;Failed 仅用于管道无法运行
// - 报告/通知失败只告警,不回滚已落库的记录
// - 入队是显式函数调用,不经由任何隐式事件分发
// ==========================================

use crate::config::EngineConfig;
use crate::domain::schema::SchemaRegistry;
use crate::domain::upload_job::UploadStatus;
use crate::exporter::error::ExportError;
use crate::exporter::report::write_report;
use crate::importer::record_importer_impl::RecordImporterImpl;
use crate::importer::record_importer_trait::RecordImporter;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::notifier::Notifier;
use crate::repository::record_store::RecordStore;
use crate::repository::upload_job_repo::UploadJobRepository;
use chrono::Duration;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

// ==========================================
// UploadJobProcessor - 任务处理器
// ==========================================
// 一个工作者端到端处理一个任务;任务之间相互独立。
pub struct UploadJobProcessor {
    tx: mpsc::Sender<String>,
    worker: JoinHandle<()>,
}

impl UploadJobProcessor {
    /// 启动处理器
    ///
    /// 启动时先回收滞留任务（工作者崩溃遗留的 Processing）并重新入队,
    /// 然后开始消费队列。
    pub async fn start<S, J, N>(
        registry: Arc<SchemaRegistry>,
        store: S,
        jobs: Arc<J>,
        notifier: Arc<N>,
        config: EngineConfig,
    ) -> JobResult<Self>
    where
        S: RecordStore + Clone + 'static,
        J: UploadJobRepository + 'static,
        N: Notifier + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<String>(config.job_queue_depth);

        // 滞留任务回收
        let stale = jobs
            .requeue_stale(Duration::minutes(config.stale_job_minutes))
            .await?;
        for job in &stale {
            tx.send(job.job_id.clone())
                .await
                .map_err(|_| JobError::QueueClosed)?;
        }

        let worker = tokio::spawn(async move {
            while let Some(job_id) = rx.recv().await {
                if let Err(e) = process_job(
                    &registry,
                    &store,
                    jobs.as_ref(),
                    notifier.as_ref(),
                    &config,
                    &job_id,
                )
                .await
                {
                    error!(job_id = %job_id, error = %e, "任务处理失败");
                }
            }
        });

        Ok(Self { tx, worker })
    }

    /// 任务入队（显式触发）
    pub async fn enqueue(&self, job_id: &str) -> JobResult<()> {
        self.tx
            .send(job_id.to_string())
            .await
            .map_err(|_| JobError::QueueClosed)
    }

    /// 关闭队列并等待在途任务完成
    pub async fn shutdown(self) {
        let Self { tx, worker } = self;
        drop(tx);
        let _ = worker.await;
    }
}

/// 端到端处理单个任务
async fn process_job<S, J, N>(
    registry: &SchemaRegistry,
    store: &S,
    jobs: &J,
    notifier: &N,
    config: &EngineConfig,
    job_id: &str,
) -> JobResult<()>
where
    S: RecordStore + Clone,
    J: UploadJobRepository,
    N: Notifier,
{
    let job = jobs
        .get_job(job_id)
        .await?
        .ok_or_else(|| JobError::JobNotFound(job_id.to_string()))?;

    info!(job_id = %job_id, schema = %job.schema_name, "开始处理上传任务");
    jobs.update_status(job_id, UploadStatus::Processing).await?;

    // 模式无法解析 → 任务 Failed,不产生报告
    let Some(schema) = registry.get(&job.schema_name) else {
        jobs.update_status(job_id, UploadStatus::Failed).await?;
        return Err(JobError::UnknownSchema(job.schema_name.clone()));
    };

    let importer = RecordImporterImpl::new(&schema, store.clone());

    // 文件不可读等管道级错误 → 任务 Failed,不产生报告
    let outcome = match importer.upload_from_job(&job).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(job_id = %job_id, error = %e, "管道无法运行,任务置为 Failed");
            jobs.update_status(job_id, UploadStatus::Failed).await?;
            return Err(e.into());
        }
    };

    // 报告生成: 失败只告警,记录已落库,不影响任务结果
    let report_path = config
        .reports_dir()
        .join(format!("{}_{}.xlsx", job.schema_name, job.job_id));

    let mut attached_report = None;
    let report_result = config
        .ensure_dirs()
        .map_err(ExportError::from)
        .and_then(|_| write_report(&outcome, importer.classifier(), &report_path));

    match report_result {
        Ok(()) => match jobs.attach_report(job_id, &report_path).await {
            Ok(()) => attached_report = Some(report_path),
            Err(e) => warn!(job_id = %job_id, error = %e, "报告挂接失败"),
        },
        Err(e) => warn!(job_id = %job_id, error = %e, "报告生成失败"),
    }

    jobs.update_status(job_id, UploadStatus::Success).await?;

    // 完成通知: 失败只告警
    if let Some(email) = &job.notify_email {
        if let Err(e) = notifier
            .send_report(
                email,
                &job.schema_name,
                outcome.success_count(),
                outcome.failure_count(),
                attached_report.as_deref(),
            )
            .await
        {
            warn!(job_id = %job_id, error = %e, "完成通知发送失败");
        }
    }

    info!(
        job_id = %job_id,
        success = outcome.success_count(),
        failed = outcome.failure_count(),
        "上传任务处理完成"
    );

    Ok(())
}
