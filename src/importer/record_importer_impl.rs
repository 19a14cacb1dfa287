// ==========================================
// 通用数据交换引擎 - 上传管道实现
// ==========================================
// 职责: 整合上传流程,从文件到记录存储
// 流程: 解析 → 表头映射 → 归一化 → unflatten → 校验 → 创建或更新 → 汇总
// 约定: 单行失败只进入失败明细,绝不终止批次
// ==========================================

use crate::domain::record::{FlatRecord, RowFailure, StoredRecord, StructuredRecord, UploadOutcome};
use crate::domain::schema::RecordSchema;
use crate::domain::upload_job::{FieldMapping, UploadJob};
use crate::engine::classifier::SchemaClassifier;
use crate::engine::flatten::FlatConverter;
use crate::engine::header_resolver::HeaderResolver;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::record_importer_trait::{FileParser, RecordImporter};
use crate::importer::validator::{is_empty_value, RowValidator};
use crate::repository::error::RepositoryError;
use crate::repository::record_store::RecordStore;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// RecordImporterImpl - 上传管道
// ==========================================
pub struct RecordImporterImpl<S>
where
    S: RecordStore,
{
    // 核心算法组件
    classifier: SchemaClassifier,

    // 记录存储
    store: S,

    // 文件解析器
    file_parser: Box<dyn FileParser>,
}

impl<S> RecordImporterImpl<S>
where
    S: RecordStore,
{
    /// 创建上传管道
    ///
    /// # 参数
    /// - schema: 目标记录模式
    /// - store: 记录存储
    pub fn new(schema: &RecordSchema, store: S) -> Self {
        Self {
            classifier: SchemaClassifier::new(schema),
            store,
            file_parser: Box::new(UniversalFileParser),
        }
    }

    /// 替换文件解析器（测试或单一格式场景）
    pub fn with_file_parser(mut self, file_parser: Box<dyn FileParser>) -> Self {
        self.file_parser = file_parser;
        self
    }

    pub fn classifier(&self) -> &SchemaClassifier {
        &self.classifier
    }

    /// 单条候选记录的创建或更新
    ///
    /// 取候选中非空的唯一字段值做析取匹配:
    /// 命中则就地更新,未命中或无可用唯一字段则创建。
    async fn create_or_update(
        &self,
        cleaned: StructuredRecord,
    ) -> Result<StoredRecord, RepositoryError> {
        let schema_name = self.classifier.schema().name.clone();

        let mut filters: Vec<(String, Value)> = Vec::new();
        for field in self.classifier.unique_fields() {
            if let Some(value) = cleaned.get(&field) {
                if !is_empty_value(value) {
                    filters.push((field, value.clone()));
                }
            }
        }

        if !filters.is_empty() {
            if let Some(existing) = self.store.find_matching(&schema_name, &filters).await? {
                return self.store.update(&existing, cleaned).await;
            }
        }

        self.store.create(&schema_name, cleaned).await
    }
}

#[async_trait::async_trait]
impl<S> RecordImporter for RecordImporterImpl<S>
where
    S: RecordStore,
{
    #[instrument(skip(self, file_path, mappings), fields(batch_id))]
    async fn upload_from_file(
        &self,
        file_path: &Path,
        mappings: &[FieldMapping],
    ) -> ImportResult<UploadOutcome> {
        let batch_id = Uuid::new_v4().to_string();
        info!(
            batch_id = %batch_id,
            file_path = %file_path.display(),
            schema = %self.classifier.schema().name,
            "开始导入记录"
        );

        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let table = self.file_parser.parse_to_raw_table(file_path).map_err(|e| {
            error!(error = %e, "文件解析失败");
            e
        })?;
        let total_rows = table.rows.len();
        info!(total_rows = total_rows, "文件解析完成");

        // === 步骤 2: 表头映射解析 ===
        debug!("步骤 2: 表头映射解析");
        let resolver = HeaderResolver::new(&self.classifier);
        let effective_mappings = if mappings.is_empty() {
            resolver.auto_guess(&table.headers)
        } else {
            mappings.to_vec()
        };
        let renames = resolver.resolve(&effective_mappings);
        debug!(renames = renames.len(), "表头映射解析完成");

        // === 步骤 3-7: 逐行处理 ===
        let converter = FlatConverter::new(&self.classifier);
        let validator = RowValidator::new(&self.classifier);

        let mut outcome = UploadOutcome {
            total_rows,
            ..Default::default()
        };

        for row in table.rows {
            let row_number = row.row_number;
            let mut cells = row.cells;

            // 应用列重命名（引用不存在列的陈旧映射自然落空）
            for (old_name, new_name) in &renames {
                if let Some(value) = cells.remove(old_name) {
                    cells.insert(new_name.clone(), value);
                }
            }

            // 归一化: 标量列表拆分,空串转缺失
            // 未知列此处保留,由校验阶段静默丢弃（带下标的标量列表列也经由 unflatten 归位）
            let mut flat = FlatRecord::new();
            for (key, raw) in cells {
                let write_many = self
                    .classifier
                    .descriptor(&key)
                    .map(|d| d.write_many())
                    .unwrap_or(false);

                if write_many {
                    let items: Vec<Value> = raw
                        .split(',')
                        .map(str::trim)
                        .filter(|segment| !segment.is_empty())
                        .map(|segment| Value::String(segment.to_string()))
                        .collect();
                    flat.insert(key, Value::Array(items));
                } else if raw.is_empty() {
                    continue;
                } else {
                    flat.insert(key, Value::String(raw));
                }
            }

            // 候选记录构造,字符串值去首尾空白
            let mut candidate = converter.unflatten(&flat);
            for (_key, value) in candidate.iter_mut() {
                trim_string_values(value);
            }

            // 校验与类型转换
            let (cleaned, errors) = validator.validate(&candidate);
            if !errors.is_empty() {
                warn!(row_number = row_number, errors = errors.len(), "行校验失败");
                outcome.failures.push(RowFailure {
                    row_number,
                    data: flat,
                    errors,
                });
                continue;
            }

            // 创建或更新
            match self.create_or_update(cleaned).await {
                Ok(stored) => outcome.successes.push(stored.data),
                Err(e) => {
                    warn!(row_number = row_number, error = %e, "行落库失败");
                    let mut errors = BTreeMap::new();
                    errors.insert("__all__".to_string(), e.to_string());
                    outcome.failures.push(RowFailure {
                        row_number,
                        data: flat,
                        errors,
                    });
                }
            }
        }

        info!(
            batch_id = %batch_id,
            total = outcome.total_rows,
            success = outcome.success_count(),
            failed = outcome.failure_count(),
            "记录导入完成"
        );

        Ok(outcome)
    }

    async fn upload_from_job(&self, job: &UploadJob) -> ImportResult<UploadOutcome> {
        if job.schema_name != self.classifier.schema().name {
            return Err(ImportError::UnknownSchema(job.schema_name.clone()));
        }

        self.upload_from_file(&job.file_path, &job.field_mappings)
            .await
    }

    /// 批量导入多个文件（并发执行）
    async fn upload_many(&self, file_paths: Vec<PathBuf>) -> Vec<Result<UploadOutcome, String>> {
        use futures::future::join_all;

        info!(count = file_paths.len(), "开始批量导入文件");

        let import_tasks = file_paths.into_iter().map(|path| async move {
            match self.upload_from_file(&path, &[]).await {
                Ok(outcome) => {
                    info!(
                        file = %path.display(),
                        success = outcome.success_count(),
                        "文件导入成功"
                    );
                    Ok(outcome)
                }
                Err(e) => {
                    error!(file = %path.display(), error = %e, "文件导入失败");
                    Err(format!("文件 {} 导入失败: {}", path.display(), e))
                }
            }
        });

        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );

        results
    }
}

/// 递归去除字符串值的首尾空白
fn trim_string_values(value: &mut Value) {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.len() != text.len() {
                *value = Value::String(trimmed.to_string());
            }
        }
        Value::Array(items) => {
            for item in items {
                trim_string_values(item);
            }
        }
        Value::Object(nested) => {
            for (_key, nested_value) in nested.iter_mut() {
                trim_string_values(nested_value);
            }
        }
        _ => {}
    }
}
