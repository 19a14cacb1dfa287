// ==========================================
// 通用数据交换引擎 - 下载管道实现
// ==========================================
// 职责: 记录集合 → 扁平表格 → CSV 文件;模板生成
// 约定: 表头取所有行扁平键的并集,形态不一的行对齐到同一张表
// ==========================================

use crate::config::EngineConfig;
use crate::domain::record::FlatRecord;
use crate::engine::classifier::SchemaClassifier;
use crate::engine::flatten::FlatConverter;
use crate::exporter::error::ExportResult;
use crate::repository::record_store::RecordStore;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

/// 模板字段范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFields {
    All,      // 全部可读字段
    Required, // 仅必填字段
    Writable, // 仅可写字段
}

// ==========================================
// CsvExporter - 下载管道
// ==========================================
pub struct CsvExporter<'a> {
    classifier: &'a SchemaClassifier,
    config: &'a EngineConfig,
}

impl<'a> CsvExporter<'a> {
    pub fn new(classifier: &'a SchemaClassifier, config: &'a EngineConfig) -> Self {
        Self { classifier, config }
    }

    /// 下载: 模式下全部记录写出为 CSV,返回文件路径
    pub async fn download_csv<S>(&self, store: &S) -> ExportResult<PathBuf>
    where
        S: RecordStore,
    {
        let schema_name = &self.classifier.schema().name;
        let records = store.list_all(schema_name).await?;

        let converter = FlatConverter::new(self.classifier);
        let flat_rows: Vec<FlatRecord> = records
            .iter()
            .map(|record| {
                let mut flat = converter.flatten(&record.data);
                // 只写字段不落入导出表
                flat.retain(|key, _| {
                    self.classifier
                        .descriptor(key)
                        .map(|d| d.readable())
                        .unwrap_or(true)
                });
                flat
            })
            .collect();

        let headers = flat_header_union(&flat_rows);

        self.config.ensure_dirs()?;
        let file_path = self.config.downloads_dir().join(format!(
            "{}_{}_{}.csv",
            schema_name,
            Utc::now().format("%Y%m%d_%H%M%S"),
            short_id()
        ));

        let mut writer = csv::Writer::from_path(&file_path)?;
        writer.write_record(&headers)?;

        for row in &flat_rows {
            let cells: Vec<String> = headers
                .iter()
                .map(|header| row.get(header).map(cell_text).unwrap_or_default())
                .collect();
            writer.write_record(&cells)?;
        }

        writer.flush()?;

        info!(
            schema = %schema_name,
            rows = flat_rows.len(),
            file = %file_path.display(),
            "记录下载完成"
        );

        Ok(file_path)
    }

    /// 生成上传模板（仅表头的 CSV）
    pub fn csv_template(&self, which: TemplateFields) -> ExportResult<PathBuf> {
        let headers = match which {
            TemplateFields::All => self.classifier.readable_fields(),
            TemplateFields::Required => self.classifier.required_fields(),
            TemplateFields::Writable => self.classifier.writable_fields(),
        };

        self.config.ensure_dirs()?;
        let file_path = self
            .config
            .templates_dir()
            .join(format!("{}_template.csv", self.classifier.schema().name));

        let mut writer = csv::Writer::from_path(&file_path)?;
        writer.write_record(&headers)?;
        writer.flush()?;

        Ok(file_path)
    }
}

/// 扁平行的表头并集（首次出现顺序）
pub(crate) fn flat_header_union(rows: &[FlatRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut headers = Vec::new();

    for row in rows {
        for key in row.keys() {
            if seen.insert(key.clone()) {
                headers.push(key.clone());
            }
        }
    }

    headers
}

/// 单元格文本: 字符串原样,null 空串,其余 JSON 文本
pub(crate) fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn short_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_header_union_first_seen_order() {
        let mut first = FlatRecord::new();
        first.insert("name".to_string(), json!("Ada"));
        first.insert("tags".to_string(), json!("red"));

        let mut second = FlatRecord::new();
        second.insert("name".to_string(), json!("Grace"));
        second.insert("address.city".to_string(), json!("Dallas"));

        let headers = flat_header_union(&[first, second]);

        assert_eq!(headers, vec!["name", "tags", "address.city"]);
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!("abc")), "abc");
        assert_eq!(cell_text(&json!(42)), "42");
        assert_eq!(cell_text(&json!(null)), "");
        assert_eq!(cell_text(&json!(true)), "true");
    }
}
