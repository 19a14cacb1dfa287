// ==========================================
// 通用数据交换引擎 - 上传结果报告
// ==========================================
// 格式: 双工作表 XLSX
// - "Successful": 成功行的扁平形态
// - "Failed": 尝试导入的行数据 + errors 列（字段→错误 JSON）
// ==========================================

use crate::domain::record::{FlatRecord, UploadOutcome};
use crate::engine::classifier::SchemaClassifier;
use crate::engine::flatten::FlatConverter;
use crate::exporter::csv_exporter::{cell_text, flat_header_union};
use crate::exporter::error::ExportResult;
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::Path;
use tracing::info;

/// 生成双工作表上传报告
pub fn write_report(
    outcome: &UploadOutcome,
    classifier: &SchemaClassifier,
    path: &Path,
) -> ExportResult<()> {
    let converter = FlatConverter::new(classifier);
    let mut workbook = Workbook::new();

    // Successful 工作表
    let success_rows: Vec<FlatRecord> = outcome
        .successes
        .iter()
        .map(|record| converter.flatten(record))
        .collect();

    let mut success_sheet = Worksheet::new();
    success_sheet.set_name("Successful")?;
    write_sheet(&mut success_sheet, &success_rows, None)?;
    workbook.push_worksheet(success_sheet);

    // Failed 工作表（附 errors 列）
    let failed_rows: Vec<FlatRecord> = outcome
        .failures
        .iter()
        .map(|failure| failure.data.clone())
        .collect();
    let error_cells: Vec<String> = outcome
        .failures
        .iter()
        .map(|failure| serde_json::to_string(&failure.errors).unwrap_or_default())
        .collect();

    let mut failed_sheet = Worksheet::new();
    failed_sheet.set_name("Failed")?;
    write_sheet(&mut failed_sheet, &failed_rows, Some(&error_cells))?;
    workbook.push_worksheet(failed_sheet);

    workbook.save(path)?;

    info!(
        success = outcome.success_count(),
        failed = outcome.failure_count(),
        file = %path.display(),
        "上传报告已生成"
    );

    Ok(())
}

/// 写出单个工作表: 首行表头,其后逐行数据
fn write_sheet(
    sheet: &mut Worksheet,
    rows: &[FlatRecord],
    error_cells: Option<&[String]>,
) -> ExportResult<()> {
    let headers = flat_header_union(rows);

    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, header)?;
    }
    if error_cells.is_some() {
        sheet.write_string(0, headers.len() as u16, "errors")?;
    }

    for (row_idx, row) in rows.iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;

        for (col, header) in headers.iter().enumerate() {
            if let Some(value) = row.get(header) {
                sheet.write_string(excel_row, col as u16, &cell_text(value))?;
            }
        }

        if let Some(cells) = error_cells {
            if let Some(errors_json) = cells.get(row_idx) {
                sheet.write_string(excel_row, headers.len() as u16, errors_json)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::RowFailure;
    use crate::domain::schema::{FieldSpec, RecordSchema, ScalarType};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn classifier() -> SchemaClassifier {
        let schema = RecordSchema::new(
            "member",
            vec![
                FieldSpec::scalar("name", ScalarType::String).required(),
                FieldSpec::scalar_list("tags"),
            ],
        );
        SchemaClassifier::new(&schema)
    }

    #[test]
    fn test_write_report_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("report.xlsx");

        let mut success = crate::domain::record::StructuredRecord::new();
        success.insert("name".to_string(), json!("Ada"));
        success.insert("tags".to_string(), json!(["red", "blue"]));

        let mut errors = BTreeMap::new();
        errors.insert("name".to_string(), "必填字段缺失".to_string());

        let outcome = UploadOutcome {
            total_rows: 2,
            successes: vec![success],
            failures: vec![RowFailure {
                row_number: 2,
                data: FlatRecord::new(),
                errors,
            }],
        };

        write_report(&outcome, &classifier(), &path).unwrap();

        assert!(path.is_file());
        assert!(path.metadata().unwrap().len() > 0);
    }

    #[test]
    fn test_write_report_empty_outcome() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("empty.xlsx");

        write_report(&UploadOutcome::default(), &classifier(), &path).unwrap();

        assert!(path.is_file());
    }
}
