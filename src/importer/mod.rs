// ==========================================
// 通用数据交换引擎 - 导入层
// ==========================================
// 职责: 外部电子表格导入,生成并落库结构化记录
// 支持: CSV, Excel
// ==========================================

// 模块声明
pub mod error;
pub mod file_parser;
pub mod record_importer_impl;
pub mod record_importer_trait;
pub mod validator;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, RawRow, RawTable, UniversalFileParser};
pub use record_importer_impl::RecordImporterImpl;
pub use validator::RowValidator;

// 重导出 Trait 接口
pub use record_importer_trait::{FileParser, RecordImporter};
