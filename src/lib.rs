// ==========================================
// 通用数据交换引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 定位: 结构化记录与电子表格之间的批量双向数据交换
// - 嵌套/列表字段的无损扁平化与还原
// - 模糊表头映射的下标消歧
// - 异步上传任务与行级部分失败
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 模式与实体
pub mod domain;

// 引擎层 - 核心算法（分类/扁平化/表头解析）
pub mod engine;

// 导入层 - 上传管道
pub mod importer;

// 导出层 - 下载管道与报告
pub mod exporter;

// 数据仓储层 - 记录存储与任务仓储
pub mod repository;

// 任务层 - 异步处理
pub mod jobs;

// 配置层
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    FieldKind, FieldMapping, FieldSpec, FlatField, FlatFieldDescriptor, FlatListField,
    FlatRecord, RecordSchema, RowFailure, ScalarType, SchemaRegistry, StoredRecord,
    StructuredRecord, UploadJob, UploadOutcome, UploadStatus,
};

// 引擎
pub use engine::{FlatConverter, HeaderResolver, SchemaClassifier};

// 导入/导出
pub use exporter::{CsvExporter, ExportError, TemplateFields};
pub use importer::{
    CsvParser, ExcelParser, FileParser, ImportError, RecordImporter, RecordImporterImpl,
    UniversalFileParser,
};

// 仓储
pub use repository::{
    RecordStore, RepositoryError, SqliteRecordStore, SqliteUploadJobRepository,
    UploadJobRepository,
};

// 任务
pub use jobs::{
    EmailNotifier, JobError, JobResult, LogNotifier, Notifier, UploadJobProcessor,
    UploadJobService,
};

// 配置
pub use config::EngineConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "通用数据交换引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
