// ==========================================
// 通用数据交换引擎 - 领域层
// ==========================================
// 职责: 定义模式描述、扁平字段描述符、记录值形态、上传任务实体
// 红线: 不含数据访问逻辑,不含文件解析逻辑
// ==========================================

pub mod flat_field;
pub mod record;
pub mod schema;
pub mod upload_job;

// 重导出核心类型
pub use flat_field::{
    generic_form, parse_list_key, FlatField, FlatFieldDescriptor, FlatListField, ListKeyParts,
};
pub use record::{FlatRecord, RowFailure, StoredRecord, StructuredRecord, UploadOutcome};
pub use schema::{FieldKind, FieldSpec, RecordSchema, ScalarType, SchemaRegistry};
pub use upload_job::{FieldMapping, UploadJob, UploadStatus};
