// ==========================================
// 通用数据交换引擎 - 核心算法层
// ==========================================
// 职责: 模式分类、扁平化双向转换、表头映射解析
// 红线: 本层为纯计算,不做 I/O,不依赖存储
// ==========================================

pub mod classifier;
pub mod flatten;
pub mod header_resolver;

// 重导出核心类型
pub use classifier::SchemaClassifier;
pub use flatten::FlatConverter;
pub use header_resolver::{normalize_header, HeaderResolver, ACTION_SKIP, CONTROL_ACTIONS};
