// ==========================================
// 通用数据交换引擎 - 记录模式描述
// ==========================================
// 职责: 以静态声明方式描述记录的字段结构
// 红线: 分类/扁平化只依赖模式本身,不依赖任何记录实例
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// ==========================================
// ScalarType - 标量类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    String,   // 文本
    Integer,  // 整数
    Float,    // 浮点数
    Boolean,  // 布尔
    Date,     // 日期（YYYY-MM-DD）
    DateTime, // 日期时间（RFC3339 或 YYYY-MM-DD HH:MM:SS）
}

// ==========================================
// FieldKind - 字段形态
// ==========================================
// 嵌套层级: 仅支持一层子对象（与扁平化深度对齐）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    /// 普通标量字段
    Scalar(ScalarType),
    /// 标量列表字段（CSV 中逗号拼接，写入时逗号拆分）
    ScalarList,
    /// 单值嵌套对象（子字段必须为标量）
    Object(Vec<FieldSpec>),
    /// 嵌套对象列表（子字段必须为标量）
    ObjectList(Vec<FieldSpec>),
}

// ==========================================
// FieldSpec - 字段声明
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,     // 字段名（扁平键的组成部分）
    pub kind: FieldKind,  // 字段形态
    pub required: bool,   // 创建时必填
    pub unique: bool,     // 参与唯一匹配（创建或更新判定）
    pub readable: bool,   // 导出时可见
    pub writable: bool,   // 导入时可写
}

impl FieldSpec {
    /// 创建默认字段声明（可读可写、非必填、非唯一）
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            unique: false,
            readable: true,
            writable: true,
        }
    }

    /// 标量字段快捷构造
    pub fn scalar(name: &str, scalar_type: ScalarType) -> Self {
        Self::new(name, FieldKind::Scalar(scalar_type))
    }

    /// 标量列表字段快捷构造
    pub fn scalar_list(name: &str) -> Self {
        Self::new(name, FieldKind::ScalarList)
    }

    /// 单值嵌套对象字段快捷构造
    pub fn object(name: &str, sub_fields: Vec<FieldSpec>) -> Self {
        Self::new(name, FieldKind::Object(sub_fields))
    }

    /// 嵌套对象列表字段快捷构造
    pub fn object_list(name: &str, sub_fields: Vec<FieldSpec>) -> Self {
        Self::new(name, FieldKind::ObjectList(sub_fields))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// 只读字段（如主键、审计字段）: 导入时忽略
    pub fn readonly(mut self) -> Self {
        self.writable = false;
        self
    }

    /// 只写字段（如口令类字段）: 导出时跳过
    pub fn writeonly(mut self) -> Self {
        self.readable = false;
        self
    }
}

// ==========================================
// RecordSchema - 记录模式
// ==========================================
// 用途: 一种记录类型的完整字段声明（有序）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    pub name: String,           // 模式名（等同序列化器引用）
    pub fields: Vec<FieldSpec>, // 字段列表（声明顺序即导出列顺序）
}

impl RecordSchema {
    pub fn new(name: &str, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.to_string(),
            fields,
        }
    }

    /// 按名查找顶层字段
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ==========================================
// SchemaRegistry - 模式注册表
// ==========================================
// 用途: 按名称解析模式（异步任务只持有 schema_name）
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<RecordSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册模式（重名覆盖）
    pub fn register(&mut self, schema: RecordSchema) {
        self.schemas.insert(schema.name.clone(), Arc::new(schema));
    }

    /// 按名解析模式
    pub fn get(&self, name: &str) -> Option<Arc<RecordSchema>> {
        self.schemas.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.keys().cloned().collect();
        names.sort();
        names
    }
}
