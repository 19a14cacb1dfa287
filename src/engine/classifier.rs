// ==========================================
// 通用数据交换引擎 - 模式分类器
// ==========================================
// 职责: 把记录模式展开为扁平字段描述符集合
// 保证: 分类是纯函数,只依赖模式,不依赖任何记录实例
// ==========================================

use crate::domain::flat_field::{FlatField, FlatFieldDescriptor, FlatListField};
use crate::domain::schema::{FieldKind, FieldSpec, RecordSchema};

// ==========================================
// SchemaClassifier - 模式分类器
// ==========================================
// 展开规则:
// - 标量字段 name          → 扁平键 name
// - 标量列表字段 tags       → 扁平键 tags（write_many）
// - 单值嵌套对象 addr{city} → 扁平键 addr.city
// - 嵌套对象列表 tags{label} → 通配键 tags[n].label（下标待表头解析分配）
#[derive(Debug, Clone)]
pub struct SchemaClassifier {
    schema: RecordSchema,
    flat_fields: Vec<FlatFieldDescriptor>,
}

impl SchemaClassifier {
    pub fn new(schema: &RecordSchema) -> Self {
        let mut flat_fields = Vec::new();

        for field in &schema.fields {
            match &field.kind {
                FieldKind::Scalar(_) => {
                    flat_fields.push(FlatFieldDescriptor::Plain(FlatField {
                        key: field.name.clone(),
                        required: field.required,
                        unique: field.unique,
                        readable: field.readable,
                        writable: field.writable,
                        write_many: false,
                    }));
                }
                FieldKind::ScalarList => {
                    flat_fields.push(FlatFieldDescriptor::Plain(FlatField {
                        key: field.name.clone(),
                        required: field.required,
                        unique: field.unique,
                        readable: field.readable,
                        writable: field.writable,
                        write_many: true,
                    }));
                }
                FieldKind::Object(sub_fields) => {
                    for sub in sub_fields {
                        flat_fields.push(FlatFieldDescriptor::Plain(FlatField {
                            key: format!("{}.{}", field.name, sub.name),
                            // 子字段必填以整体字段必填为前提
                            required: field.required && sub.required,
                            unique: sub.unique,
                            readable: field.readable && sub.readable,
                            writable: field.writable && sub.writable,
                            write_many: false,
                        }));
                    }
                }
                FieldKind::ObjectList(sub_fields) => {
                    for sub in sub_fields {
                        let key = format!("{}[n].{}", field.name, sub.name);

                        flat_fields.push(FlatFieldDescriptor::ListItem(FlatListField {
                            generic_key: key.clone(),
                            key,
                            parent_key: field.name.clone(),
                            index: None,
                            sub_key: Some(sub.name.clone()),
                            required: field.required && sub.required,
                            unique: sub.unique,
                            readable: field.readable && sub.readable,
                            writable: field.writable && sub.writable,
                        }));
                    }
                }
            }
        }

        Self {
            schema: schema.clone(),
            flat_fields,
        }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// 全部扁平字段描述符（模式声明顺序）
    pub fn flat_fields(&self) -> &[FlatFieldDescriptor] {
        &self.flat_fields
    }

    /// 按键查找描述符（列表项键按通配等价匹配）
    pub fn descriptor(&self, key: &str) -> Option<&FlatFieldDescriptor> {
        self.flat_fields.iter().find(|d| d.matches(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.descriptor(key).is_some()
    }

    /// 顶层字段声明查找
    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.schema.field(name)
    }

    /// 参与唯一匹配的顶层字段名
    ///
    /// 仅顶层标量/标量列表字段可用于创建或更新判定;
    /// 嵌套子字段即使声明 unique 也不参与匹配。
    pub fn unique_fields(&self) -> Vec<String> {
        self.schema
            .fields
            .iter()
            .filter(|f| {
                f.unique
                    && matches!(f.kind, FieldKind::Scalar(_) | FieldKind::ScalarList)
            })
            .map(|f| f.name.clone())
            .collect()
    }

    /// 必填扁平键（模板生成用）
    pub fn required_fields(&self) -> Vec<String> {
        self.flat_fields
            .iter()
            .filter(|d| d.required())
            .map(|d| d.key().to_string())
            .collect()
    }

    /// 可写扁平键
    pub fn writable_fields(&self) -> Vec<String> {
        self.flat_fields
            .iter()
            .filter(|d| d.writable())
            .map(|d| d.key().to_string())
            .collect()
    }

    /// 可读扁平键（导出列全集）
    pub fn readable_fields(&self) -> Vec<String> {
        self.flat_fields
            .iter()
            .filter(|d| d.readable())
            .map(|d| d.key().to_string())
            .collect()
    }

    /// 标量列表字段名（值需逗号拆分的可写字段）
    pub fn write_many_fields(&self) -> Vec<String> {
        self.flat_fields
            .iter()
            .filter(|d| d.write_many() && d.writable())
            .map(|d| d.key().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{FieldSpec, RecordSchema, ScalarType};

    fn member_schema() -> RecordSchema {
        RecordSchema::new(
            "member",
            vec![
                FieldSpec::scalar("id", ScalarType::Integer)
                    .unique()
                    .readonly(),
                FieldSpec::scalar("name", ScalarType::String).required(),
                FieldSpec::scalar("email", ScalarType::String).unique(),
                FieldSpec::scalar_list("tags"),
                FieldSpec::object(
                    "address",
                    vec![
                        FieldSpec::scalar("city", ScalarType::String),
                        FieldSpec::scalar("state", ScalarType::String),
                    ],
                ),
                FieldSpec::object_list(
                    "links",
                    vec![
                        FieldSpec::scalar("label", ScalarType::String),
                        FieldSpec::scalar("url", ScalarType::String),
                    ],
                ),
            ],
        )
    }

    #[test]
    fn test_flat_keys_cover_all_shapes() {
        let classifier = SchemaClassifier::new(&member_schema());
        let keys: Vec<&str> = classifier.flat_fields().iter().map(|d| d.key()).collect();

        assert_eq!(
            keys,
            vec![
                "id",
                "name",
                "email",
                "tags",
                "address.city",
                "address.state",
                "links[n].label",
                "links[n].url",
            ]
        );
    }

    #[test]
    fn test_descriptor_matches_indexed_list_key() {
        let classifier = SchemaClassifier::new(&member_schema());

        let descriptor = classifier.descriptor("links[4].label").unwrap();
        assert!(descriptor.is_list_item());
        assert_eq!(descriptor.key(), "links[n].label");

        assert!(classifier.descriptor("links[0].missing").is_none());
    }

    #[test]
    fn test_unique_fields_top_level_only() {
        let classifier = SchemaClassifier::new(&member_schema());

        assert_eq!(classifier.unique_fields(), vec!["id", "email"]);
    }

    #[test]
    fn test_required_and_writable_fields() {
        let classifier = SchemaClassifier::new(&member_schema());

        assert_eq!(classifier.required_fields(), vec!["name"]);

        let writable = classifier.writable_fields();
        assert!(!writable.contains(&"id".to_string()));
        assert!(writable.contains(&"name".to_string()));
        assert!(writable.contains(&"links[n].label".to_string()));
    }

    #[test]
    fn test_write_many_fields() {
        let classifier = SchemaClassifier::new(&member_schema());

        assert_eq!(classifier.write_many_fields(), vec!["tags"]);
    }
}
