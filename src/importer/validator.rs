// ==========================================
// 通用数据交换引擎 - 行校验器
// ==========================================
// 职责: 候选记录的模式校验与标量类型转换
// 约定: 批次内不做跨行唯一性检查,唯一性由记录存储裁决
// ==========================================

use crate::domain::record::StructuredRecord;
use crate::domain::schema::{FieldKind, FieldSpec, ScalarType};
use crate::engine::classifier::SchemaClassifier;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

// ==========================================
// RowValidator - 行校验器
// ==========================================
pub struct RowValidator<'a> {
    classifier: &'a SchemaClassifier,
}

impl<'a> RowValidator<'a> {
    pub fn new(classifier: &'a SchemaClassifier) -> Self {
        Self { classifier }
    }

    /// 校验并转换候选记录
    ///
    /// # 返回
    /// - (清洗后的记录, 字段 → 错误信息)
    ///
    /// # 规则
    /// - 只读字段与未知字段静默丢弃
    /// - 必填字段缺失或为空 → 记错误
    /// - 标量值按声明类型转换,失败 → 记错误
    pub fn validate(
        &self,
        candidate: &StructuredRecord,
    ) -> (StructuredRecord, BTreeMap<String, String>) {
        let mut cleaned = StructuredRecord::new();
        let mut errors = BTreeMap::new();

        for field in &self.classifier.schema().fields {
            let value = candidate.get(&field.name);

            if !field.writable {
                continue; // 只读字段的输入直接忽略
            }

            let present = value.map(|v| !is_empty_value(v)).unwrap_or(false);

            if field.required && !present {
                errors.insert(field.name.clone(), "必填字段缺失".to_string());
                continue;
            }

            let Some(value) = value else { continue };
            if is_empty_value(value) {
                continue;
            }

            match coerce_field(field, value) {
                Ok(coerced) => {
                    cleaned.insert(field.name.clone(), coerced);
                }
                Err(message) => {
                    errors.insert(field.name.clone(), message);
                }
            }
        }

        (cleaned, errors)
    }
}

/// 空值判定: null / 空串 / 空列表
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// 按字段声明转换值
fn coerce_field(field: &FieldSpec, value: &Value) -> Result<Value, String> {
    match &field.kind {
        FieldKind::Scalar(scalar_type) => coerce_scalar(value, *scalar_type),
        FieldKind::ScalarList => match value {
            Value::Array(items) => Ok(Value::Array(items.clone())),
            other => Ok(Value::Array(vec![other.clone()])),
        },
        FieldKind::Object(sub_fields) => match value {
            Value::Object(nested) => {
                coerce_sub_object(nested, sub_fields).map(Value::Object)
            }
            _ => Err("期望嵌套对象".to_string()),
        },
        FieldKind::ObjectList(sub_fields) => match value {
            Value::Array(items) => {
                let mut coerced_items = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(element) => {
                            coerced_items.push(Value::Object(coerce_sub_object(
                                element, sub_fields,
                            )?));
                        }
                        _ => return Err("期望对象列表".to_string()),
                    }
                }
                Ok(Value::Array(coerced_items))
            }
            _ => Err("期望对象列表".to_string()),
        },
    }
}

/// 逐子字段转换嵌套对象,未声明的子键丢弃
fn coerce_sub_object(
    nested: &Map<String, Value>,
    sub_fields: &[FieldSpec],
) -> Result<Map<String, Value>, String> {
    let mut coerced = Map::new();

    for sub in sub_fields {
        if let Some(sub_value) = nested.get(&sub.name) {
            if is_empty_value(sub_value) {
                continue;
            }
            let scalar_type = match &sub.kind {
                FieldKind::Scalar(t) => *t,
                _ => ScalarType::String, // 子字段契约上只有标量
            };
            let value = coerce_scalar(sub_value, scalar_type)
                .map_err(|e| format!("{}: {}", sub.name, e))?;
            coerced.insert(sub.name.clone(), value);
        }
    }

    Ok(coerced)
}

/// 标量类型转换
fn coerce_scalar(value: &Value, scalar_type: ScalarType) -> Result<Value, String> {
    match scalar_type {
        ScalarType::String => match value {
            Value::String(_) => Ok(value.clone()),
            other => Ok(Value::String(scalar_text(other))),
        },
        ScalarType::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::String(text) => text
                .trim()
                .parse::<i64>()
                .map(|n| Value::Number(Number::from(n)))
                .map_err(|_| format!("无法解析为整数: {}", text)),
            _ => Err("无法解析为整数".to_string()),
        },
        ScalarType::Float => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("无法解析为浮点数: {}", text)),
            _ => Err("无法解析为浮点数".to_string()),
        },
        ScalarType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(text) => match text.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "y" => Ok(Value::Bool(true)),
                "0" | "false" | "no" | "n" => Ok(Value::Bool(false)),
                _ => Err(format!("无法解析为布尔值: {}", text)),
            },
            _ => Err("无法解析为布尔值".to_string()),
        },
        ScalarType::Date => match value {
            Value::String(text) => {
                let trimmed = text.trim();
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .map(|_| Value::String(trimmed.to_string()))
                    .map_err(|_| format!("日期格式错误,期望 YYYY-MM-DD: {}", text))
            }
            _ => Err("无法解析为日期".to_string()),
        },
        ScalarType::DateTime => match value {
            Value::String(text) => {
                let trimmed = text.trim();
                DateTime::parse_from_rfc3339(trimmed)
                    .map(|_| ())
                    .or_else(|_| {
                        NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S").map(|_| ())
                    })
                    .map(|_| Value::String(trimmed.to_string()))
                    .map_err(|_| format!("日期时间格式错误: {}", text))
            }
            _ => Err("无法解析为日期时间".to_string()),
        },
    }
}

/// 非字符串标量的文本形式
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{FieldSpec, RecordSchema, ScalarType};
    use serde_json::json;

    fn classifier() -> SchemaClassifier {
        let schema = RecordSchema::new(
            "member",
            vec![
                FieldSpec::scalar("id", ScalarType::Integer).unique().readonly(),
                FieldSpec::scalar("name", ScalarType::String).required(),
                FieldSpec::scalar("age", ScalarType::Integer),
                FieldSpec::scalar("joined", ScalarType::Date),
                FieldSpec::scalar_list("tags"),
                FieldSpec::object(
                    "address",
                    vec![FieldSpec::scalar("city", ScalarType::String)],
                ),
            ],
        );
        SchemaClassifier::new(&schema)
    }

    fn record(value: serde_json::Value) -> StructuredRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_valid_record_passes() {
        let classifier = classifier();
        let validator = RowValidator::new(&classifier);

        let (cleaned, errors) = validator.validate(&record(json!({
            "name": "Ada",
            "age": "36",
            "joined": "2024-03-01",
            "tags": ["a", "b"],
            "address": {"city": "Austin"},
        })));

        assert!(errors.is_empty());
        assert_eq!(cleaned.get("age"), Some(&json!(36)));
        assert_eq!(cleaned.get("joined"), Some(&json!("2024-03-01")));
        assert_eq!(cleaned.get("address"), Some(&json!({"city": "Austin"})));
    }

    #[test]
    fn test_missing_required_field() {
        let classifier = classifier();
        let validator = RowValidator::new(&classifier);

        let (_, errors) = validator.validate(&record(json!({"age": "20"})));

        assert_eq!(errors.get("name"), Some(&"必填字段缺失".to_string()));
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let classifier = classifier();
        let validator = RowValidator::new(&classifier);

        let (_, errors) = validator.validate(&record(json!({"name": ""})));

        assert!(errors.contains_key("name"));
    }

    #[test]
    fn test_type_coercion_failure() {
        let classifier = classifier();
        let validator = RowValidator::new(&classifier);

        let (_, errors) = validator.validate(&record(json!({
            "name": "Ada",
            "age": "not-a-number",
        })));

        assert!(errors.get("age").unwrap().contains("无法解析为整数"));
    }

    #[test]
    fn test_readonly_field_dropped_silently() {
        let classifier = classifier();
        let validator = RowValidator::new(&classifier);

        let (cleaned, errors) = validator.validate(&record(json!({
            "id": "99",
            "name": "Ada",
        })));

        assert!(errors.is_empty());
        assert!(cleaned.get("id").is_none());
    }

    #[test]
    fn test_unknown_field_dropped_silently() {
        let classifier = classifier();
        let validator = RowValidator::new(&classifier);

        let (cleaned, errors) = validator.validate(&record(json!({
            "name": "Ada",
            "mystery": "value",
        })));

        assert!(errors.is_empty());
        assert!(cleaned.get("mystery").is_none());
    }

    #[test]
    fn test_bad_date_rejected() {
        let classifier = classifier();
        let validator = RowValidator::new(&classifier);

        let (_, errors) = validator.validate(&record(json!({
            "name": "Ada",
            "joined": "03/01/2024",
        })));

        assert!(errors.contains_key("joined"));
    }
}
