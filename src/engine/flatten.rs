// ==========================================
// 通用数据交换引擎 - 扁平化转换器
// ==========================================
// 职责: 嵌套记录 ↔ 单行扁平记录 双向转换
// 契约: unflatten(flatten(x)) == x（模去列表顺序与空占位对象清理）
// ==========================================

use crate::domain::flat_field::parse_list_key;
use crate::domain::record::{FlatRecord, StructuredRecord};
use crate::domain::schema::FieldKind;
use crate::engine::classifier::SchemaClassifier;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

// ==========================================
// FlatConverter - 扁平化转换器
// ==========================================
pub struct FlatConverter<'a> {
    classifier: &'a SchemaClassifier,
}

impl<'a> FlatConverter<'a> {
    pub fn new(classifier: &'a SchemaClassifier) -> Self {
        Self { classifier }
    }

    /// 嵌套记录 → 扁平记录
    ///
    /// 展开规则:
    /// - 标量: 直拷
    /// - 标量列表: 以 ", " 拼接
    /// - 单值嵌套对象: 展开为点分键（一层）
    /// - 对象列表: 逐元素展开为 field[i].sub 键
    pub fn flatten(&self, record: &StructuredRecord) -> FlatRecord {
        let write_many: HashSet<String> = self.classifier.write_many_fields().into_iter().collect();
        let mut flat = FlatRecord::new();

        for (key, value) in record {
            match value {
                Value::Array(items) => {
                    if items.is_empty() {
                        // 空对象列表不产生任何列;空标量列表保留为空串
                        if write_many.contains(key.as_str()) {
                            flat.insert(key.clone(), Value::String(String::new()));
                        }
                        continue;
                    }

                    if items.iter().all(|item| !item.is_object()) {
                        let joined = items
                            .iter()
                            .map(scalar_display)
                            .collect::<Vec<_>>()
                            .join(", ");
                        flat.insert(key.clone(), Value::String(joined));
                        continue;
                    }

                    for (index, item) in items.iter().enumerate() {
                        if let Value::Object(element) = item {
                            for (sub_key, sub_value) in element {
                                flat.insert(
                                    format!("{}[{}].{}", key, index, sub_key),
                                    sub_value.clone(),
                                );
                            }
                        }
                    }
                }
                Value::Object(nested) => {
                    for (sub_key, sub_value) in nested {
                        flat.insert(format!("{}.{}", key, sub_key), sub_value.clone());
                    }
                }
                _ => {
                    flat.insert(key.clone(), value.clone());
                }
            }
        }

        flat
    }

    /// 扁平记录 → 嵌套记录
    ///
    /// 按键逐个归类:
    /// 1. field[i] / field[i].sub → 在 field 处扩充列表,空占位补到下标处
    /// 2. 标量列表字段 + 字符串值 → 逗号拆分、去空白、丢弃空段
    /// 3. 标量列表字段 + 非列表值 → 包装为单元素列表
    /// 4. 已知单值嵌套对象的点分键 → 归入嵌套对象
    /// 5. 其余 → 标量直拷
    /// 收尾: 清理对象列表中的全空占位对象
    pub fn unflatten(&self, flat: &FlatRecord) -> StructuredRecord {
        let write_many: HashSet<String> = self.classifier.write_many_fields().into_iter().collect();
        let mut parsed = StructuredRecord::new();

        for (key, value) in flat {
            // 情形 1: 具体下标的列表项键
            if let Some(parts) = parse_list_key(key) {
                if let Some(index) = parts.index {
                    let entry = parsed
                        .entry(parts.parent.clone())
                        .or_insert_with(|| Value::Array(Vec::new()));

                    let Value::Array(list) = entry else {
                        warn!(key = %key, "列表项键与既有标量值冲突,跳过");
                        continue;
                    };

                    match &parts.sub {
                        Some(sub_key) => {
                            // 对象必须落在精确下标处,缺口用空对象占位
                            while list.len() <= index {
                                list.push(Value::Object(Map::new()));
                            }
                            if let Value::Object(element) = &mut list[index] {
                                element.insert(sub_key.clone(), value.clone());
                            }
                        }
                        None => {
                            while list.len() <= index {
                                list.push(Value::Null);
                            }
                            list[index] = value.clone();
                        }
                    }
                    continue;
                }
            }

            // 情形 2/3: 标量列表字段
            if write_many.contains(key.as_str()) {
                let items = match value {
                    Value::String(raw) => split_delimited(raw),
                    Value::Array(existing) => existing.clone(),
                    other => vec![other.clone()],
                };
                parsed.insert(key.clone(), Value::Array(items));
                continue;
            }

            // 情形 4: 已知单值嵌套对象的点分键
            if let Some((prefix, sub_key)) = key.split_once('.') {
                let is_object_field = matches!(
                    self.classifier.field_spec(prefix).map(|f| &f.kind),
                    Some(FieldKind::Object(_))
                );

                if is_object_field {
                    let entry = parsed
                        .entry(prefix.to_string())
                        .or_insert_with(|| Value::Object(Map::new()));

                    if let Value::Object(nested) = entry {
                        nested.insert(sub_key.to_string(), value.clone());
                        continue;
                    }
                }
            }

            // 情形 5: 标量直拷
            parsed.insert(key.clone(), value.clone());
        }

        // 清理对象列表缺口留下的空占位对象
        for (_key, value) in parsed.iter_mut() {
            if let Value::Array(items) = value {
                if items.iter().any(Value::is_object) {
                    items.retain(|item| match item {
                        Value::Object(element) => !element.is_empty(),
                        _ => true,
                    });
                }
            }
        }

        parsed
    }
}

/// 标量显示值: 字符串原样,其余走 JSON 文本
fn scalar_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// 逗号拆分: 去空白、丢弃空段
fn split_delimited(raw: &str) -> Vec<Value> {
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| Value::String(segment.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{FieldSpec, RecordSchema, ScalarType};
    use serde_json::json;

    fn member_classifier() -> SchemaClassifier {
        let schema = RecordSchema::new(
            "member",
            vec![
                FieldSpec::scalar("name", ScalarType::String).required(),
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
        );

        SchemaClassifier::new(&schema)
    }

    fn to_record(value: Value) -> StructuredRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_flatten_scalar_and_list() {
        let classifier = member_classifier();
        let converter = FlatConverter::new(&classifier);

        let record = to_record(json!({
            "name": "Ada",
            "tags": ["red", "blue"],
        }));

        let flat = converter.flatten(&record);

        assert_eq!(flat.get("name"), Some(&json!("Ada")));
        assert_eq!(flat.get("tags"), Some(&json!("red, blue")));
    }

    #[test]
    fn test_flatten_nested_object_and_object_list() {
        let classifier = member_classifier();
        let converter = FlatConverter::new(&classifier);

        let record = to_record(json!({
            "address": {"city": "Austin", "state": "TX"},
            "links": [
                {"label": "home", "url": "https://a.example"},
                {"label": "work", "url": "https://b.example"},
            ],
        }));

        let flat = converter.flatten(&record);

        assert_eq!(flat.get("address.city"), Some(&json!("Austin")));
        assert_eq!(flat.get("address.state"), Some(&json!("TX")));
        assert_eq!(flat.get("links[0].label"), Some(&json!("home")));
        assert_eq!(flat.get("links[1].url"), Some(&json!("https://b.example")));
    }

    #[test]
    fn test_unflatten_builds_list_at_exact_index() {
        let classifier = member_classifier();
        let converter = FlatConverter::new(&classifier);

        let mut flat = FlatRecord::new();
        flat.insert("links[2].label".to_string(), json!("third"));

        let record = converter.unflatten(&flat);

        // 前两个空占位对象被清理,只留下有内容的元素
        assert_eq!(record.get("links"), Some(&json!([{"label": "third"}])));
    }

    #[test]
    fn test_unflatten_splits_write_many_string() {
        let classifier = member_classifier();
        let converter = FlatConverter::new(&classifier);

        let mut flat = FlatRecord::new();
        flat.insert("tags".to_string(), json!("  red , , blue  "));

        let record = converter.unflatten(&flat);

        assert_eq!(record.get("tags"), Some(&json!(["red", "blue"])));
    }

    #[test]
    fn test_unflatten_wraps_write_many_scalar() {
        let classifier = member_classifier();
        let converter = FlatConverter::new(&classifier);

        let mut flat = FlatRecord::new();
        flat.insert("tags".to_string(), json!(7));

        let record = converter.unflatten(&flat);

        assert_eq!(record.get("tags"), Some(&json!([7])));
    }

    #[test]
    fn test_unflatten_dotted_key_builds_nested_object() {
        let classifier = member_classifier();
        let converter = FlatConverter::new(&classifier);

        let mut flat = FlatRecord::new();
        flat.insert("address.city".to_string(), json!("Austin"));
        flat.insert("address.state".to_string(), json!("TX"));

        let record = converter.unflatten(&flat);

        assert_eq!(
            record.get("address"),
            Some(&json!({"city": "Austin", "state": "TX"}))
        );
    }

    #[test]
    fn test_unflatten_unknown_dotted_key_copied_as_scalar() {
        let classifier = member_classifier();
        let converter = FlatConverter::new(&classifier);

        let mut flat = FlatRecord::new();
        flat.insert("misc.note".to_string(), json!("keep"));

        let record = converter.unflatten(&flat);

        assert_eq!(record.get("misc.note"), Some(&json!("keep")));
    }

    #[test]
    fn test_round_trip_full_record() {
        let classifier = member_classifier();
        let converter = FlatConverter::new(&classifier);

        let record = to_record(json!({
            "name": "Ada",
            "tags": ["red", "blue", "green"],
            "address": {"city": "Austin", "state": "TX"},
            "links": [
                {"label": "a", "url": "https://a.example"},
                {"label": "b", "url": "https://b.example"},
                {"label": "c", "url": "https://c.example"},
            ],
        }));

        let round_tripped = converter.unflatten(&converter.flatten(&record));

        assert_eq!(round_tripped, record);
    }

    #[test]
    fn test_round_trip_single_element_list() {
        let classifier = member_classifier();
        let converter = FlatConverter::new(&classifier);

        let record = to_record(json!({
            "name": "Ada",
            "links": [{"label": "only", "url": "https://a.example"}],
        }));

        let round_tripped = converter.unflatten(&converter.flatten(&record));

        assert_eq!(round_tripped, record);
    }

    #[test]
    fn test_round_trip_empty_lists() {
        let classifier = member_classifier();
        let converter = FlatConverter::new(&classifier);

        let record = to_record(json!({
            "name": "Ada",
            "tags": [],
            "links": [],
        }));

        let round_tripped = converter.unflatten(&converter.flatten(&record));

        // 空标量列表保留,空对象列表在扁平形态中没有列,往返后消失
        assert_eq!(round_tripped.get("name"), Some(&json!("Ada")));
        assert_eq!(round_tripped.get("tags"), Some(&json!([])));
        assert_eq!(round_tripped.get("links"), None);
    }

    #[test]
    fn test_round_trip_from_flat_form() {
        let classifier = member_classifier();
        let converter = FlatConverter::new(&classifier);

        let mut flat = FlatRecord::new();
        flat.insert("name".to_string(), json!("Ada"));
        flat.insert("tags".to_string(), json!("red, blue"));
        flat.insert("address.city".to_string(), json!("Austin"));
        flat.insert("links[0].label".to_string(), json!("a"));
        flat.insert("links[1].label".to_string(), json!("b"));

        let round_tripped = converter.flatten(&converter.unflatten(&flat));

        assert_eq!(round_tripped, flat);
    }
}
