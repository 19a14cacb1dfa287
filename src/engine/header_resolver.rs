// ==========================================
// 通用数据交换引擎 - 表头映射解析器
// ==========================================
// 职责: 把列名→字段的映射对解析为具体的列重命名
// 难点: 列表项字段的下标消歧（列名带编号 / 匿名重复列靠顺序）
// 红线: 消歧计数只存活于单次解析调用,绝不跨调用共享
// ==========================================

use crate::domain::flat_field::FlatFieldDescriptor;
use crate::domain::upload_job::FieldMapping;
use crate::engine::classifier::SchemaClassifier;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// 控制动作: 映射到这些值的列不做重命名
pub const ACTION_SKIP: &str = "SKIP";

pub const CONTROL_ACTIONS: &[&str] = &[ACTION_SKIP];

/// 列名中的数字片段（多位数字算一组）
fn digit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("数字正则应当合法"))
}

// ==========================================
// HeaderResolver - 表头映射解析器
// ==========================================
// 下标消歧规则:
// - 列名中恰有一组数字 → 以该数字为下标（"Tag 2" → tags[2].label）
// - 列名无数字 → 按匿名出现顺序取下一个顺延下标（0 起）
// - 列名多组数字 → 该映射条目整体跳过,列保持未映射
pub struct HeaderResolver<'a> {
    classifier: &'a SchemaClassifier,
}

impl<'a> HeaderResolver<'a> {
    pub fn new(classifier: &'a SchemaClassifier) -> Self {
        Self { classifier }
    }

    /// 解析映射对,返回 (原列名, 解析后扁平键) 重命名列表
    ///
    /// 未知字段与控制动作条目被识别但不产生重命名;
    /// 引用源文件中不存在列的陈旧映射在应用侧自然落空,同样无害。
    pub fn resolve(&self, mappings: &[FieldMapping]) -> Vec<(String, String)> {
        // 匿名下标计数,按通配键隔离,仅本次调用内有效
        let mut anonymous_counts: HashMap<String, usize> = HashMap::new();
        let mut renames = Vec::new();

        for mapping in mappings {
            if CONTROL_ACTIONS.contains(&mapping.field_name.as_str()) {
                continue;
            }

            let Some(descriptor) = self.classifier.descriptor(&mapping.field_name) else {
                debug!(field = %mapping.field_name, "映射指向未知字段,跳过");
                continue;
            };

            match descriptor {
                FlatFieldDescriptor::Plain(field) => {
                    renames.push((mapping.column_name.clone(), field.key.clone()));
                }
                FlatFieldDescriptor::ListItem(list_field) => {
                    // 下标取自原始列名,而非字段名
                    let numbers: Vec<&str> = digit_pattern()
                        .find_iter(&mapping.column_name)
                        .map(|m| m.as_str())
                        .collect();

                    if numbers.len() > 1 {
                        warn!(
                            column = %mapping.column_name,
                            "列名含多组数字,无法确定下标,跳过该映射"
                        );
                        continue;
                    }

                    let index = match numbers.first() {
                        Some(digits) => match digits.parse::<usize>() {
                            Ok(index) => index,
                            Err(_) => {
                                warn!(column = %mapping.column_name, "下标数字超出范围,跳过该映射");
                                continue;
                            }
                        },
                        None => {
                            let count = anonymous_counts
                                .entry(list_field.generic_key.clone())
                                .or_insert(0);
                            let index = *count;
                            *count += 1;
                            index
                        }
                    };

                    let mut resolved = list_field.clone();
                    resolved.set_index(index);
                    renames.push((mapping.column_name.clone(), resolved.key));
                }
            }
        }

        renames
    }

    /// 从原始表头自动推测映射: 归一化后命中已知扁平键的列被认领
    pub fn auto_guess(&self, headers: &[String]) -> Vec<FieldMapping> {
        headers
            .iter()
            .filter_map(|header| {
                let normalized = normalize_header(header);
                self.classifier
                    .descriptor(&normalized)
                    .map(|descriptor| FieldMapping::new(header, descriptor.key()))
            })
            .collect()
    }
}

/// 表头归一化: 去空白、转小写、空格转下划线
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}
