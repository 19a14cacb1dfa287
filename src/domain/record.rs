// ==========================================
// 通用数据交换引擎 - 记录值与导入结果
// ==========================================
// 职责: 定义两种记录形态与上传结果结构
// - FlatRecord: 单行电子表格形态（键含下标/点分路径）
// - StructuredRecord: 记录存储理解的嵌套形态
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 嵌套记录: 标量 / 嵌套对象 / 对象列表
pub type StructuredRecord = serde_json::Map<String, Value>;

/// 扁平记录: 一行电子表格,键形如 field / addr.city / tags[0].label
pub type FlatRecord = serde_json::Map<String, Value>;

// ==========================================
// StoredRecord - 存储层记录
// ==========================================
// 用途: 记录存储返回的序列化形态（toStructured 结果 + 存储标识）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub record_id: String,        // 存储层标识（UUID）
    pub data: StructuredRecord,   // 序列化后的记录数据
}

// ==========================================
// RowFailure - 单行失败明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFailure {
    pub row_number: usize,                  // 源文件数据行号（1 起）
    pub data: FlatRecord,                   // 尝试导入的行数据
    pub errors: BTreeMap<String, String>,   // 字段 → 错误信息
}

// ==========================================
// UploadOutcome - 上传结果
// ==========================================
// 约定: 单行失败不终止批次,成功与失败并列返回
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub total_rows: usize,                  // 源文件数据行数
    pub successes: Vec<StructuredRecord>,   // 成功行（落库后的序列化形态）
    pub failures: Vec<RowFailure>,          // 失败行明细
}

impl UploadOutcome {
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_counts() {
        let mut outcome = UploadOutcome::default();
        outcome.total_rows = 2;

        let mut record = StructuredRecord::new();
        record.insert("name".to_string(), json!("abc"));
        outcome.successes.push(record);

        let mut errors = BTreeMap::new();
        errors.insert("name".to_string(), "必填字段缺失".to_string());
        outcome.failures.push(RowFailure {
            row_number: 2,
            data: FlatRecord::new(),
            errors,
        });

        assert_eq!(outcome.success_count(), 1);
        assert_eq!(outcome.failure_count(), 1);
    }
}
