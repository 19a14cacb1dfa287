// ==========================================
// 通用数据交换引擎 - 扁平字段描述符
// ==========================================
// 职责: 描述单个扁平键（普通键 / 列表项键）+ 列表键解析
// 键形态: field / parent.sub / parent[0] / parent[0].sub / parent[n].sub
// ==========================================

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// 列表项键正则: 字段名 + 方括号下标（数字或通配 n）+ 可选点分子键
fn list_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_-]+)\[(\d+|n)\](?:\.(.+))?$").expect("列表键正则应当合法")
    })
}

/// 下标通配正则: 把具体下标归一为 [n]
fn index_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[(\d+|n)\]").expect("下标正则应当合法"))
}

/// 把扁平键中的具体下标归一为通配形式
///
/// # 示例
/// - `tags[2].label` → `tags[n].label`
/// - `name` → `name`（无下标原样返回）
pub fn generic_form(key: &str) -> String {
    index_pattern().replace_all(key, "[n]").into_owned()
}

// ==========================================
// ListKeyParts - 列表键解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListKeyParts {
    pub parent: String,          // 列表字段名
    pub index: Option<usize>,    // 具体下标（通配 n 时为 None）
    pub sub: Option<String>,     // 子键（标量元素列表时为 None）
}

/// 解析列表项键，非列表键返回 None
pub fn parse_list_key(key: &str) -> Option<ListKeyParts> {
    let caps = list_key_pattern().captures(key)?;

    let parent = caps.get(1)?.as_str().to_string();
    let index = match caps.get(2)?.as_str() {
        "n" => None,
        digits => digits.parse::<usize>().ok(),
    };
    let sub = caps
        .get(3)
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty());

    Some(ListKeyParts { parent, index, sub })
}

// ==========================================
// FlatField - 普通扁平字段
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatField {
    pub key: String,      // 扁平键（field 或 parent.sub）
    pub required: bool,
    pub unique: bool,
    pub readable: bool,
    pub writable: bool,
    pub write_many: bool, // 标量列表字段: 值按逗号拆分/拼接
}

// ==========================================
// FlatListField - 列表项扁平字段
// ==========================================
// 用途: 属于嵌套对象列表的扁平键
// 生命周期: 分类时 index=None; 表头解析为其分配一次下标,之后不再变化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatListField {
    pub key: String,             // 当前键（未分配下标时为通配形式）
    pub parent_key: String,      // 列表字段名
    pub index: Option<usize>,    // 具体下标（未解析时为 None）
    pub sub_key: Option<String>, // 元素内子键（标量元素列表时为 None）
    pub generic_key: String,     // 下标归一后的键（tags[n].label）
    pub required: bool,
    pub unique: bool,
    pub readable: bool,
    pub writable: bool,
}

impl FlatListField {
    /// 从扁平键构造（键必须是合法的列表项键）
    pub fn parse(key: &str) -> Option<Self> {
        let parts = parse_list_key(key)?;

        Some(Self {
            key: key.to_string(),
            parent_key: parts.parent,
            index: parts.index,
            sub_key: parts.sub,
            generic_key: generic_form(key),
            required: false,
            unique: false,
            readable: true,
            writable: true,
        })
    }

    /// 分配具体下标（每轮表头解析至多调用一次）
    pub fn set_index(&mut self, index: usize) {
        self.index = Some(index);
        self.key = format!("{}[{}]", self.parent_key, index);

        if let Some(sub) = &self.sub_key {
            self.key.push('.');
            self.key.push_str(sub);
        }
    }

    /// 键等价判定: 具体下标与通配形式视为同一字段
    pub fn matches(&self, key: &str) -> bool {
        key == self.key || generic_form(key) == self.generic_key
    }
}

// ==========================================
// FlatFieldDescriptor - 扁平字段描述符
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FlatFieldDescriptor {
    Plain(FlatField),
    ListItem(FlatListField),
}

impl FlatFieldDescriptor {
    pub fn key(&self) -> &str {
        match self {
            Self::Plain(f) => &f.key,
            Self::ListItem(f) => &f.key,
        }
    }

    pub fn is_list_item(&self) -> bool {
        matches!(self, Self::ListItem(_))
    }

    pub fn required(&self) -> bool {
        match self {
            Self::Plain(f) => f.required,
            Self::ListItem(f) => f.required,
        }
    }

    pub fn unique(&self) -> bool {
        match self {
            Self::Plain(f) => f.unique,
            Self::ListItem(f) => f.unique,
        }
    }

    pub fn readable(&self) -> bool {
        match self {
            Self::Plain(f) => f.readable,
            Self::ListItem(f) => f.readable,
        }
    }

    pub fn writable(&self) -> bool {
        match self {
            Self::Plain(f) => f.writable,
            Self::ListItem(f) => f.writable,
        }
    }

    pub fn write_many(&self) -> bool {
        match self {
            Self::Plain(f) => f.write_many,
            Self::ListItem(_) => false,
        }
    }

    /// 键等价判定: 普通键精确匹配,列表项键按通配等价匹配
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Plain(f) => f.key == key,
            Self::ListItem(f) => f.matches(key),
        }
    }
}
