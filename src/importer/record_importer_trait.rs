// ==========================================
// 通用数据交换引擎 - 导入接口定义
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// ==========================================

use crate::domain::record::UploadOutcome;
use crate::domain::upload_job::{FieldMapping, UploadJob};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::RawTable;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: CsvParser, ExcelParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始表格（表头 + 行记录）
    ///
    /// # 参数
    /// - file_path: 文件路径
    ///
    /// # 返回
    /// - Ok(RawTable): 表头与数据行,单元格均为字符串
    /// - Err: 文件不存在、格式不支持、解析失败
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable>;
}

// ==========================================
// RecordImporter Trait
// ==========================================
// 用途: 上传管道主接口
// 实现者: RecordImporterImpl
#[async_trait]
pub trait RecordImporter: Send + Sync {
    /// 从电子表格文件导入记录
    ///
    /// # 参数
    /// - file_path: 源文件路径（.csv/.xlsx/.xls）
    /// - mappings: 自定义列映射;为空时按表头自动推测
    ///
    /// # 返回
    /// - Ok(UploadOutcome): 成功与失败并列返回,单行失败不终止批次
    /// - Err: 文件不可读等管道级错误
    ///
    /// # 管道流程
    /// 1. 解析文件（空单元格为空串）
    /// 2. 表头映射解析并重命名列
    /// 3. 值归一化（列表拆分 / 空串转缺失）
    /// 4. 逐行 unflatten 构造候选记录
    /// 5. 模式校验与类型转换
    /// 6. 唯一字段匹配 → 创建或更新
    /// 7. 汇总行级结果
    async fn upload_from_file(
        &self,
        file_path: &Path,
        mappings: &[FieldMapping],
    ) -> ImportResult<UploadOutcome>;

    /// 按预定义任务导入
    ///
    /// # 参数
    /// - job: 上传任务（提供源文件与列映射）
    async fn upload_from_job(&self, job: &UploadJob) -> ImportResult<UploadOutcome>;

    /// 批量导入多个文件（并发执行）
    ///
    /// # 说明
    /// - 每个文件的导入相互独立,单个文件失败不影响其他文件
    async fn upload_many(
        &self,
        file_paths: Vec<PathBuf>,
    ) -> Vec<Result<UploadOutcome, String>>;
}
