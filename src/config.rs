// ==========================================
// 通用数据交换引擎 - 引擎配置
// ==========================================
// 职责: 数据目录与任务处理参数
// 支持: 环境变量覆写（QUERYCSV_* 前缀）
// ==========================================

use std::path::{Path, PathBuf};

/// 默认任务队列深度
pub const DEFAULT_JOB_QUEUE_DEPTH: usize = 64;

/// 默认滞留任务时限（分钟）
pub const DEFAULT_STALE_JOB_MINUTES: i64 = 30;

// ==========================================
// EngineConfig - 引擎配置
// ==========================================
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,        // 根数据目录
    pub job_queue_depth: usize,   // 任务队列深度
    pub stale_job_minutes: i64,   // Processing 超过该时限视为滞留
}

impl Default for EngineConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("querycsv");

        Self {
            data_dir,
            job_queue_depth: DEFAULT_JOB_QUEUE_DEPTH,
            stale_job_minutes: DEFAULT_STALE_JOB_MINUTES,
        }
    }
}

impl EngineConfig {
    /// 指定数据目录构造
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// 从环境变量构造
    ///
    /// # 环境变量
    /// - QUERYCSV_DATA_DIR: 根数据目录
    /// - QUERYCSV_JOB_QUEUE_DEPTH: 任务队列深度
    /// - QUERYCSV_STALE_JOB_MINUTES: 滞留任务时限（分钟）
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("QUERYCSV_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(depth) = std::env::var("QUERYCSV_JOB_QUEUE_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.job_queue_depth = depth;
        }
        if let Some(minutes) = std::env::var("QUERYCSV_STALE_JOB_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.stale_job_minutes = minutes;
        }

        config
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.data_dir.join("downloads")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.data_dir.join("templates")
    }

    /// 创建全部媒体子目录（幂等）
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.uploads_dir(),
            self.downloads_dir(),
            self.reports_dir(),
            self.templates_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdirs_under_data_dir() {
        let config = EngineConfig::new("/tmp/qcsv");

        assert_eq!(config.downloads_dir(), PathBuf::from("/tmp/qcsv/downloads"));
        assert_eq!(config.reports_dir(), PathBuf::from("/tmp/qcsv/reports"));
    }

    #[test]
    fn test_ensure_dirs_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::new(temp_dir.path());

        config.ensure_dirs().unwrap();
        config.ensure_dirs().unwrap();

        assert!(config.uploads_dir().is_dir());
        assert!(config.templates_dir().is_dir());
    }
}
