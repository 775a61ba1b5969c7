// ==========================================
// 城市地理数据导入 - 运行参数
// ==========================================
// 职责: 单次调用的显式配置（偏移区间 / 批次大小 / 人口阈值 / 节流）
// 红线: 参数缺陷在第一个批次之前报错,运行不会开始
// ==========================================

use crate::config::config_manager::defaults;
use crate::config::import_config_trait::ImportConfigReader;
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    pub start_offset: usize,
    pub end_offset: Option<usize>, // None = 数据源末尾
    pub batch_size: usize,
    pub min_population: i64,
    pub throttle: Duration,
    pub max_batches: Option<usize>,
    pub milestone_every: usize, // 0 = 关闭里程碑
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            start_offset: 0,
            end_offset: None,
            batch_size: defaults::BATCH_SIZE,
            min_population: defaults::MIN_POPULATION,
            throttle: Duration::from_millis(defaults::THROTTLE_MS),
            max_batches: None,
            milestone_every: defaults::MILESTONE_EVERY,
        }
    }
}

impl RunParams {
    /// 以 config_kv 中的值（或内置默认值）为基础构造
    pub async fn from_config(reader: &dyn ImportConfigReader) -> ImportResult<Self> {
        Ok(Self {
            start_offset: 0,
            end_offset: None,
            batch_size: reader.get_batch_size().await?,
            min_population: reader.get_min_population().await?,
            throttle: Duration::from_millis(reader.get_throttle_ms().await?),
            max_batches: reader.get_max_batches().await?,
            milestone_every: reader.get_milestone_every().await?,
        })
    }

    pub fn with_range(mut self, start_offset: usize, end_offset: Option<usize>) -> Self {
        self.start_offset = start_offset;
        self.end_offset = end_offset;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_min_population(mut self, min_population: i64) -> Self {
        self.min_population = min_population;
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_max_batches(mut self, max_batches: Option<usize>) -> Self {
        self.max_batches = max_batches;
        self
    }

    pub fn with_milestone_every(mut self, milestone_every: usize) -> Self {
        self.milestone_every = milestone_every;
        self
    }

    /// 参数校验
    pub fn validate(&self) -> ImportResult<()> {
        if self.batch_size == 0 {
            return Err(ImportError::InvalidRunParams(
                "batch_size 必须为正整数".to_string(),
            ));
        }
        if self.min_population < 0 {
            return Err(ImportError::InvalidRunParams(format!(
                "min_population 不能为负数: {}",
                self.min_population
            )));
        }
        if let Some(end) = self.end_offset {
            if end < self.start_offset {
                return Err(ImportError::InvalidRunParams(format!(
                    "end_offset ({}) 小于 start_offset ({})",
                    end, self.start_offset
                )));
            }
        }
        if self.max_batches == Some(0) {
            return Err(ImportError::InvalidRunParams(
                "max_batches 必须为正整数".to_string(),
            ));
        }
        Ok(())
    }

    /// 按数据源行数截断后的有效区间 [start, end)
    pub fn effective_range(&self, row_count: usize) -> (usize, usize) {
        let start = self.start_offset.min(row_count);
        let end = self
            .end_offset
            .unwrap_or(row_count)
            .min(row_count)
            .max(start);
        (start, end)
    }
}
