// ==========================================
// 城市地理数据导入 - 城市领域模型
// ==========================================
// 生命周期: RawRecord → NormalizedCity → ClassifiedCity → StoredCity
// 每个阶段只做"转发"或"丢弃",丢弃只计数不逐条上报
// ==========================================

use crate::domain::types::{CellValue, Region, RunState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ==========================================
// RawRecord - 源表格中的一行
// ==========================================
// 用途: 文件解析产物,列顺序与源表头一致
// 生命周期: 仅在单次规范化过程中存在
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    headers: Arc<[String]>,
    cells: Vec<CellValue>,
    pub row_index: usize, // 源数据中的行位置（0 起,不含表头）
}

impl RawRecord {
    pub fn new(headers: Arc<[String]>, cells: Vec<CellValue>, row_index: usize) -> Self {
        Self {
            headers,
            cells,
            row_index,
        }
    }

    /// 由 (列名, 值) 列表构造,主要用于测试与内存数据源
    pub fn from_pairs<K, V>(pairs: Vec<(K, V)>, row_index: usize) -> Self
    where
        K: Into<String>,
        V: Into<CellValue>,
    {
        let (headers, cells): (Vec<String>, Vec<CellValue>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(headers.into(), cells, row_index)
    }

    /// 按列名取值; 列不存在或行长度不足时返回 None
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|idx| self.cells.get(idx))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }
}

// ==========================================
// Coordinates - 经纬度对
// ==========================================
// 红线: 经纬度要么同时存在,要么同时缺失,不存在半边坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,  // [-90, 90]
    pub longitude: f64, // [-180, 180]
}

impl Coordinates {
    /// 校验范围后构造; 越界或非有限数返回 None
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lng_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        if lat_ok && lng_ok {
            Some(Self {
                latitude,
                longitude,
            })
        } else {
            None
        }
    }
}

// ==========================================
// NormalizedCity - 规范化后的城市记录
// ==========================================
// 红线: 仅当 name 与 country 均非空时才存在
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCity {
    pub name: String,
    pub country: String,
    pub population: Option<i64>, // 非负
    pub coordinates: Option<Coordinates>,
    pub timezone: Option<String>, // 源数据无此列,保留占位
    pub is_capital: bool,         // 源数据无此列,恒为 false
}

impl NormalizedCity {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            population: None,
            coordinates: None,
            timezone: None,
            is_capital: false,
        }
    }

    pub fn with_population(mut self, population: i64) -> Self {
        self.population = Some(population);
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Coordinates::new(latitude, longitude);
        self
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude)
    }
}

// ==========================================
// ClassifiedCity - 带区域标签的城市记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedCity {
    pub city: NormalizedCity,
    pub region: Region,
}

// ==========================================
// StoredCity - cities 表中的一行
// ==========================================
// 对齐: db.rs cities 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCity {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub region: Region,
    pub population: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    pub is_capital: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// RunProgress - 单次运行的进度快照
// ==========================================
// 用途: 控制器独占修改,每个批次提交后对外发布
// 说明: 不做持久化,续跑通过外部传入起始偏移实现
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunProgress {
    pub run_id: String,
    pub state: RunState,
    pub start_offset: usize,
    pub end_offset: usize, // 已按数据源行数截断
    pub current_offset: usize, // 此偏移之前的行均已持久化
    pub batch_size: usize,
    pub batches_committed: usize,
    pub processed: usize,
    pub inserted: usize,
    pub skipped: usize,
}

impl RunProgress {
    pub fn new(run_id: String, start_offset: usize, end_offset: usize, batch_size: usize) -> Self {
        Self {
            run_id,
            state: RunState::Idle,
            start_offset,
            end_offset,
            current_offset: start_offset,
            batch_size,
            batches_committed: 0,
            processed: 0,
            inserted: 0,
            skipped: 0,
        }
    }

    /// 区间完成百分比（空区间视为 100%）
    pub fn percent_complete(&self) -> f64 {
        let total = self.end_offset.saturating_sub(self.start_offset);
        if total == 0 {
            return 100.0;
        }
        let done = self.current_offset.saturating_sub(self.start_offset);
        (done as f64 / total as f64) * 100.0
    }
}

// ==========================================
// RunStatistics - 运行结束后的统计
// ==========================================
// 红线: 即使中止,final_offset 也必须给出已提交的位置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub run_id: String,
    pub state: RunState,
    pub start_offset: usize,
    pub end_offset: usize,
    pub final_offset: usize,
    pub source_rows: usize,
    pub batches: usize,
    pub processed: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub abort_reason: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunStatistics {
    pub fn from_progress(
        progress: &RunProgress,
        source_rows: usize,
        abort_reason: Option<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id: progress.run_id.clone(),
            state: progress.state,
            start_offset: progress.start_offset,
            end_offset: progress.end_offset,
            final_offset: progress.current_offset,
            source_rows,
            batches: progress.batches_committed,
            processed: progress.processed,
            inserted: progress.inserted,
            skipped: progress.skipped,
            abort_reason,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }

    /// 整个数据源的完成百分比
    pub fn dataset_progress_percent(&self) -> f64 {
        if self.source_rows == 0 {
            return 100.0;
        }
        (self.final_offset.min(self.source_rows) as f64 / self.source_rows as f64) * 100.0
    }
}

// ==========================================
// DatasetSummary - 库内数据汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_cities: usize,
    pub total_countries: usize,
    pub total_regions: usize,
    pub top_countries: Vec<(String, usize)>, // (国家, 城市数)
    pub largest_cities: Vec<StoredCity>,
}
