// ==========================================
// 城市地理数据导入 - 领域模型层
// ==========================================
// 职责: 定义记录类型、区域枚举、运行统计
// 红线: 不含数据访问逻辑,不含管道逻辑
// ==========================================

pub mod city;
pub mod types;

// 重导出核心类型
pub use city::{
    ClassifiedCity, Coordinates, DatasetSummary, NormalizedCity, RawRecord, RunProgress,
    RunStatistics, StoredCity,
};
pub use types::{CellValue, Region, RunState};
