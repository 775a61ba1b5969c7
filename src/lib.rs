// ==========================================
// 城市地理数据导入 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 表格数据源 → cities 表的可续跑幂等导入管道
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录类型与运行统计
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 管道各阶段与控制器
pub mod importer;

// 配置层 - 运行参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 驱动层门面
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CellValue, ClassifiedCity, DatasetSummary, NormalizedCity, RawRecord, Region, RunProgress,
    RunState, RunStatistics, StoredCity,
};

// 导入管道
pub use importer::{CityImporter, CityImporterImpl, RowSource};

// 配置
pub use config::RunParams;

// API
pub use api::{ImportApi, RunRequest};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "城市地理数据导入";
