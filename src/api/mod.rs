// ==========================================
// 城市地理数据导入 - API 层
// ==========================================
// 职责: 提供驱动层接口,供命令行入口调用
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{
    ensure_sqlite_path, get_default_db_path, ImportApi, RunRequest, DB_PATH_ENV, SUMMARY_TOP_N,
};
