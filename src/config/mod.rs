// ==========================================
// 城市地理数据导入 - 配置层
// ==========================================
// 职责: 管道运行参数管理,支持多级覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;
pub mod run_params;

// 重导出核心配置管理器
pub use config_manager::{config_keys, defaults, ConfigManager};
pub use import_config_trait::ImportConfigReader;
pub use run_params::RunParams;
