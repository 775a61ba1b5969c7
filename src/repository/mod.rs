// ==========================================
// 城市地理数据导入 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod city_repo;
pub mod city_repo_impl;
pub mod error;
pub mod import_run_repo;

// 重导出核心仓储
pub use city_repo::CityRepository;
pub use city_repo_impl::CityRepositoryImpl;
pub use error::{RepositoryError, RepositoryResult};
pub use import_run_repo::ImportRunRepository;
