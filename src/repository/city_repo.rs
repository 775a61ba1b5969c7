// ==========================================
// 城市地理数据导入 - 城市数据 Repository Trait
// ==========================================
// 职责: 定义 cities 表的数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::{ClassifiedCity, DatasetSummary, StoredCity};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// CityRepository Trait
// ==========================================
// 用途: 管道写入端（幂等加载）+ 汇总查询
// 实现者: CityRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait CityRepository: Send + Sync {
    // ===== 批量写入（事务化）=====

    /// 批量插入（存在即跳过,不覆盖,不报错）
    ///
    /// # 返回
    /// - Ok(usize): 实际新增的行数（不含冲突跳过的行）
    /// - Err: 数据库错误（整个事务回滚,可安全重试同一批次）
    async fn insert_if_absent(&self, cities: Vec<ClassifiedCity>) -> RepositoryResult<usize>;

    // ===== 查询 =====

    /// cities 表总行数
    async fn count_cities(&self) -> RepositoryResult<usize>;

    /// 按名称查询（精确匹配）
    async fn find_by_name(&self, name: &str) -> RepositoryResult<Vec<StoredCity>>;

    /// 库内数据汇总
    ///
    /// # 参数
    /// - top_n: 国家排行与最大城市列表的长度
    async fn summary(&self, top_n: usize) -> RepositoryResult<DatasetSummary>;

    // ===== 维护 =====

    /// 清空 cities 表,返回删除行数
    async fn clear_all(&self) -> RepositoryResult<usize>;
}
