// ==========================================
// 城市地理数据导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入管道的默认运行参数
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 每批读取的源行数
    ///
    /// # 默认值
    /// - 1000
    async fn get_batch_size(&self) -> ImportResult<usize>;

    /// 人口阈值（人口已知且低于此值的行被拒绝）
    ///
    /// # 默认值
    /// - 1000
    async fn get_min_population(&self) -> ImportResult<i64>;

    /// 批次间节流间隔（毫秒）
    ///
    /// # 默认值
    /// - 100
    async fn get_throttle_ms(&self) -> ImportResult<u64>;

    /// 每隔多少个批次输出一次里程碑（0 表示关闭）
    ///
    /// # 默认值
    /// - 10
    async fn get_milestone_every(&self) -> ImportResult<usize>;

    /// 单次运行的批次上限
    ///
    /// # 默认值
    /// - None（不限制）
    async fn get_max_batches(&self) -> ImportResult<Option<usize>>;
}
