// ==========================================
// 城市地理数据导入 - 导入管道 Trait
// ==========================================
// 职责: 定义管道各阶段接口（不包含实现）
// 管道: 分块读取 → 规范化 → 过滤 → 分类 → 组批 → 幂等写入 → 进度检查点
// ==========================================

use crate::config::RunParams;
use crate::domain::{NormalizedCity, RawRecord, Region, RunStatistics};
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// RowSource Trait
// ==========================================
// 用途: 按行位置寻址的表格数据源
// 实现者: TabularSource（文件解析产物）, InMemorySource（内存数据）
pub trait RowSource: Send + Sync {
    /// 数据行总数（不含表头）
    fn row_count(&self) -> usize;

    /// 按位置读取一行; 越界返回 None
    fn row_at(&self, index: usize) -> Option<RawRecord>;

    /// 读取 [offset, offset + len) 区间的行,越过末尾的部分被截断
    fn read_chunk(&self, offset: usize, len: usize) -> Vec<RawRecord> {
        let end = offset.saturating_add(len).min(self.row_count());
        (offset..end).filter_map(|idx| self.row_at(idx)).collect()
    }
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（启动阶段）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为可按行寻址的数据源
    ///
    /// # 返回
    /// - Ok(TabularSource): 表头已校验的数据源
    /// - Err: 文件不存在、格式不支持、缺少必需列
    fn parse_to_source(
        &self,
        file_path: &Path,
    ) -> ImportResult<crate::importer::file_parser::TabularSource>;
}

// ==========================================
// FieldNormalizer Trait
// ==========================================
// 用途: 原始行 → 规范化记录
// 实现者: FieldMapper
// 红线: 永不返回错误; 行级缺陷只产生 None（丢弃）或字段缺失
pub trait FieldNormalizer: Send + Sync {
    fn normalize(&self, row: &RawRecord) -> Option<NormalizedCity>;
}

// ==========================================
// RegionClassifier Trait
// ==========================================
// 用途: 国家名 → 区域
// 实现者: StaticRegionClassifier
// 红线: 纯函数且全覆盖,未收录国家返回 Region::Other
pub trait RegionClassifier: Send + Sync {
    fn classify(&self, country: &str) -> Region;
}

// ==========================================
// CityImporter Trait
// ==========================================
// 用途: 检查点/续跑控制器主接口
// 实现者: CityImporterImpl
#[async_trait]
pub trait CityImporter: Send + Sync {
    /// 在 [start, end) 区间内驱动整条管道
    ///
    /// # 返回
    /// - Ok(RunStatistics): 运行结束（Completed 或 Aborted）,final_offset 为续跑位置
    /// - Err: 配置缺陷,在第一个批次之前返回
    async fn run(&self, source: &dyn RowSource, params: &RunParams)
        -> ImportResult<RunStatistics>;
}
