// ==========================================
// 城市地理数据导入 - 字段映射器实现
// ==========================================
// 职责: 源列 → NormalizedCity 映射 + 类型转换
// 红线: name / country 任一缺失即丢弃整行,其余字段失败只置为缺失
// ==========================================

use crate::domain::{NormalizedCity, RawRecord};
use crate::importer::city_importer_trait::FieldNormalizer;
use crate::importer::data_cleaner::DataCleaner;

// ===== 源数据列名（固定命名方案）=====
pub const COL_NAME: &str = "Name";
pub const COL_COUNTRY: &str = "Country name EN";
pub const COL_POPULATION: &str = "Population";
pub const COL_COORDINATES: &str = "Coordinates";

/// 文件解析时必须存在的表头
pub const REQUIRED_COLUMNS: [&str; 4] = [COL_NAME, COL_COUNTRY, COL_POPULATION, COL_COORDINATES];

pub struct FieldMapper {
    cleaner: DataCleaner,
}

impl FieldMapper {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldNormalizer for FieldMapper {
    fn normalize(&self, row: &RawRecord) -> Option<NormalizedCity> {
        let name = self.cleaner.clean_text(row.get(COL_NAME))?;
        let country = self.cleaner.clean_text(row.get(COL_COUNTRY))?;

        Some(NormalizedCity {
            name,
            country,
            population: self.cleaner.parse_population(row.get(COL_POPULATION)),
            coordinates: self.cleaner.parse_coordinates(row.get(COL_COORDINATES)),
            timezone: None,
            is_capital: false,
        })
    }
}
