// ==========================================
// 城市地理数据导入 - 幂等键
// ==========================================
// 格式: name|country|lat|lng
// - 坐标保留 6 位小数（约 0.1 米）
// - 坐标缺失写 "-"
// 说明: 键值不含 NULL,使 cities.dedup_key 的 UNIQUE 约束对无坐标行同样生效
// ==========================================

use crate::domain::{ClassifiedCity, NormalizedCity};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn for_city(city: &ClassifiedCity) -> Self {
        Self::for_normalized(&city.city)
    }

    pub fn for_normalized(city: &NormalizedCity) -> Self {
        let (lat, lng) = match city.coordinates {
            Some(c) => (format!("{:.6}", c.latitude), format!("{:.6}", c.longitude)),
            None => ("-".to_string(), "-".to_string()),
        };
        Self(format!("{}|{}|{}|{}", city.name, city.country, lat, lng))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
