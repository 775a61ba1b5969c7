// ==========================================
// 城市地理数据导入 - 数据清洗器
// ==========================================
// 职责: TRIM / 空白标准化 / 人口数解析 / 坐标解析
// 红线: 所有方法只返回 Option,解析失败即视为缺失
// ==========================================

use crate::domain::{CellValue, Coordinates};

pub struct DataCleaner;

impl DataCleaner {
    /// 清洗文本字段（TRIM,空白 → None）
    ///
    /// 数值单元格按其文本形式参与清洗（Excel 中偶有纯数字名称）
    pub fn clean_text(&self, value: Option<&CellValue>) -> Option<String> {
        let text = match value? {
            CellValue::Empty | CellValue::Bool(_) => return None,
            CellValue::Text(s) => s.trim().to_string(),
            other => other.to_string().trim().to_string(),
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// 解析人口数: 先按实数解析,再向零截断为整数
    ///
    /// # 返回
    /// - Some(n): n >= 0
    /// - None: 空白、非数字、非有限数、负数或超出 i64 范围
    pub fn parse_population(&self, value: Option<&CellValue>) -> Option<i64> {
        let raw = match value? {
            CellValue::Int(v) => return (*v >= 0).then_some(*v),
            CellValue::Float(v) => *v,
            CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
            CellValue::Empty | CellValue::Bool(_) => return None,
        };

        if !raw.is_finite() {
            return None;
        }
        let truncated = raw.trunc();
        if truncated < 0.0 || truncated >= i64::MAX as f64 {
            return None;
        }
        Some(truncated as i64)
    }

    /// 解析 "<lat>,<lng>" 组合坐标
    ///
    /// 只接受文本单元格; 按第一个逗号拆分,两侧 TRIM 后解析为浮点数。
    /// 任一环节失败（或越界）时经纬度同时缺失。
    pub fn parse_coordinates(&self, value: Option<&CellValue>) -> Option<Coordinates> {
        let text = value?.as_text()?;
        let (lat, lng) = text.trim().split_once(',')?;
        let latitude = lat.trim().parse::<f64>().ok()?;
        let longitude = lng.trim().parse::<f64>().ok()?;
        Coordinates::new(latitude, longitude)
    }
}
