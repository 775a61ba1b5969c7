// ==========================================
// 城市地理数据导入 - 行过滤器
// ==========================================
// 职责: 判定规范化记录是否允许入库
// 规则:
// - name / country 为空 → 拒绝（规范化阶段已保证,此处再次断言）
// - population 存在且低于阈值 → 拒绝
// - population 缺失 → 接受（未知人口不做惩罚）
// ==========================================

use crate::domain::NormalizedCity;
use std::fmt;

/// 拒绝原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingName,
    MissingCountry,
    BelowMinPopulation { population: i64, min_population: i64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingName => write!(f, "名称为空"),
            RejectReason::MissingCountry => write!(f, "国家为空"),
            RejectReason::BelowMinPopulation {
                population,
                min_population,
            } => write!(f, "人口 {} 低于阈值 {}", population, min_population),
        }
    }
}

/// 过滤判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    Reject(RejectReason),
}

impl FilterDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, FilterDecision::Accept)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RowFilter {
    min_population: i64,
}

impl RowFilter {
    pub fn new(min_population: i64) -> Self {
        Self { min_population }
    }

    pub fn min_population(&self) -> i64 {
        self.min_population
    }

    pub fn evaluate(&self, city: &NormalizedCity) -> FilterDecision {
        if city.name.trim().is_empty() {
            return FilterDecision::Reject(RejectReason::MissingName);
        }
        if city.country.trim().is_empty() {
            return FilterDecision::Reject(RejectReason::MissingCountry);
        }
        match city.population {
            Some(population) if population < self.min_population => {
                FilterDecision::Reject(RejectReason::BelowMinPopulation {
                    population,
                    min_population: self.min_population,
                })
            }
            _ => FilterDecision::Accept,
        }
    }
}
