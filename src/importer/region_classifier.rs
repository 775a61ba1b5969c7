// ==========================================
// 城市地理数据导入 - 区域分类器
// ==========================================
// 职责: 国家名 → 区域（静态查表）
// 规则: 精确匹配（TRIM 后,大小写敏感）; 未收录 → Other
// 说明: 查表刻意不覆盖全部国家,落入 Other 属于正常结果
// ==========================================

use crate::domain::Region;
use crate::importer::city_importer_trait::RegionClassifier;

/// 国家名 → 区域
pub fn classify(country: &str) -> Region {
    match country.trim() {
        // ===== North America =====
        "United States" | "Canada" | "Mexico" | "Guatemala" | "Cuba" | "Haiti"
        | "Dominican Republic" | "Honduras" | "Nicaragua" | "El Salvador" | "Costa Rica"
        | "Panama" | "Jamaica" | "Bahamas" | "Belize" => Region::NorthAmerica,

        // ===== Europe =====
        "United Kingdom" | "Germany" | "France" | "Italy" | "Spain" | "Poland" | "Romania"
        | "Netherlands" | "Belgium" | "Czech Republic" | "Greece" | "Portugal" | "Sweden"
        | "Hungary" | "Austria" | "Belarus" | "Switzerland" | "Bulgaria" | "Serbia"
        | "Denmark" | "Finland" | "Slovakia" | "Norway" | "Ireland" | "Croatia"
        | "Bosnia and Herzegovina" | "Albania" | "Lithuania" | "Slovenia" | "Latvia"
        | "Estonia" | "Macedonia" | "Montenegro" | "Luxembourg" | "Malta" | "Iceland"
        | "Ukraine" | "Russian Federation" => Region::Europe,

        // ===== Asia =====
        "China" | "India" | "Indonesia" | "Pakistan" | "Bangladesh" | "Japan"
        | "Philippines" | "Vietnam" | "Turkey" | "Iran" | "Iran, Islamic Rep. of"
        | "Thailand" | "Myanmar" | "South Korea" | "Iraq" | "Afghanistan" | "Saudi Arabia"
        | "Malaysia" | "Nepal" | "Yemen" | "North Korea" | "Sri Lanka" | "Syria"
        | "Cambodia" | "Jordan" | "Azerbaijan" | "Singapore" | "Lebanon" | "Mongolia" => {
            Region::Asia
        }

        // ===== Africa =====
        "Nigeria" | "Ethiopia" | "Egypt" | "South Africa" | "Kenya" | "Tanzania"
        | "Algeria" | "Morocco" | "Angola" | "Mozambique" | "Ghana" | "Madagascar"
        | "Cameroon" | "Ivory Coast" | "Niger" | "Burkina Faso" | "Mali" | "Malawi"
        | "Zambia" | "Somalia" | "Senegal" | "Chad" | "Zimbabwe" | "Guinea" | "Rwanda"
        | "Benin" | "Tunisia" | "Burundi" | "South Sudan" | "Togo" | "Sierra Leone"
        | "Libya" => Region::Africa,

        // ===== South America =====
        "Brazil" | "Argentina" | "Colombia" | "Peru" | "Venezuela" | "Chile" | "Ecuador"
        | "Bolivia" | "Paraguay" | "Uruguay" | "Guyana" | "Suriname" => Region::SouthAmerica,

        // ===== Oceania =====
        "Australia" | "Papua New Guinea" | "New Zealand" | "Fiji" | "Solomon Islands"
        | "Vanuatu" | "New Caledonia" | "French Polynesia" | "Samoa" => Region::Oceania,

        _ => Region::Other,
    }
}

// ==========================================
// StaticRegionClassifier - 基于静态查表的实现
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticRegionClassifier;

impl RegionClassifier for StaticRegionClassifier {
    fn classify(&self, country: &str) -> Region {
        classify(country)
    }
}
