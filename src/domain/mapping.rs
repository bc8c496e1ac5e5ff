// ==========================================
// 楼盘单元库存系统 - 字段映射领域模型
// ==========================================
// 职责: 标准字段枚举 + 列头映射 + 关键词字典
// 红线: 关键词字典为显式不可变配置值,禁止模块级可变状态
// ==========================================

use chrono::{DateTime, Utc};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

// ==========================================
// CanonicalField - 标准单元字段
// ==========================================
// 固定的已知单元属性集合,与源数据列名无关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    UnitNumber,
    FloorNumber,
    Building,
    LayoutId,
    AvailabilityStatus,
    BasePriceExclVat,
    FinalPriceInclVat,
    SellingPrice,
    DiscountPrice,
    Description,
    View,
    Area,
    Bedrooms,
    Bathrooms,
}

impl CanonicalField {
    /// 全部标准字段（顺序即字典迭代顺序,平局裁决依赖此顺序）
    pub const ALL: [CanonicalField; 14] = [
        CanonicalField::UnitNumber,
        CanonicalField::FloorNumber,
        CanonicalField::Building,
        CanonicalField::LayoutId,
        CanonicalField::AvailabilityStatus,
        CanonicalField::BasePriceExclVat,
        CanonicalField::FinalPriceInclVat,
        CanonicalField::SellingPrice,
        CanonicalField::DiscountPrice,
        CanonicalField::Description,
        CanonicalField::View,
        CanonicalField::Area,
        CanonicalField::Bedrooms,
        CanonicalField::Bathrooms,
    ];

    /// 标准字段名（snake_case,与 JSON/DB 存储一致）
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::UnitNumber => "unit_number",
            CanonicalField::FloorNumber => "floor_number",
            CanonicalField::Building => "building",
            CanonicalField::LayoutId => "layout_id",
            CanonicalField::AvailabilityStatus => "availability_status",
            CanonicalField::BasePriceExclVat => "base_price_excl_vat",
            CanonicalField::FinalPriceInclVat => "final_price_incl_vat",
            CanonicalField::SellingPrice => "selling_price",
            CanonicalField::DiscountPrice => "discount_price",
            CanonicalField::Description => "description",
            CanonicalField::View => "view",
            CanonicalField::Area => "area",
            CanonicalField::Bedrooms => "bedrooms",
            CanonicalField::Bathrooms => "bathrooms",
        }
    }

    /// 从标准字段名解析
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == name)
    }
}

// ==========================================
// MappingTarget - 单个列头的映射目标
// ==========================================
// 序列化形式: 标准字段名字符串,或 "ignore"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingTarget {
    Field(CanonicalField),
    Ignore,
}

impl MappingTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingTarget::Field(f) => f.as_str(),
            MappingTarget::Ignore => "ignore",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        if name == "ignore" {
            return Some(MappingTarget::Ignore);
        }
        CanonicalField::from_name(name).map(MappingTarget::Field)
    }
}

impl Serialize for MappingTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MappingTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        MappingTarget::from_name(&raw)
            .ok_or_else(|| D::Error::custom(format!("未知映射目标: {}", raw)))
    }
}

// ==========================================
// FieldMapping - 可复用的列头映射
// ==========================================
// 归属项目;自动推断或人工创建;仅显式审批动作可翻转 is_approved
// 每个项目至多一条 is_default=true(由仓储 set_default 操作保证,非表约束)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub mapping_id: String,                       // 映射 ID（UUID）
    pub project_id: String,                       // 归属项目
    pub name: String,                             // 映射名称
    pub mappings: HashMap<String, MappingTarget>, // 源列头 -> 标准字段/ignore
    pub is_default: bool,                         // 项目默认映射标志
    pub is_approved: bool,                        // 审批标志（自动化导入门禁依据）
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FieldMapping {
    /// 查询某列头的映射目标（未声明的列头视为 ignore）
    pub fn target_for(&self, header: &str) -> MappingTarget {
        self.mappings
            .get(header)
            .copied()
            .unwrap_or(MappingTarget::Ignore)
    }

    /// 恒等映射: 源列名已是标准字段名时使用（交互式导入免存储映射）
    pub fn identity(project_id: &str, headers: &[String]) -> Self {
        let now = Utc::now();
        let mappings = headers
            .iter()
            .map(|h| {
                let target = CanonicalField::from_name(h)
                    .map(MappingTarget::Field)
                    .unwrap_or(MappingTarget::Ignore);
                (h.clone(), target)
            })
            .collect();
        Self {
            mapping_id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            name: "identity".to_string(),
            mappings,
            is_default: false,
            is_approved: true,
            created_at: now,
            updated_at: now,
        }
    }
}

// ==========================================
// KeywordDictionary - 字段关键词字典
// ==========================================
// 显式传入匹配器的不可变配置值（可本地化/扩展而不动算法）
// entries 顺序 = 字典迭代顺序,决定平局时先命中的字段
#[derive(Debug, Clone)]
pub struct KeywordDictionary {
    entries: Vec<(CanonicalField, Vec<String>)>,
}

impl KeywordDictionary {
    /// 从 (字段, 关键词列表) 构建,保持传入顺序
    pub fn new(entries: Vec<(CanonicalField, Vec<String>)>) -> Self {
        Self { entries }
    }

    /// 从配置 JSON 构建: {"unit_number": ["房号", ...], ...}
    /// 字段顺序统一按 CanonicalField::ALL,保证推断确定性
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let mut entries = Vec::new();
        for field in CanonicalField::ALL {
            if let Some(words) = obj.get(field.as_str()).and_then(|v| v.as_array()) {
                let keywords: Vec<String> = words
                    .iter()
                    .filter_map(|w| w.as_str().map(|s| s.to_string()))
                    .collect();
                if !keywords.is_empty() {
                    entries.push((field, keywords));
                }
            }
        }
        if entries.is_empty() {
            None
        } else {
            Some(Self { entries })
        }
    }

    pub fn entries(&self) -> &[(CanonicalField, Vec<String>)] {
        &self.entries
    }

    /// 某字段的关键词列表（unit_number 补救扫描使用）
    pub fn keywords_for(&self, field: CanonicalField) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, kw)| kw.as_slice())
            .unwrap_or(&[])
    }
}

impl Default for KeywordDictionary {
    /// 内置双语字典（中文 + 英文同义词）
    fn default() -> Self {
        let kw = |words: &[&str]| words.iter().map(|w| w.to_string()).collect::<Vec<_>>();
        Self::new(vec![
            (
                CanonicalField::UnitNumber,
                kw(&[
                    "unit number", "unit no", "unit", "apartment number", "flat number",
                    "房号", "单元号", "户号", "室号",
                ]),
            ),
            (
                CanonicalField::FloorNumber,
                kw(&["floor number", "floor", "level", "storey", "楼层", "层数", "层"]),
            ),
            (
                CanonicalField::Building,
                kw(&["building", "block", "tower", "楼栋", "栋", "座"]),
            ),
            (
                CanonicalField::LayoutId,
                kw(&["layout", "layout id", "unit type", "floorplan", "plan type", "户型", "户型编号"]),
            ),
            (
                CanonicalField::AvailabilityStatus,
                kw(&["availability status", "availability", "status", "sale status", "状态", "销售状态"]),
            ),
            (
                CanonicalField::BasePriceExclVat,
                kw(&["base price excl vat", "base price", "price excl vat", "net price", "不含税价", "净价"]),
            ),
            (
                CanonicalField::FinalPriceInclVat,
                kw(&["final price incl vat", "final price", "price incl vat", "gross price", "含税价", "总价"]),
            ),
            (
                CanonicalField::SellingPrice,
                kw(&["selling price", "sale price", "price", "售价", "销售价", "价格"]),
            ),
            (
                CanonicalField::DiscountPrice,
                kw(&["discount price", "discounted price", "promo price", "折扣价", "优惠价"]),
            ),
            (
                CanonicalField::Description,
                kw(&["description", "notes", "remark", "描述", "备注"]),
            ),
            (
                CanonicalField::View,
                kw(&["view", "orientation", "facing", "景观", "朝向"]),
            ),
            (
                CanonicalField::Area,
                kw(&["area", "size", "sqm", "square meters", "面积", "建筑面积", "平米"]),
            ),
            (
                CanonicalField::Bedrooms,
                kw(&["bedrooms", "bedroom count", "beds", "卧室", "卧室数", "室"]),
            ),
            (
                CanonicalField::Bathrooms,
                kw(&["bathrooms", "bathroom count", "baths", "卫生间", "浴室", "卫"]),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_field_name_roundtrip() {
        for field in CanonicalField::ALL {
            assert_eq!(CanonicalField::from_name(field.as_str()), Some(field));
        }
        assert_eq!(CanonicalField::from_name("nonsense"), None);
    }

    #[test]
    fn test_mapping_target_serde() {
        let json = serde_json::to_string(&MappingTarget::Field(CanonicalField::UnitNumber)).unwrap();
        assert_eq!(json, "\"unit_number\"");
        let back: MappingTarget = serde_json::from_str("\"ignore\"").unwrap();
        assert_eq!(back, MappingTarget::Ignore);
    }

    #[test]
    fn test_identity_mapping() {
        let headers = vec!["unit_number".to_string(), "随便什么列".to_string()];
        let mapping = FieldMapping::identity("P001", &headers);
        assert_eq!(
            mapping.target_for("unit_number"),
            MappingTarget::Field(CanonicalField::UnitNumber)
        );
        assert_eq!(mapping.target_for("随便什么列"), MappingTarget::Ignore);
        // 未声明的列头也视为 ignore
        assert_eq!(mapping.target_for("missing"), MappingTarget::Ignore);
        assert!(mapping.is_approved);
    }

    #[test]
    fn test_dictionary_from_json_keeps_field_order() {
        let value = serde_json::json!({
            "bedrooms": ["卧室"],
            "unit_number": ["房号"],
        });
        let dict = KeywordDictionary::from_json(&value).unwrap();
        // 顺序按 CanonicalField::ALL,与 JSON 键序无关
        assert_eq!(dict.entries()[0].0, CanonicalField::UnitNumber);
        assert_eq!(dict.entries()[1].0, CanonicalField::Bedrooms);
    }
}
