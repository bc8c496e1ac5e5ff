// ==========================================
// 楼盘单元库存系统 - 行规范化器
// ==========================================
// 职责: 映射应用 + 类型清洗/转换,原始行 -> CanonicalUnit
// 红线: 纯变换,产出新记录,禁止就地改写原始行（避免顺序依赖 bug）
// ==========================================

use crate::domain::import::RawImportRow;
use crate::domain::mapping::{CanonicalField, FieldMapping, MappingTarget};
use crate::domain::project::ProjectContext;
use crate::domain::types::UnitStatus;
use crate::domain::unit::CanonicalUnit;
use crate::importer::unit_importer_trait::RowNormalizer as RowNormalizerTrait;

// ==========================================
// RowError - 行级错误
// ==========================================
// 该行被跳过并计数,批次继续;不升级为批级失败
#[derive(Debug, Clone)]
pub struct RowError {
    pub row_number: usize,
    pub message: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "第 {} 行: {}", self.row_number, self.message)
    }
}

// ==========================================
// NormalizedRow - 规范化输出
// ==========================================
#[derive(Debug, Clone)]
pub struct NormalizedRow {
    pub unit: CanonicalUnit,
    pub warnings: Vec<String>,
}

// ==========================================
// RowNormalizer - 行规范化器实现
// ==========================================
pub struct RowNormalizer;

/// 空值哨兵: 归一为"缺失",绝不归一为 0
const NULL_SENTINELS: [&str; 3] = ["NA", "N/A", "-"];

impl RowNormalizer {
    /// JSON 值 -> 可用字符串（null/对象/数组视为缺失）
    fn value_to_string(value: &serde_json::Value) -> Option<String> {
        match value {
            serde_json::Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// 提取某标准字段的原始字符串值
    ///
    /// 多个列头映射到同一字段时按列头排序取第一个非空值,
    /// 保证与行内键序无关的确定性
    fn raw_value(row: &RawImportRow, mapping: &FieldMapping, field: CanonicalField) -> Option<String> {
        let mut headers: Vec<&String> = mapping
            .mappings
            .iter()
            .filter(|(_, target)| **target == MappingTarget::Field(field))
            .map(|(header, _)| header)
            .collect();
        headers.sort();

        for header in headers {
            if let Some(value) = row.get(header.as_str()).and_then(Self::value_to_string) {
                return Some(value);
            }
        }
        None
    }

    /// 是否为空值哨兵
    fn is_null_sentinel(raw: &str) -> bool {
        let upper = raw.trim().to_uppercase();
        upper.is_empty() || NULL_SENTINELS.contains(&upper.as_str())
    }

    /// 解析数值/价格: 仅保留数字、小数点、负号后解析
    /// 哨兵与解析失败都归一为缺失（不是 0,也不是错误）
    fn parse_decimal(raw: Option<String>) -> Option<f64> {
        let raw = raw?;
        if Self::is_null_sentinel(&raw) {
            return None;
        }
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        cleaned.parse::<f64>().ok()
    }

    /// 解析整数（楼层/卧室/卫生间）: 失败归一为缺失
    fn parse_int(raw: Option<String>) -> Option<i64> {
        let raw = raw?;
        if Self::is_null_sentinel(&raw) {
            return None;
        }
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '-')
            .collect();
        cleaned.parse::<i64>().ok()
    }

    /// 解析销售状态: 大小写无关的包含匹配,默认 AVAILABLE
    fn parse_status(raw: Option<&str>) -> (UnitStatus, Option<String>) {
        let Some(raw) = raw else {
            return (UnitStatus::Available, None);
        };
        let lower = raw.to_lowercase();
        if lower.contains("sold") {
            return (UnitStatus::Sold, None);
        }
        if lower.contains("reserved") || lower.contains("booked") {
            return (UnitStatus::Reserved, None);
        }
        if lower.contains("available") || lower.trim().is_empty() {
            return (UnitStatus::Available, None);
        }
        // 非常规状态文案: 默认 AVAILABLE + 警告,不阻断行
        (
            UnitStatus::Available,
            Some(format!("状态文案无法识别 \"{}\",按 AVAILABLE 处理", raw)),
        )
    }
}

impl RowNormalizerTrait for RowNormalizer {
    fn normalize(
        &self,
        row: &RawImportRow,
        mapping: &FieldMapping,
        ctx: &ProjectContext,
        row_number: usize,
    ) -> Result<NormalizedRow, RowError> {
        let mut warnings = Vec::new();

        // === 必填: 单元号 ===
        let unit_number = Self::raw_value(row, mapping, CanonicalField::UnitNumber)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RowError {
                row_number,
                message: "缺少单元号（unit_number）,该行被拒绝".to_string(),
            })?;

        // === 状态 ===
        let status_raw = Self::raw_value(row, mapping, CanonicalField::AvailabilityStatus);
        let (status, status_warning) = Self::parse_status(status_raw.as_deref());
        if let Some(w) = status_warning {
            warnings.push(format!("第 {} 行: {}", row_number, w));
        }

        // === 楼栋解析（单元不能没有楼栋） ===
        let building_raw = Self::raw_value(row, mapping, CanonicalField::Building);
        let building = ctx
            .resolve_building(building_raw.as_deref())
            .ok_or_else(|| RowError {
                row_number,
                message: match &building_raw {
                    Some(name) => format!("无法解析楼栋 \"{}\",且项目无可用兜底楼栋", name),
                    None => "未提供楼栋且项目无可用兜底楼栋".to_string(),
                },
            })?;

        // === 户型解析（不可解析降级为无户型 + 警告） ===
        let layout_raw = Self::raw_value(row, mapping, CanonicalField::LayoutId);
        let layout_id = match &layout_raw {
            Some(raw) => match ctx.resolve_layout(raw) {
                Some(layout) => Some(layout.layout_id.clone()),
                None => {
                    warnings.push(format!(
                        "第 {} 行: 户型 \"{}\" 无法解析,按无户型导入",
                        row_number, raw
                    ));
                    None
                }
            },
            None => None,
        };

        let unit = CanonicalUnit {
            unit_number,
            floor_number: Self::parse_int(Self::raw_value(row, mapping, CanonicalField::FloorNumber)),
            building_id: Some(building.building_id.clone()),
            layout_id,
            status,
            base_price_excl_vat: Self::parse_decimal(Self::raw_value(
                row,
                mapping,
                CanonicalField::BasePriceExclVat,
            )),
            final_price_incl_vat: Self::parse_decimal(Self::raw_value(
                row,
                mapping,
                CanonicalField::FinalPriceInclVat,
            )),
            selling_price: Self::parse_decimal(Self::raw_value(
                row,
                mapping,
                CanonicalField::SellingPrice,
            )),
            discount_price: Self::parse_decimal(Self::raw_value(
                row,
                mapping,
                CanonicalField::DiscountPrice,
            )),
            area: Self::parse_decimal(Self::raw_value(row, mapping, CanonicalField::Area)),
            bedrooms: Self::parse_int(Self::raw_value(row, mapping, CanonicalField::Bedrooms)),
            bathrooms: Self::parse_int(Self::raw_value(row, mapping, CanonicalField::Bathrooms)),
            description: Self::raw_value(row, mapping, CanonicalField::Description),
            view: Self::raw_value(row, mapping, CanonicalField::View),
            row_number,
        };

        Ok(NormalizedRow { unit, warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::{Building, Layout, Project};
    use chrono::Utc;
    use serde_json::json;
    use std::collections::HashMap;

    fn ctx() -> ProjectContext {
        let now = Utc::now();
        ProjectContext {
            project: Project {
                project_id: "P1".to_string(),
                name: "示例项目".to_string(),
                default_building_id: None,
                created_at: now,
            },
            buildings: vec![Building {
                building_id: "B1".to_string(),
                project_id: "P1".to_string(),
                name: "Tower A".to_string(),
                created_at: now,
            }],
            layouts: vec![Layout {
                layout_id: "L1".to_string(),
                project_id: "P1".to_string(),
                name: "2BR".to_string(),
                created_at: now,
            }],
            default_building_id: None,
        }
    }

    fn identity_mapping(headers: &[&str]) -> FieldMapping {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        FieldMapping::identity("P1", &headers)
    }

    fn row(pairs: &[(&str, serde_json::Value)]) -> RawImportRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<HashMap<_, _>>()
    }

    #[test]
    fn test_normalize_basic_row() {
        let mapping = identity_mapping(&[
            "unit_number",
            "floor_number",
            "selling_price",
            "availability_status",
            "layout_id",
        ]);
        let raw = row(&[
            ("unit_number", json!(" A-101 ")),
            ("floor_number", json!("3")),
            ("selling_price", json!("1,200,000 AED")),
            ("availability_status", json!("Reserved")),
            ("layout_id", json!("L1")),
        ]);

        let normalized = RowNormalizer.normalize(&raw, &mapping, &ctx(), 1).unwrap();
        assert_eq!(normalized.unit.unit_number, "A-101");
        assert_eq!(normalized.unit.floor_number, Some(3));
        assert_eq!(normalized.unit.selling_price, Some(1_200_000.0));
        assert_eq!(normalized.unit.status, UnitStatus::Reserved);
        assert_eq!(normalized.unit.layout_id, Some("L1".to_string()));
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn test_missing_unit_number_rejects_row() {
        let mapping = identity_mapping(&["unit_number", "selling_price"]);
        let raw = row(&[
            ("unit_number", json!("   ")),
            ("selling_price", json!(500)),
        ]);
        let err = RowNormalizer
            .normalize(&raw, &mapping, &ctx(), 7)
            .unwrap_err();
        assert_eq!(err.row_number, 7);
        assert!(err.message.contains("单元号"));
    }

    #[test]
    fn test_sentinels_normalize_to_absent_not_zero() {
        let mapping = identity_mapping(&["unit_number", "area", "bedrooms", "selling_price"]);
        for sentinel in ["NA", "N/A", "-", ""] {
            let raw = row(&[
                ("unit_number", json!("A1")),
                ("area", json!(sentinel)),
                ("bedrooms", json!(sentinel)),
                ("selling_price", json!(sentinel)),
            ]);
            let normalized = RowNormalizer.normalize(&raw, &mapping, &ctx(), 1).unwrap();
            assert_eq!(normalized.unit.area, None, "sentinel: {:?}", sentinel);
            assert_eq!(normalized.unit.bedrooms, None);
            assert_eq!(normalized.unit.selling_price, None);
        }
    }

    #[test]
    fn test_invalid_int_is_absent_not_error() {
        let mapping = identity_mapping(&["unit_number", "bedrooms"]);
        let raw = row(&[("unit_number", json!("A1")), ("bedrooms", json!("many"))]);
        let normalized = RowNormalizer.normalize(&raw, &mapping, &ctx(), 1).unwrap();
        assert_eq!(normalized.unit.bedrooms, None);
    }

    #[test]
    fn test_status_contains_match() {
        let mapping = identity_mapping(&["unit_number", "availability_status"]);
        let cases = [
            ("SOLD OUT", UnitStatus::Sold),
            ("pre-booked", UnitStatus::Reserved),
            ("Reserved for VIP", UnitStatus::Reserved),
            ("Available now", UnitStatus::Available),
        ];
        for (text, expected) in cases {
            let raw = row(&[
                ("unit_number", json!("A1")),
                ("availability_status", json!(text)),
            ]);
            let normalized = RowNormalizer.normalize(&raw, &mapping, &ctx(), 1).unwrap();
            assert_eq!(normalized.unit.status, expected, "text: {}", text);
        }
    }

    #[test]
    fn test_unusual_status_warns_and_defaults() {
        let mapping = identity_mapping(&["unit_number", "availability_status"]);
        let raw = row(&[
            ("unit_number", json!("A1")),
            ("availability_status", json!("待定")),
        ]);
        let normalized = RowNormalizer.normalize(&raw, &mapping, &ctx(), 1).unwrap();
        assert_eq!(normalized.unit.status, UnitStatus::Available);
        assert_eq!(normalized.warnings.len(), 1);
    }

    #[test]
    fn test_unresolved_layout_degrades_with_warning() {
        let mapping = identity_mapping(&["unit_number", "layout_id"]);
        let raw = row(&[
            ("unit_number", json!("A1")),
            ("layout_id", json!("不存在的户型")),
        ]);
        let normalized = RowNormalizer.normalize(&raw, &mapping, &ctx(), 1).unwrap();
        assert_eq!(normalized.unit.layout_id, None);
        assert_eq!(normalized.warnings.len(), 1);
    }

    #[test]
    fn test_no_building_anywhere_rejects_row() {
        let mut empty_ctx = ctx();
        empty_ctx.buildings.clear();
        let mapping = identity_mapping(&["unit_number"]);
        let raw = row(&[("unit_number", json!("A1"))]);
        let err = RowNormalizer
            .normalize(&raw, &mapping, &empty_ctx, 2)
            .unwrap_err();
        assert!(err.message.contains("楼栋"));
    }

    #[test]
    fn test_numeric_json_values_accepted() {
        let mapping = identity_mapping(&["unit_number", "selling_price", "floor_number"]);
        let raw = row(&[
            ("unit_number", json!(101)),
            ("selling_price", json!(750000.5)),
            ("floor_number", json!(12)),
        ]);
        let normalized = RowNormalizer.normalize(&raw, &mapping, &ctx(), 1).unwrap();
        assert_eq!(normalized.unit.unit_number, "101");
        assert_eq!(normalized.unit.selling_price, Some(750000.5));
        assert_eq!(normalized.unit.floor_number, Some(12));
    }
}
