// ==========================================
// 楼盘单元库存系统 - 字段关键词匹配器
// ==========================================
// 职责: 任意源列头 -> 标准字段的启发式匹配
// 红线: 纯函数,无隐藏状态;同输入必同输出（映射推断确定性）
// 匹配顺序: 精确 -> 子串（长关键词优先,同长取字典序先出现的字段）-> 分词
// ==========================================

use crate::domain::mapping::{CanonicalField, KeywordDictionary, MappingTarget};
use std::collections::HashMap;

// ==========================================
// HeaderMatch - 单列头匹配结果
// ==========================================
// tied: 子串阶段与命中字段同关键词长度打平的其他字段
// 平局不静默吞掉,推断时生成警告供人工复核
#[derive(Debug, Clone)]
pub struct HeaderMatch {
    pub field: Option<CanonicalField>,
    pub tied: Vec<CanonicalField>,
}

// ==========================================
// MappingInference - 整组列头的推断结果
// ==========================================
#[derive(Debug, Clone)]
pub struct MappingInference {
    pub targets: HashMap<String, MappingTarget>,
    pub warnings: Vec<String>,
}

/// 规范化列头: 小写、去标点（非字母数字一律视为分隔符）、压缩空白
pub fn normalize_header(header: &str) -> String {
    let mut cleaned = String::with_capacity(header.len());
    for c in header.chars() {
        if c.is_alphanumeric() {
            cleaned.extend(c.to_lowercase());
        } else {
            cleaned.push(' ');
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 匹配单个列头,返回最佳标准字段（无命中返回 None）
pub fn match_header(header: &str, dict: &KeywordDictionary) -> Option<CanonicalField> {
    match_header_detailed(header, dict).field
}

/// 匹配单个列头,附带平局信息
pub fn match_header_detailed(header: &str, dict: &KeywordDictionary) -> HeaderMatch {
    let normalized = normalize_header(header);
    if normalized.is_empty() {
        return HeaderMatch {
            field: None,
            tied: Vec::new(),
        };
    }

    // === 阶段 1: 精确匹配（字段名或任一关键词） ===
    for (field, keywords) in dict.entries() {
        let label = field.as_str().replace('_', " ");
        if normalized == label {
            return HeaderMatch {
                field: Some(*field),
                tied: Vec::new(),
            };
        }
        if keywords.iter().any(|kw| normalize_header(kw) == normalized) {
            return HeaderMatch {
                field: Some(*field),
                tied: Vec::new(),
            };
        }
    }

    // === 阶段 2: 子串匹配（列头含关键词,或关键词含列头） ===
    // 多字段命中时取最长关键词;同长不覆盖（字典序先出现的字段胜出）,
    // 打平的其他字段记入 tied
    let mut best: Option<(CanonicalField, usize)> = None;
    let mut tied: Vec<CanonicalField> = Vec::new();
    for (field, keywords) in dict.entries() {
        for kw in keywords {
            let nkw = normalize_header(kw);
            if nkw.is_empty() {
                continue;
            }
            if normalized.contains(&nkw) || nkw.contains(&normalized) {
                let len = nkw.chars().count();
                match best {
                    None => {
                        best = Some((*field, len));
                    }
                    Some((best_field, best_len)) => {
                        if len > best_len {
                            best = Some((*field, len));
                            tied.clear();
                        } else if len == best_len
                            && *field != best_field
                            && !tied.contains(field)
                        {
                            tied.push(*field);
                        }
                    }
                }
            }
        }
    }
    if let Some((field, _)) = best {
        return HeaderMatch {
            field: Some(field),
            tied,
        };
    }

    // === 阶段 3: 分词匹配（列头单词与关键词单词相等/互相包含） ===
    let header_words: Vec<&str> = normalized.split(' ').collect();
    for (field, keywords) in dict.entries() {
        for kw in keywords {
            let nkw = normalize_header(kw);
            for kw_word in nkw.split(' ') {
                if kw_word.is_empty() {
                    continue;
                }
                for header_word in &header_words {
                    if *header_word == kw_word
                        || header_word.contains(kw_word)
                        || kw_word.contains(header_word)
                    {
                        return HeaderMatch {
                            field: Some(*field),
                            tied: Vec::new(),
                        };
                    }
                }
            }
        }
    }

    HeaderMatch {
        field: None,
        tied: Vec::new(),
    }
}

/// 推断整组列头的映射
///
/// 未命中的列头映射为 ignore;后置补救: 若没有任何列头命中
/// unit_number,用 unit_number 关键词单独重扫被 ignore 的列头,
/// 命中即回头覆盖该列头的 ignore 分配（没有单元号映射的导入
/// 完全无法执行,此偏置是刻意的）
pub fn infer_mapping(headers: &[String], dict: &KeywordDictionary) -> MappingInference {
    let mut targets: HashMap<String, MappingTarget> = HashMap::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut has_unit_number = false;

    for header in headers {
        let matched = match_header_detailed(header, dict);
        match matched.field {
            Some(field) => {
                if !matched.tied.is_empty() {
                    let tied_names: Vec<&str> =
                        matched.tied.iter().map(|f| f.as_str()).collect();
                    warnings.push(format!(
                        "列头 \"{}\" 在多个字段间打平（选用 {},候选 {}）,建议人工复核映射",
                        header,
                        field.as_str(),
                        tied_names.join(", ")
                    ));
                }
                if field == CanonicalField::UnitNumber {
                    has_unit_number = true;
                }
                targets.insert(header.clone(), MappingTarget::Field(field));
            }
            None => {
                targets.insert(header.clone(), MappingTarget::Ignore);
            }
        }
    }

    // === 后置补救: unit_number 必须有来源 ===
    if !has_unit_number {
        let rescue_dict = KeywordDictionary::new(vec![(
            CanonicalField::UnitNumber,
            dict.keywords_for(CanonicalField::UnitNumber).to_vec(),
        )]);
        for header in headers {
            if targets.get(header) != Some(&MappingTarget::Ignore) {
                continue;
            }
            if match_header(header, &rescue_dict).is_some() {
                targets.insert(
                    header.clone(),
                    MappingTarget::Field(CanonicalField::UnitNumber),
                );
                warnings.push(format!(
                    "未找到单元号列,已将列头 \"{}\" 回补映射为 unit_number",
                    header
                ));
                break;
            }
        }
    }

    MappingInference { targets, warnings }
}
