// ==========================================
// 楼盘单元库存系统 - 项目领域模型
// ==========================================
// 职责: 项目/楼栋/户型实体 + 规范化所需的项目上下文
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Project - 楼盘项目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub name: String,
    pub default_building_id: Option<String>, // 楼栋解析兜底
    pub created_at: DateTime<Utc>,
}

// ==========================================
// Building - 楼栋
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub building_id: String,
    pub project_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// Layout - 户型
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub layout_id: String,
    pub project_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// ProjectContext - 规范化阶段的项目上下文
// ==========================================
// 一次导入开始时加载一次,规范化器只读使用
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub project: Project,
    pub buildings: Vec<Building>,
    pub layouts: Vec<Layout>,
    /// 请求级覆盖,优先于 project.default_building_id
    pub default_building_id: Option<String>,
}

impl ProjectContext {
    /// 按名称解析楼栋
    ///
    /// 顺序: 小写精确匹配 -> 互相包含匹配 -> 请求级默认楼栋
    /// -> 项目默认楼栋 -> 项目第一个楼栋
    pub fn resolve_building(&self, name: Option<&str>) -> Option<&Building> {
        if let Some(raw) = name {
            let needle = raw.trim().to_lowercase();
            if !needle.is_empty() {
                if let Some(b) = self
                    .buildings
                    .iter()
                    .find(|b| b.name.to_lowercase() == needle)
                {
                    return Some(b);
                }
                if let Some(b) = self.buildings.iter().find(|b| {
                    let candidate = b.name.to_lowercase();
                    candidate.contains(&needle) || needle.contains(&candidate)
                }) {
                    return Some(b);
                }
            }
        }

        let fallback_id = self
            .default_building_id
            .as_deref()
            .or(self.project.default_building_id.as_deref());
        if let Some(id) = fallback_id {
            if let Some(b) = self.buildings.iter().find(|b| b.building_id == id) {
                return Some(b);
            }
        }
        self.buildings.first()
    }

    /// 按 ID 或名称解析户型（同项目内）
    pub fn resolve_layout(&self, raw: &str) -> Option<&Layout> {
        let needle = raw.trim();
        if needle.is_empty() {
            return None;
        }
        self.layouts
            .iter()
            .find(|l| l.layout_id == needle)
            .or_else(|| {
                let lower = needle.to_lowercase();
                self.layouts.iter().find(|l| l.name.to_lowercase() == lower)
            })
    }
}
