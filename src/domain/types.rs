// ==========================================
// 楼盘单元库存系统 - 基础类型定义
// ==========================================
// 职责: 定义跨层共享的枚举类型
// 红线: 仅类型定义,不含业务逻辑
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// UnitStatus - 单元销售状态
// ==========================================
// 状态语义: 导入对账的核心状态机
// AVAILABLE/RESERVED -> SOLD 为隐式退市(本批次未提交即视为售出)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Available,
    Reserved,
    Sold,
}

impl UnitStatus {
    /// 数据库/JSON 统一序列化形式（全大写）
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Available => "AVAILABLE",
            UnitStatus::Reserved => "RESERVED",
            UnitStatus::Sold => "SOLD",
        }
    }

    /// 从数据库字符串解析（未知值回退 AVAILABLE）
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "SOLD" => UnitStatus::Sold,
            "RESERVED" => UnitStatus::Reserved,
            _ => UnitStatus::Available,
        }
    }
}

// ==========================================
// UpdateType - 版本记录变更类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateType {
    Create,
    Update,
}

impl UpdateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Create => "CREATE",
            UpdateType::Update => "UPDATE",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "CREATE" => UpdateType::Create,
            _ => UpdateType::Update,
        }
    }
}

// ==========================================
// AuthContext - 调用方身份
// ==========================================
// 说明: 认证策略不在本核心范围内(视为已通过的能力检查)
// 此处仅区分"交互式"与"自动化"两类调用方,用于审批门禁判断
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    /// 交互式会话调用（人工操作,始终有权直接执行对账）
    Interactive { user: String },
    /// 自动化调用（机器对机器,需审批过的映射才能执行对账）
    Automated { client: String },
}

impl AuthContext {
    /// 是否为自动化调用方
    pub fn is_automated(&self) -> bool {
        matches!(self, AuthContext::Automated { .. })
    }

    /// 操作者标识（写入 import_record.imported_by）
    pub fn actor(&self) -> &str {
        match self {
            AuthContext::Interactive { user } => user,
            AuthContext::Automated { client } => client,
        }
    }
}
