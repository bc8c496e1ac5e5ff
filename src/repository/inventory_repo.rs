// ==========================================
// 楼盘单元库存系统 - 库存仓储接口
// ==========================================
// 职责: 定义项目/楼栋/户型/单元/版本的数据访问接口
// 红线: Repository 不含业务规则,只做数据 CRUD
// ==========================================

use crate::domain::project::{Building, Layout, Project};
use crate::domain::unit::{Unit, UnitVersion};
use crate::repository::error::RepoResult;
use async_trait::async_trait;

// ==========================================
// UnitMutation - 一次对账产生的单元变更
// ==========================================
// 引擎计算,仓储原子应用;每条变更携带其版本台账记录
// 版本记录与单元变更同序写入（审计可读性要求）
#[derive(Debug, Clone)]
pub enum UnitMutation {
    Create { unit: Unit, version: UnitVersion },
    Update { unit: Unit, version: UnitVersion },
}

impl UnitMutation {
    pub fn unit(&self) -> &Unit {
        match self {
            UnitMutation::Create { unit, .. } | UnitMutation::Update { unit, .. } => unit,
        }
    }
}

// ==========================================
// InventoryRepository Trait
// ==========================================
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    // ===== 项目维度读取 =====

    /// 按 ID 获取项目（不存在返回 None）
    async fn get_project(&self, project_id: &str) -> RepoResult<Option<Project>>;

    /// 项目全部楼栋
    async fn list_buildings(&self, project_id: &str) -> RepoResult<Vec<Building>>;

    /// 项目全部户型
    async fn list_layouts(&self, project_id: &str) -> RepoResult<Vec<Layout>>;

    /// 项目全部单元（含 SOLD,用于自然键匹配）
    async fn list_units(&self, project_id: &str) -> RepoResult<Vec<Unit>>;

    /// 单元的版本台账（按写入顺序）
    async fn list_versions(&self, unit_id: &str) -> RepoResult<Vec<UnitVersion>>;

    // ===== 对账写入 =====

    /// 原子应用一批单元变更（单事务;任一失败则整体回滚）
    ///
    /// 版本记录与单元变更在同一事务内按传入顺序写入
    async fn apply_mutations(&self, mutations: &[UnitMutation]) -> RepoResult<()>;

    // ===== 基础数据写入（种子/测试/运维） =====

    async fn insert_project(&self, project: &Project) -> RepoResult<()>;
    async fn insert_building(&self, building: &Building) -> RepoResult<()>;
    async fn insert_layout(&self, layout: &Layout) -> RepoResult<()>;
}
