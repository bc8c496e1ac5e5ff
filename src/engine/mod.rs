// ==========================================
// 楼盘单元库存系统 - 对账引擎模块
// ==========================================

pub mod reconciliation;

pub use reconciliation::{
    plan_reconciliation, ReconcileOptions, ReconcileOutcome, ReconcilePlan, ReconciliationEngine,
};
