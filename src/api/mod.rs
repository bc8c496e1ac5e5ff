// ==========================================
// 楼盘单元库存系统 - API 模块
// ==========================================

pub mod error;
pub mod import_api;

pub use error::{ApiError, ErrorBody};
pub use import_api::{
    Credentials, ImportUnitsRequest, ImportUnitsResponse, PendingApprovalBody,
    ProcessPendingResponse, UnitImportApi,
};
