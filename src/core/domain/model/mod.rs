pub mod config;
pub mod fleet_view;
pub mod pending_action;
pub mod storage_pool;
pub mod vm;
