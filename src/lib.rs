//! 客户对账单：从外部记账服务汇集发票、收款、贷项通知单，
//! 生成带滚动余额的按客户账本，供屏幕、文档导出、表格导出共用。

pub mod api;
pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod service;
pub mod source;

pub use config::AppConfig;
pub use format::AmountFormat;
pub use service::StatementService;
pub use source::{create_client, HttpRecordSource, RecordSource};
