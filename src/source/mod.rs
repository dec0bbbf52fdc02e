pub mod client;
pub mod http;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::models::{Customer, RawRecord, RecordDetail, RecordType};

pub use client::create_client;
pub use http::HttpRecordSource;

/// 外部记账服务接口
///
/// 每次调用返回该类型的完整快照，不做增量合并。
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_customer(&self, org_id: &str, customer_id: &str) -> Result<Customer, SourceError>;

    async fn fetch_records(
        &self,
        org_id: &str,
        customer_id: &str,
        record_type: RecordType,
    ) -> Result<Vec<RawRecord>, SourceError>;

    async fn fetch_detail(
        &self,
        org_id: &str,
        record_type: RecordType,
        record_id: &str,
    ) -> Result<RecordDetail, SourceError>;
}
