use thiserror::Error;

use crate::models::RecordType;

/// 外部记账服务调用错误
#[derive(Debug, Error)]
pub enum SourceError {
    /// 凭证失效或无权限，需要由会话层重新认证
    #[error("session rejected by accounting service (HTTP {status})")]
    Session { status: u16 },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl SourceError {
    pub fn is_session(&self) -> bool {
        matches!(self, SourceError::Session { .. })
    }
}

/// 同步过程中唯一向上抛出的错误；模块级失败在内部吸收
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no active organization")]
    NoOrganization,

    #[error("session rejected (HTTP {status}) while fetching {record_type:?} for customer {customer_id}")]
    Session {
        customer_id: String,
        record_type: Option<RecordType>,
        status: u16,
    },
}
