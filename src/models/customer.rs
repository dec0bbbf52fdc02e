use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// 客户
///
/// `opening_balance` 只在构建账本时读取，之后不会被修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub opening_balance: BigDecimal,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Customer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, opening_balance: BigDecimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            opening_balance,
            email: None,
            phone: None,
        }
    }
}
