use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::customer::Customer;
use super::record::{LineItem, RecordType};

/// 账本行附带的明细
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EntryDetail {
    /// 未解析到明细 (渲染时按空白处理)
    #[default]
    None,
    LineItems(Vec<LineItem>),
    /// 收款核销的发票号, 直接取自原始收款记录
    AppliedInvoices(Vec<String>),
}

/// 账本行
///
/// 借贷只有一边非零：发票记借方，收款与贷项通知单记贷方。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// 解析失败时为 `None`，排在所有有日期的行之后
    pub date: Option<NaiveDate>,
    /// 源系统日期原文
    pub raw_date: String,
    pub record_type: RecordType,
    pub record_id: String,
    pub reference: String,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    pub running_balance: BigDecimal,
    pub project: Option<String>,
    pub detail: EntryDetail,
}

impl LedgerEntry {
    /// 显示用日期
    pub fn date_label(&self) -> String {
        match self.date {
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None => self.raw_date.clone(),
        }
    }
}

/// 单个客户的对账单，三个输出面共用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub customer: Customer,
    pub opening_balance: BigDecimal,
    pub entries: Vec<LedgerEntry>,
    pub total_invoiced: BigDecimal,
    pub total_received: BigDecimal,
    pub balance_due: BigDecimal,
}

/// 表格导出的扁平行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub date: String,
    pub transaction: String,
    pub details: String,
    pub amount: Option<BigDecimal>,
    pub payments: Option<BigDecimal>,
    pub balance: BigDecimal,
    pub customer: String,
    pub project: String,
}
