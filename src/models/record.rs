use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 记账模块类型
///
/// 声明顺序即同日交易的排序优先级：发票 < 收款 < 贷项通知单。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Invoice,
    Payment,
    CreditNote,
}

impl RecordType {
    /// 同步时的模块拉取顺序
    pub const ALL: [RecordType; 3] = [RecordType::Invoice, RecordType::Payment, RecordType::CreditNote];

    /// 远端 API 的模块名
    pub fn module(self) -> &'static str {
        match self {
            RecordType::Invoice => "invoices",
            RecordType::Payment => "customerpayments",
            RecordType::CreditNote => "creditnotes",
        }
    }

    /// 是否带有明细行
    pub fn has_line_items(self) -> bool {
        !matches!(self, RecordType::Payment)
    }

    pub fn label(self) -> &'static str {
        match self {
            RecordType::Invoice => "Invoice",
            RecordType::Payment => "Payment",
            RecordType::CreditNote => "Credit Note",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 源系统给出的原始金额, 原样保留; 只有账本构建时才转成十进制
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(serde_json::Number),
    Text(String),
    #[default]
    Missing,
    /// 对象、布尔等非金额值，整条记录仍保留，金额按 0 处理
    Other(serde_json::Value),
}

impl RawAmount {
    /// 缺失或无法解析时返回 `None`
    pub fn to_decimal(&self) -> Option<BigDecimal> {
        match self {
            RawAmount::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
            RawAmount::Text(s) => BigDecimal::from_str(s.trim()).ok(),
            RawAmount::Missing | RawAmount::Other(_) => None,
        }
    }

    /// 源系统金额不应为负, 负数取绝对值, 记入借方还是贷方由类型决定
    pub fn to_decimal_or_zero(&self) -> BigDecimal {
        self.to_decimal()
            .map(|v| v.abs())
            .unwrap_or_else(BigDecimal::zero)
    }
}

impl From<&str> for RawAmount {
    fn from(s: &str) -> Self {
        RawAmount::Text(s.to_string())
    }
}

/// 三类记录共有字段
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordCommon {
    pub id: String,
    pub date: String,
    pub reference: String,
    #[serde(default)]
    pub amount: RawAmount,
    #[serde(default)]
    pub project: Option<String>,
}

/// 外部记账服务的原始记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawRecord {
    Invoice {
        #[serde(flatten)]
        common: RecordCommon,
        due_date: Option<String>,
    },
    Payment {
        #[serde(flatten)]
        common: RecordCommon,
        /// 该笔收款核销的发票号
        #[serde(default)]
        applied_invoices: Vec<String>,
    },
    CreditNote {
        #[serde(flatten)]
        common: RecordCommon,
    },
}

impl RawRecord {
    pub fn record_type(&self) -> RecordType {
        match self {
            RawRecord::Invoice { .. } => RecordType::Invoice,
            RawRecord::Payment { .. } => RecordType::Payment,
            RawRecord::CreditNote { .. } => RecordType::CreditNote,
        }
    }

    pub fn common(&self) -> &RecordCommon {
        match self {
            RawRecord::Invoice { common, .. }
            | RawRecord::Payment { common, .. }
            | RawRecord::CreditNote { common } => common,
        }
    }
}

/// 发票/贷项通知单明细行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: BigDecimal,
    pub rate: BigDecimal,
    pub line_total: BigDecimal,
}

/// `fetch_detail` 的结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordDetail {
    pub line_items: Vec<LineItem>,
}

/// 单个客户一次同步得到的三组记录 (各自保持源顺序)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerRecords {
    pub invoices: Vec<RawRecord>,
    pub payments: Vec<RawRecord>,
    pub credit_notes: Vec<RawRecord>,
}

impl CustomerRecords {
    pub fn get(&self, record_type: RecordType) -> &[RawRecord] {
        match record_type {
            RecordType::Invoice => &self.invoices,
            RecordType::Payment => &self.payments,
            RecordType::CreditNote => &self.credit_notes,
        }
    }

    pub fn set(&mut self, record_type: RecordType, records: Vec<RawRecord>) {
        match record_type {
            RecordType::Invoice => self.invoices = records,
            RecordType::Payment => self.payments = records,
            RecordType::CreditNote => self.credit_notes = records,
        }
    }

    /// 按 发票 → 收款 → 贷项 的固定顺序串联
    pub fn iter_in_priority(&self) -> impl Iterator<Item = &RawRecord> {
        RecordType::ALL.into_iter().flat_map(move |t| self.get(t).iter())
    }

    pub fn len(&self) -> usize {
        self.invoices.len() + self.payments.len() + self.credit_notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
