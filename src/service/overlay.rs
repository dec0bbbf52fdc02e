use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::format::AmountFormat;
use crate::models::{ExportRow, RecordType, Statement};
use crate::service::export::{
    details_text, DocumentRow, DocumentSummary, DocumentTable, ExportSource, OPENING_BALANCE_LABEL,
};

/// 屏幕上可编辑的一行，只保留文本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayRow {
    pub date: String,
    pub transaction: String,
    pub details: String,
    pub project: String,
    pub debit_text: String,
    pub credit_text: String,
    pub balance_text: String,
}

/// 人工编辑操作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OverlayEdit {
    DeleteRow { index: usize },
    SetDebit { index: usize, text: String },
    SetCredit { index: usize, text: String },
}

/// 对账单的屏幕展示层
///
/// 与 `Statement` 相互独立：编辑和重算只改这里的文本。表头合计在生成时定格，
/// 编辑后不会重算，所以可能与余额列不一致。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationOverlay {
    pub customer: String,
    pub opening_balance_text: String,
    pub total_invoiced_text: String,
    pub total_received_text: String,
    pub balance_due_text: String,
    pub rows: Vec<OverlayRow>,
}

impl PresentationOverlay {
    pub fn from_statement(statement: &Statement, fmt: &AmountFormat) -> Self {
        let rows = statement
            .entries
            .iter()
            .map(|entry| {
                let is_debit = entry.record_type == RecordType::Invoice;
                OverlayRow {
                    date: entry.date_label(),
                    transaction: entry.record_type.label().to_string(),
                    details: details_text(entry, fmt),
                    project: entry.project.clone().unwrap_or_default(),
                    debit_text: if is_debit { fmt.format(&entry.debit_amount) } else { String::new() },
                    credit_text: if is_debit { String::new() } else { fmt.format(&entry.credit_amount) },
                    balance_text: fmt.format(&entry.running_balance),
                }
            })
            .collect();

        Self {
            customer: statement.customer.name.clone(),
            opening_balance_text: fmt.format(&statement.opening_balance),
            total_invoiced_text: fmt.format(&statement.total_invoiced),
            total_received_text: fmt.format(&statement.total_received),
            balance_due_text: fmt.format(&statement.balance_due),
            rows,
        }
    }

    pub fn delete_row(&mut self, index: usize) -> bool {
        if index >= self.rows.len() {
            return false;
        }
        self.rows.remove(index);
        true
    }

    pub fn set_debit_text(&mut self, index: usize, text: &str) -> bool {
        match self.rows.get_mut(index) {
            Some(row) => {
                row.debit_text = text.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_credit_text(&mut self, index: usize, text: &str) -> bool {
        match self.rows.get_mut(index) {
            Some(row) => {
                row.credit_text = text.to_string();
                true
            }
            None => false,
        }
    }

    /// 越界的编辑返回 `false` 且不做任何修改
    pub fn apply(&mut self, edit: &OverlayEdit) -> bool {
        match edit {
            OverlayEdit::DeleteRow { index } => self.delete_row(*index),
            OverlayEdit::SetDebit { index, text } => self.set_debit_text(*index, text),
            OverlayEdit::SetCredit { index, text } => self.set_credit_text(*index, text),
        }
    }

    /// 按当前行顺序从上到下重算余额列
    ///
    /// 只读可见的借/贷文本，从期初余额文本开始累计；表头合计不动。
    pub fn recalculate(&mut self, fmt: &AmountFormat) {
        let mut running = fmt.parse(&self.opening_balance_text);
        for row in self.rows.iter_mut() {
            let debit = fmt.parse(&row.debit_text);
            let credit = fmt.parse(&row.credit_text);
            running = running + debit - credit;
            row.balance_text = fmt.format(&running);
        }
    }

    fn amount_cell(text: &str, fmt: &AmountFormat) -> Option<BigDecimal> {
        if text.trim().is_empty() {
            None
        } else {
            Some(fmt.parse(text))
        }
    }

    /// 按编辑后的屏幕内容生成表格导出行
    pub fn export_rows(&self, fmt: &AmountFormat) -> Vec<ExportRow> {
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(ExportRow {
            date: String::new(),
            transaction: OPENING_BALANCE_LABEL.to_string(),
            details: String::new(),
            amount: None,
            payments: None,
            balance: fmt.parse(&self.opening_balance_text),
            customer: self.customer.clone(),
            project: String::new(),
        });

        rows.extend(self.rows.iter().map(|row| ExportRow {
            date: row.date.clone(),
            transaction: row.transaction.clone(),
            details: row.details.clone(),
            amount: Self::amount_cell(&row.debit_text, fmt),
            payments: Self::amount_cell(&row.credit_text, fmt),
            balance: fmt.parse(&row.balance_text),
            customer: self.customer.clone(),
            project: row.project.clone(),
        }));

        rows
    }

    /// 按编辑后的屏幕内容生成文档表格
    pub fn document_table(&self) -> DocumentTable {
        DocumentTable {
            customer: self.customer.clone(),
            source: ExportSource::Edited,
            summary: DocumentSummary {
                opening_balance: self.opening_balance_text.clone(),
                total_invoiced: self.total_invoiced_text.clone(),
                total_received: self.total_received_text.clone(),
                balance_due: self.balance_due_text.clone(),
            },
            rows: self
                .rows
                .iter()
                .map(|row| DocumentRow {
                    date: row.date.clone(),
                    transaction: row.transaction.clone(),
                    details: row.details.clone(),
                    debit: row.debit_text.clone(),
                    credit: row.credit_text.clone(),
                    balance: row.balance_text.clone(),
                })
                .collect(),
        }
    }
}
