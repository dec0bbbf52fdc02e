use bigdecimal::{BigDecimal, Zero};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexSet;

use crate::models::{CustomerRecords, EntryDetail, LedgerEntry, RawRecord};

/// 宽松解析日期：`YYYY-MM-DD`、带时间的 ISO 格式、`DD/MM/YYYY`
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Some(head) = raw.get(..10) {
        if raw.len() > 10 {
            if let Ok(d) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
                return Some(d);
            }
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok()
}

/// 原始记录 → 账本行 (余额稍后串联)
///
/// 发票记借方；收款与贷项通知单都记贷方。贷项通知单虽然是另一种业务单据，
/// 但它同样减少客户欠款，所以在账本上和收款一样处理。
fn to_entry(record: &RawRecord) -> LedgerEntry {
    let common = record.common();
    let amount = common.amount.to_decimal_or_zero();
    if common.amount.to_decimal().is_none() {
        tracing::warn!(
            "{} {} 金额缺失或无法解析 ({:?}), 按 0 处理",
            record.record_type(),
            common.reference,
            common.amount
        );
    }

    let (debit_amount, credit_amount, detail) = match record {
        RawRecord::Invoice { .. } => (amount, BigDecimal::zero(), EntryDetail::None),
        RawRecord::Payment { applied_invoices, .. } => {
            let applied: IndexSet<String> = applied_invoices.iter().cloned().collect();
            (
                BigDecimal::zero(),
                amount,
                EntryDetail::AppliedInvoices(applied.into_iter().collect()),
            )
        }
        RawRecord::CreditNote { .. } => (BigDecimal::zero(), amount, EntryDetail::None),
    };

    LedgerEntry {
        date: parse_date(&common.date),
        raw_date: common.date.clone(),
        record_type: record.record_type(),
        record_id: common.id.clone(),
        reference: common.reference.clone(),
        debit_amount,
        credit_amount,
        running_balance: BigDecimal::zero(),
        project: common.project.clone(),
        detail,
    }
}

/// 构建账本：归一化 → 按日期稳定排序 → 从期初余额开始逐行累计
///
/// 同日交易保持 发票 → 收款 → 贷项 的串联顺序，各模块内部保持源顺序。
/// 无法解析日期的记录排在最后。
pub fn build_ledger(opening_balance: &BigDecimal, records: &CustomerRecords) -> Vec<LedgerEntry> {
    let mut entries: Vec<LedgerEntry> = records.iter_in_priority().map(to_entry).collect();

    // sort_by_key 是稳定排序
    entries.sort_by_key(|e| (e.date.is_none(), e.date));

    let mut running = opening_balance.clone();
    for entry in entries.iter_mut() {
        running = &running + &entry.debit_amount - &entry.credit_amount;
        entry.running_balance = running.clone();
    }

    entries
}
