use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::format::AmountFormat;
use crate::models::{EntryDetail, ExportRow, LedgerEntry, RecordType, Statement};

pub const OPENING_BALANCE_LABEL: &str = "Opening Balance";

const CSV_HEADER: [&str; 8] = [
    "Date",
    "Transaction",
    "Details",
    "Amount",
    "Payments",
    "Balance",
    "Customer",
    "Project",
];

/// 导出取数来源
///
/// 默认导出重新生成的对账单；只有显式选择 `Edited` 才按人工编辑后的屏幕内容导出。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportSource {
    #[default]
    Original,
    Edited,
}

/// 文档导出的表头汇总 (已格式化)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub opening_balance: String,
    pub total_invoiced: String,
    pub total_received: String,
    pub balance_due: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRow {
    pub date: String,
    pub transaction: String,
    pub details: String,
    pub debit: String,
    pub credit: String,
    pub balance: String,
}

/// 文档导出用的静态表格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTable {
    pub customer: String,
    pub source: ExportSource,
    pub summary: DocumentSummary,
    pub rows: Vec<DocumentRow>,
}

/// 账本行的明细列文本
pub fn details_text(entry: &LedgerEntry, fmt: &AmountFormat) -> String {
    match &entry.detail {
        EntryDetail::None => entry.reference.clone(),
        EntryDetail::LineItems(items) if items.is_empty() => entry.reference.clone(),
        EntryDetail::LineItems(items) => {
            let lines: Vec<String> = items
                .iter()
                .map(|item| {
                    format!(
                        "{} x {} @ {} = {}",
                        item.name,
                        item.quantity,
                        fmt.format(&item.rate),
                        fmt.format(&item.line_total)
                    )
                })
                .collect();
            format!("{}: {}", entry.reference, lines.join("; "))
        }
        EntryDetail::AppliedInvoices(numbers) if numbers.is_empty() => entry.reference.clone(),
        EntryDetail::AppliedInvoices(numbers) => {
            format!("{} (applied to {})", entry.reference, numbers.join(", "))
        }
    }
}

/// 表格导出行：期初余额行 + 每个账本行一行
pub fn export_rows(statement: &Statement, fmt: &AmountFormat) -> Vec<ExportRow> {
    let customer = statement.customer.name.clone();
    let mut rows = Vec::with_capacity(statement.entries.len() + 1);
    rows.push(ExportRow {
        date: String::new(),
        transaction: OPENING_BALANCE_LABEL.to_string(),
        details: String::new(),
        amount: None,
        payments: None,
        balance: statement.opening_balance.clone(),
        customer: customer.clone(),
        project: String::new(),
    });

    for entry in &statement.entries {
        let is_debit = entry.record_type == RecordType::Invoice;
        rows.push(ExportRow {
            date: entry.date_label(),
            transaction: entry.record_type.label().to_string(),
            details: details_text(entry, fmt),
            amount: is_debit.then(|| entry.debit_amount.clone()),
            payments: (!is_debit).then(|| entry.credit_amount.clone()),
            balance: entry.running_balance.clone(),
            customer: customer.clone(),
            project: entry.project.clone().unwrap_or_default(),
        });
    }

    rows
}

fn option_to_csv(val: &Option<BigDecimal>, fmt: &AmountFormat) -> String {
    val.as_ref().map(|v| fmt.format(v)).unwrap_or_default()
}

/// 写出 CSV
pub fn write_csv<W: Write>(rows: &[ExportRow], fmt: &AmountFormat, writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CSV_HEADER)?;

    for row in rows {
        writer.write_record([
            row.date.clone(),
            row.transaction.clone(),
            row.details.clone(),
            option_to_csv(&row.amount, fmt),
            option_to_csv(&row.payments, fmt),
            fmt.format(&row.balance),
            row.customer.clone(),
            row.project.clone(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// 文档导出表格
pub fn document_table(statement: &Statement, fmt: &AmountFormat) -> DocumentTable {
    let rows = statement
        .entries
        .iter()
        .map(|entry| {
            let is_debit = entry.record_type == RecordType::Invoice;
            DocumentRow {
                date: entry.date_label(),
                transaction: entry.record_type.label().to_string(),
                details: details_text(entry, fmt),
                debit: if is_debit { fmt.format(&entry.debit_amount) } else { String::new() },
                credit: if is_debit { String::new() } else { fmt.format(&entry.credit_amount) },
                balance: fmt.format(&entry.running_balance),
            }
        })
        .collect();

    DocumentTable {
        customer: statement.customer.name.clone(),
        source: ExportSource::Original,
        summary: DocumentSummary {
            opening_balance: fmt.format(&statement.opening_balance),
            total_invoiced: fmt.format(&statement.total_invoiced),
            total_received: fmt.format(&statement.total_received),
            balance_due: fmt.format(&statement.balance_due),
        },
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Customer, LineItem};
    use crate::service::statement::materialize;
    use bigdecimal::Zero;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn sample_statement() -> Statement {
        let customer = Customer::new("c1", "Acme Ltd", dec("1000"));
        let invoice = LedgerEntry {
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1),
            raw_date: "2024-01-01".into(),
            record_type: RecordType::Invoice,
            record_id: "i1".into(),
            reference: "INV-001".into(),
            debit_amount: dec("1500"),
            credit_amount: BigDecimal::zero(),
            running_balance: dec("2500"),
            project: Some("Website".into()),
            detail: EntryDetail::LineItems(vec![LineItem {
                name: "Design".into(),
                quantity: dec("3"),
                rate: dec("500"),
                line_total: dec("1500"),
            }]),
        };
        let payment = LedgerEntry {
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 2),
            raw_date: "2024-01-02".into(),
            record_type: RecordType::Payment,
            record_id: "p1".into(),
            reference: "PAY-001".into(),
            debit_amount: BigDecimal::zero(),
            credit_amount: dec("300"),
            running_balance: dec("2200"),
            project: None,
            detail: EntryDetail::AppliedInvoices(vec!["INV-001".into()]),
        };
        materialize(&customer, vec![invoice, payment])
    }

    #[test]
    fn rows_start_with_opening_balance_header() {
        let fmt = AmountFormat::default();
        let rows = export_rows(&sample_statement(), &fmt);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].transaction, OPENING_BALANCE_LABEL);
        assert_eq!(rows[0].balance, dec("1000"));
        assert_eq!(rows[1].amount, Some(dec("1500")));
        assert_eq!(rows[1].payments, None);
        assert_eq!(rows[1].details, "INV-001: Design x 3 @ 500.00 = 1,500.00");
        assert_eq!(rows[1].project, "Website");
        assert_eq!(rows[2].payments, Some(dec("300")));
        assert_eq!(rows[2].details, "PAY-001 (applied to INV-001)");
        assert!(rows.iter().all(|r| r.customer == "Acme Ltd"));
    }

    #[test]
    fn csv_uses_formatted_amounts() {
        let fmt = AmountFormat::default();
        let rows = export_rows(&sample_statement(), &fmt);
        let mut buf = Vec::new();
        write_csv(&rows, &fmt, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Date,Transaction,Details,Amount,Payments,Balance,Customer,Project");
        assert_eq!(lines[1], ",Opening Balance,,,,\"1,000.00\",Acme Ltd,");
        assert_eq!(lines[3], "2024-01-02,Payment,PAY-001 (applied to INV-001),,300.00,\"2,200.00\",Acme Ltd,");
    }

    #[test]
    fn document_table_matches_statement_totals() {
        let fmt = AmountFormat::default();
        let statement = sample_statement();
        let table = document_table(&statement, &fmt);
        assert_eq!(table.summary.balance_due, "2,200.00");
        assert_eq!(table.summary.total_invoiced, "1,500.00");
        assert_eq!(table.summary.total_received, "300.00");
        assert_eq!(table.rows[0].debit, "1,500.00");
        assert_eq!(table.rows[0].credit, "");
        assert_eq!(table.rows[1].credit, "300.00");
        assert_eq!(table.rows.last().map(|r| r.balance.as_str()), Some("2,200.00"));
    }
}
