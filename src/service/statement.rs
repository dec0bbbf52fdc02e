use bigdecimal::{BigDecimal, Zero};

use crate::models::{Customer, LedgerEntry, Statement};

/// 生成对账单，屏幕、文档导出、表格导出都只从这里取数
///
/// 合计直接对已算好的账本行求和，不回头重算原始记录，保证与余额列一致。
pub fn materialize(customer: &Customer, entries: Vec<LedgerEntry>) -> Statement {
    let mut total_invoiced = BigDecimal::zero();
    let mut total_received = BigDecimal::zero();
    for entry in &entries {
        total_invoiced += &entry.debit_amount;
        total_received += &entry.credit_amount;
    }

    let balance_due = entries
        .last()
        .map(|e| e.running_balance.clone())
        .unwrap_or_else(|| customer.opening_balance.clone());

    Statement {
        customer: customer.clone(),
        opening_balance: customer.opening_balance.clone(),
        entries,
        total_invoiced,
        total_received,
        balance_due,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomerRecords, RawRecord, RecordCommon};
    use crate::service::ledger::build_ledger;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn zero_transactions_keep_opening_balance() {
        let customer = Customer::new("c1", "Acme", dec("250.75"));
        let statement = materialize(&customer, Vec::new());
        assert!(statement.entries.is_empty());
        assert_eq!(statement.balance_due, dec("250.75"));
        assert_eq!(statement.total_invoiced, BigDecimal::zero());
        assert_eq!(statement.total_received, BigDecimal::zero());
    }

    #[test]
    fn totals_reconcile_with_running_balance() {
        let customer = Customer::new("c1", "Acme", dec("-40"));
        let mk = |id: &str, date: &str, amount: &str| RecordCommon {
            id: id.into(),
            date: date.into(),
            reference: id.into(),
            amount: amount.into(),
            project: None,
        };
        let records = CustomerRecords {
            invoices: vec![
                RawRecord::Invoice { common: mk("i1", "2024-01-03", "120.10"), due_date: None },
                RawRecord::Invoice { common: mk("i2", "2024-01-09", "80"), due_date: None },
            ],
            payments: vec![RawRecord::Payment {
                common: mk("p1", "2024-01-04", "60.05"),
                applied_invoices: vec![],
            }],
            credit_notes: vec![RawRecord::CreditNote { common: mk("c1", "2024-01-10", "15") }],
        };

        let statement = materialize(&customer, build_ledger(&customer.opening_balance, &records));
        assert_eq!(statement.total_invoiced, dec("200.10"));
        assert_eq!(statement.total_received, dec("75.05"));
        assert_eq!(
            statement.balance_due,
            &statement.opening_balance + &statement.total_invoiced - &statement.total_received
        );
        assert_eq!(statement.balance_due, dec("85.05"));
    }
}
