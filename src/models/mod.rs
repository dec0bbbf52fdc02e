pub mod customer;
pub mod ledger;
pub mod record;

pub use customer::Customer;
pub use ledger::{EntryDetail, ExportRow, LedgerEntry, Statement};
pub use record::{
    CustomerRecords, LineItem, RawAmount, RawRecord, RecordCommon, RecordDetail, RecordType,
};
