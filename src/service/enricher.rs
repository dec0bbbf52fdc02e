use indexmap::IndexSet;

use crate::models::{CustomerRecords, EntryDetail, LedgerEntry, RecordType};
use crate::service::context::DetailCache;

/// 从明细缓存挂载发票/贷项通知单的明细行，返回挂载成功的行数
///
/// 缓存未命中的行保持 `EntryDetail::None`；收款行原样保留核销发票号。
pub fn enrich(entries: &mut [LedgerEntry], cache: &DetailCache) -> usize {
    let mut attached = 0;
    for entry in entries.iter_mut() {
        if !entry.record_type.has_line_items() {
            continue;
        }
        if let Some(detail) = cache.get(entry.record_type, &entry.record_id) {
            entry.detail = EntryDetail::LineItems(detail.line_items);
            attached += 1;
        }
    }
    attached
}

/// 尚未缓存明细的 (类型, ID)，保持源顺序并去重
pub fn pending_details(records: &CustomerRecords, cache: &DetailCache) -> IndexSet<(RecordType, String)> {
    records
        .iter_in_priority()
        .filter(|r| r.record_type().has_line_items())
        .map(|r| (r.record_type(), r.common().id.clone()))
        .filter(|(t, id)| !id.is_empty() && !cache.contains(*t, id))
        .collect()
}
