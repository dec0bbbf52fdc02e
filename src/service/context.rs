use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{Customer, CustomerRecords, RawRecord, RecordDetail, RecordType};
use crate::service::overlay::PresentationOverlay;

/// 明细缓存 (记录类型, 记录ID) -> 明细行
///
/// 只追加：同一个 key 第二次写入会被忽略。
#[derive(Debug, Default)]
pub struct DetailCache {
    entries: DashMap<(RecordType, String), RecordDetail>,
}

impl DetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, record_type: RecordType, record_id: &str) -> Option<RecordDetail> {
        self.entries
            .get(&(record_type, record_id.to_string()))
            .map(|d| d.value().clone())
    }

    pub fn contains(&self, record_type: RecordType, record_id: &str) -> bool {
        self.entries.contains_key(&(record_type, record_id.to_string()))
    }

    /// 返回是否为新写入
    pub fn insert(&self, record_type: RecordType, record_id: &str, detail: RecordDetail) -> bool {
        let mut inserted = false;
        self.entries
            .entry((record_type, record_id.to_string()))
            .or_insert_with(|| {
                inserted = true;
                detail
            });
        inserted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 按 (客户, 模块) 存放的原始记录，每次同步整体替换
#[derive(Debug, Default)]
pub struct RecordStore {
    customers: DashMap<String, Customer>,
    records: DashMap<(String, RecordType), Vec<RawRecord>>,
}

impl RecordStore {
    pub fn replace_customer(&self, customer: Customer) {
        self.customers.insert(customer.id.clone(), customer);
    }

    pub fn customer(&self, customer_id: &str) -> Option<Customer> {
        self.customers.get(customer_id).map(|c| c.value().clone())
    }

    pub fn replace_records(&self, customer_id: &str, record_type: RecordType, records: Vec<RawRecord>) {
        self.records.insert((customer_id.to_string(), record_type), records);
    }

    /// 未同步过的模块按空集合处理
    pub fn customer_records(&self, customer_id: &str) -> CustomerRecords {
        let mut out = CustomerRecords::default();
        for record_type in RecordType::ALL {
            if let Some(records) = self.records.get(&(customer_id.to_string(), record_type)) {
                out.set(record_type, records.value().clone());
            }
        }
        out
    }

    /// 删除客户及其全部模块记录
    pub fn remove_customer(&self, customer_id: &str) {
        self.customers.remove(customer_id);
        for record_type in RecordType::ALL {
            self.records.remove(&(customer_id.to_string(), record_type));
        }
    }

    pub fn customer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.customers.iter().map(|c| c.key().clone()).collect();
        ids.sort();
        ids
    }
}

/// 某个组织下的全部可变状态
///
/// 切换组织或登出时整体丢弃，不做原地清理。
#[derive(Debug)]
pub struct OrgContext {
    pub org_id: Option<String>,
    pub generation: u64,
    pub store: RecordStore,
    pub details: DetailCache,
    pub overlays: DashMap<String, PresentationOverlay>,
}

impl OrgContext {
    fn new(org_id: Option<String>, generation: u64) -> Self {
        Self {
            org_id,
            generation,
            store: RecordStore::default(),
            details: DetailCache::new(),
            overlays: DashMap::new(),
        }
    }

    /// 丢弃客户的屏幕展示层，下次访问时按最新记录重建
    pub fn invalidate_overlay(&self, customer_id: &str) {
        self.overlays.remove(customer_id);
    }

    /// 客户本轮无法同步：上一轮的记录和编辑都不再展示
    pub fn forget_customer(&self, customer_id: &str) {
        self.store.remove_customer(customer_id);
        self.invalidate_overlay(customer_id);
    }
}

/// 持有当前组织上下文
#[derive(Debug)]
pub struct Workspace {
    current: RwLock<Arc<OrgContext>>,
    generation: AtomicU64,
}

impl Workspace {
    pub fn new(org_id: Option<String>) -> Self {
        Self {
            current: RwLock::new(Arc::new(OrgContext::new(org_id, 0))),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn current(&self) -> Arc<OrgContext> {
        self.current.read().await.clone()
    }

    /// 进行中的同步用它判断自己持有的上下文是否已被替换
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    pub async fn switch_organization(&self, org_id: &str) -> Arc<OrgContext> {
        self.install(Some(org_id.to_string())).await
    }

    /// 登出：丢弃所有缓存，不保留组织
    pub async fn clear(&self) -> Arc<OrgContext> {
        self.install(None).await
    }

    async fn install(&self, org_id: Option<String>) -> Arc<OrgContext> {
        let mut guard = self.current.write().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let ctx = Arc::new(OrgContext::new(org_id, generation));
        *guard = ctx.clone();
        tracing::info!(
            "Organization context replaced: {:?} (generation {})",
            ctx.org_id,
            generation
        );
        ctx
    }
}
