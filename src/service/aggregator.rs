use futures::stream::{self, StreamExt, TryStreamExt};
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{SourceError, SyncError};
use crate::models::RecordType;
use crate::service::context::{OrgContext, Workspace};
use crate::service::enricher::pending_details;
use crate::source::RecordSource;

/// 单个客户的拉取任务，按入队顺序逐个执行
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchTask {
    Customer,
    Records(RecordType),
    Detail(RecordType, String),
}

/// 单个客户的同步结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomerSyncOutcome {
    pub customer_id: String,
    pub customer_name: Option<String>,
    /// 客户信息拉取失败，整个客户被跳过
    pub skipped: bool,
    pub failed_modules: Vec<RecordType>,
    pub details_fetched: usize,
    pub detail_failures: usize,
    pub records: usize,
    /// 同步途中组织被切换，后续结果已丢弃
    pub superseded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub org_id: String,
    pub generation: u64,
    pub customers: Vec<CustomerSyncOutcome>,
    pub superseded: bool,
}

/// 记录汇集：把外部记录按客户、模块写入当前组织上下文
pub struct RecordAggregator {
    source: Arc<dyn RecordSource>,
    workspace: Arc<Workspace>,
    max_concurrent_customers: usize,
}

impl RecordAggregator {
    pub fn new(source: Arc<dyn RecordSource>, workspace: Arc<Workspace>, max_concurrent_customers: usize) -> Self {
        Self {
            source,
            workspace,
            max_concurrent_customers: max_concurrent_customers.max(1),
        }
    }

    /// 同步多个客户
    ///
    /// 每个客户内部严格顺序拉取；客户之间的并发度由配置决定，默认 1。
    /// 只有会话失败会中止并返回错误。
    pub async fn sync_customers(&self, customer_ids: &[String]) -> Result<SyncReport, SyncError> {
        let ctx = self.workspace.current().await;
        let Some(org_id) = ctx.org_id.clone() else {
            return Err(SyncError::NoOrganization);
        };

        tracing::info!(
            "开始同步组织 {} 的 {} 个客户 (并发 {})",
            org_id,
            customer_ids.len(),
            self.max_concurrent_customers
        );

        let customers: Vec<CustomerSyncOutcome> = stream::iter(customer_ids.iter().cloned())
            .map(|customer_id| {
                let ctx = ctx.clone();
                let org_id = org_id.clone();
                async move { self.sync_customer(&ctx, &org_id, &customer_id).await }
            })
            .buffered(self.max_concurrent_customers)
            .try_collect()
            .await?;

        let superseded = customers.iter().any(|c| c.superseded);
        tracing::info!(
            "同步完成: 组织 {}, 客户 {}, 被切换中止: {}",
            org_id,
            customers.len(),
            superseded
        );

        Ok(SyncReport {
            org_id,
            generation: ctx.generation,
            customers,
            superseded,
        })
    }

    async fn sync_customer(
        &self,
        ctx: &OrgContext,
        org_id: &str,
        customer_id: &str,
    ) -> Result<CustomerSyncOutcome, SyncError> {
        let mut outcome = CustomerSyncOutcome {
            customer_id: customer_id.to_string(),
            ..CustomerSyncOutcome::default()
        };

        let mut queue: VecDeque<FetchTask> = VecDeque::new();
        queue.push_back(FetchTask::Customer);
        queue.extend(RecordType::ALL.into_iter().map(FetchTask::Records));

        while let Some(task) = queue.pop_front() {
            if !self.workspace.is_current(ctx.generation) {
                tracing::warn!("客户 {} 同步途中组织已切换, 放弃本轮结果", customer_id);
                outcome.superseded = true;
                break;
            }

            match task {
                FetchTask::Customer => {
                    let result = self.source.fetch_customer(org_id, customer_id).await;
                    if !self.workspace.is_current(ctx.generation) {
                        outcome.superseded = true;
                        break;
                    }
                    match result {
                        Ok(customer) => {
                            outcome.customer_name = Some(customer.name.clone());
                            ctx.store.replace_customer(customer);
                        }
                        Err(e) => {
                            check_session(&e, customer_id, None)?;
                            tracing::warn!("客户 {} 信息拉取失败, 跳过并清除上一轮数据: {}", customer_id, e);
                            ctx.forget_customer(customer_id);
                            outcome.skipped = true;
                            break;
                        }
                    }
                }
                FetchTask::Records(record_type) => {
                    let result = self.source.fetch_records(org_id, customer_id, record_type).await;
                    if !self.workspace.is_current(ctx.generation) {
                        outcome.superseded = true;
                        break;
                    }
                    match result {
                        Ok(records) => {
                            tracing::info!(
                                "客户 {} 模块 {} 拉取 {} 条记录",
                                customer_id,
                                record_type.module(),
                                records.len()
                            );
                            outcome.records += records.len();
                            ctx.store.replace_records(customer_id, record_type, records);
                        }
                        Err(e) => {
                            check_session(&e, customer_id, Some(record_type))?;
                            tracing::warn!(
                                "客户 {} 模块 {} 拉取失败, 本轮置空: {}",
                                customer_id,
                                record_type.module(),
                                e
                            );
                            outcome.failed_modules.push(record_type);
                            ctx.store.replace_records(customer_id, record_type, Vec::new());
                        }
                    }

                    // 记录全部入库后再排明细任务
                    if record_type == RecordType::CreditNote {
                        let records = ctx.store.customer_records(customer_id);
                        let pending: IndexSet<(RecordType, String)> = pending_details(&records, &ctx.details);
                        queue.extend(pending.into_iter().map(|(t, id)| FetchTask::Detail(t, id)));
                    }
                }
                FetchTask::Detail(record_type, record_id) => {
                    // 其他客户可能已经拉过同一张单据
                    if ctx.details.contains(record_type, &record_id) {
                        continue;
                    }
                    let result = self.source.fetch_detail(org_id, record_type, &record_id).await;
                    if !self.workspace.is_current(ctx.generation) {
                        outcome.superseded = true;
                        break;
                    }
                    match result {
                        Ok(detail) => {
                            if ctx.details.insert(record_type, &record_id, detail) {
                                outcome.details_fetched += 1;
                            }
                        }
                        Err(e) => {
                            check_session(&e, customer_id, Some(record_type))?;
                            tracing::warn!("{} {} 明细拉取失败: {}", record_type, record_id, e);
                            outcome.detail_failures += 1;
                        }
                    }
                }
            }
        }

        if !outcome.skipped {
            // 记录已整体替换, 旧的屏幕编辑作废
            ctx.invalidate_overlay(customer_id);
        }

        tracing::info!(
            "客户 {} 同步完成: 记录 {} 条, 明细 {} 条, 失败模块 {:?}",
            customer_id,
            outcome.records,
            outcome.details_fetched,
            outcome.failed_modules
        );
        Ok(outcome)
    }
}

fn check_session(error: &SourceError, customer_id: &str, record_type: Option<RecordType>) -> Result<(), SyncError> {
    if let SourceError::Session { status } = error {
        tracing::error!("客户 {} 会话失效, 中止同步: {}", customer_id, error);
        return Err(SyncError::Session {
            customer_id: customer_id.to_string(),
            record_type,
            status: *status,
        });
    }
    Ok(())
}
