use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::RefMut;
use std::sync::Arc;

use crate::error::SyncError;
use crate::format::AmountFormat;
use crate::models::{ExportRow, Statement};
use crate::service::aggregator::{RecordAggregator, SyncReport};
use crate::service::context::{OrgContext, Workspace};
use crate::service::enricher::enrich;
use crate::service::export::{self, DocumentTable, ExportSource};
use crate::service::ledger::build_ledger;
use crate::service::overlay::{OverlayEdit, PresentationOverlay};
use crate::service::statement::materialize;
use crate::source::RecordSource;

/// 对账单服务：同步、生成对账单、屏幕编辑、导出
pub struct StatementService {
    workspace: Arc<Workspace>,
    aggregator: RecordAggregator,
    format: AmountFormat,
}

impl StatementService {
    pub fn new(
        source: Arc<dyn RecordSource>,
        workspace: Arc<Workspace>,
        format: AmountFormat,
        max_concurrent_customers: usize,
    ) -> Self {
        let aggregator = RecordAggregator::new(source, workspace.clone(), max_concurrent_customers);
        Self {
            workspace,
            aggregator,
            format,
        }
    }

    pub fn format(&self) -> &AmountFormat {
        &self.format
    }

    pub async fn switch_organization(&self, org_id: &str) {
        self.workspace.switch_organization(org_id).await;
    }

    pub async fn logout(&self) {
        self.workspace.clear().await;
    }

    pub async fn sync(&self, customer_ids: &[String]) -> Result<SyncReport, SyncError> {
        self.aggregator.sync_customers(customer_ids).await
    }

    pub async fn customer_ids(&self) -> Vec<String> {
        self.workspace.current().await.store.customer_ids()
    }

    /// 构建账本 → 挂载明细 → 生成对账单；每次调用都重新计算
    fn statement_in(ctx: &OrgContext, customer_id: &str) -> Option<Statement> {
        let customer = ctx.store.customer(customer_id)?;
        let records = ctx.store.customer_records(customer_id);
        let mut entries = build_ledger(&customer.opening_balance, &records);
        let attached = enrich(&mut entries, &ctx.details);
        tracing::debug!(
            "Customer {}: {} entries, {} with line items",
            customer_id,
            entries.len(),
            attached
        );
        Some(materialize(&customer, entries))
    }

    pub async fn statement(&self, customer_id: &str) -> Option<Statement> {
        let ctx = self.workspace.current().await;
        Self::statement_in(&ctx, customer_id)
    }

    /// 取屏幕展示层，不存在时按当前对账单新建
    pub async fn overlay(&self, customer_id: &str) -> Option<PresentationOverlay> {
        let ctx = self.workspace.current().await;
        self.overlay_in(&ctx, customer_id)
    }

    /// 在分片写锁下取出或新建展示层；持有期间同一客户的其他编辑会等待
    fn overlay_entry<'a>(
        &self,
        ctx: &'a OrgContext,
        customer_id: &str,
    ) -> Option<RefMut<'a, String, PresentationOverlay>> {
        match ctx.overlays.entry(customer_id.to_string()) {
            Entry::Occupied(entry) => Some(entry.into_ref()),
            Entry::Vacant(entry) => {
                let statement = Self::statement_in(ctx, customer_id)?;
                Some(entry.insert(PresentationOverlay::from_statement(&statement, &self.format)))
            }
        }
    }

    fn overlay_in(&self, ctx: &OrgContext, customer_id: &str) -> Option<PresentationOverlay> {
        self.overlay_entry(ctx, customer_id).map(|overlay| overlay.value().clone())
    }

    /// 依次应用编辑，然后重算余额列；返回被忽略 (越界) 的编辑数
    pub async fn apply_edits(
        &self,
        customer_id: &str,
        edits: &[OverlayEdit],
    ) -> Option<(PresentationOverlay, usize)> {
        let ctx = self.workspace.current().await;
        let mut overlay = self.overlay_entry(&ctx, customer_id)?;

        let ignored = edits.iter().filter(|edit| !overlay.apply(edit)).count();
        if ignored > 0 {
            tracing::warn!("Customer {}: {} overlay edits out of range", customer_id, ignored);
        }
        overlay.recalculate(&self.format);

        Some((overlay.value().clone(), ignored))
    }

    /// 丢弃人工编辑
    pub async fn reset_overlay(&self, customer_id: &str) -> Option<PresentationOverlay> {
        let ctx = self.workspace.current().await;
        ctx.overlays.remove(customer_id);
        self.overlay_in(&ctx, customer_id)
    }

    pub async fn export_rows(&self, customer_id: &str, source: ExportSource) -> Option<Vec<ExportRow>> {
        match source {
            ExportSource::Original => {
                let statement = self.statement(customer_id).await?;
                Some(export::export_rows(&statement, &self.format))
            }
            ExportSource::Edited => {
                let overlay = self.overlay(customer_id).await?;
                Some(overlay.export_rows(&self.format))
            }
        }
    }

    pub async fn export_csv(
        &self,
        customer_id: &str,
        source: ExportSource,
    ) -> Result<Option<Vec<u8>>, csv::Error> {
        let Some(rows) = self.export_rows(customer_id, source).await else {
            return Ok(None);
        };
        let mut buf = Vec::new();
        export::write_csv(&rows, &self.format, &mut buf)?;
        Ok(Some(buf))
    }

    pub async fn document(&self, customer_id: &str, source: ExportSource) -> Option<DocumentTable> {
        match source {
            ExportSource::Original => {
                let statement = self.statement(customer_id).await?;
                Some(export::document_table(&statement, &self.format))
            }
            ExportSource::Edited => Some(self.overlay(customer_id).await?.document_table()),
        }
    }
}
