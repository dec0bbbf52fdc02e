#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use customer_statement::error::SourceError;
use customer_statement::models::{Customer, RawAmount, RawRecord, RecordCommon, RecordDetail, RecordType};
use customer_statement::service::Workspace;
use customer_statement::RecordSource;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn common(id: &str, date: &str, amount: &str) -> RecordCommon {
    RecordCommon {
        id: id.to_string(),
        date: date.to_string(),
        reference: id.to_uppercase(),
        amount: RawAmount::from(amount),
        project: None,
    }
}

pub fn invoice(id: &str, date: &str, amount: &str) -> RawRecord {
    RawRecord::Invoice {
        common: common(id, date, amount),
        due_date: None,
    }
}

pub fn payment(id: &str, date: &str, amount: &str, applied: &[&str]) -> RawRecord {
    RawRecord::Payment {
        common: common(id, date, amount),
        applied_invoices: applied.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn credit_note(id: &str, date: &str, amount: &str) -> RawRecord {
    RawRecord::CreditNote {
        common: common(id, date, amount),
    }
}

/// 内存数据源，记录调用顺序，可注入失败和组织切换
#[derive(Default)]
pub struct FakeSource {
    customers: Mutex<HashMap<String, Customer>>,
    records: Mutex<HashMap<(String, RecordType), Vec<RawRecord>>>,
    details: HashMap<(RecordType, String), RecordDetail>,
    failing: HashSet<(String, RecordType)>,
    failing_details: HashSet<String>,
    session_failure: Option<(String, RecordType)>,
    switch_during: Mutex<Option<(Arc<Workspace>, String, RecordType, String)>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customer(mut self, id: &str, name: &str, opening: &str) -> Self {
        self.customers
            .get_mut()
            .unwrap()
            .insert(id.to_string(), Customer::new(id, name, dec(opening)));
        self
    }

    pub fn with_records(self, customer_id: &str, record_type: RecordType, records: Vec<RawRecord>) -> Self {
        self.set_records(customer_id, record_type, records);
        self
    }

    /// 同步之间修改远端数据
    pub fn set_records(&self, customer_id: &str, record_type: RecordType, records: Vec<RawRecord>) {
        self.records
            .lock()
            .unwrap()
            .insert((customer_id.to_string(), record_type), records);
    }

    pub fn remove_customer(&self, id: &str) {
        self.customers.lock().unwrap().remove(id);
    }

    pub fn with_detail(mut self, record_type: RecordType, id: &str, detail: RecordDetail) -> Self {
        self.details.insert((record_type, id.to_string()), detail);
        self
    }

    pub fn failing(mut self, customer_id: &str, record_type: RecordType) -> Self {
        self.failing.insert((customer_id.to_string(), record_type));
        self
    }

    pub fn failing_detail(mut self, id: &str) -> Self {
        self.failing_details.insert(id.to_string());
        self
    }

    pub fn session_failure(mut self, customer_id: &str, record_type: RecordType) -> Self {
        self.session_failure = Some((customer_id.to_string(), record_type));
        self
    }

    /// 拉取指定模块时切换到另一个组织，模拟切换与在途请求竞争
    pub fn switch_during(
        self,
        workspace: Arc<Workspace>,
        customer_id: &str,
        record_type: RecordType,
        new_org: &str,
    ) -> Self {
        *self.switch_during.lock().unwrap() =
            Some((workspace, customer_id.to_string(), record_type, new_org.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RecordSource for FakeSource {
    async fn fetch_customer(&self, _org_id: &str, customer_id: &str) -> Result<Customer, SourceError> {
        self.log(format!("customer:{}", customer_id));
        let customer = self.customers.lock().unwrap().get(customer_id).cloned();
        customer.ok_or(SourceError::Status {
            status: 404,
            url: format!("/contacts/{}", customer_id),
        })
    }

    async fn fetch_records(
        &self,
        _org_id: &str,
        customer_id: &str,
        record_type: RecordType,
    ) -> Result<Vec<RawRecord>, SourceError> {
        self.log(format!("{}:{}", record_type.module(), customer_id));
        let key = (customer_id.to_string(), record_type);

        let switch = self.switch_during.lock().unwrap().take();
        if let Some((workspace, cid, rt, org)) = switch {
            if cid == customer_id && rt == record_type {
                workspace.switch_organization(&org).await;
            } else {
                *self.switch_during.lock().unwrap() = Some((workspace, cid, rt, org));
            }
        }

        if self.session_failure.as_ref() == Some(&key) {
            return Err(SourceError::Session { status: 401 });
        }
        if self.failing.contains(&key) {
            return Err(SourceError::Status {
                status: 500,
                url: format!("/{}", record_type.module()),
            });
        }
        let records = self.records.lock().unwrap().get(&key).cloned();
        Ok(records.unwrap_or_default())
    }

    async fn fetch_detail(
        &self,
        _org_id: &str,
        record_type: RecordType,
        record_id: &str,
    ) -> Result<RecordDetail, SourceError> {
        self.log(format!("detail:{}", record_id));
        if self.failing_details.contains(record_id) {
            return Err(SourceError::Decode("broken detail".into()));
        }
        Ok(self
            .details
            .get(&(record_type, record_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
