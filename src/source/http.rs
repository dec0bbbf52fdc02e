use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use super::RecordSource;
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::models::{Customer, LineItem, RawAmount, RawRecord, RecordCommon, RecordDetail, RecordType};

/// 基于 HTTP 的记账服务数据源
pub struct HttpRecordSource {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpRecordSource {
    pub fn new(client: Client, config: &SourceConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Failed to send GET request to {}: {}", url, e);
            SourceError::Transport(e)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SourceError::Session {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| SourceError::Decode(format!("{}: {}", url, e)))
    }
}

#[derive(Debug, Deserialize)]
struct ContactEnvelope {
    contact: ContactWire,
}

#[derive(Debug, Deserialize)]
struct ContactWire {
    contact_name: String,
    #[serde(default)]
    opening_balance: RawAmount,
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvoiceWire {
    invoice_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    invoice_number: String,
    #[serde(default, deserialize_with = "null_as_default")]
    date: String,
    due_date: Option<String>,
    #[serde(default)]
    total: RawAmount,
    project_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppliedInvoiceWire {
    #[serde(default, deserialize_with = "null_as_default")]
    invoice_number: String,
}

#[derive(Debug, Deserialize)]
struct PaymentWire {
    payment_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    payment_number: String,
    #[serde(default, deserialize_with = "null_as_default")]
    date: String,
    #[serde(default)]
    amount: RawAmount,
    #[serde(default, deserialize_with = "null_as_default")]
    invoices: Vec<AppliedInvoiceWire>,
    project_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreditNoteWire {
    creditnote_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    creditnote_number: String,
    #[serde(default, deserialize_with = "null_as_default")]
    date: String,
    #[serde(default)]
    total: RawAmount,
    project_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvoiceList {
    #[serde(default)]
    invoices: Vec<InvoiceWire>,
}

#[derive(Debug, Deserialize)]
struct PaymentList {
    #[serde(default)]
    customerpayments: Vec<PaymentWire>,
}

#[derive(Debug, Deserialize)]
struct CreditNoteList {
    #[serde(default)]
    creditnotes: Vec<CreditNoteWire>,
}

#[derive(Debug, Deserialize)]
struct LineItemWire {
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
    #[serde(default)]
    quantity: RawAmount,
    #[serde(default)]
    rate: RawAmount,
    #[serde(default)]
    item_total: RawAmount,
}

#[derive(Debug, Deserialize)]
struct DetailWire {
    #[serde(default)]
    line_items: Vec<LineItemWire>,
}

#[derive(Debug, Deserialize)]
struct DetailEnvelope {
    #[serde(alias = "creditnote")]
    invoice: DetailWire,
}

/// 源系统常把缺省字段写成 null，按默认值处理，避免整页解析失败
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn signed_or_zero(amount: &RawAmount) -> BigDecimal {
    amount.to_decimal().unwrap_or_else(BigDecimal::zero)
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch_customer(&self, org_id: &str, customer_id: &str) -> Result<Customer, SourceError> {
        let envelope: ContactEnvelope = self
            .get_json(&format!("/contacts/{}", customer_id), &[("organization_id", org_id)])
            .await?;
        let contact = envelope.contact;
        Ok(Customer {
            id: customer_id.to_string(),
            name: contact.contact_name,
            opening_balance: signed_or_zero(&contact.opening_balance),
            email: contact.email,
            phone: contact.phone,
        })
    }

    async fn fetch_records(
        &self,
        org_id: &str,
        customer_id: &str,
        record_type: RecordType,
    ) -> Result<Vec<RawRecord>, SourceError> {
        let path = format!("/{}", record_type.module());
        let query = [("organization_id", org_id), ("customer_id", customer_id)];

        let records = match record_type {
            RecordType::Invoice => {
                let list: InvoiceList = self.get_json(&path, &query).await?;
                list.invoices
                    .into_iter()
                    .map(|w| RawRecord::Invoice {
                        common: RecordCommon {
                            id: w.invoice_id,
                            date: w.date,
                            reference: w.invoice_number,
                            amount: w.total,
                            project: w.project_name,
                        },
                        due_date: w.due_date,
                    })
                    .collect()
            }
            RecordType::Payment => {
                let list: PaymentList = self.get_json(&path, &query).await?;
                list.customerpayments
                    .into_iter()
                    .map(|w| RawRecord::Payment {
                        common: RecordCommon {
                            id: w.payment_id,
                            date: w.date,
                            reference: w.payment_number,
                            amount: w.amount,
                            project: w.project_name,
                        },
                        applied_invoices: w.invoices.into_iter().map(|i| i.invoice_number).collect(),
                    })
                    .collect()
            }
            RecordType::CreditNote => {
                let list: CreditNoteList = self.get_json(&path, &query).await?;
                list.creditnotes
                    .into_iter()
                    .map(|w| RawRecord::CreditNote {
                        common: RecordCommon {
                            id: w.creditnote_id,
                            date: w.date,
                            reference: w.creditnote_number,
                            amount: w.total,
                            project: w.project_name,
                        },
                    })
                    .collect()
            }
        };

        Ok(records)
    }

    async fn fetch_detail(
        &self,
        org_id: &str,
        record_type: RecordType,
        record_id: &str,
    ) -> Result<RecordDetail, SourceError> {
        let path = format!("/{}/{}", record_type.module(), record_id);
        let envelope: DetailEnvelope = self.get_json(&path, &[("organization_id", org_id)]).await?;

        let line_items = envelope
            .invoice
            .line_items
            .into_iter()
            .map(|w| LineItem {
                name: w.name,
                quantity: signed_or_zero(&w.quantity),
                rate: signed_or_zero(&w.rate),
                line_total: signed_or_zero(&w.item_total),
            })
            .collect();

        Ok(RecordDetail { line_items })
    }
}
