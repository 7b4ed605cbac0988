//! HTTP client for the sheet web app.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use surgenda_core::models::format_date_key;
use surgenda_core::{
    MonthKey, RawSlotRecord, RemoteError, RemoteStore, SessionToken, SpecialtyCatalog,
    VerifyOutcome, WriteAction,
};
use surgenda_core::remote::{RemoteResult, WriteReceipt};

use crate::wire::{RowsResponse, TokenMap, WriteResponse};

// The deployed Apps Script endpoint only accepts text/plain bodies.
const POST_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// Client for the spreadsheet web-app deployment URL.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
}

impl SheetsClient {
    /// Client over a fresh HTTP connection pool.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    /// Client reusing an existing [`reqwest::Client`].
    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        query: &[(&str, &str)],
    ) -> RemoteResult<T> {
        debug!(query = ?query, "sheet GET");
        let response = self
            .http
            .get(&self.base_url)
            .query(query)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        let body = response.text().await.map_err(transport)?;
        serde_json::from_str(&body).map_err(payload)
    }
}

#[async_trait]
impl RemoteStore for SheetsClient {
    async fn read_day(
        &self,
        date: NaiveDate,
        token: &SessionToken,
    ) -> RemoteResult<Vec<RawSlotRecord>> {
        let date = format_date_key(date);
        let response: RowsResponse = self
            .get_json(&[("date", date.as_str()), ("token", token.as_str())])
            .await?;
        response.into_result()
    }

    async fn read_month(
        &self,
        month: MonthKey,
        token: &SessionToken,
    ) -> RemoteResult<Vec<RawSlotRecord>> {
        let month = month.to_string();
        let response: RowsResponse = self
            .get_json(&[("month", month.as_str()), ("token", token.as_str())])
            .await?;
        response.into_result()
    }

    async fn write(
        &self,
        action: &WriteAction,
        token: &SessionToken,
    ) -> RemoteResult<WriteReceipt> {
        let mut body = serde_json::to_value(action).map_err(payload)?;
        if let Value::Object(map) = &mut body {
            map.insert("token".to_string(), Value::from(token.as_str()));
        }
        debug!("sheet POST");

        let response = self
            .http
            .post(&self.base_url)
            .header(reqwest::header::CONTENT_TYPE, POST_CONTENT_TYPE)
            .body(body.to_string())
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        let text = response.text().await.map_err(transport)?;
        let outcome: WriteResponse = serde_json::from_str(&text).map_err(payload)?;

        if outcome.is_success() {
            Ok(WriteReceipt {
                count: outcome.count,
            })
        } else {
            Err(RemoteError::Rejected(
                outcome.message.unwrap_or_else(|| "server error".to_string()),
            ))
        }
    }

    async fn verify(&self, token: &SessionToken) -> RemoteResult<VerifyOutcome> {
        let map: TokenMap = self.get_json(&[("type", "tokens")]).await?;
        Ok(match map.get(token.as_str()) {
            Some(entry) => VerifyOutcome {
                valid: true,
                user: Some(entry.to_user()),
            },
            None => VerifyOutcome {
                valid: false,
                user: None,
            },
        })
    }

    async fn procedures_catalog(&self, token: &SessionToken) -> RemoteResult<SpecialtyCatalog> {
        let groups: std::collections::HashMap<String, Vec<String>> = self
            .get_json(&[("type", "procedures"), ("token", token.as_str())])
            .await?;
        Ok(SpecialtyCatalog::new(groups))
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}

fn payload(err: serde_json::Error) -> RemoteError {
    RemoteError::InvalidPayload(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use surgenda_core::remote::SlotUpdate;
    use surgenda_core::SlotId;

    #[test]
    fn test_post_body_carries_token_alongside_action() {
        let action = WriteAction::Update(SlotUpdate::release(&SlotId::new("7"), "ana"));
        let mut body = serde_json::to_value(&action).unwrap();
        if let Value::Object(map) = &mut body {
            map.insert("token".to_string(), Value::from("tok-1"));
        }

        let text = body.to_string();
        assert!(text.contains(r#""action":"update""#));
        assert!(text.contains(r#""token":"tok-1""#));
        assert!(text.contains(r#""id":"7""#));
    }

    #[test]
    fn test_client_keeps_base_url() {
        let client = SheetsClient::new("https://example.org/macros/exec");
        assert_eq!(client.base_url(), "https://example.org/macros/exec");
    }
}
