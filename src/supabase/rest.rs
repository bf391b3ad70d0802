//! Table reads and writes over the PostgREST endpoint.

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Response, StatusCode,
};

use crate::{
    domain::{
        message::{Message, NewMessage},
        sync::StoreError,
    },
    infra::{config::BackendConfig, error::AppError},
};

use super::wire::{self, InsertRow};

const PREFER_REPRESENTATION: &str = "return=representation";

#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    table_url: String,
}

impl RestClient {
    pub fn new(config: &BackendConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .default_headers(auth_headers(&config.anon_key)?)
            .build()
            .map_err(AppError::HttpClientInit)?;

        Ok(Self {
            http,
            table_url: table_url(&config.url, &config.table),
        })
    }

    /// Every row, oldest first.
    pub async fn fetch_ordered(&self) -> Result<Vec<Message>, StoreError> {
        let response = self
            .http
            .get(&self.table_url)
            .query(&[("select", "*"), ("order", "created_at.asc")])
            .send()
            .await
            .map_err(transport_error)?;

        let body = checked(response).await?.text().await.map_err(transport_error)?;
        wire::decode_rows(&body)
    }

    /// Inserts one row and returns it as stored.
    pub async fn insert(&self, record: &NewMessage) -> Result<Message, StoreError> {
        let response = self
            .http
            .post(&self.table_url)
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&InsertRow {
                username: &record.username,
                content: &record.content,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let body = checked(response).await?.text().await.map_err(transport_error)?;
        wire::decode_rows(&body)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::InvalidData("insert returned no row".to_owned()))
    }
}

pub fn table_url(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base_url.trim().trim_end_matches('/'), table)
}

fn auth_headers(anon_key: &str) -> Result<HeaderMap, AppError> {
    let invalid = |_| AppError::ConfigInvalid {
        reason: "backend.anon_key contains characters not allowed in a header".to_owned(),
    };

    let mut api_key = HeaderValue::from_str(anon_key).map_err(invalid)?;
    api_key.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {anon_key}")).map_err(invalid)?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert("apikey", api_key);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

async fn checked(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> StoreError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized,
        _ => StoreError::Rejected {
            status: status.as_u16(),
            message: wire::error_message(body),
        },
    }
}

fn transport_error(error: reqwest::Error) -> StoreError {
    StoreError::Unavailable(error.without_url().to_string())
}
