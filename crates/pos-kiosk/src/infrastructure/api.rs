//! HTTP client for the server's JSON API.
//!
//! A thin `reqwest` wrapper implementing [`PosApi`].  Every request carries
//! the configured timeout, so a dead server surfaces as an [`ApiError`]
//! rather than a hung kiosk.

use std::time::Duration;

use async_trait::async_trait;
use pos_core::{Item, KioskRecord, NewItem, NewSale, ServerInfo, User};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::application::ports::{ApiError, PosApi, ServerEndpoint};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// [`PosApi`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpPosApi {
    client: reqwest::Client,
}

impl HttpPosApi {
    /// Builds a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Fails only if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &ServerEndpoint,
        path: &str,
    ) -> Result<T, ApiError> {
        debug!("GET {path}");
        let response = self
            .client
            .get(endpoint.url(path))
            .send()
            .await
            .map_err(|e| transport(path, e))?;
        let response = check_status(path, response)?;
        response.json::<T>().await.map_err(|e| ApiError::Decode {
            path: path.to_owned(),
            message: e.to_string(),
        })
    }

    async fn post_json<B: Serialize + Sync>(
        &self,
        endpoint: &ServerEndpoint,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        debug!("POST {path}");
        let response = self
            .client
            .post(endpoint.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| transport(path, e))?;
        check_status(path, response)?;
        Ok(())
    }
}

fn transport(path: &str, e: reqwest::Error) -> ApiError {
    ApiError::Transport {
        path: path.to_owned(),
        message: e.to_string(),
    }
}

fn check_status(path: &str, response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Status {
            path: path.to_owned(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl PosApi for HttpPosApi {
    async fn list_kiosks(&self, endpoint: &ServerEndpoint) -> Result<Vec<KioskRecord>, ApiError> {
        self.get_json(endpoint, "/api/kiosks").await
    }

    async fn list_users(&self, endpoint: &ServerEndpoint) -> Result<Vec<User>, ApiError> {
        self.get_json(endpoint, "/api/users").await
    }

    async fn list_items(&self, endpoint: &ServerEndpoint) -> Result<Vec<Item>, ApiError> {
        self.get_json(endpoint, "/api/items").await
    }

    async fn add_item(&self, endpoint: &ServerEndpoint, item: &NewItem) -> Result<(), ApiError> {
        self.post_json(endpoint, "/api/items", item).await
    }

    async fn record_sale(&self, endpoint: &ServerEndpoint, sale: &NewSale) -> Result<(), ApiError> {
        self.post_json(endpoint, "/api/sales", sale).await
    }

    async fn server_info(&self, endpoint: &ServerEndpoint) -> Result<ServerInfo, ApiError> {
        self.get_json(endpoint, "/api/discover").await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
