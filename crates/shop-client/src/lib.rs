use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use shop_types::domain::order::{AdminUpdate, Order};
use shop_types::domain::placement::OrderDraft;
use uuid::Uuid;

#[derive(Clone)]
pub struct ShopClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

#[derive(Clone)]
pub struct ShopClient {
    base: Url,
    client: reqwest::Client,
}

/// Error payload returned by the server for every non-2xx response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(default)]
    pub details: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
#[error("{status}: {}", .body.error)]
pub struct ApiFailure {
    pub status: reqwest::StatusCode,
    pub body: ApiError,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityResponse {
    pub eligible: bool,
}

impl ShopClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<ShopClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(ShopClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    /// Turns an error status into an [`ApiFailure`] when the body carries one.
    async fn decode<T: serde::de::DeserializeOwned>(res: reqwest::Response) -> anyhow::Result<T> {
        let status = res.status();
        if status.is_success() {
            return Ok(res.json().await?);
        }
        let text = res.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiError>(&text) {
            Ok(body) => Err(ApiFailure { status, body }.into()),
            Err(_) => anyhow::bail!("request failed with {status}: {text}"),
        }
    }

    pub async fn place_order(&self, draft: &OrderDraft) -> anyhow::Result<Order> {
        let res = self
            .client
            .post(self.url("orders")?)
            .json(draft)
            .send()
            .await?;
        Self::decode(res).await
    }

    pub async fn get_order(&self, id: Uuid) -> anyhow::Result<Order> {
        let res = self
            .client
            .get(self.url(&format!("orders/{id}"))?)
            .send()
            .await?;
        Self::decode(res).await
    }

    pub async fn list_orders(&self, buyer_id: Option<Uuid>) -> anyhow::Result<Vec<Order>> {
        let mut req = self.client.get(self.url("orders")?);
        if let Some(buyer) = buyer_id {
            req = req.query(&[("buyer_id", buyer.to_string())]);
        }
        Self::decode(req.send().await?).await
    }

    pub async fn update_order_admin(
        &self,
        id: Uuid,
        update: &AdminUpdate,
    ) -> anyhow::Result<Order> {
        let res = self
            .client
            .patch(self.url(&format!("orders/{id}"))?)
            .json(update)
            .send()
            .await?;
        Self::decode(res).await
    }

    pub async fn confirm_order_received(&self, id: Uuid) -> anyhow::Result<Order> {
        let res = self
            .client
            .post(self.url(&format!("orders/{id}/confirm-received"))?)
            .send()
            .await?;
        Self::decode(res).await
    }

    pub async fn cancel_order(&self, id: Uuid) -> anyhow::Result<Order> {
        let res = self
            .client
            .post(self.url(&format!("orders/{id}/cancel"))?)
            .send()
            .await?;
        Self::decode(res).await
    }

    pub async fn check_review_eligibility(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> anyhow::Result<bool> {
        let res = self
            .client
            .get(self.url("reviews/eligibility")?)
            .query(&[
                ("user_id", user_id.to_string()),
                ("product_id", product_id.to_string()),
            ])
            .send()
            .await?;
        let body: EligibilityResponse = Self::decode(res).await?;
        tracing::debug!(%user_id, %product_id, eligible = body.eligible, "review eligibility");
        Ok(body.eligible)
    }
}

impl ShopClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<ShopClient> {
        if let Some(client) = self.client {
            return Ok(ShopClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(ShopClient {
            base: self.base,
            client,
        })
    }
}
