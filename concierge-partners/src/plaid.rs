use crate::{ensure_success, PartnerError, PartnerResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

/// Result of exchanging a Link public token. Both ids are optional on the
/// wire and must be checked before use.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenExchange {
    pub item_id: Option<String>,
    pub access_token: Option<String>,
    #[serde(flatten)]
    pub raw: serde_json::Map<String, Value>,
}

#[async_trait]
pub trait PlaidApi: Send + Sync {
    async fn create_link_token(&self, client_user_id: &str) -> PartnerResult<Value>;

    async fn exchange_public_token(&self, public_token: &str) -> PartnerResult<TokenExchange>;

    async fn accounts(&self, access_token: &str) -> PartnerResult<Value>;
}

#[derive(Clone)]
pub struct PlaidClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    secret: String,
    client_name: String,
}

impl PlaidClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        secret: impl Into<String>,
        client_name: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            secret: secret.into(),
            client_name: client_name.into(),
        }
    }

    async fn post(&self, path: &str, mut body: Value) -> PartnerResult<Value> {
        if self.client_id.is_empty() || self.secret.is_empty() {
            return Err(PartnerError::MissingCredentials("plaid.client_id/plaid.secret"));
        }
        body["client_id"] = json!(self.client_id);
        body["secret"] = json!(self.secret);

        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await?;

        Ok(ensure_success("plaid", response).await?.json().await?)
    }
}

#[async_trait]
impl PlaidApi for PlaidClient {
    async fn create_link_token(&self, client_user_id: &str) -> PartnerResult<Value> {
        self.post(
            "/link/token/create",
            json!({
                "client_name": self.client_name,
                "user": { "client_user_id": client_user_id },
                "products": ["transactions"],
                "country_codes": ["US"],
                "language": "en"
            }),
        )
        .await
    }

    async fn exchange_public_token(&self, public_token: &str) -> PartnerResult<TokenExchange> {
        let data = self
            .post("/item/public_token/exchange", json!({ "public_token": public_token }))
            .await?;
        let exchange: TokenExchange = serde_json::from_value(data)?;
        info!("Plaid public token exchanged for item {:?}", exchange.item_id);
        Ok(exchange)
    }

    async fn accounts(&self, access_token: &str) -> PartnerResult<Value> {
        self.post("/accounts/get", json!({ "access_token": access_token })).await
    }
}
