use crate::{ensure_success, PartnerError, PartnerResult};
use async_trait::async_trait;
use concierge_store::{PlaidItem, PlaidItemStore, StoreResult};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const PLAID_ITEMS: &str = "plaid_items";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service-account key file we need.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccount {
    pub fn from_json(raw: &str) -> PartnerResult<Self> {
        let mut account: ServiceAccount = serde_json::from_str(raw)?;
        // keys pasted into env vars often carry escaped newlines
        account.private_key = account.private_key.replace("\\n", "\n");
        Ok(account)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Firestore REST client authenticated as a service account.
pub struct FirestoreClient {
    http: reqwest::Client,
    account: ServiceAccount,
    base_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl FirestoreClient {
    pub fn new(http: reqwest::Client, account: ServiceAccount) -> Self {
        info!("Firestore enabled for project {}", account.project_id);
        Self {
            http,
            account,
            base_url: FIRESTORE_BASE.to_string(),
            token: Mutex::new(None),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn signed_assertion(&self) -> PartnerResult<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.account.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let key = EncodingKey::from_rsa_pem(self.account.private_key.as_bytes())
            .map_err(|e| PartnerError::Auth(format!("invalid service account key: {}", e)))?;
        encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| PartnerError::Auth(e.to_string()))
    }

    async fn access_token(&self) -> PartnerResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.expires_at) {
            return Ok(token.token.clone());
        }

        let assertion = self.signed_assertion()?;
        let form: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer")
            .append_pair("assertion", &assertion)
            .finish();

        let response = self
            .http
            .post(&self.account.token_uri)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await?;
        let token: TokenResponse = ensure_success("google oauth", response)
            .await
            .map_err(|e| PartnerError::Auth(e.to_string()))?
            .json()
            .await?;

        debug!("Firestore access token refreshed");
        // refresh a minute early
        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(60));
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        let id: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
        format!(
            "{}/projects/{}/databases/(default)/documents/{}/{}",
            self.base_url, self.account.project_id, collection, id
        )
    }

    pub async fn set_document(&self, collection: &str, id: &str, fields: Value) -> PartnerResult<()> {
        let token = self.access_token().await?;
        let response = self
            .http
            .patch(self.document_url(collection, id))
            .bearer_auth(token)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        ensure_success("firestore", response).await?;
        Ok(())
    }

    /// The document's `fields`, or `None` when it does not exist.
    pub async fn get_document(&self, collection: &str, id: &str) -> PartnerResult<Option<Value>> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(self.document_url(collection, id))
            .bearer_auth(token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: Value = ensure_success("firestore", response).await?.json().await?;
        Ok(doc.get("fields").cloned())
    }
}

fn string_or_null(value: Option<&str>) -> Value {
    match value {
        Some(s) => json!({ "stringValue": s }),
        None => json!({ "nullValue": null }),
    }
}

fn item_fields(item: &PlaidItem) -> Value {
    json!({
        "plaid_item_id": { "stringValue": item.plaid_item_id },
        "access_token": { "stringValue": item.access_token },
        "institution_id": string_or_null(item.institution_id.as_deref()),
        "institution_name": string_or_null(item.institution_name.as_deref()),
        "created_at": { "timestampValue": item.created_at.to_rfc3339() },
    })
}

#[async_trait]
impl PlaidItemStore for FirestoreClient {
    async fn put_item(&self, item: &PlaidItem) -> StoreResult<()> {
        self.set_document(PLAID_ITEMS, &item.plaid_item_id, item_fields(item)).await?;
        info!("Plaid item written to Firestore: {}", item.plaid_item_id);
        Ok(())
    }

    async fn access_token(&self, item_id: &str) -> StoreResult<Option<String>> {
        let fields = self.get_document(PLAID_ITEMS, item_id).await?;
        Ok(fields.and_then(|f| {
            f.pointer("/access_token/stringValue")
                .and_then(Value::as_str)
                .map(str::to_string)
        }))
    }
}
