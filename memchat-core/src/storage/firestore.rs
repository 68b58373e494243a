//! Firestore document store over the REST v1 API.
//!
//! Documents live at
//! `projects/{project}/databases/{database}/documents/{collection}/{id}` and
//! carry two fields: `messages` (an array of `{role, content}` maps) and
//! `summary` (a string). `save` issues a PATCH without an update mask, which
//! replaces every field of the document.
//!
//! When `FIRESTORE_EMULATOR_HOST` is set the store talks plain HTTP to the
//! emulator instead of the production endpoint. Every request is authorized
//! with a fresh token from the store's [`AccessTokenSource`].

use super::auth::AccessTokenSource;
use super::{ConversationStore, SessionKey, StorageError};
use crate::config::constants::{env_vars, storage as storage_defaults};
use crate::config::env::optional_env;
use crate::llm::{Message, MessageRole};
use crate::memory::ConversationState;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const BACKEND: &str = "firestore";

pub struct FirestoreStore {
    http_client: HttpClient,
    base_url: String,
    project_id: String,
    database: String,
    tokens: Arc<dyn AccessTokenSource>,
}

/// Emulator address from `FIRESTORE_EMULATOR_HOST`, if set
pub fn emulator_host() -> Option<String> {
    optional_env(env_vars::FIRESTORE_EMULATOR_HOST)
}

impl FirestoreStore {
    pub fn new(
        project_id: &str,
        database: &str,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, StorageError> {
        let base_url = match emulator_host() {
            Some(host) => format!("http://{}/v1", host.trim_end_matches('/')),
            None => storage_defaults::FIRESTORE_BASE_URL.to_string(),
        };
        Self::with_base_url(base_url, project_id, database, tokens)
    }

    /// Point the store at an explicit REST root such as `http://127.0.0.1:8080/v1`
    pub fn with_base_url(
        base_url: impl Into<String>,
        project_id: &str,
        database: &str,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, StorageError> {
        if project_id.trim().is_empty() {
            return Err(StorageError::Connection {
                backend: BACKEND,
                message: "project id is empty".to_string(),
            });
        }

        let http_client = HttpClient::builder()
            .build()
            .map_err(|e| StorageError::Connection {
                backend: BACKEND,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let base_url = base_url.into();
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.trim().to_string(),
            database: database.to_string(),
            tokens,
        })
    }

    fn document_url(&self, key: &SessionKey) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents/{}/{}",
            self.base_url, self.project_id, self.database, key.collection, key.document_id
        )
    }

    async fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, StorageError> {
        Ok(match self.tokens.access_token().await? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> StorageError {
        if err.is_connect() {
            StorageError::Connection {
                backend: BACKEND,
                message: format!("cannot reach {}: {err}", self.base_url),
            }
        } else {
            StorageError::Backend {
                backend: BACKEND,
                message: err.to_string(),
            }
        }
    }
}

async fn status_error(response: reqwest::Response) -> StorageError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    StorageError::Backend {
        backend: BACKEND,
        message: format!("HTTP {status}: {body}"),
    }
}

#[async_trait]
impl ConversationStore for FirestoreStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn load(&self, key: &SessionKey) -> Result<Option<ConversationState>, StorageError> {
        let url = self.document_url(key);
        debug!(%url, "firestore get");

        let response = self
            .authorize(self.http_client.get(&url))
            .await?
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let document: Document = response
            .json()
            .await
            .map_err(|e| StorageError::Decode(format!("invalid Firestore document: {e}")))?;
        decode_document(document).map(Some)
    }

    async fn save(&self, key: &SessionKey, state: &ConversationState) -> Result<(), StorageError> {
        let url = self.document_url(key);
        debug!(%url, messages = state.history.len(), "firestore patch");

        let response = self
            .authorize(self.http_client.patch(&url))
            .await?
            .json(&encode_document(state))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }
}

/// Firestore typed value. Only the variants this store reads or writes are modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Value {
    StringValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
    NullValue(Option<serde_json::Value>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ArrayValue {
    #[serde(default)]
    values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct MapValue {
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

fn encode_document(state: &ConversationState) -> Document {
    let messages = state
        .history
        .iter()
        .map(|message| {
            let mut fields = BTreeMap::new();
            fields.insert(
                "role".to_string(),
                Value::StringValue(message.role.as_str().to_string()),
            );
            fields.insert(
                "content".to_string(),
                Value::StringValue(message.content.clone()),
            );
            Value::MapValue(MapValue { fields })
        })
        .collect();

    let mut fields = BTreeMap::new();
    fields.insert(
        "messages".to_string(),
        Value::ArrayValue(ArrayValue { values: messages }),
    );
    fields.insert(
        "summary".to_string(),
        Value::StringValue(state.summary.clone()),
    );
    Document { fields }
}

fn decode_document(mut document: Document) -> Result<ConversationState, StorageError> {
    let summary = match document.fields.remove("summary") {
        Some(Value::StringValue(summary)) => summary,
        Some(Value::NullValue(_)) | None => String::new(),
        Some(other) => {
            return Err(StorageError::Decode(format!(
                "field `summary` is not a string: {other:?}"
            )));
        }
    };

    let history = match document.fields.remove("messages") {
        Some(Value::ArrayValue(array)) => array
            .values
            .into_iter()
            .enumerate()
            .map(|(index, value)| decode_message(index, value))
            .collect::<Result<Vec<_>, _>>()?,
        Some(Value::NullValue(_)) | None => Vec::new(),
        Some(other) => {
            return Err(StorageError::Decode(format!(
                "field `messages` is not an array: {other:?}"
            )));
        }
    };

    Ok(ConversationState { history, summary })
}

fn decode_message(index: usize, value: Value) -> Result<Message, StorageError> {
    let Value::MapValue(MapValue { mut fields }) = value else {
        return Err(StorageError::Decode(format!(
            "messages[{index}] is not a map"
        )));
    };

    let mut string_field = |name: &str| match fields.remove(name) {
        Some(Value::StringValue(text)) => Ok(text),
        _ => Err(StorageError::Decode(format!(
            "messages[{index}].{name} is missing or not a string"
        ))),
    };

    let role = string_field("role")?;
    let content = string_field("content")?;
    let role = match role.as_str() {
        "system" => MessageRole::System,
        "user" => MessageRole::User,
        "assistant" => MessageRole::Assistant,
        other => {
            return Err(StorageError::Decode(format!(
                "messages[{index}] has unknown role `{other}`"
            )));
        }
    };

    Ok(Message { role, content })
}
