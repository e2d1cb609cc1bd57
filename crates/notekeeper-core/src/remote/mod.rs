//! Remote note service.
//!
//! `RemoteNoteService` is the seam the sync reconciler talks through;
//! `NoteKeeperClient` implements it over the NoteKeeper REST API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{IncomingMessage, Note, NoteId};
use crate::util::compact_text;

/// Authoritative CRUD endpoint for notes
#[async_trait]
pub trait RemoteNoteService: Send + Sync {
    /// Full server listing; `None` when the server answered without data
    async fn list_notes(&self) -> Result<Option<Vec<Note>>>;

    /// Create a note and return the server's copy (with its new id)
    async fn create_note(&self, content: &str) -> Result<Note>;

    /// Push a note's content; `false` when the server refused it
    async fn update_note(&self, note: &Note) -> Result<bool>;

    /// Delete a note; `false` when the server refused it
    async fn delete_note(&self, id: &NoteId) -> Result<bool>;
}

/// HTTP client for the NoteKeeper API.
///
/// Keeps a cookie jar so the session established by `identifier()` is sent
/// with every later request. The session can be exported with
/// `session_cookie()` and restored in another process with `with_session()`.
pub struct NoteKeeperClient {
    base_url: String,
    session_url: Url,
    jar: Arc<Jar>,
    client: reqwest::Client,
    identifier: OnceCell<String>,
}

impl NoteKeeperClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Self::with_session(config, None)
    }

    /// Build a client whose cookie jar starts with a previously exported
    /// session (`name=value` pairs separated by `;`).
    pub fn with_session(config: &ClientConfig, session: Option<&str>) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let session_url = Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("invalid base URL `{base_url}`: {e}")))?;

        let jar = Arc::new(Jar::default());
        for cookie in session
            .into_iter()
            .flat_map(|session| session.split(';'))
            .map(str::trim)
            .filter(|cookie| !cookie.is_empty())
        {
            jar.add_cookie_str(cookie, &session_url);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .default_headers(headers)
            .timeout(config.http_timeout())
            .build()?;

        Ok(Self {
            base_url,
            session_url,
            jar,
            client,
            identifier: OnceCell::new(),
        })
    }

    /// Session cookies currently held for the API, as `name=value` pairs.
    pub fn session_cookie(&self) -> Option<String> {
        let header = self.jar.cookies(&self.session_url)?;
        header
            .to_str()
            .ok()
            .map(ToString::to_string)
            .filter(|cookie| !cookie.is_empty())
    }

    /// Client identifier issued by `auth/login`; fetched once, then cached.
    pub async fn identifier(&self) -> Result<&str> {
        let identifier = self
            .identifier
            .get_or_try_init(|| async {
                let response = self.request(Method::GET, "auth/login").send().await?;
                let payload: LoginResponse = Self::ensure_success(response).await?.json().await?;
                tracing::debug!("Obtained client identifier");
                Ok::<_, Error>(payload.identifier)
            })
            .await?;
        Ok(identifier.as_str())
    }

    /// End the server session.
    pub async fn logout(&self) -> Result<()> {
        let response = self.request(Method::GET, "logout").send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Server-side message history, oldest first.
    pub async fn list_messages(&self) -> Result<Vec<IncomingMessage>> {
        let response = self.request(Method::GET, "messages").send().await?;
        let payload: MessagesEnvelope = Self::ensure_success(response).await?.json().await?;
        Ok(payload.messages.unwrap_or_default())
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        let endpoint = endpoint.trim_matches('/');
        if endpoint.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{endpoint}", self.base_url)
        }
    }

    fn request(&self, method: Method, endpoint: &str) -> reqwest::RequestBuilder {
        self.client.request(method, self.endpoint_url(endpoint))
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Api(parse_api_error(status, &body)))
    }
}

#[async_trait]
impl RemoteNoteService for NoteKeeperClient {
    async fn list_notes(&self) -> Result<Option<Vec<Note>>> {
        let response = self.request(Method::GET, "notes").send().await?;
        let payload: NotesEnvelope = Self::ensure_success(response).await?.json().await?;
        Ok(payload.notes)
    }

    async fn create_note(&self, content: &str) -> Result<Note> {
        let response = self
            .request(Method::POST, "notes")
            .json(&ContentBody { content })
            .send()
            .await?;
        let payload: NoteEnvelope = Self::ensure_success(response).await?.json().await?;
        payload
            .note
            .ok_or_else(|| Error::Api("create response did not include a note".to_string()))
    }

    async fn update_note(&self, note: &Note) -> Result<bool> {
        let id = note
            .id
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("cannot update a note without an id".into()))?;
        let response = self
            .request(Method::PUT, &format!("notes/{id}"))
            .json(&ContentBody {
                content: &note.content,
            })
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    async fn delete_note(&self, id: &NoteId) -> Result<bool> {
        let response = self
            .request(Method::DELETE, &format!("notes/{id}"))
            .json(&IdBody { id })
            .send()
            .await?;
        Ok(response.status().is_success())
    }
}

#[derive(Serialize)]
struct ContentBody<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct IdBody<'a> {
    id: &'a NoteId,
}

#[derive(Debug, Deserialize)]
struct NotesEnvelope {
    #[serde(default)]
    notes: Option<Vec<Note>>,
}

#[derive(Debug, Deserialize)]
struct NoteEnvelope {
    #[serde(default)]
    note: Option<Note>,
}

#[derive(Debug, Deserialize)]
struct MessagesEnvelope {
    #[serde(default)]
    messages: Option<Vec<IncomingMessage>>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    identifier: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
