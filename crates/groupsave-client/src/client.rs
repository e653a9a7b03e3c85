//! Main client implementation and the authenticated request gateway.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use url::Url;

use crate::api::{AuthApi, DashboardApi, GroupsApi, NotificationsApi};
use crate::error::{Error, ErrorResponse, Result};
use crate::handle::{SessionHandle, StaticToken};

/// Default timeout for requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// GroupSave API client.
///
/// Every request goes through one gateway path that attaches the bearer
/// token from the configured [`SessionHandle`] and reports 401 responses
/// back to it before returning [`Error::Unauthorized`].
///
/// # Example
///
/// ```no_run
/// use groupsave_client::GroupSaveClient;
///
/// # async fn example() -> groupsave_client::Result<()> {
/// let client = GroupSaveClient::builder()
///     .base_url("https://api.groupsave.app/api")
///     .auth_token("secret")
///     .build()?;
///
/// let dashboard = client.dashboard().get().await?;
/// println!("{} groups", dashboard.snapshot.my_groups.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GroupSaveClient {
    /// Inner shared state.
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    /// HTTP client.
    pub(crate) http: reqwest::Client,
    /// Base URL for API requests.
    pub(crate) base_url: Url,
    /// Request timeout.
    pub(crate) timeout: Duration,
    /// Token source and rejection sink.
    pub(crate) session: Option<Arc<dyn SessionHandle>>,
}

impl std::fmt::Debug for GroupSaveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupSaveClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .field("has_session", &self.inner.session.is_some())
            .finish()
    }
}

impl GroupSaveClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the sign-in, registration and recovery endpoints.
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// Access the dashboard endpoint.
    pub fn dashboard(&self) -> DashboardApi {
        DashboardApi::new(self.clone())
    }

    /// Access the groups API.
    pub fn groups(&self) -> GroupsApi {
        GroupsApi::new(self.clone())
    }

    /// Access the notifications API.
    pub fn notifications(&self) -> NotificationsApi {
        NotificationsApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Gateway
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner.base_url.join(path).map_err(Error::from)
    }

    /// Make a GET request.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        self.execute("GET", path, self.inner.http.get(url)).await
    }

    /// Make a POST request with a JSON body.
    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        self.execute("POST", path, self.inner.http.post(url).json(body))
            .await
    }

    /// Make a POST request without a body.
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        self.execute("POST", path, self.inner.http.post(url)).await
    }

    /// Attach credentials, send, and map the response.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        let request = self.authorize(request).await;
        trace!(method, path, "Sending request");

        let response = request.timeout(self.inner.timeout).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        debug!(method, path, status = status.as_u16(), "Response received");

        if status.is_success() {
            decode(&body)
        } else {
            Err(self.extract_error(status, &body).await)
        }
    }

    /// Attach `Authorization: Bearer <token>` if the session has one.
    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = match &self.inner.session {
            Some(session) => session.bearer_token().await,
            None => None,
        };
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Extract an error from a failed response.
    ///
    /// A 401 is reported to the session handle before the error is returned.
    async fn extract_error(&self, status: StatusCode, body: &[u8]) -> Error {
        let code = status.as_u16();
        let parsed: ErrorResponse = serde_json::from_slice(body).unwrap_or_default();
        let fallback = format!("HTTP {}", code);

        if status == StatusCode::UNAUTHORIZED {
            warn!("Request rejected as unauthenticated");
            if let Some(session) = &self.inner.session {
                session.unauthorized_response().await;
            }
            return Error::Unauthorized(parsed.message_or("Unauthenticated."));
        }

        if status == StatusCode::NOT_FOUND {
            return Error::NotFound(parsed.message_or(&fallback));
        }

        if status == StatusCode::UNPROCESSABLE_ENTITY
            || (status.is_client_error() && !parsed.errors.is_empty())
        {
            return Error::Validation {
                status: code,
                message: parsed.message_or(&fallback),
                errors: parsed.errors,
            };
        }

        Error::Api {
            status: code,
            message: parsed.message_or(&fallback),
        }
    }
}

/// Decode a success body, treating an empty body as `{}`.
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    Ok(serde_json::from_slice(body)?)
}

/// Builder for creating a GroupSaveClient.
pub struct ClientBuilder {
    base_url: Option<String>,
    session: Option<Arc<dyn SessionHandle>>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            session: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the base URL for the API (e.g. `https://api.groupsave.app/api`).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Use a fixed bearer token with no lifecycle.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.session = Some(Arc::new(StaticToken(token.into())));
        self
    }

    /// Use a session handle as the token source and 401 sink.
    pub fn session(mut self, session: Arc<dyn SessionHandle>) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<GroupSaveClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        // Parse and normalize base URL so relative joins keep its path
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("groupsave-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(GroupSaveClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                session: self.session,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
