//! The per-actor API session.

use crate::error::ApiError;
use crate::metrics::{Operation, RequestMetrics};
use crate::url::build_url;
use loadbot_types::{
    Actor, ContentItem, NewPostRequest, PostId, PostRecord, RegistrationRequest,
    RegistrationResponse, TokenRequest, TokenResponse, UserRecord, VerifyTokenRequest,
    VoteAction, VoteDirection, VoteRecord,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

/// Statuses treated as success for every operation.
pub const ACCEPTED_STATUSES: [u16; 5] = [200, 201, 301, 302, 304];

/// `DELETE` answers with 204 No Content.
const NO_CONTENT: u16 = 204;

/// Connection settings shared by every client of one API host.
///
/// Holds the HTTP connection pool and the metrics collector. Cloning is cheap.
/// Sessions are never shared: each [`ServiceClient`] handed out by
/// [`connect`](Self::connect) carries its own token and identity.
#[derive(Clone)]
pub struct ServiceEndpoint {
    http: reqwest::Client,
    host: String,
    metrics: Arc<RequestMetrics>,
}

impl ServiceEndpoint {
    /// Create an endpoint for the API rooted at `host`.
    ///
    /// `accept_invalid_certs` lets the harness target hosts with self-signed
    /// certificates.
    pub fn new(host: impl Into<String>, accept_invalid_certs: bool) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;

        Ok(Self {
            http,
            host: host.into(),
            metrics: Arc::new(RequestMetrics::new()),
        })
    }

    /// Base URL of the API.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Metrics shared by all clients of this endpoint.
    pub fn metrics(&self) -> &Arc<RequestMetrics> {
        &self.metrics
    }

    /// Open a new, unauthenticated session.
    pub fn connect(&self) -> ServiceClient {
        ServiceClient {
            endpoint: self.clone(),
            token: None,
            identity: OnceCell::new(),
        }
    }
}

impl fmt::Debug for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEndpoint")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

/// A single actor's session with the API.
///
/// The token is installed by [`authenticate`](Self::authenticate) or
/// [`authenticate_with_token`](Self::authenticate_with_token) and only read
/// afterwards, so an authenticated client can be shared behind an `Arc` by the
/// tasks of the actor that owns it. Installing a different token drops the
/// cached identity.
///
/// Each operation is one round trip, except that
/// [`create_content`](Self::create_content) first looks up the identity when
/// it is not cached yet. Nothing is retried.
pub struct ServiceClient {
    endpoint: ServiceEndpoint,
    token: Option<String>,
    identity: OnceCell<UserRecord>,
}

impl ServiceClient {
    /// Whether a token is installed.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// The installed token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Log in with a username (or email) and password.
    ///
    /// Installs the issued token and returns it.
    pub async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<String, ApiError> {
        let body = TokenRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: TokenResponse = self
            .call(Operation::Authenticate, Method::POST, "auth", Some(&body))
            .await?;
        self.install_token(Some(response.token.clone()));
        Ok(response.token)
    }

    /// Verify `token` with the API and install it.
    ///
    /// On failure any previously installed token is dropped, leaving the client
    /// unauthenticated.
    pub async fn authenticate_with_token(&mut self, token: &str) -> Result<(), ApiError> {
        let body = VerifyTokenRequest {
            token: token.to_string(),
        };
        match self
            .execute(Operation::VerifyToken, Method::POST, "auth/verify", Some(&body))
            .await
        {
            Ok(_) => {
                self.install_token(Some(token.to_string()));
                Ok(())
            }
            Err(e) => {
                self.install_token(None);
                Err(e)
            }
        }
    }

    /// Register a new user. Does not authenticate this client.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<Actor, ApiError> {
        let body = RegistrationRequest::new(username, password, email);
        let response: RegistrationResponse = self
            .call(
                Operation::Register,
                Method::POST,
                "auth/registration",
                Some(&body),
            )
            .await?;
        Ok(Actor::from_registration(password, response))
    }

    /// The authenticated user. Fetched on first access and cached for the
    /// lifetime of the client, even when first accessed concurrently.
    pub async fn current_identity(&self) -> Result<&UserRecord, ApiError> {
        self.require_token()?;
        self.identity
            .get_or_try_init(|| {
                self.call(Operation::CurrentIdentity, Method::GET, "users/me", None::<&()>)
            })
            .await
    }

    /// All users known to the API.
    pub async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
        self.require_token()?;
        self.call(Operation::ListUsers, Method::GET, "users", None::<&()>)
            .await
    }

    /// All posts known to the API.
    pub async fn list_content(&self) -> Result<Vec<PostRecord>, ApiError> {
        self.require_token()?;
        self.call(Operation::ListContent, Method::GET, "posts", None::<&()>)
            .await
    }

    /// Create a post authored by the authenticated user.
    pub async fn create_content(&self, title: &str, body: &str) -> Result<ContentItem, ApiError> {
        self.require_token()?;
        let author = self.current_identity().await?.id;
        let request = NewPostRequest {
            title: title.to_string(),
            content: body.to_string(),
            author,
        };
        let post: PostRecord = self
            .call(Operation::CreateContent, Method::POST, "posts", Some(&request))
            .await?;
        Ok(post.into())
    }

    /// Like or dislike a post. One round trip.
    ///
    /// The issuing user comes from the response, or from the cached identity
    /// when the response leaves it out. The identity is never fetched here.
    pub async fn vote(
        &self,
        content_id: PostId,
        direction: VoteDirection,
    ) -> Result<VoteAction, ApiError> {
        self.require_token()?;
        let path = format!("posts/{}/{}", content_id, direction.path_segment());
        let record: VoteRecord = self
            .call(Operation::Vote, Method::POST, &path, None::<&()>)
            .await?;

        let actor_id = record
            .author
            .or_else(|| self.identity.get().map(|user| user.id));

        Ok(VoteAction {
            vote_id: record.id,
            content_id: record.object_id.unwrap_or(content_id),
            direction: VoteDirection::from_weight(record.vote).unwrap_or(direction),
            actor_id,
        })
    }

    /// Delete a post owned by the authenticated user.
    pub async fn delete_content(&self, content_id: PostId) -> Result<(), ApiError> {
        self.require_token()?;
        let path = format!("posts/{}", content_id);
        self.execute(Operation::DeleteContent, Method::DELETE, &path, None::<&()>)
            .await?;
        Ok(())
    }

    /// Swap the token. A different token may belong to a different user, so
    /// the cached identity goes with the old one.
    fn install_token(&mut self, token: Option<String>) {
        if self.token != token {
            self.identity = OnceCell::new();
        }
        self.token = token;
    }

    fn require_token(&self) -> Result<&str, ApiError> {
        self.token.as_deref().ok_or(ApiError::Unauthorized)
    }

    /// One round trip decoded into `T`.
    async fn call<T, B>(
        &self,
        operation: Operation,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let bytes = self.execute(operation, method, path, body).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// One round trip with status checking. Records metrics.
    async fn execute<B>(
        &self,
        operation: Operation,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let started = Instant::now();
        let result = self.send(operation, method, path, body).await;
        self.endpoint
            .metrics
            .record(operation, started.elapsed(), result.is_ok());
        result
    }

    async fn send<B>(
        &self,
        operation: Operation,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = build_url(&self.endpoint.host, path);
        trace!(%operation, %method, %url, "Sending request");

        let mut request = self.endpoint.http.request(method, &url);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("JWT {}", token));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?.to_vec();

        if is_accepted(operation, status) {
            return Ok(bytes);
        }

        let errors = serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::Object(Default::default()));
        debug!(%operation, status, %errors, "Request rejected");
        Err(classify(operation, status, errors))
    }
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("host", &self.endpoint.host)
            .field("authenticated", &self.is_authenticated())
            .field("identity", &self.identity.get().map(|u| &u.username))
            .finish()
    }
}

fn is_accepted(operation: Operation, status: u16) -> bool {
    ACCEPTED_STATUSES.contains(&status)
        || (operation == Operation::DeleteContent && status == NO_CONTENT)
}

fn classify(operation: Operation, status: u16, errors: Value) -> ApiError {
    match operation {
        Operation::Authenticate | Operation::VerifyToken => ApiError::Auth { status, errors },
        Operation::Register => ApiError::Registration { status, errors },
        _ => ApiError::Request { status, errors },
    }
}
