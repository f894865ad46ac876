//! Test helpers for loadbot.
//!
//! [`MockApi`] serves the content-and-voting API from memory on a local port so
//! the client and harness can be exercised end to end without a real backend.
//! It enforces the same rules the real service does:
//!
//! - usernames and post titles are unique
//! - one vote per user and post
//! - only a post's author may delete it
//! - every route except login, verification and registration needs a token
//!
//! Each handled request is counted per route (`"POST posts"`,
//! `"GET users/me"`, ...) so tests can assert exactly which calls were made.
//! Failure switches inject rejections that the real service would only produce
//! under contention.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use loadbot_types::{
    NewPostRequest, PostId, PostRecord, RegistrationRequest, RegistrationResponse, TokenRequest,
    TokenResponse, UserId, UserRecord, VerifyTokenRequest, VoteRecord,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Path prefix the API is mounted under.
pub const API_PREFIX: &str = "/api/v1";

struct StoredUser {
    record: UserRecord,
    password: String,
}

#[derive(Default)]
struct MockState {
    users: Vec<StoredUser>,
    tokens: HashMap<String, UserId>,
    posts: BTreeMap<PostId, PostRecord>,
    votes: Vec<VoteRecord>,
    next_user_id: UserId,
    next_post_id: PostId,
    next_vote_id: u64,
    issued_tokens: u64,
    requests: HashMap<&'static str, usize>,
    fail_registrations: usize,
    fail_posts: usize,
    reject_tokens: bool,
    anonymous_votes: bool,
}

impl MockState {
    fn hit(&mut self, route: &'static str) {
        *self.requests.entry(route).or_default() += 1;
    }

    fn insert_user(&mut self, username: &str, password: &str, email: &str) -> UserRecord {
        self.next_user_id += 1;
        let record = UserRecord {
            id: self.next_user_id,
            username: username.to_string(),
            email: email.to_string(),
            groups: Vec::new(),
        };
        self.users.push(StoredUser {
            record: record.clone(),
            password: password.to_string(),
        });
        record
    }

    fn issue_token(&mut self, user_id: UserId) -> String {
        self.issued_tokens += 1;
        let token = format!("mock.{}.{}", user_id, self.issued_tokens);
        self.tokens.insert(token.clone(), user_id);
        token
    }

    fn user(&self, id: UserId) -> Option<&UserRecord> {
        self.users.iter().map(|u| &u.record).find(|u| u.id == id)
    }

    fn insert_post(&mut self, author: UserId, title: &str, content: &str) -> PostRecord {
        self.next_post_id += 1;
        let post = PostRecord {
            id: self.next_post_id,
            title: title.to_string(),
            slug: slugify(title),
            author,
            content: content.to_string(),
            likes: 0,
            dislikes: 0,
            created_on: None,
            updated_on: None,
        };
        self.posts.insert(post.id, post.clone());
        post
    }

    /// Resolve the `Authorization: JWT <token>` header.
    fn authorize(&self, headers: &HeaderMap) -> Result<UserId, Response> {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("JWT "))
            .and_then(|token| self.tokens.get(token).copied())
            .ok_or_else(|| {
                reject(
                    StatusCode::UNAUTHORIZED,
                    json!({"detail": "Authentication credentials were not provided."}),
                )
            })
    }
}

type Shared = Arc<Mutex<MockState>>;

fn reject(status: StatusCode, errors: Value) -> Response {
    (status, Json(errors)).into_response()
}

fn slugify(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// In-memory content-and-voting API bound to a local port.
///
/// The server task is aborted when the value is dropped.
pub struct MockApi {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockApi {
    /// Bind to an ephemeral port on localhost and start serving.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock api listener");
        let addr = listener.local_addr().expect("mock api local address");

        let app = Router::new().nest(API_PREFIX, routes(Arc::clone(&state)));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL to hand to the client, including the API prefix.
    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.addr, API_PREFIX)
    }

    /// Create a user directly, bypassing registration.
    pub fn add_user(&self, username: &str, password: &str, email: &str) -> UserId {
        self.state.lock().insert_user(username, password, email).id
    }

    /// Create a post directly on behalf of `author`.
    pub fn add_post(&self, author: UserId, title: &str, content: &str) -> PostId {
        self.state.lock().insert_post(author, title, content).id
    }

    /// Requests handled for a route label such as `"POST posts"`.
    pub fn requests(&self, route: &str) -> usize {
        self.state.lock().requests.get(route).copied().unwrap_or(0)
    }

    /// Requests handled across all routes.
    pub fn total_requests(&self) -> usize {
        self.state.lock().requests.values().sum()
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().users.len()
    }

    pub fn post_count(&self) -> usize {
        self.state.lock().posts.len()
    }

    pub fn vote_count(&self) -> usize {
        self.state.lock().votes.len()
    }

    /// All stored posts, oldest first.
    pub fn posts(&self) -> Vec<PostRecord> {
        self.state.lock().posts.values().cloned().collect()
    }

    /// Number of posts per author.
    pub fn posts_by_author(&self) -> HashMap<UserId, usize> {
        let mut counts = HashMap::new();
        for post in self.state.lock().posts.values() {
            *counts.entry(post.author).or_default() += 1;
        }
        counts
    }

    /// Number of votes per author.
    pub fn votes_by_author(&self) -> HashMap<UserId, usize> {
        let mut counts = HashMap::new();
        for vote in &self.state.lock().votes {
            if let Some(author) = vote.author {
                *counts.entry(author).or_default() += 1;
            }
        }
        counts
    }

    /// Reject the next `n` registrations with a 400.
    pub fn fail_next_registrations(&self, n: usize) {
        self.state.lock().fail_registrations = n;
    }

    /// Reject the next `n` post creations with a 400.
    pub fn fail_next_posts(&self, n: usize) {
        self.state.lock().fail_posts = n;
    }

    /// Make `auth/verify` reject every token while set.
    pub fn reject_token_verification(&self, reject: bool) {
        self.state.lock().reject_tokens = reject;
    }

    /// Leave the voter out of vote responses while set. Votes are still
    /// stored with their author.
    pub fn omit_vote_author(&self, omit: bool) {
        self.state.lock().anonymous_votes = omit;
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn routes(state: Shared) -> Router {
    Router::new()
        .route("/auth/", post(login))
        .route("/auth/verify/", post(verify))
        .route("/auth/registration/", post(register))
        .route("/users/", get(list_users))
        .route("/users/me/", get(me))
        .route("/posts/", get(list_posts).post(create_post))
        .route("/posts/{id}/", delete(delete_post))
        .route("/posts/{id}/like/", post(like))
        .route("/posts/{id}/dislike/", post(dislike))
        .with_state(state)
}

async fn login(State(state): State<Shared>, Json(body): Json<TokenRequest>) -> Response {
    let mut state = state.lock();
    state.hit("POST auth");

    let user_id = state
        .users
        .iter()
        .find(|u| {
            (u.record.username == body.username || u.record.email == body.username)
                && u.password == body.password
        })
        .map(|u| u.record.id);

    match user_id {
        Some(id) => {
            let token = state.issue_token(id);
            Json(TokenResponse { token }).into_response()
        }
        None => reject(
            StatusCode::BAD_REQUEST,
            json!({"non_field_errors": ["Unable to log in with provided credentials."]}),
        ),
    }
}

async fn verify(State(state): State<Shared>, Json(body): Json<VerifyTokenRequest>) -> Response {
    let mut state = state.lock();
    state.hit("POST auth/verify");

    if state.reject_tokens || !state.tokens.contains_key(&body.token) {
        return reject(
            StatusCode::BAD_REQUEST,
            json!({"non_field_errors": ["Error decoding signature."]}),
        );
    }
    Json(TokenResponse { token: body.token }).into_response()
}

async fn register(State(state): State<Shared>, Json(body): Json<RegistrationRequest>) -> Response {
    let mut state = state.lock();
    state.hit("POST auth/registration");

    if state.fail_registrations > 0 {
        state.fail_registrations -= 1;
        return reject(
            StatusCode::BAD_REQUEST,
            json!({"email": ["Enter a valid email address."]}),
        );
    }
    if body.username.is_empty() {
        return reject(
            StatusCode::BAD_REQUEST,
            json!({"username": ["This field may not be blank."]}),
        );
    }
    if body.password1 != body.password2 {
        return reject(
            StatusCode::BAD_REQUEST,
            json!({"non_field_errors": ["The two password fields didn't match."]}),
        );
    }
    if state
        .users
        .iter()
        .any(|u| u.record.username == body.username)
    {
        return reject(
            StatusCode::BAD_REQUEST,
            json!({"username": ["A user with that username already exists."]}),
        );
    }

    let user = state.insert_user(&body.username, &body.password1, &body.email);
    let token = state.issue_token(user.id);
    (StatusCode::CREATED, Json(RegistrationResponse { user, token })).into_response()
}

async fn list_users(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock();
    state.hit("GET users");
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    let users: Vec<UserRecord> = state.users.iter().map(|u| u.record.clone()).collect();
    Json(users).into_response()
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock();
    state.hit("GET users/me");
    let user_id = match state.authorize(&headers) {
        Ok(id) => id,
        Err(rejection) => return rejection,
    };
    match state.user(user_id) {
        Some(user) => Json(user.clone()).into_response(),
        None => reject(StatusCode::NOT_FOUND, json!({"detail": "Not found."})),
    }
}

async fn list_posts(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock();
    state.hit("GET posts");
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    // Newest first, as the real API orders them
    let posts: Vec<PostRecord> = state.posts.values().rev().cloned().collect();
    Json(posts).into_response()
}

async fn create_post(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<NewPostRequest>,
) -> Response {
    let mut state = state.lock();
    state.hit("POST posts");
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }

    if state.fail_posts > 0 {
        state.fail_posts -= 1;
        return reject(
            StatusCode::BAD_REQUEST,
            json!({"title": ["post with this title already exists."]}),
        );
    }
    if state.posts.values().any(|p| p.title == body.title) {
        return reject(
            StatusCode::BAD_REQUEST,
            json!({"title": ["post with this title already exists."]}),
        );
    }
    if state.user(body.author).is_none() {
        return reject(
            StatusCode::BAD_REQUEST,
            json!({"author": [format!("Invalid pk \"{}\" - object does not exist.", body.author)]}),
        );
    }

    let post = state.insert_post(body.author, &body.title, &body.content);
    (StatusCode::CREATED, Json(post)).into_response()
}

async fn delete_post(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<PostId>,
) -> Response {
    let mut state = state.lock();
    state.hit("DELETE posts");
    let user_id = match state.authorize(&headers) {
        Ok(id) => id,
        Err(rejection) => return rejection,
    };

    match state.posts.get(&id).map(|p| p.author) {
        None => reject(StatusCode::NOT_FOUND, json!({"detail": "Not found."})),
        Some(author) if author != user_id => reject(
            StatusCode::FORBIDDEN,
            json!({"detail": "You must be the creator of this object."}),
        ),
        Some(_) => {
            state.posts.remove(&id);
            state.votes.retain(|v| v.object_id != Some(id));
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

async fn like(state: State<Shared>, headers: HeaderMap, id: Path<PostId>) -> Response {
    cast(state, headers, id, 1, "POST posts/like")
}

async fn dislike(state: State<Shared>, headers: HeaderMap, id: Path<PostId>) -> Response {
    cast(state, headers, id, -1, "POST posts/dislike")
}

fn cast(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<PostId>,
    weight: i8,
    route: &'static str,
) -> Response {
    let mut state = state.lock();
    state.hit(route);
    let user_id = match state.authorize(&headers) {
        Ok(id) => id,
        Err(rejection) => return rejection,
    };

    if !state.posts.contains_key(&id) {
        return reject(StatusCode::NOT_FOUND, json!({"detail": "Not found."}));
    }
    if state
        .votes
        .iter()
        .any(|v| v.author == Some(user_id) && v.object_id == Some(id))
    {
        return reject(
            StatusCode::BAD_REQUEST,
            json!({"non_field_errors": ["You have already voted on this post."]}),
        );
    }

    state.next_vote_id += 1;
    let vote = VoteRecord {
        id: Some(state.next_vote_id),
        vote: weight,
        author: Some(user_id),
        object_id: Some(id),
        created_at: None,
    };
    state.votes.push(vote.clone());
    if let Some(post) = state.posts.get_mut(&id) {
        if weight > 0 {
            post.likes += 1;
        } else {
            post.dislikes += 1;
        }
    }

    let response = if state.anonymous_votes {
        VoteRecord {
            author: None,
            ..vote
        }
    } else {
        vote
    };
    (StatusCode::CREATED, Json(response)).into_response()
}
