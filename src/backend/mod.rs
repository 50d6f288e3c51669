//! Backend-as-a-service client.
//!
//! The client is built once from [`BackendConfig`] and shared by reference;
//! there is no process-wide instance. It covers:
//! - The active weekly challenge, with a placeholder when none is available
//! - Session persistence and throttled token refresh

pub mod challenge;
pub mod error;
pub mod response;
pub mod session;

pub use challenge::{Challenge, Submission};
pub use error::{BackendError, BackendResult};
pub use response::BackendResponse;
pub use session::{RefreshLimiter, RefreshPolicy, Session, SessionStore};

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::BackendConfig;

/// Timeout applied to every backend request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Title given to submissions without one.
const UNTITLED: &str = "Untitled";

/// Async client for the REST and auth endpoints of the backend.
#[derive(Clone, Debug)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    policy: RefreshPolicy,
    limiter: Arc<RefreshLimiter>,
}

impl BackendClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid, a header value is not valid
    /// ASCII, or the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        url::Url::parse(&config.url)?;

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("apikey"), header_value(&config.anon_key)?);
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", config.anon_key))?,
        );
        headers.insert(
            HeaderName::from_static("x-client-info"),
            header_value(&config.client_info)?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackendError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            policy: RefreshPolicy::default(),
            limiter: Arc::new(RefreshLimiter::default()),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn get_rows<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> BackendResult<Vec<R>> {
        let response = self
            .client
            .get(self.endpoint(path))
            .query(query)
            .send()
            .await
            .map_err(BackendError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        response
            .json::<Vec<R>>()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))
    }

    /// Earliest challenge still open at `now`, with its submissions.
    pub async fn fetch_active_challenge(&self, now: DateTime<Utc>) -> BackendResponse<Challenge> {
        self.lookup_active_challenge(now).await.into()
    }

    async fn lookup_active_challenge(&self, now: DateTime<Utc>) -> BackendResult<Option<Challenge>> {
        let query = [
            ("select", "*".to_string()),
            (
                "end_date",
                format!("gte.{}", now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ),
            ("order", "start_date.asc".to_string()),
            ("limit", "1".to_string()),
        ];
        let rows = self
            .get_rows::<ChallengeRow>("rest/v1/challenges", &query)
            .await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        let id = row.id.into_string();
        let query = [
            (
                "select",
                "id,image_url,title,description,votes,user_id,created_at".to_string(),
            ),
            ("challenge_id", format!("eq.{id}")),
            ("order", "votes.desc".to_string()),
        ];
        let submissions = self
            .get_rows::<SubmissionRow>("rest/v1/submissions", &query)
            .await?
            .into_iter()
            .map(SubmissionRow::into_submission)
            .collect();

        Ok(Some(Challenge {
            id,
            prompt: row.prompt,
            end_date: row.end_date,
            submissions,
        }))
    }

    /// Active challenge, or the placeholder when none can be fetched.
    pub async fn active_challenge(&self) -> Challenge {
        let now = Utc::now();
        match self.fetch_active_challenge(now).await {
            BackendResponse::Found(challenge) => challenge,
            BackendResponse::NotFound => {
                debug!("No open challenge, using placeholder");
                Challenge::placeholder(now)
            }
            BackendResponse::Error(e) => {
                warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    "Error fetching challenge, using placeholder"
                );
                Challenge::placeholder(now)
            }
        }
    }

    /// Exchange the refresh token for a new session.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-success status or an
    /// unexpected body.
    pub async fn refresh_session(&self, session: &Session) -> BackendResult<Session> {
        let response = self
            .client
            .post(self.endpoint("auth/v1/token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": session.refresh_token }))
            .send()
            .await
            .map_err(BackendError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        let expires_at = body
            .expires_at
            .or_else(|| body.expires_in.map(|secs| Utc::now().timestamp() + secs))
            .ok_or_else(|| BackendError::MalformedResponse("token has no expiry".to_string()))?;

        Ok(Session {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_at,
        })
    }

    /// Refresh a session close to expiry, at most once per second.
    /// A failed refresh keeps the old session.
    pub async fn maybe_refresh(&self, session: Session) -> Session {
        if !self.policy.should_refresh(&session, Utc::now().timestamp()) {
            return session;
        }
        if !self.limiter.try_acquire(Instant::now()) {
            debug!("Token refresh throttled");
            return session;
        }

        match self.refresh_session(&session).await {
            Ok(fresh) => {
                info!(expires_at = fresh.expires_at, "Session refreshed");
                fresh
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                session
            }
        }
    }

    /// Load the stored session, refresh it if needed and store the result.
    pub async fn refresh_stored_session(&self, sessions: &SessionStore) -> Option<Session> {
        let current = sessions.load().await?;
        let refreshed = self.maybe_refresh(current.clone()).await;
        if refreshed != current {
            if let Err(e) = sessions.save(&refreshed).await {
                warn!(error = %e, "Error saving refreshed session");
            }
        }
        Some(refreshed)
    }
}

fn header_value(value: &str) -> BackendResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| BackendError::HttpClient(e.to_string()))
}

/// Row ids may be numeric or textual depending on the table.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowId {
    Text(String),
    Number(i64),
}

impl RowId {
    fn into_string(self) -> String {
        match self {
            Self::Text(id) => id,
            Self::Number(id) => id.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChallengeRow {
    id: RowId,
    prompt: String,
    end_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SubmissionRow {
    id: RowId,
    image_url: String,
    title: Option<String>,
    #[serde(default)]
    votes: i64,
    user_id: String,
}

impl SubmissionRow {
    fn into_submission(self) -> Submission {
        Submission {
            id: self.id.into_string(),
            image_url: self.image_url,
            title: self
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            user_id: self.user_id,
            votes: self.votes,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::extract::Query;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    use crate::storage::{KeyValueStore, MemoryKvStore};

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base: &str) -> BackendClient {
        BackendClient::new(&BackendConfig::new(base, "anon-key")).unwrap()
    }

    #[tokio::test]
    async fn test_active_challenge_with_submissions() {
        let router = Router::new()
            .route(
                "/rest/v1/challenges",
                get(|headers: AxumHeaders, Query(q): Query<HashMap<String, String>>| async move {
                    assert_eq!(headers.get("apikey").unwrap(), "anon-key");
                    assert!(headers.get("x-client-info").is_some());
                    assert!(q["end_date"].starts_with("gte."));
                    assert_eq!(q["order"], "start_date.asc");
                    Json(json!([{
                        "id": 7,
                        "prompt": "A heron is fishing in a canal",
                        "end_date": "2030-01-01T00:00:00Z",
                        "start_date": "2029-12-25T00:00:00Z"
                    }]))
                }),
            )
            .route(
                "/rest/v1/submissions",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    assert_eq!(q["challenge_id"], "eq.7");
                    Json(json!([
                        {"id": "s1", "image_url": "https://img/1", "title": null, "votes": 3, "user_id": "u1"},
                        {"id": "s2", "image_url": "https://img/2", "title": "Heron", "votes": 1, "user_id": "u2"}
                    ]))
                }),
            );
        let base = spawn_stub(router).await;

        let challenge = client_for(&base).active_challenge().await;

        assert_eq!(challenge.id, "7");
        assert_eq!(challenge.prompt, "A heron is fishing in a canal");
        assert_eq!(challenge.submissions.len(), 2);
        assert_eq!(challenge.submissions[0].title, "Untitled");
        assert_eq!(challenge.submissions[1].title, "Heron");
    }

    #[tokio::test]
    async fn test_no_open_challenge_uses_placeholder() {
        let router = Router::new().route("/rest/v1/challenges", get(|| async { Json(json!([])) }));
        let base = spawn_stub(router).await;
        let client = client_for(&base);

        assert!(matches!(
            client.fetch_active_challenge(Utc::now()).await,
            BackendResponse::NotFound
        ));
        assert_eq!(client.active_challenge().await.id, challenge::PLACEHOLDER_ID);
    }

    #[tokio::test]
    async fn test_backend_error_uses_placeholder() {
        let router = Router::new().route(
            "/rest/v1/challenges",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let base = spawn_stub(router).await;
        let client = client_for(&base);

        assert!(matches!(
            client.fetch_active_challenge(Utc::now()).await,
            BackendResponse::Error(BackendError::Status(503))
        ));
        let challenge = client.active_challenge().await;
        assert_eq!(challenge.prompt, challenge::PLACEHOLDER_PROMPT);
    }

    #[tokio::test]
    async fn test_refresh_session() {
        let router = Router::new().route(
            "/auth/v1/token",
            post(|Query(q): Query<HashMap<String, String>>, Json(body): Json<Value>| async move {
                assert_eq!(q["grant_type"], "refresh_token");
                assert_eq!(body["refresh_token"], "old-refresh");
                Json(json!({
                    "access_token": "new-access",
                    "refresh_token": "new-refresh",
                    "expires_in": 3600
                }))
            }),
        );
        let base = spawn_stub(router).await;
        let client = client_for(&base);

        let kv = Arc::new(MemoryKvStore::new());
        let sessions = SessionStore::new(kv.clone() as Arc<dyn KeyValueStore>);
        sessions
            .save(&Session {
                access_token: "old-access".to_string(),
                refresh_token: "old-refresh".to_string(),
                expires_at: Utc::now().timestamp() + 60,
            })
            .await
            .unwrap();

        let refreshed = client.refresh_stored_session(&sessions).await.unwrap();
        assert_eq!(refreshed.access_token, "new-access");
        assert!(refreshed.expires_at > Utc::now().timestamp() + 3000);
        assert_eq!(sessions.load().await, Some(refreshed));
    }

    #[tokio::test]
    async fn test_fresh_session_is_not_refreshed() {
        let client = client_for("http://127.0.0.1:9");
        let session = Session {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: Utc::now().timestamp() + 3600,
        };
        assert_eq!(client.maybe_refresh(session.clone()).await, session);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_session() {
        let router = Router::new().route(
            "/auth/v1/token",
            post(|| async { (StatusCode::BAD_REQUEST, "invalid grant") }),
        );
        let base = spawn_stub(router).await;
        let session = Session {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: 0,
        };

        assert_eq!(client_for(&base).maybe_refresh(session.clone()).await, session);
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let config = BackendConfig::new("not a url", "key");
        assert!(matches!(
            BackendClient::new(&config),
            Err(BackendError::InvalidUrl(_))
        ));
    }
}
