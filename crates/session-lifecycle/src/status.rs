//! Status probing against the remote authentication service.
//!
//! One call, one answer: "who, if anyone, is authenticated with this
//! credential?". The interesting part is classification. A rejected
//! credential must never look like a network blip, or the controller would
//! keep retrying something that cannot succeed.

use crate::session::{Credential, UserProfile};
use crate::{SessionError, SessionResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CACHE_CONTROL, PRAGMA};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Outcome of one status query.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusResult {
    LoggedIn(UserProfile),
    /// The server answered and nobody is authenticated.
    LoggedOut,
    /// Network-level failure worth retrying.
    TransientFailure(String),
    /// The credential was rejected (HTTP 401).
    AuthFailure,
    /// The response did not match the documented payload.
    ProtocolFailure(String),
}

impl StatusResult {
    /// Short name for logs; never includes user data.
    pub fn label(&self) -> &'static str {
        match self {
            StatusResult::LoggedIn(_) => "logged_in",
            StatusResult::LoggedOut => "logged_out",
            StatusResult::TransientFailure(_) => "transient_failure",
            StatusResult::AuthFailure => "auth_failure",
            StatusResult::ProtocolFailure(_) => "protocol_failure",
        }
    }
}

/// Remote calls the controller depends on.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    /// Issue exactly one status query with `credential`.
    async fn fetch(&self, credential: &Credential) -> StatusResult;

    /// Best-effort remote logout.
    async fn confirm_logout(&self, credential: &Credential) -> SessionResult<()>;
}

/// Status response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    logged_in: bool,
    #[serde(default)]
    user: Option<UserProfile>,
}

/// Endpoints and limits for [`HttpStatusFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub status_url: Url,
    pub logout_url: Url,
    pub request_timeout: Duration,
}

impl FetcherSettings {
    pub fn from_config(config: &session_config::Config) -> SessionResult<Self> {
        Ok(Self {
            status_url: config.status_url()?,
            logout_url: config.logout_url()?,
            request_timeout: config.request_timeout(),
        })
    }
}

/// Explicit description of one outbound request. Nothing is inherited from
/// client-wide defaults.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub url: Url,
    pub headers: HeaderMap,
    pub timeout: Duration,
}

/// reqwest-backed [`StatusFetcher`].
///
/// The client keeps a cookie jar so cookie-mode sessions ride along with
/// every request without the controller seeing them.
pub struct HttpStatusFetcher {
    http_client: Client,
    settings: FetcherSettings,
}

impl HttpStatusFetcher {
    pub fn new(settings: FetcherSettings) -> SessionResult<Self> {
        let http_client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http_client,
            settings,
        })
    }

    /// Build the request for `url` carrying `credential`.
    pub fn describe(&self, url: &Url, credential: &Credential) -> RequestDescriptor {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = credential.bearer_token() {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("stored token is not a valid header value, sending without it"),
            }
        }

        RequestDescriptor {
            url: url.clone(),
            headers,
            timeout: self.settings.request_timeout,
        }
    }

    async fn send(&self, request: RequestDescriptor) -> SessionResult<reqwest::Response> {
        Ok(self
            .http_client
            .get(request.url)
            .headers(request.headers)
            .timeout(request.timeout)
            .send()
            .await?)
    }
}

/// Map an HTTP status and body to a [`StatusResult`].
pub fn classify_response(status: StatusCode, body: &str) -> StatusResult {
    if status == StatusCode::UNAUTHORIZED {
        return StatusResult::AuthFailure;
    }

    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        return StatusResult::TransientFailure(format!("HTTP {}", status.as_u16()));
    }

    if !status.is_success() {
        return StatusResult::ProtocolFailure(format!("unexpected HTTP {}", status.as_u16()));
    }

    match serde_json::from_str::<StatusResponse>(body) {
        Ok(StatusResponse {
            logged_in: true,
            user: Some(user),
        }) => StatusResult::LoggedIn(user),
        Ok(StatusResponse {
            logged_in: true,
            user: None,
        }) => StatusResult::ProtocolFailure("loggedIn without user".to_string()),
        Ok(StatusResponse {
            logged_in: false, ..
        }) => StatusResult::LoggedOut,
        Err(e) => StatusResult::ProtocolFailure(format!("malformed status body: {}", e)),
    }
}

/// Map a transport error to a [`StatusResult`].
pub fn classify_error(error: SessionError) -> StatusResult {
    if error.is_transient() {
        StatusResult::TransientFailure(error.to_string())
    } else {
        StatusResult::ProtocolFailure(error.to_string())
    }
}

#[async_trait]
impl StatusFetcher for HttpStatusFetcher {
    async fn fetch(&self, credential: &Credential) -> StatusResult {
        let request = self.describe(&self.settings.status_url, credential);
        debug!(url = %request.url, credential = ?credential, "Querying auth status");

        let response = match self.send(request).await {
            Ok(response) => response,
            Err(e) => return classify_error(e),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return classify_error(SessionError::Http(e)),
        };

        let result = classify_response(status, &body);
        debug!(status = %status, result = result.label(), "Auth status classified");
        result
    }

    async fn confirm_logout(&self, credential: &Credential) -> SessionResult<()> {
        let request = self.describe(&self.settings.logout_url, credential);
        let response = self.send(request).await?;

        if !response.status().is_success() && !response.status().is_redirection() {
            return Err(SessionError::Protocol(format!(
                "logout returned HTTP {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn settings_for(server: &MockServer) -> FetcherSettings {
        let base = Url::parse(&server.uri()).unwrap();
        FetcherSettings {
            status_url: base.join("/api/auth/status").unwrap(),
            logout_url: base.join("/api/auth/logout").unwrap(),
            request_timeout: Duration::from_millis(300),
        }
    }

    #[test]
    fn test_classify_logged_in() {
        let result = classify_response(
            StatusCode::OK,
            r#"{"loggedIn":true,"user":{"username":"alice","displayName":"Alice"}}"#,
        );
        match result {
            StatusResult::LoggedIn(user) => {
                assert_eq!(user.username, "alice");
                assert_eq!(user.display_label(), "Alice");
            }
            other => panic!("Expected LoggedIn, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_logged_out() {
        assert_eq!(
            classify_response(StatusCode::OK, r#"{"loggedIn":false}"#),
            StatusResult::LoggedOut
        );
        // A stray user next to loggedIn:false is ignored.
        assert_eq!(
            classify_response(
                StatusCode::OK,
                r#"{"loggedIn":false,"user":{"username":"ghost"}}"#
            ),
            StatusResult::LoggedOut
        );
    }

    #[test]
    fn test_classify_unauthorized_is_auth_failure() {
        assert_eq!(
            classify_response(StatusCode::UNAUTHORIZED, r#"{"error":"expired"}"#),
            StatusResult::AuthFailure
        );
    }

    #[test]
    fn test_classify_server_errors_are_transient() {
        for code in [500u16, 502, 503, 504, 408, 429] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(
                matches!(classify_response(status, ""), StatusResult::TransientFailure(_)),
                "HTTP {} should be transient",
                code
            );
        }
    }

    #[test]
    fn test_classify_protocol_failures() {
        assert!(matches!(
            classify_response(StatusCode::OK, "<html>oops</html>"),
            StatusResult::ProtocolFailure(_)
        ));
        assert!(matches!(
            classify_response(StatusCode::OK, r#"{"loggedIn":true}"#),
            StatusResult::ProtocolFailure(_)
        ));
        assert!(matches!(
            classify_response(StatusCode::NOT_FOUND, ""),
            StatusResult::ProtocolFailure(_)
        ));
    }

    #[tokio::test]
    async fn test_fetch_sends_bearer_and_no_cache_headers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/status"))
            .and(header("authorization", "Bearer abc123"))
            .and(header("cache-control", "no-cache"))
            .and(header("pragma", "no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "loggedIn": true,
                "user": {"username": "alice"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpStatusFetcher::new(settings_for(&server)).unwrap();
        let result = fetcher
            .fetch(&Credential::Bearer("abc123".to_string()))
            .await;

        assert_eq!(result, StatusResult::LoggedIn(UserProfile::new("alice")));
    }

    #[tokio::test]
    async fn test_fetch_ambient_sends_no_authorization() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/status"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"loggedIn": false})),
            )
            .mount(&server)
            .await;

        let fetcher = HttpStatusFetcher::new(settings_for(&server)).unwrap();
        assert_eq!(fetcher.fetch(&Credential::Ambient).await, StatusResult::LoggedOut);

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_fetch_carries_session_cookie() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/logout"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("set-cookie", "sid=s3ss10n; Path=/"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/auth/status"))
            .and(header_exists("cookie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "loggedIn": true,
                "user": {"username": "alice"}
            })))
            .mount(&server)
            .await;

        let fetcher = HttpStatusFetcher::new(settings_for(&server)).unwrap();
        // Any response may set the cookie; the jar replays it on the next call.
        fetcher.confirm_logout(&Credential::Ambient).await.unwrap();

        assert!(matches!(
            fetcher.fetch(&Credential::Ambient).await,
            StatusResult::LoggedIn(_)
        ));
    }

    #[tokio::test]
    async fn test_fetch_401_is_auth_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/status"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let fetcher = HttpStatusFetcher::new(settings_for(&server)).unwrap();
        assert_eq!(
            fetcher.fetch(&Credential::Bearer("expired".to_string())).await,
            StatusResult::AuthFailure
        );
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_transient() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"loggedIn": false}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpStatusFetcher::new(settings_for(&server)).unwrap();
        assert!(matches!(
            fetcher.fetch(&Credential::Ambient).await,
            StatusResult::TransientFailure(_)
        ));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transient() {
        let server = MockServer::start().await;
        let settings = settings_for(&server);
        drop(server);

        let fetcher = HttpStatusFetcher::new(settings).unwrap();
        assert!(matches!(
            fetcher.fetch(&Credential::Ambient).await,
            StatusResult::TransientFailure(_)
        ));
    }

    #[tokio::test]
    async fn test_confirm_logout_reports_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = HttpStatusFetcher::new(settings_for(&server)).unwrap();
        assert!(fetcher
            .confirm_logout(&Credential::Bearer("abc123".to_string()))
            .await
            .is_err());
    }

    #[test]
    fn test_describe_marks_authorization_sensitive() {
        let settings = FetcherSettings {
            status_url: Url::parse("http://localhost:8080/api/auth/status").unwrap(),
            logout_url: Url::parse("http://localhost:8080/api/auth/logout").unwrap(),
            request_timeout: Duration::from_secs(15),
        };
        let fetcher = HttpStatusFetcher::new(settings.clone()).unwrap();

        let request = fetcher.describe(&settings.status_url, &Credential::Bearer("abc".into()));
        let auth = request.headers.get(AUTHORIZATION).unwrap();
        assert!(auth.is_sensitive());
        assert_eq!(auth.to_str().unwrap(), "Bearer abc");
        assert_eq!(request.timeout, Duration::from_secs(15));

        let ambient = fetcher.describe(&settings.status_url, &Credential::Ambient);
        assert!(ambient.headers.get(AUTHORIZATION).is_none());
    }
}
