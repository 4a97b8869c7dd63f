//! The authentication service the session store talks to

use async_trait::async_trait;
use reqwest::Client;

use crate::types::{parse_login_body, LoginRequest, LoginResponse};
use crate::AuthError;

/// Remote side of login and logout.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, AuthError>;

    /// Tell the server the token is no longer in use
    async fn logout(&self, token: &str) -> Result<(), AuthError>;
}

/// `AuthApi` over the console backend's REST endpoints
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    url: String,
    http_client: Client,
}

impl HttpAuthApi {
    /// `url` is the API base, e.g. `http://localhost:8080/api`.
    pub fn new(url: &str, http_client: Client) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            http_client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth{}", self.url, path)
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, AuthError> {
        let url = self.endpoint("/login");

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AuthError::CredentialsRejected(format!("{}: {}", status, body)));
        }

        parse_login_body(&body)
    }

    async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let url = self.endpoint("/logout");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AuthError::ApiError(format!("{}: {}", status, error_text)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_login_posts_credentials() {
        tokio_test::block_on(async {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/api/auth/login"))
                .and(body_json(serde_json::json!({ "username": "admin", "password": "x" })))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "code": 200,
                    "message": "ok",
                    "data": {
                        "token": "abc",
                        "username": "admin",
                        "expiresAt": 4_102_444_800_000_i64
                    }
                })))
                .mount(&mock_server)
                .await;

            let api = HttpAuthApi::new(&format!("{}/api/", mock_server.uri()), Client::new());
            let response = api.login(&LoginRequest::new("admin", "x")).await.unwrap();

            assert_eq!(response.token, "abc");
            assert_eq!(response.username, "admin");
        });
    }

    #[test]
    fn test_login_rejected_status() {
        tokio_test::block_on(async {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/api/auth/login"))
                .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
                .mount(&mock_server)
                .await;

            let api = HttpAuthApi::new(&format!("{}/api", mock_server.uri()), Client::new());
            let result = api.login(&LoginRequest::new("admin", "wrong")).await;

            match result {
                Err(AuthError::CredentialsRejected(message)) => {
                    assert!(message.contains("bad credentials"))
                }
                other => panic!("unexpected result: {:?}", other),
            }
        });
    }

    #[test]
    fn test_logout_sends_bearer_token() {
        tokio_test::block_on(async {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/api/auth/logout"))
                .and(header("Authorization", "Bearer abc"))
                .respond_with(ResponseTemplate::new(200))
                .expect(1)
                .mount(&mock_server)
                .await;

            let api = HttpAuthApi::new(&format!("{}/api", mock_server.uri()), Client::new());
            assert!(api.logout("abc").await.is_ok());
        });
    }
}
