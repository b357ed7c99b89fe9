use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::api::dev_backend::DevBackend;
use crate::api::dto::{ErrorBody, RegisterRequest, TokenResponse};
use crate::models::{Profile, ProfileDraft, User};

#[derive(Error, Debug)]
pub enum ApiError {
    /// The token was rejected on an authenticated call. Callers must treat
    /// this as "the session ended" rather than a generic failure.
    #[error("unauthorized")]
    Unauthorized,
    /// The server refused the request and said why.
    #[error("{detail}")]
    Rejected { status: u16, detail: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    Url(String),
}

/// The single choke point for talking to the jyotish backend. Every
/// authenticated request goes through [`ApiClient::send`], which attaches
/// the bearer header and normalizes an HTTP 401 to [`ApiError::Unauthorized`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    dev_backend: Option<DevBackend>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::Url(format!("Invalid API URL {}: {}", base_url, e)))?;

        Ok(Self {
            client: Client::new(),
            base_url,
            dev_backend: None,
        })
    }

    /// A client backed by the in-memory [`DevBackend`] instead of the
    /// network, for offline development and tests.
    pub fn dev() -> Result<Self, ApiError> {
        let mut client = Self::new("http://localhost")?;
        client.dev_backend = Some(DevBackend::new());
        Ok(client)
    }

    pub fn dev_backend(&self) -> Option<&DevBackend> {
        self.dev_backend.as_ref()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Url(format!("Failed to build URL for path {}: {}", path, e)))
    }

    /// Pull the `{"detail": ...}` message out of an error response, falling
    /// back to the status line when the body isn't structured.
    async fn error_detail(response: Response) -> String {
        let status = response.status();
        match response.json::<ErrorBody>().await {
            Ok(body) => body.detail,
            Err(_) => format!("request failed with status {}", status),
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        token: &str,
        call_name: &str,
    ) -> Result<Response, ApiError> {
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("Failed to call {}: {}", call_name, e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(ApiError::Rejected {
                status,
                detail: Self::error_detail(response).await,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        token: &str,
        call_name: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(request, token, call_name).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(format!("Failed to parse {} response: {}", call_name, e)))
    }

    /// Exchange credentials for a token. The login endpoint is the one
    /// form-encoded call in the API, and a 401 here is a rejected
    /// credential carrying the server's message, not a dead session.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        if let Some(dev) = &self.dev_backend {
            return dev.login(username, password);
        }

        let response = self
            .client
            .post(self.endpoint("/api/auth/login")?)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("Failed to call POST /api/auth/login: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(ApiError::Rejected {
                status,
                detail: Self::error_detail(response).await,
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ApiError::Decode(format!("Failed to parse login response: {}", e)))
    }

    pub async fn register(&self, seed: &RegisterRequest) -> Result<TokenResponse, ApiError> {
        if let Some(dev) = &self.dev_backend {
            return dev.register(seed);
        }

        let response = self
            .client
            .post(self.endpoint("/api/auth/register")?)
            .json(seed)
            .send()
            .await
            .map_err(|e| {
                ApiError::Network(format!("Failed to call POST /api/auth/register: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(ApiError::Rejected {
                status,
                detail: Self::error_detail(response).await,
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ApiError::Decode(format!("Failed to parse register response: {}", e)))
    }

    pub async fn me(&self, token: &str) -> Result<User, ApiError> {
        if let Some(dev) = &self.dev_backend {
            return dev.me(token);
        }

        self.get_json(
            self.client.get(self.endpoint("/api/auth/me")?),
            token,
            "GET /api/auth/me",
        )
        .await
    }

    pub async fn list_profiles(&self, token: &str) -> Result<Vec<Profile>, ApiError> {
        if let Some(dev) = &self.dev_backend {
            return dev.list_profiles(token);
        }

        self.get_json(
            self.client.get(self.endpoint("/api/profiles/")?),
            token,
            "GET /api/profiles/",
        )
        .await
    }

    pub async fn create_profile(
        &self,
        token: &str,
        draft: &ProfileDraft,
    ) -> Result<Profile, ApiError> {
        if let Some(dev) = &self.dev_backend {
            return dev.create_profile(token, draft);
        }

        self.get_json(
            self.client.post(self.endpoint("/api/profiles/")?).json(draft),
            token,
            "POST /api/profiles/",
        )
        .await
    }

    pub async fn update_profile(
        &self,
        token: &str,
        id: i64,
        draft: &ProfileDraft,
    ) -> Result<Profile, ApiError> {
        if let Some(dev) = &self.dev_backend {
            return dev.update_profile(token, id, draft);
        }

        self.get_json(
            self.client
                .put(self.endpoint(&format!("/api/profiles/{}", id))?)
                .json(draft),
            token,
            "PUT /api/profiles/:id",
        )
        .await
    }

    pub async fn delete_profile(&self, token: &str, id: i64) -> Result<(), ApiError> {
        if let Some(dev) = &self.dev_backend {
            return dev.delete_profile(token, id);
        }

        let response = self
            .send(
                self.client.delete(self.endpoint(&format!("/api/profiles/{}", id))?),
                token,
                "DELETE /api/profiles/:id",
            )
            .await?;
        let _ = response.bytes().await;
        Ok(())
    }
}
