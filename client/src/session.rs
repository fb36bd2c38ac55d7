//! Cookie-authenticated session against a CIC instance.
//!
//! CIC does not accept Basic authentication: a form login against
//! `/login` issues a session cookie, which the underlying `reqwest` cookie
//! store replays on every later request made through the same [`Session`].

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::error::{CicError, CicResult, HttpFailure};
use crate::query::{Endpoint, LOGIN_ENDPOINT};

/// Default CIC instance.
pub const DEFAULT_CIC_URL: &str = "https://cic.mo.sap.corp";

/// Header asking TMS for a reduced representation (e.g. `metadata`).
pub const DEPTH_HEADER: &str = "X-Depth";

/// Connection settings for a CIC instance.
#[derive(Clone)]
pub struct CicConfig {
    pub base_url: String,
    pub user: String,
    pub password: String,
}

impl CicConfig {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_CIC_URL.to_string(),
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl std::fmt::Debug for CicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CicConfig")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Request body. TMS takes form-encoded PATCH bodies but JSON POST bodies.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Form(Vec<(String, String)>),
    Json(Value),
}

/// One request against the CIC API.
///
/// Without a payload the request is a GET; a form payload is sent as PATCH
/// and a JSON payload as POST.
#[derive(Debug, Clone)]
pub struct CicRequest {
    endpoint: Endpoint,
    payload: Option<Payload>,
    depth: Option<String>,
}

impl CicRequest {
    pub fn get(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            payload: None,
            depth: None,
        }
    }

    pub fn patch(endpoint: Endpoint, form: Vec<(String, String)>) -> Self {
        Self {
            endpoint,
            payload: Some(Payload::Form(form)),
            depth: None,
        }
    }

    pub fn post(endpoint: Endpoint, body: Value) -> Self {
        Self {
            endpoint,
            payload: Some(Payload::Json(body)),
            depth: None,
        }
    }

    pub fn with_depth(mut self, depth: impl Into<String>) -> Self {
        self.depth = Some(depth.into());
        self
    }

    pub fn method(&self) -> reqwest::Method {
        match self.payload {
            None => reqwest::Method::GET,
            Some(Payload::Form(_)) => reqwest::Method::PATCH,
            Some(Payload::Json(_)) => reqwest::Method::POST,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

/// A 2xx response with its body already read.
#[derive(Debug, Clone)]
pub struct CicResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl CicResponse {
    /// Parse the body as JSON. An empty body reads as `null`.
    pub fn json(&self) -> CicResult<Value> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body).map_err(|source| CicError::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

/// Logged-in CIC session.
pub struct Session {
    client: reqwest::Client,
    base_url: String,
    user: String,
}

impl Session {
    /// Log in and keep the session cookie for subsequent calls.
    pub async fn login(config: &CicConfig) -> CicResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        tracing::debug!("Initializing CIC session with url: {base_url}");

        let client = reqwest::Client::builder().cookie_store(true).build()?;
        let url = format!("{base_url}{LOGIN_ENDPOINT}");
        let form = [
            ("username", config.user.as_str()),
            ("password", config.password.as_str()),
        ];
        let response = client.post(&url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::debug!("Response code: {status}, response body: {body}");
            return Err(CicError::AuthFailure { url: base_url, body });
        }
        if !status.is_success() {
            return Err(CicError::Http(HttpFailure {
                method: "POST".to_string(),
                url,
                status: status.as_u16(),
                body,
            }));
        }

        tracing::debug!("Session cookie acquired for user {}", config.user);
        Ok(Self {
            client,
            base_url,
            user: config.user.clone(),
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and read the response body.
    ///
    /// No status is interpreted here: every non-2xx answer comes back as
    /// [`CicError::Http`] with the body preserved, and callers decide which
    /// statuses carry meaning for them.
    pub async fn send(&self, request: CicRequest) -> CicResult<CicResponse> {
        let method = request.method();
        let url = format!("{}{}", self.base_url, request.endpoint.path_and_query());
        tracing::debug!("Sending HTTP {method} to {url}");

        let mut builder = self.client.request(method.clone(), &url);
        builder = match &request.payload {
            None => builder,
            Some(Payload::Form(form)) => builder.form(form),
            Some(Payload::Json(body)) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(body).map_err(|source| CicError::Encode {
                    url: url.clone(),
                    source,
                })?),
        };
        if let Some(depth) = &request.depth {
            builder = builder.header(DEPTH_HEADER, depth);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("Response code {status}");

        if !status.is_success() {
            return Err(CicError::Http(HttpFailure {
                method: method.to_string(),
                url,
                status: status.as_u16(),
                body,
            }));
        }

        Ok(CicResponse {
            status: status.as_u16(),
            url,
            body,
        })
    }
}
