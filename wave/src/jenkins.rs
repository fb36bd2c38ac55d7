//! Jenkins build history fetcher.

use serde_json::Value;

use crate::config::{Credentials, JobConfig};
use crate::error::{Result, WaveError};
use crate::model::BUILD_TREE;

/// Read-only Jenkins client authenticating with HTTP Basic auth.
#[derive(Clone)]
pub struct JenkinsClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl JenkinsClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn job_url(&self, job: &JobConfig) -> String {
        format!("{}/{}/api/json", self.base_url, job.path.trim_matches('/'))
    }

    /// Fetch every build of `job` with number, timing and parameters.
    ///
    /// The body is returned as-is so it can be stored before it is
    /// sanitized.
    pub async fn fetch_history(&self, job: &JobConfig) -> Result<Value> {
        let url = self.job_url(job);
        tracing::info!("fetching build history from {url}");
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.credentials.user, Some(&self.credentials.password))
            .query(&[("depth", "2"), ("pretty", "true"), ("tree", BUILD_TREE)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WaveError::Jenkins {
                url,
                status: status.as_u16(),
                body,
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| WaveError::Decode {
            origin: format!("Jenkins response from {url}"),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Credentials {
        Credentials {
            user: "user".to_string(),
            password: "pass".to_string(),
        }
    }

    fn job() -> JobConfig {
        JobConfig {
            path: "job/Cloud/job/Cloud_system_admin".to_string(),
            snapshot: "fpa log".to_string(),
            version: "2017.21".to_string(),
        }
    }

    #[tokio::test]
    async fn requests_build_tree_with_basic_auth() {
        let server = MockServer::start().await;
        let body = json!({"allBuilds": [{"number": 1, "timestamp": 0, "duration": 0}]});
        Mock::given(method("GET"))
            .and(path("/job/Cloud/job/Cloud_system_admin/api/json"))
            .and(query_param("depth", "2"))
            .and(query_param("pretty", "true"))
            .and(query_param("tree", BUILD_TREE))
            // user:pass
            .and(header("authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = JenkinsClient::new(format!("{}/", server.uri()), credentials()).unwrap();
        let history = client.fetch_history(&job()).await.unwrap();

        assert_eq!(history, body);
    }

    #[tokio::test]
    async fn non_success_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid password/token"))
            .mount(&server)
            .await;

        let client = JenkinsClient::new(server.uri(), credentials()).unwrap();
        let err = client.fetch_history(&job()).await.unwrap_err();

        match err {
            WaveError::Jenkins { status, body, url } => {
                assert_eq!(status, 401);
                assert_eq!(body, "Invalid password/token");
                assert!(url.ends_with("/job/Cloud/job/Cloud_system_admin/api/json"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let client = JenkinsClient::new(server.uri(), credentials()).unwrap();
        let err = client.fetch_history(&job()).await.unwrap_err();

        assert!(matches!(err, WaveError::Decode { .. }), "{err:?}");
        assert!(err.to_string().starts_with("failed to decode Jenkins response from"));
    }
}
