//! Upstream HTTP fetch shared by the manifest and segment endpoints.
//!
//! Builds the forged header set (fixed User-Agent, optional inferred
//! `Referer`/`Origin`, caller overrides on top) and issues a single GET.
//! There is no retry: the first failure goes back to the caller.

use crate::config::{Config, DEFAULT_USER_AGENT, HeaderPolicy};
use crate::error::{ProxyError, Result};
use crate::headers::ForwardHeaders;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Shared upstream client. Cheap to clone; the connection pool is shared.
#[derive(Clone, Debug)]
pub struct Upstream {
    client: Client,
    user_agent: HeaderValue,
    policy: HeaderPolicy,
    timeout: Duration,
}

impl Upstream {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to create HTTP client");

        let user_agent = HeaderValue::from_str(&config.user_agent).unwrap_or_else(|_| {
            warn!("USER_AGENT is not a valid header value, using the default");
            HeaderValue::from_static(DEFAULT_USER_AGENT)
        });

        Self {
            client,
            user_agent,
            policy: config.header_policy.clone(),
            timeout: Duration::from_secs(config.upstream_timeout_secs),
        }
    }

    /// Headers sent upstream for `target`.
    ///
    /// # Errors
    /// [`ProxyError::InvalidHeaders`] if a forwarded name or value is not a
    /// legal HTTP header.
    pub fn request_headers(&self, target: &Url, forward: &ForwardHeaders) -> Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(forward.len() + 3);
        headers.insert(USER_AGENT, self.user_agent.clone());

        if self.policy == HeaderPolicy::Inferred {
            let origin = target.origin().ascii_serialization();
            let referer = format!("{origin}/");
            headers.insert(ORIGIN, header_value(&origin)?);
            headers.insert(REFERER, header_value(&referer)?);
        }

        for (name, value) in forward.iter() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                ProxyError::InvalidHeaders(format!("Invalid header name: {name}"))
            })?;
            headers.insert(name, header_value(value)?);
        }

        Ok(headers)
    }

    /// GET `target` with the forged header set. Non-2xx responses are
    /// returned as-is; the caller decides what to do with the status.
    pub async fn fetch(&self, target: &Url, forward: &ForwardHeaders) -> Result<Response> {
        let headers = self.request_headers(target, forward)?;

        info!("Fetching upstream: {}", target);

        let response = self
            .client
            .get(target.clone())
            .headers(headers)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Upstream {} returned {}", target, response.status());
        }

        Ok(response)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| ProxyError::InvalidHeaders(format!("Invalid header value: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn upstream(policy: HeaderPolicy) -> Upstream {
        Upstream::new(&Config {
            header_policy: policy,
            ..Config::default()
        })
    }

    fn target() -> Url {
        Url::parse("https://cdn.example.com:8443/live/seg1.ts").unwrap()
    }

    #[test]
    fn passthrough_sends_user_agent_only() {
        let headers = upstream(HeaderPolicy::Passthrough)
            .request_headers(&target(), &ForwardHeaders::new())
            .unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[USER_AGENT], DEFAULT_USER_AGENT);
    }

    #[test]
    fn inferred_derives_referer_and_origin_from_target() {
        let headers = upstream(HeaderPolicy::Inferred)
            .request_headers(&target(), &ForwardHeaders::new())
            .unwrap();
        assert_eq!(headers[ORIGIN], "https://cdn.example.com:8443");
        assert_eq!(headers[REFERER], "https://cdn.example.com:8443/");
    }

    #[test]
    fn caller_headers_win_conflicts() {
        let forward: ForwardHeaders = [
            ("User-Agent", "VLC/3.0"),
            ("Referer", "https://site.example/"),
            ("X-Custom", "1"),
        ]
        .into_iter()
        .collect();

        let headers = upstream(HeaderPolicy::Inferred)
            .request_headers(&target(), &forward)
            .unwrap();
        assert_eq!(headers[USER_AGENT], "VLC/3.0");
        assert_eq!(headers[REFERER], "https://site.example/");
        assert_eq!(headers[ORIGIN], "https://cdn.example.com:8443");
        assert_eq!(headers["x-custom"], "1");
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let forward: ForwardHeaders = [("bad header", "x")].into_iter().collect();
        let err = upstream(HeaderPolicy::Passthrough)
            .request_headers(&target(), &forward)
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidHeaders(_)));
    }

    #[test]
    fn invalid_header_value_is_rejected() {
        let forward: ForwardHeaders = [("x-token", "line\nbreak")].into_iter().collect();
        let err = upstream(HeaderPolicy::Passthrough)
            .request_headers(&target(), &forward)
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidHeaders(_)));
    }

    #[test]
    fn invalid_configured_user_agent_falls_back() {
        let upstream = Upstream::new(&Config {
            user_agent: "bad\nagent".to_string(),
            ..Config::default()
        });
        let headers = upstream
            .request_headers(&target(), &ForwardHeaders::new())
            .unwrap();
        assert_eq!(headers[USER_AGENT], DEFAULT_USER_AGENT);
    }

    #[tokio::test]
    async fn fetch_sends_forged_headers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/seg.ts"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .and(header("x-token", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("bytes"))
            .expect(1)
            .mount(&server)
            .await;

        let forward: ForwardHeaders = [("X-Token", "secret")].into_iter().collect();
        let url = Url::parse(&format!("{}/seg.ts", server.uri())).unwrap();

        let response = upstream(HeaderPolicy::Passthrough)
            .fetch(&url, &forward)
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "bytes");
    }

    #[tokio::test]
    async fn fetch_does_not_retry_or_fail_on_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let response = upstream(HeaderPolicy::Passthrough)
            .fetch(&url, &ForwardHeaders::new())
            .await
            .unwrap();
        assert_eq!(response.status(), 503);
    }

    #[tokio::test]
    async fn connection_failure_is_upstream_error() {
        // Bind then drop a listener to get a port nobody is listening on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = Url::parse(&format!("http://127.0.0.1:{port}/seg.ts")).unwrap();
        let err = upstream(HeaderPolicy::Passthrough)
            .fetch(&url, &ForwardHeaders::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Upstream(_)));
    }
}
