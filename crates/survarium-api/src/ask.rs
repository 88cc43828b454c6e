//! Request executor.
//!
//! Turns a [`QueryDescriptor`] into one signed `GET`, parses the JSON body and
//! classifies failures. Transient failures are retried in a loop with
//! randomized exponential backoff until the policy gives up.

use std::time::Instant;

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde_json::Value;

use crate::config::{REQUEST_TIMEOUT, USER_AGENT as SURVARIUM_USER_AGENT};
use crate::errors::{ApiError, Result};
use crate::handlers::QueryDescriptor;
use crate::retry::{RetryPolicy, RetryState};
use crate::sign::Signer;
use crate::source;

const METHOD: &str = "GET";

/// Options of a single execution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AskOptions {
    /// Retry ceiling. Zero disables retries.
    pub retries: u32,
    /// Dump prefix for the parsed response.
    pub save_source: Option<String>,
}

/// Signs and sends requests against one API address.
#[derive(Debug, Clone)]
pub struct Executor {
    client: reqwest::Client,
    base_url: String,
    signer: Signer,
    policy: RetryPolicy,
}

impl Executor {
    pub fn new(base_url: impl Into<String>, signer: Signer, policy: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
            signer,
            policy,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Full request URL for a descriptor.
    pub fn url(&self, descriptor: &QueryDescriptor) -> String {
        let mut url = format!("{}{}", self.base_url, descriptor.path);
        if descriptor.query.is_some() {
            url.push('?');
            url.push_str(&descriptor.query_string());
        }
        url
    }

    fn headers(&self, url: &str) -> Result<HeaderMap> {
        // Fresh nonce and timestamp on every attempt.
        let auth = self.signer.make(url, METHOD);

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(SURVARIUM_USER_AGENT));
        headers.insert("encoding", HeaderValue::from_static("gzip"));
        let auth_value = HeaderValue::from_str(&auth.header)
            .map_err(|_| ApiError::validation("Invalid authorization header"))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    /// Execute the request, retrying transient failures.
    pub async fn execute(&self, descriptor: &QueryDescriptor, options: &AskOptions) -> Result<Value> {
        let url = self.url(descriptor);
        let started = Instant::now();
        let mut state = RetryState::new(options.retries);

        let value = loop {
            match self.attempt(&url).await {
                Ok(value) => break value,
                Err(err) => {
                    let next = state.attempt + 1;
                    if !self.policy.allows(next, state.limit, &err) {
                        debug!("giving up on {} after {} retries: {}", url, state.attempt, err);
                        return Err(err);
                    }
                    state.attempt = next;
                    let delay = self.policy.backoff(next);
                    debug!(
                        "error [{}], plan retry #{} after {}ms for {}",
                        err.http_status().map_or_else(|| "network".to_string(), |s| s.to_string()),
                        next,
                        delay.as_millis(),
                        url
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        };

        debug!(
            "completed {} with {} retries in {:.2}sec.",
            url,
            state.attempt,
            started.elapsed().as_secs_f64()
        );

        if let Some(prefix) = &options.save_source {
            source::spawn_save(prefix.clone(), descriptor.clone(), value.clone());
        }

        Ok(value)
    }

    async fn attempt(&self, url: &str) -> Result<Value> {
        debug!("querying {}", url);
        let response = self
            .client
            .get(url)
            .headers(self.headers(url)?)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        let response_url = response.url().clone();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Http {
                status: Some(status.as_u16()),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body: Some(body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            let host = match (response_url.host_str(), response_url.port()) {
                (Some(host), Some(port)) => format!("{}:{}", host, port),
                (Some(host), None) => host.to_string(),
                (None, _) => String::new(),
            };
            let path = match response_url.query() {
                Some(query) => format!("{}?{}", response_url.path(), query),
                None => response_url.path().to_string(),
            };
            ApiError::Parse {
                message: e.to_string(),
                body,
                host,
                method: METHOD.to_string(),
                path,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> Executor {
        Executor::new(
            "http://api.survarium.com/",
            Signer::new("test", "test"),
            RetryPolicy::default(),
        )
    }

    #[test]
    fn test_url_with_query() {
        let descriptor = QueryDescriptor::new("getclans")
            .with("amount", 100u64)
            .with("offset", 50u64);
        assert_eq!(
            executor().url(&descriptor),
            "http://api.survarium.com/getclans?amount=100&offset=50"
        );
    }

    #[test]
    fn test_url_without_query() {
        assert_eq!(
            executor().url(&QueryDescriptor::new("getmaxmatchid")),
            "http://api.survarium.com/getmaxmatchid"
        );
    }

    #[test]
    fn test_headers_are_signed() {
        let headers = executor()
            .headers("http://api.survarium.com/getmaxmatchid")
            .unwrap();
        assert_eq!(headers[USER_AGENT], "Survarium browser");
        assert_eq!(headers["encoding"], "gzip");
        let auth = headers[AUTHORIZATION].to_str().unwrap();
        assert!(auth.starts_with("OAuth  surv_consumer_key=\"test\", surv_nonce=\""));
        assert!(auth.contains("surv_signature_method=\"HMAC-SHA1\""));
    }
}
