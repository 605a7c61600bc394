use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

/// The remote marketplace API that issues bearer tokens for listing calls.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Exchange credentials for a backend bearer token, if the backend returns one.
    async fn login(&self, email: &str, password: &str) -> anyhow::Result<Option<String>>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Token lookup tolerant to the response shapes the backend has used.
fn extract_token(body: &Value) -> Option<String> {
    const KEYS: [&str; 3] = ["token", "accessToken", "access_token"];
    let direct = |v: &Value| {
        KEYS.iter()
            .find_map(|k| v.get(*k).and_then(Value::as_str))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    };
    direct(body).or_else(|| body.get("data").and_then(direct))
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn login(&self, email: &str, password: &str) -> anyhow::Result<Option<String>> {
        let url = format!("{}/auth/login", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;

        let status = res.status();
        if !status.is_success() {
            anyhow::bail!("backend login returned {}", status);
        }
        let body: Value = res.json().await.context("backend login body")?;
        let token = extract_token(&body);
        debug!(has_token = token.is_some(), "backend login completed");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_found_under_known_keys() {
        assert_eq!(extract_token(&json!({"token": "a"})).as_deref(), Some("a"));
        assert_eq!(extract_token(&json!({"accessToken": "b"})).as_deref(), Some("b"));
        assert_eq!(
            extract_token(&json!({"data": {"access_token": "c"}})).as_deref(),
            Some("c")
        );
    }

    #[test]
    fn empty_or_missing_token_is_none() {
        assert!(extract_token(&json!({"token": ""})).is_none());
        assert!(extract_token(&json!({"user": {"id": 1}})).is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let b = HttpBackend::new(reqwest::Client::new(), "https://api.example.com/");
        assert_eq!(b.base_url, "https://api.example.com");
    }
}
