use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 60 * 24 * 30;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_url: String, // base URL objects are served from
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub jwt: JwtConfig,
    pub backend_api_url: Option<String>,
    pub media: Option<MediaConfig>,
}

/// Trimmed, non-empty value of `key` as seen through `lookup`.
fn optional_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let data_dir = optional_var(&lookup, "DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));
        let jwt = JwtConfig {
            secret: optional_var(&lookup, "JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: optional_var(&lookup, "JWT_ISSUER").unwrap_or_else(|| "roomhub".into()),
            audience: optional_var(&lookup, "JWT_AUDIENCE")
                .unwrap_or_else(|| "roomhub-users".into()),
            ttl_minutes: optional_var(&lookup, "JWT_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(DEFAULT_SESSION_TTL_MINUTES),
        };
        let backend_api_url = optional_var(&lookup, "BACKEND_API_URL")
            .map(|u| u.trim_end_matches('/').to_string());
        Ok(Self {
            data_dir,
            jwt,
            backend_api_url,
            media: MediaConfig::from_lookup(&lookup),
        })
    }
}

impl MediaConfig {
    /// `None` unless endpoint, bucket and both keys are set.
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Option<Self> {
        let endpoint = optional_var(lookup, "MEDIA_ENDPOINT")?;
        let bucket = optional_var(lookup, "MEDIA_BUCKET")?;
        let access_key = optional_var(lookup, "MEDIA_ACCESS_KEY")?;
        let secret_key = optional_var(lookup, "MEDIA_SECRET_KEY")?;
        let public_url = optional_var(lookup, "MEDIA_PUBLIC_URL")
            .unwrap_or_else(|| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
        Some(Self {
            endpoint,
            bucket,
            access_key,
            secret_key,
            region: optional_var(lookup, "MEDIA_REGION").unwrap_or_else(|| "us-east-1".into()),
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(move |key| vars.get(key).cloned())
    }

    const MEDIA: [(&str, &str); 5] = [
        ("JWT_SECRET", "s3cret"),
        ("MEDIA_ENDPOINT", "http://minio:9000/"),
        ("MEDIA_BUCKET", "roomhub"),
        ("MEDIA_ACCESS_KEY", "ak"),
        ("MEDIA_SECRET_KEY", "sk"),
    ];

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let cfg = config(&[("JWT_SECRET", "s3cret")]).expect("config");
        assert_eq!(cfg.jwt.ttl_minutes, 43_200);
        assert_eq!(cfg.jwt.issuer, "roomhub");
        assert_eq!(cfg.jwt.audience, "roomhub-users");
        assert_eq!(cfg.data_dir, PathBuf::from("./data"));
        assert!(cfg.backend_api_url.is_none());
        assert!(cfg.media.is_none());
    }

    #[test]
    fn missing_or_blank_secret_is_an_error() {
        assert!(config(&[]).is_err());
        assert!(config(&[("JWT_SECRET", "   ")]).is_err());
    }

    #[test]
    fn unparsable_ttl_falls_back_to_default() {
        let cfg = config(&[("JWT_SECRET", "s"), ("JWT_TTL_MINUTES", "soon")]).expect("config");
        assert_eq!(cfg.jwt.ttl_minutes, DEFAULT_SESSION_TTL_MINUTES);
        let cfg = config(&[("JWT_SECRET", "s"), ("JWT_TTL_MINUTES", "15")]).expect("config");
        assert_eq!(cfg.jwt.ttl_minutes, 15);
    }

    #[test]
    fn media_needs_endpoint_bucket_and_both_keys() {
        let media = config(&MEDIA).expect("config").media.expect("media enabled");
        assert_eq!(media.region, "us-east-1");
        assert_eq!(media.public_url, "http://minio:9000/roomhub");

        for skipped in ["MEDIA_ENDPOINT", "MEDIA_BUCKET", "MEDIA_ACCESS_KEY", "MEDIA_SECRET_KEY"] {
            let partial: Vec<(&str, &str)> =
                MEDIA.iter().copied().filter(|(k, _)| *k != skipped).collect();
            assert!(
                config(&partial).expect("config").media.is_none(),
                "{} missing",
                skipped
            );
        }
    }

    #[test]
    fn backend_url_loses_trailing_slash() {
        let cfg = config(&[("JWT_SECRET", "s"), ("BACKEND_API_URL", "https://api.test/v1/")])
            .expect("config");
        assert_eq!(cfg.backend_api_url.as_deref(), Some("https://api.test/v1"));
    }
}
