use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::util::http::{Auth, ClientError, ClientOptions, InvalidUriError, Uri};
use crate::util::json::duration_ms;
use crate::util::types::{ControllerId, Tenant};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read server certificate {0}: {1}")]
    Certificate(PathBuf, #[source] std::io::Error),

    #[error("invalid controller endpoint: {0}")]
    Endpoint(#[from] InvalidUriError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Connection settings for a hawkBit controller
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DdiConfig {
    /// Server URL, e.g. `https://hawkbit.example.com`
    pub base_url: Uri,

    #[serde(default = "default_tenant")]
    pub tenant: Tenant,

    pub controller_id: ControllerId,

    pub auth: Auth,

    #[serde(default)]
    pub request: RequestConfig,

    /// PEM root certificate to trust in addition to the system ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_cert: Option<PathBuf>,
}

pub fn default_tenant() -> Tenant {
    "DEFAULT".to_owned()
}

/// Request and poll timing, durations are given in milliseconds
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestConfig {
    #[serde(with = "duration_ms")]
    pub timeout: Duration,

    #[serde(with = "duration_ms")]
    pub connect_timeout: Duration,

    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,

    #[serde(with = "duration_ms")]
    pub poll_max_jitter: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(59_000),
            connect_timeout: Duration::from_millis(10_000),
            poll_interval: Duration::from_millis(300_000),
            poll_max_jitter: Duration::from_millis(30_000),
        }
    }
}

impl DdiConfig {
    /// The root controller resource,
    /// `{base}/{tenant}/controller/v1/{controllerId}`
    pub fn root_uri(&self) -> Result<Uri, InvalidUriError> {
        self.base_url.append_segments([
            self.tenant.as_str(),
            "controller",
            "v1",
            self.controller_id.as_str(),
        ])
    }

    /// Transport settings, reads the server certificate if one is configured
    pub fn client_options(&self) -> Result<ClientOptions, ConfigError> {
        let root_certificate = self
            .server_cert
            .as_ref()
            .map(|path| std::fs::read(path).map_err(|e| ConfigError::Certificate(path.clone(), e)))
            .transpose()?;

        Ok(ClientOptions {
            timeout: Some(self.request.timeout),
            connect_timeout: Some(self.request.connect_timeout),
            root_certificate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config() -> DdiConfig {
        serde_json::from_value(json!({
            "base_url": "https://hawkbit.example.com",
            "controller_id": "dev-1",
            "auth": {"type": "target_token", "token": "secret"},
        }))
        .unwrap()
    }

    #[test]
    fn test_uses_defaults_for_optional_settings() {
        let config = config();
        assert_eq!(config.tenant, "DEFAULT");
        assert_eq!(config.request.timeout, Duration::from_secs(59));
        assert_eq!(config.request.poll_interval, Duration::from_secs(300));
        assert!(config.server_cert.is_none());
    }

    #[test]
    fn test_builds_the_root_uri() {
        let mut config = config();
        config.tenant = "acme".to_owned();
        assert_eq!(
            config.root_uri().unwrap().to_string(),
            "https://hawkbit.example.com/acme/controller/v1/dev-1"
        );
    }

    #[test]
    fn test_root_uri_keeps_reserved_characters_in_their_segment() {
        let mut config = config();
        config.controller_id = "dev?x".parse().unwrap();
        assert_eq!(
            config.root_uri().unwrap().to_string(),
            "https://hawkbit.example.com/DEFAULT/controller/v1/dev%3Fx"
        );

        config.controller_id = "dev#x".parse().unwrap();
        config.tenant = "a?b".to_owned();
        assert_eq!(
            config.root_uri().unwrap().to_string(),
            "https://hawkbit.example.com/a%3Fb/controller/v1/dev%23x"
        );
    }

    #[test]
    fn test_reads_request_durations_in_millis() {
        let config: DdiConfig = serde_json::from_value(json!({
            "base_url": "http://localhost:8080",
            "controller_id": "dev-1",
            "auth": {"type": "gateway_token", "token": "secret"},
            "request": {
                "timeout": 1000,
                "connect_timeout": 500,
                "poll_interval": 60000,
                "poll_max_jitter": 0,
            }
        }))
        .unwrap();

        assert_eq!(config.request.connect_timeout, Duration::from_millis(500));
        assert_eq!(config.request.poll_max_jitter, Duration::ZERO);

        let options = config.client_options().unwrap();
        assert_eq!(options.timeout, Some(Duration::from_secs(1)));
        assert!(options.root_certificate.is_none());
    }

    #[test]
    fn test_fails_on_a_missing_certificate() {
        let mut config = config();
        config.server_cert = Some(PathBuf::from("/nonexistent/ca.pem"));
        assert!(matches!(
            config.client_options(),
            Err(ConfigError::Certificate(..))
        ));
    }
}
