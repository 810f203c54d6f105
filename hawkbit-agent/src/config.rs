use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cli::Cli;
use crate::ddi::{DdiConfig, RequestConfig, default_tenant};
use crate::util::http::{Auth, Uri};
use crate::util::types::{ControllerId, Tenant};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Settings read from the `--config` file, all of them optional so the
/// command line can fill the gaps
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    base_url: Option<Uri>,
    tenant: Option<Tenant>,
    controller_id: Option<ControllerId>,
    auth: Option<Auth>,
    request: Option<RequestConfig>,
    server_cert: Option<PathBuf>,
    attributes: BTreeMap<String, String>,
    download_dir: Option<PathBuf>,
}

impl FileConfig {
    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        serde_json::from_slice(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub ddi: DdiConfig,

    /// Attributes sent to the server on registration
    pub attributes: BTreeMap<String, String>,

    pub download_dir: Option<PathBuf>,
}

impl AgentConfig {
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = cli
            .config
            .as_deref()
            .map(FileConfig::read)
            .transpose()?
            .unwrap_or_default();

        let auth = match (&cli.security_token, &cli.gateway_token) {
            (Some(token), _) => Some(Auth::TargetToken {
                token: token.clone(),
            }),
            (_, Some(token)) => Some(Auth::GatewayToken {
                token: token.clone(),
            }),
            _ => file.auth,
        };

        let request_defaults = file.request.unwrap_or_default();
        let request = RequestConfig {
            timeout: cli.request_timeout.unwrap_or(request_defaults.timeout),
            connect_timeout: cli
                .connect_timeout
                .unwrap_or(request_defaults.connect_timeout),
            poll_interval: cli.poll_interval.unwrap_or(request_defaults.poll_interval),
            poll_max_jitter: cli
                .poll_max_jitter
                .unwrap_or(request_defaults.poll_max_jitter),
        };

        let ddi = DdiConfig {
            base_url: cli
                .base_url
                .clone()
                .or(file.base_url)
                .ok_or(ConfigError::Missing("base_url"))?,
            tenant: cli
                .tenant
                .clone()
                .or(file.tenant)
                .unwrap_or_else(default_tenant),
            controller_id: cli
                .controller_id
                .clone()
                .or(file.controller_id)
                .ok_or(ConfigError::Missing("controller_id"))?,
            auth: auth.ok_or(ConfigError::Missing("security_token or gateway_token"))?,
            request,
            server_cert: cli.server_cert.clone().or(file.server_cert),
        };

        let mut attributes = file.attributes;
        attributes.extend(cli.attributes.iter().cloned());

        Ok(Self {
            ddi,
            attributes,
            download_dir: cli.download_dir.clone().or(file.download_dir),
        })
    }
}
