use std::error::Error;

use tracing::{info, instrument, trace};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod cli;
mod config;
mod deploy;
mod poll;

use hawkbit_ddi as ddi;
use hawkbit_util as util;

use crate::config::AgentConfig;
use crate::ddi::DdiClient;

fn initialize_tracing() {
    // Initialize tracing subscriber for human-readable logs
    tracing_subscriber::registry()
        .with(
            // Use some log defaults. These can be overriden using
            // RUST_LOG
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("debug,hyper=error,reqwest=info")),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .event_format(fmt::format().compact().with_target(false).without_time()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    initialize_tracing();

    let cli = cli::parse();
    let config = AgentConfig::load(&cli)?;

    start_agent(config).await
}

#[instrument(name = "agent", skip_all, fields(controller_id = %config.ddi.controller_id), err)]
async fn start_agent(config: AgentConfig) -> Result<(), Box<dyn Error>> {
    trace!(config = ?config, "using config:");

    let client = DdiClient::new(&config.ddi)?;
    info!("polling {}", client.root_uri());

    tokio::select! {
        _ = poll::start_poll(&client, &config) => Ok(()),

        res = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            res.map_err(|err| err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddi::DdiConfig;
    use crate::util::http::Auth;
    use mockito::ServerGuard;
    use std::collections::BTreeMap;

    pub fn test_config(server: &ServerGuard) -> AgentConfig {
        AgentConfig {
            ddi: DdiConfig {
                base_url: server.url().parse().unwrap(),
                tenant: "DEFAULT".to_owned(),
                controller_id: "dev-1".parse().unwrap(),
                auth: Auth::TargetToken {
                    token: "secret".to_owned(),
                },
                request: Default::default(),
                server_cert: None,
            },
            attributes: BTreeMap::new(),
            download_dir: None,
        }
    }

    pub fn test_client(server: &ServerGuard) -> DdiClient {
        DdiClient::new(&test_config(server).ddi).unwrap()
    }
}
