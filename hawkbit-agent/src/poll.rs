use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::config::AgentConfig;
use crate::ddi::{self, DdiClient, MergeMode, RequestConfig, State};
use crate::deploy::{self, check_result};

pub fn next_poll(config: &RequestConfig) -> Duration {
    let max_jitter = &config.poll_max_jitter;
    let jitter_ms = rand::random_range(0..=max_jitter.as_millis() as u64);
    let jitter = Duration::from_millis(jitter_ms);
    config.poll_interval + jitter
}

/// Poll the server forever, acting on every state it hands out.
///
/// Failures are logged and the next poll happens on schedule.
pub async fn start_poll(client: &DdiClient, config: &AgentConfig) {
    loop {
        match client.poll().await {
            Ok(state) => {
                // errors are logged by the span
                let _ = handle_state(client, config, &state).await;
            }
            // the error itself is logged by the poll span
            Err(e) if e.is_transient() => debug!("retrying on next poll"),
            Err(_) => warn!("poll rejected, check the agent configuration"),
        }

        let wait = next_poll(&config.ddi.request);
        debug!("next poll in {}ms", wait.as_millis());
        tokio::time::sleep(wait).await;
    }
}

#[instrument(skip_all, fields(state = %state.kind()), err(level = "warn"))]
pub async fn handle_state(
    client: &DdiClient,
    config: &AgentConfig,
    state: &State,
) -> Result<(), ddi::Error> {
    match state {
        State::None => {}
        State::Register(registration) => {
            info!("sending {} device attributes", config.attributes.len());
            let result = client
                .update_registration(registration, &config.attributes, MergeMode::Replace, &[])
                .await?;
            check_result("registration", result);
        }
        State::Cancel(stop) => {
            // no action outlives a poll, so there is nothing to stop
            info!("accepting cancel request {}", stop.id());
            let result = client.report_cancel_accepted(stop, &[]).await?;
            check_result("cancel", result);
        }
        State::Update(deployment) => {
            info!("deployment offered\n{state}");
            match &config.download_dir {
                Some(dir) if deployment.download() != "skip" => {
                    let success = deploy::deploy(client, deployment, dir).await?;
                    info!(success, "deployment {} done", deployment.id());
                }
                _ => {
                    let result = client.report_scheduled(deployment, &[]).await?;
                    check_result("scheduling", result);
                }
            }
        }
    }

    Ok(())
}
