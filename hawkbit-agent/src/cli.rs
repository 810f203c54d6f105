use clap::Parser;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use crate::util::http::Uri;
use crate::util::types::{ControllerId, Tenant};

fn parse_duration(s: &str) -> Result<Duration, ParseIntError> {
    let millis: u64 = s.parse()?;
    Ok(Duration::from_millis(millis))
}

fn parse_attribute(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("attribute name cannot be empty: '{s}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)] // read from Cargo.toml
pub struct Cli {
    /// JSON configuration file, command line values take precedence
    #[arg(env = "HAWKBIT_CONFIG", long = "config", value_name = "path")]
    pub config: Option<PathBuf>,

    /// hawkBit server URL, e.g. "https://hawkbit.example.com"
    #[arg(env = "HAWKBIT_BASE_URL", long = "base-url", value_name = "uri")]
    pub base_url: Option<Uri>,

    /// Tenant name
    #[arg(env = "HAWKBIT_TENANT", long = "tenant", value_name = "str")]
    pub tenant: Option<Tenant>,

    /// Identifier of this device on the server
    #[arg(
        env = "HAWKBIT_CONTROLLER_ID",
        long = "controller-id",
        value_name = "id"
    )]
    pub controller_id: Option<ControllerId>,

    /// Target security token
    #[arg(
        env = "HAWKBIT_SECURITY_TOKEN",
        long = "security-token",
        value_name = "token",
        conflicts_with = "gateway_token"
    )]
    pub security_token: Option<String>,

    /// Gateway security token, used instead of a target token
    #[arg(
        env = "HAWKBIT_GATEWAY_TOKEN",
        long = "gateway-token",
        value_name = "token"
    )]
    pub gateway_token: Option<String>,

    /// Request timeout in milliseconds
    #[arg(
        env = "HAWKBIT_REQUEST_TIMEOUT_MS",
        long = "request-timeout-ms",
        value_name = "ms",
        value_parser = parse_duration
    )]
    pub request_timeout: Option<Duration>,

    /// Connect timeout in milliseconds
    #[arg(
        env = "HAWKBIT_CONNECT_TIMEOUT_MS",
        long = "connect-timeout-ms",
        value_name = "ms",
        value_parser = parse_duration
    )]
    pub connect_timeout: Option<Duration>,

    /// Poll interval in milliseconds
    #[arg(
        env = "HAWKBIT_POLL_INTERVAL_MS",
        long = "poll-interval-ms",
        value_name = "ms",
        value_parser = parse_duration
    )]
    pub poll_interval: Option<Duration>,

    /// Maximum random delay added to the poll interval in milliseconds
    #[arg(
        env = "HAWKBIT_POLL_MAX_JITTER_MS",
        long = "poll-max-jitter-ms",
        value_name = "ms",
        value_parser = parse_duration
    )]
    pub poll_max_jitter: Option<Duration>,

    /// PEM root certificate to trust when connecting to the server
    #[arg(env = "HAWKBIT_SERVER_CERT", long = "server-cert", value_name = "path")]
    pub server_cert: Option<PathBuf>,

    /// Device attribute sent when the server asks for registration, may be repeated
    #[arg(long = "attribute", value_name = "key=value", value_parser = parse_attribute)]
    pub attributes: Vec<(String, String)>,

    /// Directory to download deployment artifacts into
    #[arg(
        env = "HAWKBIT_DOWNLOAD_DIR",
        long = "download-dir",
        value_name = "path"
    )]
    pub download_dir: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Parser::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attribute() {
        assert_eq!(
            parse_attribute("hwRevision=2").unwrap(),
            ("hwRevision".to_owned(), "2".to_owned())
        );
        assert_eq!(
            parse_attribute("note=a=b").unwrap(),
            ("note".to_owned(), "a=b".to_owned())
        );
        assert!(parse_attribute("novalue").is_err());
        assert!(parse_attribute("=x").is_err());
    }

    #[test]
    fn test_tokens_are_exclusive() {
        let res = Cli::try_parse_from([
            "hawkbit-agent",
            "--security-token",
            "a",
            "--gateway-token",
            "b",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_durations_are_millis() {
        let cli =
            Cli::try_parse_from(["hawkbit-agent", "--poll-interval-ms", "1500"]).unwrap();
        assert_eq!(cli.poll_interval, Some(Duration::from_millis(1500)));
    }
}
