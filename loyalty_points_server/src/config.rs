use std::time::Duration;

use clap::Parser;
use lpg_common::Secret;

const DEFAULT_RUN_ADDRESS: &str = ":8080";

/// Runtime configuration. Every flag has an environment equivalent; the environment overrides the flag default, and a
/// value passed explicitly on the command line wins.
#[derive(Parser, Debug, Clone)]
#[command(name = "loyalty-points-server", version, about = "Loyalty points gateway server")]
pub struct ServerConfig {
    /// Address to listen on. The `:8080` form binds all interfaces.
    #[arg(short = 'a', long = "address", env = "RUN_ADDRESS", default_value = DEFAULT_RUN_ADDRESS)]
    pub run_address: String,

    /// Postgres connection string
    #[arg(short = 'd', long = "database-uri", env = "DATABASE_URI")]
    pub database_uri: Option<String>,

    /// Base URL of the external accrual service
    #[arg(short = 'r', long = "accrual-address", env = "ACCRUAL_SYSTEM_ADDRESS")]
    pub accrual_address: Option<String>,

    /// Signing key for session tokens
    #[arg(long = "jwt-secret", env = "JWT_SECRET")]
    pub jwt_secret: Option<Secret<String>>,

    /// Session token lifetime
    #[arg(long = "jwt-ttl", env = "JWT_TTL", default_value = "24h", value_parser = parse_duration)]
    pub jwt_ttl: Duration,

    /// How often the accrual collector polls for unfinished orders
    #[arg(long = "poll-interval", env = "ACCRUAL_POLL_INTERVAL", default_value = "1s", value_parser = parse_duration)]
    pub poll_interval: Duration,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long = "log-level", env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    /// The address handed to the listener, with the bare `:port` form normalised.
    pub fn listen_address(&self) -> String {
        match self.run_address.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => self.run_address.clone(),
        }
    }
}

/// Parses durations of the `24h` / `30m` / `5s` / `500ms` form.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let unit_at = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit (ms, s, m or h)"))?;
    let (value, unit) = s.split_at(unit_at);
    let value: u64 = value.parse().map_err(|_| format!("'{s}' is not a valid duration"))?;
    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 3600)),
        _ => Err(format!("unsupported duration unit '{unit}'")),
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use clap::Parser;

    use super::{parse_duration, ServerConfig};

    #[test]
    fn durations_parse_with_units() {
        assert_eq!(parse_duration("24h").unwrap(), Duration::from_secs(24 * 3600));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn malformed_durations_are_rejected() {
        assert!(parse_duration("24").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("1d").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn bare_port_listen_address_binds_all_interfaces() {
        let config = ServerConfig::parse_from(["lpg", "-d", "postgres://x", "-r", "http://accrual"]);
        assert_eq!(config.listen_address(), "0.0.0.0:8080");
    }

    #[test]
    fn explicit_listen_address_is_kept() {
        let config =
            ServerConfig::parse_from(["lpg", "-a", "127.0.0.1:9090", "-d", "postgres://x", "-r", "http://accrual"]);
        assert_eq!(config.listen_address(), "127.0.0.1:9090");
    }

    #[test]
    fn defaults_are_applied() {
        let config = ServerConfig::parse_from(["lpg"]);
        assert_eq!(config.jwt_ttl, Duration::from_secs(24 * 3600));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
    }
}
