use std::{env, net::IpAddr, str::FromStr, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 3001;

#[derive(Clone, Debug)]
pub struct Config {
    /// The secret used to sign bearer tokens.
    /// If the secret changes, every previously issued token stops verifying.
    pub jwt_secret: String,
    /// How long tokens remain valid for. `None` issues tokens without an expiry.
    pub token_lifetime: Option<Duration>,
    pub host: IpAddr,
    pub port: u16,
}

impl Config {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_lifetime: None,
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
        }
    }

    /// Read configuration from the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a local `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from any variable source, `lookup` returning `None` for unset names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SEC").unwrap_or_default();
        if jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        let mut config = Self::new(jwt_secret);

        if let Some(host) = parse_var(&lookup, "HOST")? {
            config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "PORT")? {
            config.port = port;
        }
        config.token_lifetime =
            parse_var::<u64, _>(&lookup, "TOKEN_LIFETIME_SECS")?.map(Duration::from_secs);

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(None),
    }
}
