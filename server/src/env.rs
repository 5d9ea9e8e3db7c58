use axum_client_ip::ClientIpSource;
use envconfig::Envconfig;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    pub fn is_production(&self) -> bool {
        matches!(self, Mode::Production)
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            _ => Err(format!("invalid mode: {}", s)),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Mode::Development => "development",
            Mode::Production => "production",
        })
    }
}

#[derive(Envconfig)]
pub(crate) struct Env {
    #[cfg_attr(
        debug_assertions,
        envconfig(from = "APP_MODE", default = "development")
    )]
    #[cfg_attr(
        not(debug_assertions),
        envconfig(from = "APP_MODE", default = "production")
    )]
    pub mode: Mode,

    #[envconfig(from = "IP_SOURCE", default = "ConnectInfo")]
    pub(crate) ip_source: ClientIpSource,

    #[envconfig(from = "HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "PORT", default = "8080")]
    pub port: u16,

    #[envconfig(from = "ACCESS_CONTROL_ALLOW_ORIGIN")]
    pub access_control_allowed_origin: Option<String>,

    #[envconfig(from = "DATABASE_URL", default = "postgres://localhost/portier")]
    pub database_url: String,

    #[envconfig(from = "DATABASE_MAX_CONNECTIONS", default = "5")]
    pub database_max_connections: u32,

    #[envconfig(from = "SESSION_IDLE_TIMEOUT", default = "3600")]
    pub session_idle_timeout: u64,

    #[envconfig(from = "SESSION_SWEEP_INTERVAL", default = "60")]
    pub session_sweep_interval: u64,

    #[envconfig(
        from = "FREE_MOBILE_API_URL",
        default = "https://smsapi.free-mobile.fr/sendmsg"
    )]
    pub sms_api_url: String,

    #[envconfig(from = "FREE_MOBILE_USER")]
    pub sms_user: Option<String>,

    #[envconfig(from = "FREE_MOBILE_KEY")]
    pub sms_key: Option<String>,
}

impl Env {
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval.max(1))
    }
}

pub fn init() -> anyhow::Result<Env> {
    let config = Env::init_from_env()?;
    Ok(config)
}

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
