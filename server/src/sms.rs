use crate::env::Env;
use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

struct Credentials {
    user: String,
    key: SecretString,
}

/// Relays one-line notifications through the Free Mobile SMS API.
pub(crate) struct SmsRelay {
    client: reqwest::Client,
    endpoint: String,
    credentials: Option<Credentials>,
}

impl SmsRelay {
    pub(crate) fn new(
        endpoint: String,
        user: Option<String>,
        key: Option<String>,
    ) -> reqwest::Result<Self> {
        let credentials = match (user, key) {
            (Some(user), Some(key)) if !user.is_empty() && !key.is_empty() => Some(Credentials {
                user,
                key: SecretString::from(key),
            }),
            _ => None,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            credentials,
        })
    }

    pub(crate) fn from_env(config: &Env) -> reqwest::Result<Self> {
        Self::new(
            config.sms_api_url.clone(),
            config.sms_user.clone(),
            config.sms_key.clone(),
        )
    }

    pub(crate) fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Sends `message`. Any failure is logged and reported as `false`.
    pub(crate) async fn send(&self, message: &str) -> bool {
        let Some(credentials) = &self.credentials else {
            warn!("sms relay has no credentials configured");
            return false;
        };

        let url = match reqwest::Url::parse_with_params(
            &self.endpoint,
            &[
                ("user", credentials.user.as_str()),
                ("pass", credentials.key.expose_secret()),
                ("msg", message),
            ],
        ) {
            Ok(url) => url,
            Err(err) => {
                warn!("invalid sms endpoint {}: {}", self.endpoint, err);
                return false;
            }
        };

        debug!("relaying sms of {} bytes", message.len());

        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                info!("sms relayed");
                true
            }
            Ok(response) => {
                warn!("sms gateway rejected message: {}", response.status());
                false
            }
            Err(err) => {
                warn!("sms gateway unreachable: {}", err.without_url());
                false
            }
        }
    }
}
