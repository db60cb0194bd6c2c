//! Connection settings read from the environment.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use mailboard_imap::{Config as ImapConfig, Security};

use crate::error::{MailError, Result};
use crate::model::ServerInfo;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything needed to reach and log in to the mailbox.
#[derive(Clone, PartialEq, Eq)]
pub struct MailConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Login secret.
    pub password: String,
    /// Implicit TLS.
    pub tls: bool,
    /// Skip certificate validation.
    pub accept_invalid_certs: bool,
    /// Limit for TCP connect, TLS and greeting.
    pub connect_timeout: Duration,
    /// Limit for the LOGIN round-trip.
    pub auth_timeout: Duration,
    /// Limit for each later command.
    pub io_timeout: Duration,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tls", &self.tls)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("connect_timeout", &self.connect_timeout)
            .field("auth_timeout", &self.auth_timeout)
            .field("io_timeout", &self.io_timeout)
            .finish()
    }
}

impl MailConfig {
    /// TLS on the default port with default timeouts.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: Security::Implicit.default_port(),
            username: username.into(),
            password: password.into(),
            tls: true,
            accept_invalid_certs: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Reads `MAILBOARD_*` variables from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Config`] if the username or password is missing
    /// or a number or boolean does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// Same as [`MailConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let tls = get("MAILBOARD_TLS")
            .map(|v| parse_bool("MAILBOARD_TLS", &v))
            .transpose()?
            .unwrap_or(true);
        let security = if tls { Security::Implicit } else { Security::None };

        let port = get("MAILBOARD_IMAP_PORT")
            .map(|v| parse_number::<u16>("MAILBOARD_IMAP_PORT", &v))
            .transpose()?
            .unwrap_or_else(|| security.default_port());

        let seconds = |name: &str, default: Duration| -> Result<Duration> {
            Ok(get(name)
                .map(|v| parse_number::<u64>(name, &v))
                .transpose()?
                .map_or(default, Duration::from_secs))
        };

        Ok(Self {
            host: get("MAILBOARD_IMAP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            username: get("MAILBOARD_USERNAME")
                .ok_or_else(|| MailError::Config("MAILBOARD_USERNAME is not set".into()))?,
            password: lookup("MAILBOARD_PASSWORD")
                .filter(|v| !v.is_empty())
                .ok_or_else(|| MailError::Config("MAILBOARD_PASSWORD is not set".into()))?,
            tls,
            accept_invalid_certs: get("MAILBOARD_ACCEPT_INVALID_CERTS")
                .map(|v| parse_bool("MAILBOARD_ACCEPT_INVALID_CERTS", &v))
                .transpose()?
                .unwrap_or(false),
            connect_timeout: seconds("MAILBOARD_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT)?,
            auth_timeout: seconds("MAILBOARD_AUTH_TIMEOUT_SECS", DEFAULT_AUTH_TIMEOUT)?,
            io_timeout: seconds("MAILBOARD_IO_TIMEOUT_SECS", DEFAULT_IO_TIMEOUT)?,
        })
    }

    /// Protocol-level settings for [`mailboard_imap::connect`].
    #[must_use]
    pub fn imap_config(&self) -> ImapConfig {
        ImapConfig::builder(self.host.clone())
            .port(self.port)
            .security(if self.tls {
                Security::Implicit
            } else {
                Security::None
            })
            .accept_invalid_certs(self.accept_invalid_certs)
            .connect_timeout(self.connect_timeout)
            .io_timeout(self.io_timeout)
            .build()
    }

    /// Host, port and username.
    #[must_use]
    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(MailError::Config(format!(
            "{name} must be a boolean, got {other:?}"
        ))),
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MailError::Config(format!("{name} must be a number, got {value:?}")))
}
