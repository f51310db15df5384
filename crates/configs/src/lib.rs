//! # configs
//!
//! Layered settings: built-in defaults, then an optional `actionboard.toml`,
//! then `ACTIONBOARD__*` environment variables (after `.env` is loaded).
//!
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0:3000"
//!
//! [[interceptor.redirects]]
//! from = "/old-page"
//! to = "/new-page"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "ACTIONBOARD";
pub const DEFAULT_FILE: &str = "actionboard";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub log: LogSettings,
    pub interceptor: InterceptorSettings,
    /// The `.env` file that was applied, if any. Reported by the caller once
    /// logging is up; nothing here logs.
    #[serde(skip)]
    pub dotenv: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
    /// Adds `Secure` to cookies the service sets. Enable behind TLS.
    pub secure_cookies: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".into(),
            secure_cookies: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedirectRule {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InterceptorSettings {
    /// Exact-path redirects, checked first.
    pub redirects: Vec<RedirectRule>,
    pub protected_prefix: String,
    pub login_path: String,
    pub session_cookie: String,
    /// The only session value accepted under `protected_prefix`.
    pub session_token: SecretString,
    /// Substrings of the user agent that get a 403.
    pub deny_user_agents: Vec<String>,
    /// Paths under these prefixes bypass the interceptor entirely.
    pub excluded_prefixes: Vec<String>,
    pub visit_cookie: String,
}

impl Default for InterceptorSettings {
    fn default() -> Self {
        Self {
            redirects: vec![RedirectRule {
                from: "/old-page".into(),
                to: "/new-page".into(),
            }],
            protected_prefix: "/protected".into(),
            login_path: "/login".into(),
            session_cookie: "auth-token".into(),
            session_token: SecretString::from("valid-token"),
            deny_user_agents: vec!["bad-bot".into()],
            excluded_prefixes: vec![
                "/api".into(),
                "/static".into(),
                "/favicon.ico".into(),
                "/public".into(),
            ],
            visit_cookie: "last-visited".into(),
        }
    }
}

impl Settings {
    /// Loads the nearest `.env`, then [`Settings::load_from`] with the default
    /// file name.
    pub fn load() -> Result<Self, ConfigError> {
        let dotenv = dotenvy::dotenv().ok();
        Ok(Self {
            dotenv,
            ..Self::load_from(DEFAULT_FILE)?
        })
    }

    /// Like [`Settings::load`] with an explicit env file; a missing one is
    /// skipped.
    pub fn load_with_env_file(env_file: &Path, file: &str) -> Result<Self, ConfigError> {
        let dotenv = dotenvy::from_path(env_file)
            .ok()
            .map(|()| env_file.to_path_buf());
        Ok(Self {
            dotenv,
            ..Self::load_from(file)?
        })
    }

    /// `file` is a path without extension; a missing file is not an error.
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("interceptor.deny_user_agents")
                    .with_list_parse_key("interceptor.excluded_prefixes")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind_addr
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bad bind_addr {:?}", self.server.bind_addr)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        let i = &self.interceptor;
        for (name, path) in [
            ("protected_prefix", &i.protected_prefix),
            ("login_path", &i.login_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!("{name} must start with '/'")));
            }
        }
        if i.login_path.starts_with(&i.protected_prefix) {
            return Err(ConfigError::Invalid(
                "login_path must not sit under protected_prefix".into(),
            ));
        }
        for rule in &i.redirects {
            if !rule.from.starts_with('/') || !rule.to.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "redirect {} -> {} must use absolute paths",
                    rule.from, rule.to
                )));
            }
            if rule.from == rule.to {
                return Err(ConfigError::Invalid(format!("redirect loop on {}", rule.from)));
            }
        }
        if i.session_cookie.is_empty() || i.visit_cookie.is_empty() {
            return Err(ConfigError::Invalid("cookie names must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.interceptor.session_token.expose_secret(), "valid-token");
        assert_eq!(settings.interceptor.redirects[0].to, "/new-page");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::load_from("definitely-not-a-config-file").unwrap();
        assert_eq!(settings.server.bind_addr, "127.0.0.1:3000");
        assert_eq!(settings.log.format, LogFormat::Pretty);
    }

    #[test]
    fn env_file_feeds_settings_and_is_reported() {
        let dir = std::env::temp_dir().join(format!("actionboard-env-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let env_file = dir.join(".env");
        std::fs::write(&env_file, "ACTIONBOARD__LOG__FILTER=actionboard=trace\n").unwrap();

        let settings =
            Settings::load_with_env_file(&env_file, "definitely-not-a-config-file").unwrap();
        assert_eq!(settings.dotenv.as_deref(), Some(env_file.as_path()));
        assert_eq!(settings.log.filter, "actionboard=trace");

        let skipped =
            Settings::load_with_env_file(&dir.join("absent.env"), "definitely-not-a-config-file")
                .unwrap();
        assert!(skipped.dotenv.is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn login_under_protected_prefix_is_rejected() {
        let mut settings = Settings::default();
        settings.interceptor.login_path = "/protected/login".into();
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn login_sharing_the_protected_prefix_is_rejected() {
        let mut settings = Settings::default();
        settings.interceptor.login_path = "/protected-login".into();
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));

        settings.interceptor.login_path = "/protect".into();
        settings.validate().unwrap();
    }

    #[test]
    fn self_redirect_is_rejected() {
        let mut settings = Settings::default();
        settings.interceptor.redirects.push(RedirectRule {
            from: "/loop".into(),
            to: "/loop".into(),
        });
        assert!(settings.validate().is_err());
    }

    #[test]
    fn bad_bind_addr_is_rejected() {
        let mut settings = Settings::default();
        settings.server.bind_addr = "not-an-addr".into();
        assert!(settings.bind_addr().is_err());
    }
}
