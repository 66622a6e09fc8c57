use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub verification: Verification,
    pub challenge: Challenge,
    pub mail: Mail,
    pub http: Http,
    pub log: Log,
}

#[derive(Debug, Deserialize)]
pub struct Verification {
    pub backend: String, // "fake" or "real"
}

#[derive(Deserialize)]
pub struct Challenge {
    pub backend: String, // "memory" or "redis"
    pub mac_secret: String,
    pub redis_url: Option<String>,
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Challenge")
            .field("backend", &self.backend)
            .field("mac_secret", &"<redacted>")
            .field("redis_url", &self.redis_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Mail {
    pub backend: String, // "memory" or "smtp"
    pub smtp: Option<Smtp>,
}

#[derive(Deserialize)]
pub struct Smtp {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub send_timeout_secs: u64,
}

// Settings get logged at startup; the relay password must not.
impl fmt::Debug for Smtp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Smtp")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from_address", &self.from_address)
            .field("send_timeout_secs", &self.send_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_settings_parse() {
        let settings = parse_settings(Some("settings/dev.toml")).unwrap();
        assert_eq!(settings.verification.backend, "fake");
        assert_eq!(settings.challenge.backend, "memory");
    }

    #[test]
    fn smtp_password_is_redacted_in_debug_output() {
        let smtp = Smtp {
            host: "smtp.example.com".to_string(),
            username: "mailer".to_string(),
            password: "hunter2".to_string(),
            from_address: "no-reply@example.com".to_string(),
            send_timeout_secs: 15,
        };
        let printed = format!("{:?}", smtp);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(parse_settings(Some("settings/nope.toml")).is_err());
    }
}
