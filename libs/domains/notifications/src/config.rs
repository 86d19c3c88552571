//! Transport configuration loaded from the environment.
//!
//! Missing credentials are not an error here: the service still starts,
//! `/health` reports `configured: false` and sends fail with a configuration
//! error.

use crate::providers::EMAILJS_SEND_URL;
use core_config::{ConfigError, FromEnv, env_flag, env_optional, env_or_default, env_parse_or};
use std::fmt;

/// SMTP connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Login, also used as the sender address.
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_name: String,
    /// `false` accepts invalid or self-signed certificates.
    pub reject_unauthorized: bool,
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            from_name: "Shopping App".to_string(),
            reject_unauthorized: true,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_from_name(mut self, from_name: impl Into<String>) -> Self {
        self.from_name = from_name.into();
        self
    }

    /// Implicit TLS from the first byte (port 465); everything else uses STARTTLS.
    pub fn is_implicit_tls(&self) -> bool {
        self.port == 465
    }

    pub fn is_configured(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("from_name", &self.from_name)
            .field("reject_unauthorized", &self.reject_unauthorized)
            .finish()
    }
}

impl FromEnv for SmtpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_or_default("SMTP_HOST", "smtp.gmail.com"),
            port: env_parse_or("SMTP_PORT", 465)?,
            username: env_optional("SMTP_USER"),
            password: env_optional("SMTP_PASS"),
            from_name: env_or_default("SMTP_FROM_NAME", "Shopping App"),
            reject_unauthorized: env_flag("SMTP_TLS_REJECT_UNAUTHORIZED", true)?,
        })
    }
}

/// EmailJS REST API parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct EmailJsConfig {
    pub service_id: Option<String>,
    pub template_id: Option<String>,
    /// Sent as `user_id`.
    pub public_key: Option<String>,
    /// Sent as `accessToken`.
    pub private_key: Option<String>,
    pub api_url: String,
}

impl EmailJsConfig {
    pub fn new(
        service_id: impl Into<String>,
        template_id: impl Into<String>,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            service_id: Some(service_id.into()),
            template_id: Some(template_id.into()),
            public_key: Some(public_key.into()),
            private_key: Some(private_key.into()),
            api_url: EMAILJS_SEND_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// All four identifiers are required.
    pub fn is_configured(&self) -> bool {
        self.service_id.is_some()
            && self.template_id.is_some()
            && self.public_key.is_some()
            && self.private_key.is_some()
    }
}

impl fmt::Debug for EmailJsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailJsConfig")
            .field("service_id", &self.service_id)
            .field("template_id", &self.template_id)
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key.as_ref().map(|_| "***"))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl FromEnv for EmailJsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            service_id: env_optional("EMAILJS_SERVICE_ID"),
            template_id: env_optional("EMAILJS_TEMPLATE_ID"),
            public_key: env_optional("EMAILJS_PUBLIC_KEY"),
            private_key: env_optional("EMAILJS_PRIVATE_KEY"),
            api_url: env_or_default("EMAILJS_API_URL", EMAILJS_SEND_URL),
        })
    }
}

/// The outbound channel, chosen once at startup via `MAIL_TRANSPORT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    Smtp(SmtpConfig),
    EmailJs(EmailJsConfig),
}

impl TransportConfig {
    pub fn is_configured(&self) -> bool {
        match self {
            Self::Smtp(config) => config.is_configured(),
            Self::EmailJs(config) => config.is_configured(),
        }
    }
}

impl FromEnv for TransportConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let transport = env_or_default("MAIL_TRANSPORT", "smtp");

        match transport.trim().to_ascii_lowercase().as_str() {
            "smtp" => Ok(Self::Smtp(SmtpConfig::from_env()?)),
            "emailjs" => Ok(Self::EmailJs(EmailJsConfig::from_env()?)),
            other => Err(ConfigError::ParseError {
                key: "MAIL_TRANSPORT".to_string(),
                details: format!("expected 'smtp' or 'emailjs', got '{}'", other),
            }),
        }
    }
}
