//! SMTP email provider implementation using lettre.
//!
//! Holds a single pooled connection. The pooled transport is rebuilt after
//! [`MESSAGES_PER_CONNECTION`] messages so long-lived connections do not
//! outstay the server's per-session limits.

use super::{EmailProvider, OutgoingEmail, SentEmail};
use crate::config::SmtpConfig;
use crate::error::{TransportError, TransportErrorKind, io_error_kind, is_connection_reset};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{
        PoolConfig,
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub const MESSAGES_PER_CONNECTION: u32 = 3;

/// Connect and per-command socket timeout, handed to lettre.
pub const SMTP_SOCKET_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound for opening a fresh connection up to a usable session
/// (greeting, EHLO, TLS, AUTH).
pub const SMTP_GREETING_TIMEOUT: Duration = Duration::from_secs(30);

type SmtpTransport = AsyncSmtpTransport<Tokio1Executor>;

struct PooledTransport {
    transport: Arc<SmtpTransport>,
    sent: u32,
}

/// SMTP provider with a size-1 connection pool.
pub struct SmtpProvider {
    config: SmtpConfig,
    pool: Mutex<PooledTransport>,
}

impl SmtpProvider {
    /// Create a new SMTP provider. Must be called inside a Tokio runtime.
    ///
    /// Missing credentials are accepted here and reported on send.
    pub fn new(config: SmtpConfig) -> Result<Self, TransportError> {
        let transport = Arc::new(Self::build_transport(&config)?);

        info!(
            host = %config.host,
            port = config.port,
            secure = config.is_implicit_tls(),
            configured = config.is_configured(),
            "SMTP transport initialized"
        );

        Ok(Self {
            config,
            pool: Mutex::new(PooledTransport { transport, sent: 0 }),
        })
    }

    fn build_transport(config: &SmtpConfig) -> Result<SmtpTransport, TransportError> {
        let mut tls = TlsParameters::builder(config.host.clone());
        if !config.reject_unauthorized {
            warn!(host = %config.host, "SMTP certificate verification disabled");
            tls = tls.dangerous_accept_invalid_certs(true);
        }
        let tls = tls
            .build()
            .map_err(|e| TransportError::configuration(format!("TLS configuration error: {}", e)))?;

        let tls = if config.is_implicit_tls() {
            Tls::Wrapper(tls)
        } else {
            Tls::Required(tls)
        };

        let mut builder = SmtpTransport::builder_dangerous(&config.host)
            .port(config.port)
            .tls(tls)
            .timeout(Some(SMTP_SOCKET_TIMEOUT))
            .pool_config(PoolConfig::new().max_size(1));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    /// Hand out the pooled transport, rebuilding it once it has carried its
    /// share of messages. The flag is set when nothing has used it yet.
    async fn checkout(&self) -> Result<(Arc<SmtpTransport>, bool), TransportError> {
        let mut pool = self.pool.lock().await;

        if pool.sent >= MESSAGES_PER_CONNECTION {
            debug!(sent = pool.sent, "Recycling SMTP connection");
            pool.transport = Arc::new(Self::build_transport(&self.config)?);
            pool.sent = 0;
        }
        let fresh = pool.sent == 0;
        pool.sent += 1;

        Ok((Arc::clone(&pool.transport), fresh))
    }

    /// Force the next checkout to rebuild the transport.
    async fn discard(&self) {
        self.pool.lock().await.sent = MESSAGES_PER_CONNECTION;
    }

    /// Open a session on a fresh transport within [`SMTP_GREETING_TIMEOUT`].
    async fn handshake(&self, transport: &SmtpTransport) -> Result<(), TransportError> {
        match tokio::time::timeout(SMTP_GREETING_TIMEOUT, transport.test_connection()).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(TransportError::new(
                TransportErrorKind::ConnectionReset,
                "SMTP connection closed during handshake",
            )),
            Ok(Err(e)) => Err(classify_smtp_error(&e)),
            Err(_) => Err(TransportError::timeout(format!(
                "SMTP server did not greet within {} seconds",
                SMTP_GREETING_TIMEOUT.as_secs()
            ))),
        }
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, TransportError> {
        let sender = self
            .config
            .username
            .as_deref()
            .ok_or_else(|| TransportError::configuration("SMTP credentials are not configured"))?;

        let from = Mailbox::new(
            Some(self.config.from_name.clone()),
            sender.parse().map_err(|e| {
                TransportError::configuration(format!("Invalid sender address: {}", e))
            })?,
        );
        let to = Mailbox::new(
            Some(email.to_name.clone()),
            email.to_email.parse().map_err(|e| {
                TransportError::new(
                    TransportErrorKind::InvalidRequest,
                    format!("Invalid recipient address: {}", e),
                )
            })?,
        );

        Message::builder()
            .from(from)
            .to(to)
            .subject(&email.rendered.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.rendered.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.rendered.html.clone()),
                    ),
            )
            .map_err(|e| {
                TransportError::new(
                    TransportErrorKind::InvalidRequest,
                    format!("Failed to build email message: {}", e),
                )
            })
    }
}

/// What we could learn about a failed SMTP exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SmtpFailure {
    timeout: bool,
    permanent: bool,
    reply_code: Option<u16>,
    io_kind: Option<std::io::ErrorKind>,
}

impl SmtpFailure {
    fn inspect(err: &lettre::transport::smtp::Error) -> Self {
        Self {
            timeout: err.is_timeout(),
            permanent: err.is_permanent(),
            reply_code: err.status().and_then(|code| code.to_string().parse().ok()),
            io_kind: io_error_kind(err),
        }
    }

    fn kind(&self) -> TransportErrorKind {
        if self.timeout || self.io_kind == Some(std::io::ErrorKind::TimedOut) {
            return TransportErrorKind::Timeout;
        }
        if self.io_kind.is_some_and(is_connection_reset) {
            return TransportErrorKind::ConnectionReset;
        }
        match self.reply_code {
            Some(530 | 534 | 535) => TransportErrorKind::Authentication,
            Some(_) => TransportErrorKind::Rejected,
            None if self.permanent => TransportErrorKind::Rejected,
            None => TransportErrorKind::Internal,
        }
    }
}

fn classify_smtp_error(err: &lettre::transport::smtp::Error) -> TransportError {
    let kind = SmtpFailure::inspect(err).kind();
    TransportError::new(kind, format!("SMTP send failed: {}", err))
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, TransportError> {
        if !self.config.is_configured() {
            return Err(TransportError::configuration(
                "SMTP credentials are not configured (SMTP_USER, SMTP_PASS)",
            ));
        }

        debug!(
            to = %email.to_email,
            subject = %email.rendered.subject,
            host = %self.config.host,
            port = self.config.port,
            "Sending email via SMTP"
        );

        let message = self.build_message(email)?;
        let (transport, fresh) = self.checkout().await?;

        if fresh {
            if let Err(err) = self.handshake(&transport).await {
                error!(
                    host = %self.config.host,
                    port = self.config.port,
                    kind = %err.kind,
                    error = %err,
                    "SMTP handshake failed"
                );
                self.discard().await;
                return Err(err);
            }
        }

        let response = transport.send(message).await.map_err(|e| {
            let err = classify_smtp_error(&e);
            error!(to = %email.to_email, kind = %err.kind, error = %e, "Failed to send email via SMTP");
            err
        })?;

        let message_id = response.message().next().map(|s| s.to_string());

        info!(to = %email.to_email, message_id = ?message_id, "Email sent successfully via SMTP");

        Ok(SentEmail { message_id })
    }

    fn name(&self) -> &'static str {
        "smtp"
    }

    fn health(&self) -> serde_json::Value {
        json!({
            "configured": self.config.is_configured(),
            "host": self.config.host,
            "port": self.config.port,
            "secure": self.config.is_implicit_tls(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentNotification;
    use crate::templates::TemplateEngine;
    use std::io::ErrorKind;

    fn outgoing(to: &str) -> OutgoingEmail {
        let notification = PaymentNotification::new("a@b.com", "42").unwrap();
        OutgoingEmail {
            to_email: to.to_string(),
            to_name: "a".to_string(),
            rendered: TemplateEngine::new()
                .unwrap()
                .render_payment_confirmation(&notification)
                .unwrap(),
        }
    }

    #[test]
    fn test_failure_classification() {
        let timeout = SmtpFailure {
            timeout: true,
            ..Default::default()
        };
        assert_eq!(timeout.kind(), TransportErrorKind::Timeout);

        let reset = SmtpFailure {
            io_kind: Some(ErrorKind::ConnectionReset),
            ..Default::default()
        };
        assert_eq!(reset.kind(), TransportErrorKind::ConnectionReset);

        let eof = SmtpFailure {
            io_kind: Some(ErrorKind::UnexpectedEof),
            ..Default::default()
        };
        assert_eq!(eof.kind(), TransportErrorKind::ConnectionReset);

        for code in [530, 534, 535] {
            let auth = SmtpFailure {
                permanent: true,
                reply_code: Some(code),
                ..Default::default()
            };
            assert_eq!(auth.kind(), TransportErrorKind::Authentication);
        }

        let mailbox = SmtpFailure {
            permanent: true,
            reply_code: Some(550),
            ..Default::default()
        };
        assert_eq!(mailbox.kind(), TransportErrorKind::Rejected);

        let busy = SmtpFailure {
            reply_code: Some(421),
            ..Default::default()
        };
        assert!(!busy.kind().is_transient());

        assert_eq!(SmtpFailure::default().kind(), TransportErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_health_snapshot() {
        let provider = SmtpProvider::new(SmtpConfig::new("smtp.example.com", 465)).unwrap();
        let health = provider.health();

        assert_eq!(provider.name(), "smtp");
        assert_eq!(health["configured"], false);
        assert_eq!(health["host"], "smtp.example.com");
        assert_eq!(health["port"], 465);
        assert_eq!(health["secure"], true);
    }

    #[tokio::test]
    async fn test_send_without_credentials_is_configuration_error() {
        let provider = SmtpProvider::new(SmtpConfig::new("smtp.example.com", 587)).unwrap();
        let err = provider.send(&outgoing("a@b.com")).await.unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_build_message_rejects_bad_recipient() {
        let config = SmtpConfig::new("smtp.example.com", 465).with_credentials("shop@example.com", "pw");
        let provider = SmtpProvider::new(config).unwrap();

        let err = provider.build_message(&outgoing("not an address")).unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::InvalidRequest);

        assert!(provider.build_message(&outgoing("a@b.com")).is_ok());
    }

    #[tokio::test]
    async fn test_pool_is_recycled_after_three_messages() {
        let config = SmtpConfig::new("smtp.example.com", 465).with_credentials("shop@example.com", "pw");
        let provider = SmtpProvider::new(config).unwrap();

        let (first, fresh) = provider.checkout().await.unwrap();
        assert!(fresh);
        for _ in 1..MESSAGES_PER_CONNECTION {
            let (next, fresh) = provider.checkout().await.unwrap();
            assert!(Arc::ptr_eq(&first, &next));
            assert!(!fresh);
        }
        let (fourth, fresh) = provider.checkout().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &fourth));
        assert!(fresh);
    }

    #[tokio::test]
    async fn test_relaxed_certificate_checks_build() {
        for port in [465, 587] {
            let mut config = SmtpConfig::new("smtp.example.com", port).with_credentials("shop@example.com", "pw");
            config.reject_unauthorized = false;

            assert!(SmtpProvider::build_transport(&config).is_ok());
            let provider = SmtpProvider::new(config).unwrap();
            assert_eq!(provider.health()["configured"], true);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_server_times_out_at_greeting() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            // Accept and never greet.
            let (_socket, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let config = SmtpConfig::new("127.0.0.1", port).with_credentials("shop@example.com", "pw");
        let provider = SmtpProvider::new(config).unwrap();

        let start = tokio::time::Instant::now();
        let err = provider.send(&outgoing("a@b.com")).await.unwrap_err();

        assert_eq!(err.kind, TransportErrorKind::Timeout);
        assert!(err.is_transient());
        assert!(start.elapsed() >= SMTP_GREETING_TIMEOUT);
        assert!(start.elapsed() < SMTP_SOCKET_TIMEOUT);

        let (_, fresh) = provider.checkout().await.unwrap();
        assert!(fresh);
    }
}
