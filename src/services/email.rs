//! Email service for one-time sign-in codes and booking notices

use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::MailConfig;

const SITE_NAME: &str = "HR Companion";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Mail delivery is disabled")]
    MailDisabled,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("Failed to send email: {0}")]
    Transport(String),
}

/// SMTP sender configured from the `mail` config section
pub struct EmailService {
    config: MailConfig,
}

impl EmailService {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.smtp_host.is_empty()
    }

    /// Send a sign-in code valid for `ttl_minutes`
    pub async fn send_code(
        &self,
        to_email: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<(), EmailError> {
        let subject = format!("[{}] Your sign-in code", SITE_NAME);
        let body = format!(
            "Hello,\n\nYour sign-in code is: {}\n\nThe code expires in {} minutes. \
             If you did not request it, you can ignore this email.\n\n{} team",
            code, ttl_minutes, SITE_NAME
        );
        self.send(to_email, &subject, body).await
    }

    /// Notify a mentor about a new booking request
    pub async fn send_booking_request(
        &self,
        to_email: &str,
        mentor_name: &str,
        user_name: &str,
        topic: &str,
    ) -> Result<(), EmailError> {
        let subject = format!("[{}] New booking request", SITE_NAME);
        let body = format!(
            "Hello {},\n\n{} requested a session with you.\nTopic: {}\n\n\
             Sign in to confirm or cancel the booking.\n\n{} team",
            mentor_name, user_name, topic, SITE_NAME
        );
        self.send(to_email, &subject, body).await
    }

    async fn send(&self, to_email: &str, subject: &str, body: String) -> Result<(), EmailError> {
        if !self.is_enabled() {
            return Err(EmailError::MailDisabled);
        }

        // `from` may carry a display name: "Name <addr>"
        let email = Message::builder()
            .from(
                self.config
                    .from
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.config.from.clone()))?,
            )
            .to(to_email
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to_email.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
            .map_err(|e| EmailError::Transport(e.to_string()))?
            .port(self.config.smtp_port);
        if !self.config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ));
        }
        let mailer = builder.build();

        mailer
            .send(email)
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        tracing::debug!("Sent \"{}\" to {}", subject, to_email);
        Ok(())
    }
}

/// Codes span 000000..=999999
const CODE_SPACE: u32 = 1_000_000;

/// Largest multiple of `CODE_SPACE` that fits in a u32; draws at or above it
/// are discarded so every code is equally likely
const CODE_ZONE: u32 = (u32::MAX / CODE_SPACE) * CODE_SPACE;

/// Random 6-digit code from the OS generator, zero padded
pub fn generate_code() -> anyhow::Result<String> {
    loop {
        let mut buf = [0u8; 4];
        getrandom::fill(&mut buf)
            .map_err(|e| anyhow::anyhow!("Failed to read OS randomness: {}", e))?;
        let n = u32::from_le_bytes(buf);
        if n < CODE_ZONE {
            return Ok(format!("{:06}", n % CODE_SPACE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..50 {
            let code = generate_code().unwrap();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_generated_codes_vary() {
        let codes: std::collections::HashSet<String> =
            (0..20).map(|_| generate_code().unwrap()).collect();
        assert!(codes.len() > 1);
        assert_eq!(CODE_ZONE % CODE_SPACE, 0);
        assert!(u32::MAX - CODE_ZONE < CODE_SPACE);
    }

    #[tokio::test]
    async fn test_disabled_mail_is_reported() {
        let service = EmailService::new(MailConfig::default());
        assert!(!service.is_enabled());

        let result = service.send_code("ana@example.com", "123456", 15).await;
        assert!(matches!(result, Err(EmailError::MailDisabled)));
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let service = EmailService::new(MailConfig {
            enabled: true,
            smtp_host: "smtp.example.com".to_string(),
            from: "noreply@example.com".to_string(),
            ..MailConfig::default()
        });

        let result = service.send_code("not an address", "123456", 15).await;
        assert!(matches!(result, Err(EmailError::InvalidAddress(_))));
    }
}
