// Outbound mail for verification codes.
//
// Delivery is recorded through structured logging; wiring an SMTP relay in
// would only change `deliver`.

use crate::config::EmailConfig;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct Mailer {
    from_address: String,
}

/// A rendered outbound message
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Mailer {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            from_address: config.from_address.clone(),
        }
    }

    /// Render the verification-code message for an address
    pub fn render_verification_code(&self, email: &str, code: &str, ttl_minutes: i64) -> EmailMessage {
        EmailMessage {
            from: self.from_address.clone(),
            to: email.to_string(),
            subject: "Your verification code".to_string(),
            body: format!(
                "Your verification code is {}. It expires in {} minutes.",
                code, ttl_minutes
            ),
        }
    }

    /// Send a verification code to an address
    #[instrument(skip(self, code))]
    pub async fn send_verification_code(
        &self,
        email: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> EmailMessage {
        let message = self.render_verification_code(email, code, ttl_minutes);
        self.deliver(&message);
        message
    }

    fn deliver(&self, message: &EmailMessage) {
        tracing::info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "Verification code sent"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EmailConfig {
        EmailConfig {
            from_address: "no-reply@blog.local".to_string(),
            code_length: 6,
            code_ttl_minutes: 5,
            resend_interval_seconds: 60,
        }
    }

    #[test]
    fn test_render_verification_code() {
        let mailer = Mailer::new(&test_config());
        let message = mailer.render_verification_code("alice@example.com", "123456", 5);

        assert_eq!(message.from, "no-reply@blog.local");
        assert_eq!(message.to, "alice@example.com");
        assert!(message.body.contains("123456"));
        assert!(message.body.contains("5 minutes"));
    }

    #[tokio::test]
    async fn test_send_returns_rendered_message() {
        let mailer = Mailer::new(&test_config());
        let message = mailer
            .send_verification_code("bob@example.com", "000111", 5)
            .await;
        assert_eq!(message.to, "bob@example.com");
        assert!(message.body.contains("000111"));
    }
}
