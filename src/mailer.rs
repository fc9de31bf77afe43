use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("Failed to send mail: {0}")]
    Delivery(String),
}

/// Outgoing mail used by the invitation flow
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_invitation(&self, email: &str, link: &str) -> Result<(), MailerError>;
}

/// Writes each message to the log instead of delivering it
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_invitation(&self, email: &str, link: &str) -> Result<(), MailerError> {
        tracing::info!(to = %email, link = %link, "invitation email queued");
        Ok(())
    }
}

/// Link placed in invitation emails
pub fn invitation_link(app_url: &str, token: &str) -> String {
    format!("{}/accept-invite?token={}", app_url.trim_end_matches('/'), token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_link() {
        assert_eq!(
            invitation_link("https://sims.example.com/", "abc123"),
            "https://sims.example.com/accept-invite?token=abc123"
        );
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_everything() {
        let mailer = LogMailer;
        assert!(mailer.send_invitation("a@b.co", "http://x/accept-invite?token=t").await.is_ok());
    }
}
