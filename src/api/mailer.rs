//! Outbound email delivery abstraction.
//!
//! Account-lifecycle operations deliver verification and reset links
//! through this trait. Delivery is inline and best-effort: a failed send
//! surfaces to the caller as a distinct error, and the operation that
//! already wrote its rows does not roll them back.
//!
//! The default sender for local dev is `LogMailer`, which logs and
//! returns `Ok(())`. Real deployments implement `Mailer` against an SMTP
//! relay or an email API.

use anyhow::Result;
use tracing::info;

/// Email delivery abstraction injected into the auth handlers.
pub trait Mailer: Send + Sync {
    /// Deliver a message or return an error so the caller can surface it.
    fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        info!(
            to_email = %to,
            subject = %subject,
            body = %html_body,
            "email send stub"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LogMailer, Mailer};

    #[test]
    fn log_mailer_always_succeeds() {
        let mailer = LogMailer;
        assert!(mailer
            .send("alice@example.com", "Verify Email", "<p>hi</p>")
            .is_ok());
    }
}
