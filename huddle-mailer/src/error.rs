//! Error types for mailer construction.

use thiserror::Error;

/// Result type for mailer operations.
pub type MailerResult<T> = Result<T, MailerError>;

/// Errors raised while building a transport. Send failures are not errors;
/// they surface as `false` from [`crate::MailTransport::send`].
#[derive(Debug, Error)]
pub enum MailerError {
    /// The SMTP URL could not be parsed.
    #[error("invalid SMTP URL: {0}")]
    InvalidSmtpUrl(String),

    /// The relay could not be configured.
    #[error("SMTP setup failed: {0}")]
    Transport(String),
}
