//! Email transport for Huddle account flows.
//!
//! The identity services deliver verification codes, reset codes, and backup
//! code bundles through [`MailTransport`]. A send failure degrades the
//! calling flow to an explicit user-visible error; nothing here retries.

mod error;
mod memory;
mod smtp;

pub use error::{MailerError, MailerResult};
pub use memory::{MemoryMailer, SentMail};
pub use smtp::{SmtpConfig, SmtpMailer};

/// Outbound mail delivery.
///
/// Implementations report success as a plain bool: the calling flow either
/// proceeds or tells the user delivery failed. Retry policy, if any, belongs
/// to the user pressing the button again.
pub trait MailTransport: Send + Sync {
    /// Sends one message. `html_body` is an optional rich-text alternative.
    fn send(&self, to: &str, subject: &str, text_body: &str, html_body: Option<&str>) -> bool;
}
