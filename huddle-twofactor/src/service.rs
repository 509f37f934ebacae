//! The second-factor service.

use crate::error::{TwoFactorError, TwoFactorResult};
use crate::totp::verify_token;
use huddle_mailer::MailTransport;
use huddle_store::{EnrollmentArtifacts, Store, UserId};
use tracing::{debug, info};

/// Manages per-user second-factor state on top of the store.
pub struct TwoFactorService {
    store: Store,
}

impl TwoFactorService {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Completes enrollment: persists secret and backup codes and flips the
    /// account to `enabled`. Re-enabling overwrites any prior material. The
    /// cached pending-enrollment bundle is dropped; it is spent.
    pub fn enable(&self, user_id: UserId, secret: &str, codes: &[String]) -> TwoFactorResult<()> {
        self.store.set_totp(user_id, secret, codes)?;
        self.store.clear_enrollment(user_id)?;
        info!(user_id = %user_id, "second factor enabled");
        Ok(())
    }

    /// Disables the second factor, clearing secret, backup codes, and any
    /// cached enrollment bundle.
    pub fn disable(&self, user_id: UserId) -> TwoFactorResult<()> {
        self.store.clear_totp(user_id)?;
        self.store.clear_enrollment(user_id)?;
        info!(user_id = %user_id, "second factor disabled");
        Ok(())
    }

    /// Returns whether the account currently has a second factor enabled.
    pub fn is_enabled(&self, user_id: UserId) -> TwoFactorResult<bool> {
        Ok(self
            .store
            .user_by_id(user_id)?
            .is_some_and(|u| u.totp_enabled()))
    }

    /// Verifies a submitted TOTP token against the account's stored secret.
    /// False when no second factor is enabled.
    pub fn verify_user_token(&self, user_id: UserId, token: &str) -> TwoFactorResult<bool> {
        let Some(user) = self.store.user_by_id(user_id)? else {
            return Ok(false);
        };
        let Some(secret) = user.totp_secret else {
            return Ok(false);
        };
        Ok(verify_token(&secret, token))
    }

    /// Consumes a backup code (case-insensitive, single use). A second
    /// attempt with the same code always fails.
    pub fn verify_backup_code(&self, user_id: UserId, code: &str) -> TwoFactorResult<bool> {
        let consumed = self.store.take_backup_code(user_id, code)?;
        if consumed {
            debug!(user_id = %user_id, "backup code accepted");
        }
        Ok(consumed)
    }

    /// Caches the pending-enrollment bundle so the dialog can be re-shown
    /// without regenerating secret, codes, or QR image.
    pub fn cache_enrollment(
        &self,
        user_id: UserId,
        artifacts: &EnrollmentArtifacts,
    ) -> TwoFactorResult<()> {
        Ok(self.store.cache_enrollment(user_id, artifacts)?)
    }

    /// Returns the cached pending-enrollment bundle, if any.
    pub fn cached_enrollment(
        &self,
        user_id: UserId,
    ) -> TwoFactorResult<Option<EnrollmentArtifacts>> {
        Ok(self.store.enrollment(user_id)?)
    }

    /// Drops the cached pending-enrollment bundle without enabling.
    pub fn clear_enrollment(&self, user_id: UserId) -> TwoFactorResult<()> {
        Ok(self.store.clear_enrollment(user_id)?)
    }

    /// Mails the user their remaining backup codes.
    ///
    /// # Errors
    ///
    /// Returns [`TwoFactorError::Delivery`] when the transport reports
    /// failure; the caller surfaces that to the user, no retry here.
    pub fn send_backup_codes(
        &self,
        user_id: UserId,
        mailer: &dyn MailTransport,
    ) -> TwoFactorResult<()> {
        let user = self
            .store
            .user_by_id(user_id)?
            .ok_or(huddle_store::StoreError::NotFound("user"))?;
        let codes = user.backup_codes.unwrap_or_default();

        let body = format!(
            "Your Huddle backup codes:\n\n{}\n\nEach code works exactly once. \
             Store them somewhere safe.",
            codes.join("\n")
        );
        if !mailer.send(&user.email, "Your Huddle backup codes", &body, None) {
            return Err(TwoFactorError::Delivery(user.email));
        }
        Ok(())
    }
}
