//! The authentication service.

use crate::error::AuthResult;
use crate::password::{hash_password, verify_password};
use crate::root::RootAccount;
use huddle_mailer::MailTransport;
use huddle_store::{Store, UserId};
use rand::Rng;
use tracing::{debug, warn};

/// An authenticated identity handed back to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub verified: bool,
}

/// Resolves credentials against the store, with an optional privileged
/// account that never touches it.
pub struct AuthService {
    store: Store,
    root: Option<RootAccount>,
}

impl AuthService {
    /// Creates the service. `root` is the configuration-supplied privileged
    /// account, if the deployment has one.
    #[must_use]
    pub fn new(store: Store, root: Option<RootAccount>) -> Self {
        Self { store, root }
    }

    /// Resolves an (email, password) pair to an identity.
    ///
    /// The privileged account is checked first and entirely outside the
    /// store. For store-backed accounts, an unknown email, an unverified
    /// account, and a wrong password are indistinguishable: all yield `None`.
    pub fn authenticate(&self, email: &str, password: &str) -> AuthResult<Option<Identity>> {
        if let Some(root) = &self.root {
            if root.matches_email(email) {
                if root.verify_secret(password) {
                    debug!("privileged account authenticated");
                    return Ok(Some(Identity {
                        id: UserId::ROOT,
                        email: root.email().to_string(),
                        name: "Administrator".to_string(),
                        verified: true,
                    }));
                }
                return Ok(None);
            }
        }

        let Some(user) = self.store.user_by_email(email)? else {
            return Ok(None);
        };
        if !user.verified || !verify_password(&user.password_hash, password) {
            return Ok(None);
        }
        debug!(user_id = %user.id, "user authenticated");
        Ok(Some(Identity {
            id: user.id,
            email: user.email,
            name: user.name,
            verified: user.verified,
        }))
    }

    /// Registers a new unverified account.
    ///
    /// Returns false — silently, without distinguishing the cause — when the
    /// email is malformed, collides with the privileged account, or already
    /// exists.
    pub fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        company: &str,
        verification_code: &str,
    ) -> AuthResult<bool> {
        if !is_plausible_email(email) {
            return Ok(false);
        }
        if let Some(root) = &self.root {
            if root.matches_email(email) {
                warn!("registration attempt with privileged email");
                return Ok(false);
            }
        }

        let password_hash = hash_password(password)?;
        match self
            .store
            .create_user(email, &password_hash, name, company, verification_code)
        {
            Ok(_) => Ok(true),
            Err(huddle_store::StoreError::AlreadyExists(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Confirms an email address with its pending verification code.
    /// True only on an exact, first-time match.
    pub fn verify_email(&self, email: &str, code: &str) -> AuthResult<bool> {
        Ok(self.store.mark_verified(email, code)?)
    }

    /// Re-sends the pending verification code for an unverified account.
    /// Returns false when the account is missing, already verified, or mail
    /// delivery fails.
    pub fn send_verification_code(
        &self,
        email: &str,
        mailer: &dyn MailTransport,
    ) -> AuthResult<bool> {
        let Some(user) = self.store.user_by_email(email)? else {
            return Ok(false);
        };
        let Some(code) = (!user.verified).then_some(user.verification_code).flatten() else {
            return Ok(false);
        };
        Ok(mailer.send(
            &user.email,
            "Verify your Huddle email",
            &format!("Your Huddle verification code is {code}. Enter it in the app to finish signing up."),
            None,
        ))
    }

    /// Starts the password-reset flow: issues a fresh 6-digit code
    /// (superseding any prior token for this email) and mails it.
    ///
    /// An unknown email still returns true without sending anything, so the
    /// response does not leak whether an account exists. Mail failure returns
    /// false; the user is told delivery failed and may try again.
    pub fn request_password_reset(
        &self,
        email: &str,
        mailer: &dyn MailTransport,
    ) -> AuthResult<bool> {
        if self.store.user_by_email(email)?.is_none() {
            return Ok(true);
        }

        let code = generate_reset_code();
        self.store.put_reset_token(email, &code)?;
        let sent = mailer.send(
            email,
            "Your Huddle password reset code",
            &format!("Your password reset code is {code}. It expires in 15 minutes."),
            None,
        );
        if !sent {
            warn!(email, "reset code delivery failed");
        }
        Ok(sent)
    }

    /// Completes the reset flow: consumes the token (single use, 15-minute
    /// expiry) and replaces the password hash.
    pub fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> AuthResult<bool> {
        if !self.store.consume_reset_token(email, code)? {
            return Ok(false);
        }
        let password_hash = hash_password(new_password)?;
        Ok(self.store.update_password_hash(email, &password_hash)?)
    }
}

/// Random 6-digit reset code, zero-padded.
fn generate_reset_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// Minimal shape check applied before any storage access. Full address
/// validation is the mail server's job.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
