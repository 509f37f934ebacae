//! Password-reset tokens and sessions.

use crate::error::{StoreError, StoreResult};
use crate::records::{ResetToken, Session, UserId};
use crate::store::{fmt_ts, parse_ts, Store};
use chrono::{Duration, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

/// How long a reset token stays valid after issuance.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 15;

impl Store {
    /// Issues a reset token for `email`, superseding any prior token for
    /// that address. Expiry is fixed at issuance + 15 minutes.
    pub fn put_reset_token(&self, email: &str, code: &str) -> StoreResult<ResetToken> {
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.put_reset_token_expiring(email, code, expires_at)
    }

    /// Issues a reset token with an explicit expiry. Used by tests exercising
    /// the expiry boundary.
    ///
    /// The key is the lowercased address, matching the case-insensitive
    /// uniqueness of user emails, so requests with different casing supersede
    /// each other instead of coexisting.
    pub fn put_reset_token_expiring(
        &self,
        email: &str,
        code: &str,
        expires_at: chrono::DateTime<Utc>,
    ) -> StoreResult<ResetToken> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR REPLACE INTO reset_tokens (email, code, expires_at)
             VALUES (lower(?1), ?2, ?3)",
            params![email, code, fmt_ts(expires_at)],
        )
        .map_err(|e| StoreError::Storage(format!("failed to store reset token: {e}")))?;
        Ok(ResetToken {
            email: email.to_lowercase(),
            code: code.to_string(),
            expires_at,
        })
    }

    /// Returns the live reset token for `email`, if any (expired tokens are
    /// reported as absent).
    pub fn reset_token(&self, email: &str) -> StoreResult<Option<ResetToken>> {
        let conn = self.connect()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT code, expires_at FROM reset_tokens WHERE email = lower(?1)",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| StoreError::Storage(format!("failed to query reset token: {e}")))?;
        let Some((code, expires)) = row else {
            return Ok(None);
        };
        let expires_at = parse_ts(&expires)?;
        if expires_at <= Utc::now() {
            return Ok(None);
        }
        Ok(Some(ResetToken {
            email: email.to_lowercase(),
            code,
            expires_at,
        }))
    }

    /// Consumes the reset token for `email` if `code` matches and the token
    /// has not expired. Single use: a successful consume deletes the row.
    pub fn consume_reset_token(&self, email: &str, code: &str) -> StoreResult<bool> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Storage(format!("failed to begin transaction: {e}")))?;

        let row: Option<(String, String)> = tx
            .query_row(
                "SELECT code, expires_at FROM reset_tokens WHERE email = lower(?1)",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| StoreError::Storage(format!("failed to query reset token: {e}")))?;

        let Some((stored_code, expires)) = row else {
            return Ok(false);
        };
        if parse_ts(&expires)? <= Utc::now() || stored_code != code {
            return Ok(false);
        }

        tx.execute(
            "DELETE FROM reset_tokens WHERE email = lower(?1)",
            params![email],
        )
        .map_err(|e| StoreError::Storage(format!("failed to delete reset token: {e}")))?;
        tx.commit()
            .map_err(|e| StoreError::Storage(format!("failed to commit: {e}")))?;
        debug!(email, "reset token consumed");
        Ok(true)
    }

    /// Creates a session with a fresh opaque token.
    pub fn create_session(&self, user_id: UserId, ttl: Duration) -> StoreResult<Session> {
        let conn = self.connect()?;
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + ttl;
        conn.execute(
            "INSERT INTO sessions (user_id, token, expires_at) VALUES (?1, ?2, ?3)",
            params![user_id.as_i64(), token, fmt_ts(expires_at)],
        )
        .map_err(|e| StoreError::Storage(format!("failed to create session: {e}")))?;
        Ok(Session {
            user_id,
            token,
            expires_at,
        })
    }

    /// Resolves a session token. Expired sessions are reported as absent.
    pub fn session_by_token(&self, token: &str) -> StoreResult<Option<Session>> {
        let conn = self.connect()?;
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT user_id, expires_at FROM sessions WHERE token = ?1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| StoreError::Storage(format!("failed to query session: {e}")))?;
        let Some((user_id, expires)) = row else {
            return Ok(None);
        };
        let expires_at = parse_ts(&expires)?;
        if expires_at <= Utc::now() {
            return Ok(None);
        }
        Ok(Some(Session {
            user_id: UserId::from_raw(user_id),
            token: token.to_string(),
            expires_at,
        }))
    }

    /// Deletes a session by token.
    pub fn delete_session(&self, token: &str) -> StoreResult<()> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .map_err(|e| StoreError::Storage(format!("failed to delete session: {e}")))?;
        Ok(())
    }

    /// Removes every expired session. Returns how many were purged.
    pub fn purge_expired_sessions(&self) -> StoreResult<usize> {
        let conn = self.connect()?;
        let purged = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                params![fmt_ts(Utc::now())],
            )
            .map_err(|e| StoreError::Storage(format!("failed to purge sessions: {e}")))?;
        Ok(purged)
    }
}
