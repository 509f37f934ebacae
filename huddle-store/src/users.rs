//! User account operations.

use crate::error::{map_insert_err, StoreError, StoreResult};
use crate::records::{EnrollmentArtifacts, User, UserId};
use crate::store::{fmt_ts, parse_ts, Store};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

const USER_COLUMNS: &str = "id, email, password_hash, name, company, verified, \
     verification_code, totp_secret, backup_codes, created_at, \
     enrollment_qr, enrollment_secret, enrollment_codes, enrollment_sent_at";

/// Raw row image; converted to [`User`] outside the rusqlite closure so JSON
/// and timestamp parse failures surface as store errors, not row errors.
struct RawUser {
    id: i64,
    email: String,
    password_hash: String,
    name: String,
    company: String,
    verified: bool,
    verification_code: Option<String>,
    totp_secret: Option<String>,
    backup_codes: Option<String>,
    created_at: String,
    enrollment_qr: Option<Vec<u8>>,
    enrollment_secret: Option<String>,
    enrollment_codes: Option<String>,
    enrollment_sent_at: Option<String>,
}

impl RawUser {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            name: row.get(3)?,
            company: row.get(4)?,
            verified: row.get(5)?,
            verification_code: row.get(6)?,
            totp_secret: row.get(7)?,
            backup_codes: row.get(8)?,
            created_at: row.get(9)?,
            enrollment_qr: row.get(10)?,
            enrollment_secret: row.get(11)?,
            enrollment_codes: row.get(12)?,
            enrollment_sent_at: row.get(13)?,
        })
    }

    fn into_user(self) -> StoreResult<User> {
        let backup_codes = match self.backup_codes {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };
        // All four enrollment columns are written together; a partial set
        // means no cached bundle.
        let enrollment = match (
            self.enrollment_qr,
            self.enrollment_secret,
            self.enrollment_codes,
            self.enrollment_sent_at,
        ) {
            (Some(qr_png), Some(secret), Some(codes), Some(sent_at)) => {
                Some(EnrollmentArtifacts {
                    qr_png,
                    secret,
                    codes: serde_json::from_str(&codes)?,
                    sent_at: parse_ts(&sent_at)?,
                })
            }
            _ => None,
        };
        Ok(User {
            id: UserId::from_raw(self.id),
            email: self.email,
            password_hash: self.password_hash,
            name: self.name,
            company: self.company,
            verified: self.verified,
            verification_code: self.verification_code,
            totp_secret: self.totp_secret,
            backup_codes,
            enrollment,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

impl Store {
    /// Creates an unverified user. Duplicate emails (case-insensitive)
    /// surface as [`StoreError::AlreadyExists`].
    pub fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        company: &str,
        verification_code: &str,
    ) -> StoreResult<UserId> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO users (email, password_hash, name, company, verified, verification_code, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
            params![email, password_hash, name, company, verification_code, fmt_ts(Utc::now())],
        )
        .map_err(|e| map_insert_err("user", e))?;
        let id = UserId::from_raw(conn.last_insert_rowid());
        debug!(user_id = %id, "user created");
        Ok(id)
    }

    /// Looks up a user by email, case-insensitively.
    pub fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = self.connect()?;
        let raw = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower(?1)"),
                params![email],
                RawUser::from_row,
            )
            .optional()
            .map_err(|e| StoreError::Storage(format!("failed to query user: {e}")))?;
        raw.map(RawUser::into_user).transpose()
    }

    /// Looks up a user by id.
    pub fn user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let conn = self.connect()?;
        let raw = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.as_i64()],
                RawUser::from_row,
            )
            .optional()
            .map_err(|e| StoreError::Storage(format!("failed to query user: {e}")))?;
        raw.map(RawUser::into_user).transpose()
    }

    /// Flips `verified` and clears the pending code, but only on an exact
    /// code match against an unverified user. Returns whether a row changed.
    pub fn mark_verified(&self, email: &str, code: &str) -> StoreResult<bool> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE users SET verified = 1, verification_code = NULL
                 WHERE lower(email) = lower(?1) AND verified = 0 AND verification_code = ?2",
                params![email, code],
            )
            .map_err(|e| StoreError::Storage(format!("failed to mark verified: {e}")))?;
        Ok(changed == 1)
    }

    /// Replaces the stored password hash. Returns whether a row changed.
    pub fn update_password_hash(&self, email: &str, password_hash: &str) -> StoreResult<bool> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE users SET password_hash = ?2 WHERE lower(email) = lower(?1)",
                params![email, password_hash],
            )
            .map_err(|e| StoreError::Storage(format!("failed to update password: {e}")))?;
        Ok(changed == 1)
    }

    /// Persists second-factor material, overwriting anything already there.
    pub fn set_totp(&self, user_id: UserId, secret: &str, codes: &[String]) -> StoreResult<()> {
        let conn = self.connect()?;
        let json = serde_json::to_string(codes)?;
        let changed = conn
            .execute(
                "UPDATE users SET totp_secret = ?2, backup_codes = ?3 WHERE id = ?1",
                params![user_id.as_i64(), secret, json],
            )
            .map_err(|e| StoreError::Storage(format!("failed to set totp: {e}")))?;
        if changed == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    /// Clears second-factor material.
    pub fn clear_totp(&self, user_id: UserId) -> StoreResult<()> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE users SET totp_secret = NULL, backup_codes = NULL WHERE id = ?1",
                params![user_id.as_i64()],
            )
            .map_err(|e| StoreError::Storage(format!("failed to clear totp: {e}")))?;
        if changed == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    /// Consumes one backup code, case-insensitively, in a single transaction.
    /// Returns true if the code matched and was removed; a miss leaves the
    /// stored set untouched.
    pub fn take_backup_code(&self, user_id: UserId, code: &str) -> StoreResult<bool> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Storage(format!("failed to begin transaction: {e}")))?;

        let stored: Option<Option<String>> = tx
            .query_row(
                "SELECT backup_codes FROM users WHERE id = ?1",
                params![user_id.as_i64()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Storage(format!("failed to read backup codes: {e}")))?;

        let Some(Some(json)) = stored else {
            return Ok(false);
        };
        let mut codes: Vec<String> = serde_json::from_str(&json)?;
        let Some(pos) = codes.iter().position(|c| c.eq_ignore_ascii_case(code)) else {
            return Ok(false);
        };
        codes.remove(pos);

        tx.execute(
            "UPDATE users SET backup_codes = ?2 WHERE id = ?1",
            params![user_id.as_i64(), serde_json::to_string(&codes)?],
        )
        .map_err(|e| StoreError::Storage(format!("failed to remove backup code: {e}")))?;
        tx.commit()
            .map_err(|e| StoreError::Storage(format!("failed to commit: {e}")))?;
        debug!(user_id = %user_id, remaining = codes.len(), "backup code consumed");
        Ok(true)
    }

    /// Caches enrollment artifacts so the UI can re-show the bundle without
    /// regenerating secret or codes.
    pub fn cache_enrollment(
        &self,
        user_id: UserId,
        artifacts: &EnrollmentArtifacts,
    ) -> StoreResult<()> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE users SET enrollment_qr = ?2, enrollment_secret = ?3,
                     enrollment_codes = ?4, enrollment_sent_at = ?5
                 WHERE id = ?1",
                params![
                    user_id.as_i64(),
                    artifacts.qr_png,
                    artifacts.secret,
                    serde_json::to_string(&artifacts.codes)?,
                    fmt_ts(artifacts.sent_at),
                ],
            )
            .map_err(|e| StoreError::Storage(format!("failed to cache enrollment: {e}")))?;
        if changed == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    /// Returns the cached enrollment bundle, if any.
    pub fn enrollment(&self, user_id: UserId) -> StoreResult<Option<EnrollmentArtifacts>> {
        Ok(self.user_by_id(user_id)?.and_then(|u| u.enrollment))
    }

    /// Drops the cached enrollment bundle.
    pub fn clear_enrollment(&self, user_id: UserId) -> StoreResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE users SET enrollment_qr = NULL, enrollment_secret = NULL,
                 enrollment_codes = NULL, enrollment_sent_at = NULL
             WHERE id = ?1",
            params![user_id.as_i64()],
        )
        .map_err(|e| StoreError::Storage(format!("failed to clear enrollment: {e}")))?;
        Ok(())
    }
}
