//! Trial activations, license applications, active licenses, and migrations.

use crate::error::{map_insert_err, StoreError, StoreResult};
use crate::records::{
    ActiveLicense, LicenseApplication, LicenseMigration, LicenseTier, NewLicense, ReviewStatus,
    TrialActivation, TrialState, UserId,
};
use crate::store::{fmt_ts, parse_ts, Store};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

struct RawTrial {
    machine_id: String,
    user_id: Option<i64>,
    activated_at: String,
    expires_at: String,
    state: String,
}

impl RawTrial {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            machine_id: row.get(0)?,
            user_id: row.get(1)?,
            activated_at: row.get(2)?,
            expires_at: row.get(3)?,
            state: row.get(4)?,
        })
    }

    fn into_trial(self) -> StoreResult<TrialActivation> {
        Ok(TrialActivation {
            machine_id: self.machine_id,
            user_id: self.user_id.map(UserId::from_raw),
            activated_at: parse_ts(&self.activated_at)?,
            expires_at: parse_ts(&self.expires_at)?,
            state: TrialState::parse(&self.state),
        })
    }
}

impl Store {
    // ── Trials ───────────────────────────────────────────────────

    /// Inserts a trial activation. A second activation for the same machine
    /// surfaces as [`StoreError::AlreadyExists`].
    pub fn insert_trial(
        &self,
        machine_id: &str,
        user_id: Option<UserId>,
        activated_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO trial_activations (machine_id, user_id, activated_at, expires_at, state)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                machine_id,
                user_id.map(|u| u.as_i64()),
                fmt_ts(activated_at),
                fmt_ts(expires_at),
                TrialState::Active.as_str(),
            ],
        )
        .map_err(|e| map_insert_err("trial activation", e))?;
        debug!(machine_id, "trial activated");
        Ok(())
    }

    /// Returns the trial row for a machine, if any.
    pub fn trial(&self, machine_id: &str) -> StoreResult<Option<TrialActivation>> {
        let conn = self.connect()?;
        let raw = conn
            .query_row(
                "SELECT machine_id, user_id, activated_at, expires_at, state
                 FROM trial_activations WHERE machine_id = ?1",
                params![machine_id],
                RawTrial::from_row,
            )
            .optional()
            .map_err(|e| StoreError::Storage(format!("failed to query trial: {e}")))?;
        raw.map(RawTrial::into_trial).transpose()
    }

    /// Updates the persisted trial state. The expiry timestamp never moves.
    pub fn set_trial_state(&self, machine_id: &str, state: TrialState) -> StoreResult<()> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE trial_activations SET state = ?2 WHERE machine_id = ?1",
                params![machine_id, state.as_str()],
            )
            .map_err(|e| StoreError::Storage(format!("failed to update trial state: {e}")))?;
        if changed == 0 {
            return Err(StoreError::NotFound("trial activation"));
        }
        Ok(())
    }

    // ── License applications ─────────────────────────────────────

    /// Inserts a pending license application and returns its id.
    pub fn insert_application(
        &self,
        user_id: UserId,
        machine_id: &str,
        tier: LicenseTier,
    ) -> StoreResult<i64> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO license_applications (user_id, machine_id, tier, status, requested_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id.as_i64(),
                machine_id,
                tier.as_str(),
                ReviewStatus::Pending.as_str(),
                fmt_ts(Utc::now()),
            ],
        )
        .map_err(|e| map_insert_err("license application", e))?;
        Ok(conn.last_insert_rowid())
    }

    /// Lists a user's applications, newest first.
    pub fn applications_for_user(&self, user_id: UserId) -> StoreResult<Vec<LicenseApplication>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, machine_id, tier, status, requested_at,
                        is_migrated, migrated_to, migration_reason
                 FROM license_applications WHERE user_id = ?1 ORDER BY id DESC",
            )
            .map_err(|e| StoreError::Storage(format!("failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map(params![user_id.as_i64()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, bool>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                ))
            })
            .map_err(|e| StoreError::Storage(format!("failed to query applications: {e}")))?;

        let mut result = Vec::new();
        for row in rows {
            let (id, uid, machine_id, tier, status, requested_at, is_migrated, migrated_to, reason) =
                row.map_err(|e| StoreError::Storage(format!("failed to read row: {e}")))?;
            result.push(LicenseApplication {
                id,
                user_id: UserId::from_raw(uid),
                machine_id,
                tier: LicenseTier::parse(&tier),
                status: ReviewStatus::parse(&status),
                requested_at: parse_ts(&requested_at)?,
                is_migrated,
                migrated_to,
                migration_reason: reason,
            });
        }
        Ok(result)
    }

    /// Records migration lineage on an application.
    pub fn mark_application_migrated(
        &self,
        application_id: i64,
        migrated_to: &str,
        reason: &str,
    ) -> StoreResult<()> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE license_applications
                 SET is_migrated = 1, migrated_to = ?2, migration_reason = ?3
                 WHERE id = ?1",
                params![application_id, migrated_to, reason],
            )
            .map_err(|e| StoreError::Storage(format!("failed to mark migrated: {e}")))?;
        if changed == 0 {
            return Err(StoreError::NotFound("license application"));
        }
        Ok(())
    }

    // ── Active licenses ──────────────────────────────────────────

    /// Inserts an active license. Duplicate keys surface as
    /// [`StoreError::AlreadyExists`].
    pub fn insert_license(&self, license: &NewLicense) -> StoreResult<i64> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO active_licenses
                 (license_key, key_hash, machine_id, tier, activated_at, expires_at,
                  validation_count, active, application_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 1, ?7)",
            params![
                license.license_key,
                license.key_hash,
                license.machine_id,
                license.tier.as_str(),
                fmt_ts(Utc::now()),
                license.expires_at.map(fmt_ts),
                license.application_id,
            ],
        )
        .map_err(|e| map_insert_err("license", e))?;
        Ok(conn.last_insert_rowid())
    }

    /// Lists a user's licenses via the application back-reference.
    pub fn licenses_for_user(&self, user_id: UserId) -> StoreResult<Vec<ActiveLicense>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT l.id, l.license_key, l.key_hash, l.machine_id, l.tier,
                        l.activated_at, l.expires_at, l.validation_count, l.active,
                        l.application_id
                 FROM active_licenses l
                 JOIN license_applications a ON l.application_id = a.id
                 WHERE a.user_id = ?1
                 ORDER BY l.id DESC",
            )
            .map_err(|e| StoreError::Storage(format!("failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map(params![user_id.as_i64()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, bool>(8)?,
                    row.get::<_, Option<i64>>(9)?,
                ))
            })
            .map_err(|e| StoreError::Storage(format!("failed to query licenses: {e}")))?;

        let mut result = Vec::new();
        for row in rows {
            let (id, key, hash, machine_id, tier, activated, expires, count, active, app_id) =
                row.map_err(|e| StoreError::Storage(format!("failed to read row: {e}")))?;
            result.push(ActiveLicense {
                id,
                license_key: key,
                key_hash: hash,
                machine_id,
                tier: LicenseTier::parse(&tier),
                activated_at: parse_ts(&activated)?,
                expires_at: expires.as_deref().map(parse_ts).transpose()?,
                validation_count: count,
                active,
                application_id: app_id,
            });
        }
        Ok(result)
    }

    /// Bumps the validation counter for an active license.
    pub fn record_validation(&self, license_key: &str) -> StoreResult<()> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE active_licenses SET validation_count = validation_count + 1
                 WHERE license_key = ?1 AND active = 1",
                params![license_key],
            )
            .map_err(|e| StoreError::Storage(format!("failed to record validation: {e}")))?;
        if changed == 0 {
            return Err(StoreError::NotFound("license"));
        }
        Ok(())
    }

    // ── License migrations ───────────────────────────────────────

    /// Inserts a pending migration request and returns its id.
    pub fn insert_migration(
        &self,
        old_key: &str,
        old_machine_id: &str,
        new_machine_id: &str,
        reason: &str,
    ) -> StoreResult<i64> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO license_migrations
                 (old_key, old_machine_id, new_machine_id, reason, status, requested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                old_key,
                old_machine_id,
                new_machine_id,
                reason,
                ReviewStatus::Pending.as_str(),
                fmt_ts(Utc::now()),
            ],
        )
        .map_err(|e| map_insert_err("license migration", e))?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns a migration by id.
    pub fn migration(&self, id: i64) -> StoreResult<Option<LicenseMigration>> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT id, old_key, old_machine_id, new_machine_id, reason, status,
                        requested_at, new_key, new_application_id
                 FROM license_migrations WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, Option<i64>>(8)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| StoreError::Storage(format!("failed to query migration: {e}")))?;

        let Some((id, old_key, old_machine, new_machine, reason, status, at, new_key, new_app)) =
            row
        else {
            return Ok(None);
        };
        Ok(Some(LicenseMigration {
            id,
            old_key,
            old_machine_id: old_machine,
            new_machine_id: new_machine,
            reason,
            status: ReviewStatus::parse(&status),
            requested_at: parse_ts(&at)?,
            new_key,
            new_application_id: new_app,
        }))
    }

    /// Records the administrative outcome of a migration.
    pub fn set_migration_outcome(
        &self,
        id: i64,
        status: ReviewStatus,
        new_key: Option<&str>,
        new_application_id: Option<i64>,
    ) -> StoreResult<()> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE license_migrations
                 SET status = ?2, new_key = ?3, new_application_id = ?4
                 WHERE id = ?1",
                params![id, status.as_str(), new_key, new_application_id],
            )
            .map_err(|e| StoreError::Storage(format!("failed to update migration: {e}")))?;
        if changed == 0 {
            return Err(StoreError::NotFound("license migration"));
        }
        Ok(())
    }
}
