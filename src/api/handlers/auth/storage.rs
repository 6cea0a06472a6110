//! Database helpers for accounts and the verification ledger.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::Instrument;
use uuid::Uuid;

use super::utils::hash_ledger_token;

/// Outcome when attempting to create a new account.
#[derive(Debug)]
pub(super) enum InsertAccountOutcome {
    Created(Uuid),
    Conflict,
}

/// Outcome of a ledger consumption attempt.
///
/// `Expired` means the entry existed but its expiry had passed; the row
/// is removed either way, so a second attempt reads `NotFound`.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ConsumeOutcome {
    Consumed,
    NotFound,
    Expired,
}

/// Stored account row, password digest included. Strip the digest with
/// `UserResponse::from_record` before anything leaves the API.
#[derive(Debug)]
pub(crate) struct AccountRecord {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) password_hash: String,
    pub(crate) email_verified: bool,
    pub(crate) created_at: OffsetDateTime,
}

fn account_from_row(row: &sqlx::postgres::PgRow) -> AccountRecord {
    AccountRecord {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        email_verified: row.get("email_verified"),
        created_at: row.get("created_at"),
    }
}

pub(crate) async fn lookup_account_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<AccountRecord>> {
    let query = r"
        SELECT id, email, name, password_hash, email_verified, created_at
        FROM accounts
        WHERE email = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by email")?;

    Ok(row.map(|row| account_from_row(&row)))
}

pub(crate) async fn lookup_account_by_id(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Option<AccountRecord>> {
    let query = r"
        SELECT id, email, name, password_hash, email_verified, created_at
        FROM accounts
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by id")?;

    Ok(row.map(|row| account_from_row(&row)))
}

pub(super) async fn insert_account(
    pool: &PgPool,
    email: &str,
    name: &str,
    password_hash: &str,
) -> Result<InsertAccountOutcome> {
    let query = r"
        INSERT INTO accounts (email, name, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(InsertAccountOutcome::Created(row.get("id"))),
        Err(err) if is_unique_violation(&err) => Ok(InsertAccountOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert account"),
    }
}

pub(super) async fn mark_email_verified(pool: &PgPool, account_id: Uuid) -> Result<()> {
    let query = r"
        UPDATE accounts
        SET email_verified = TRUE,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to mark email verified")?;
    Ok(())
}

pub(super) async fn update_password(
    pool: &PgPool,
    account_id: Uuid,
    password_hash: &str,
) -> Result<()> {
    let query = r"
        UPDATE accounts
        SET password_hash = $2,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password")?;
    Ok(())
}

/// Record a lifecycle token in the ledger; only the hash is stored.
pub(super) async fn record_token(
    pool: &PgPool,
    account_id: Uuid,
    token: &str,
    ttl: Duration,
) -> Result<()> {
    let token_hash = hash_ledger_token(token);
    let ttl_seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

    let query = r"
        INSERT INTO verification_tokens (account_id, token_hash, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .bind(token_hash)
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to record verification token")?;
    Ok(())
}

/// Consume a ledger entry with a single atomic find-and-delete.
///
/// Concurrent duplicate submissions race on the `DELETE`; only the one
/// that gets the row back succeeds. An expired entry is removed by the
/// same statement and reported as `Expired`.
pub(super) async fn consume_token(
    pool: &PgPool,
    account_id: Uuid,
    token: &str,
) -> Result<ConsumeOutcome> {
    let token_hash = hash_ledger_token(token);

    let query = r"
        DELETE FROM verification_tokens
        WHERE account_id = $1
          AND token_hash = $2
        RETURNING (expires_at > NOW()) AS valid
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume verification token")?;

    let Some(row) = row else {
        return Ok(ConsumeOutcome::NotFound);
    };

    if row.get::<bool, _>("valid") {
        Ok(ConsumeOutcome::Consumed)
    } else {
        Ok(ConsumeOutcome::Expired)
    }
}

pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{is_unique_violation, ConsumeOutcome, InsertAccountOutcome};
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[test]
    fn insert_outcome_debug_names() {
        assert_eq!(
            format!("{:?}", InsertAccountOutcome::Conflict),
            "Conflict"
        );
    }

    #[test]
    fn consume_outcome_variants_are_distinct() {
        assert_ne!(ConsumeOutcome::Consumed, ConsumeOutcome::NotFound);
        assert_ne!(ConsumeOutcome::NotFound, ConsumeOutcome::Expired);
    }

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }
}
