//! PostgreSQL-backed `store_upsert` adapter and persistence coordinator.
//!
//! Writes go through a per-`(app, kind, slug)` advisory lock taken for the
//! duration of the upsert transaction: if two workflows produce the same
//! slug concurrently, the race is resolved by having the loser fail to
//! acquire the lock rather than racing on the unique constraint. Existence
//! checks stay lock-free.

mod error;

use async_trait::async_trait;
use tokio_postgres::{Client, NoTls};
use uuid::Uuid;

use questflow_core::ports::{StorePort, StoreUpsertOutcome, StoreUpsertRequest, StoreUpsertResponse};
use questflow_core::Result;

pub use error::Error;

/// Validate a PostgreSQL identifier (table name). Identifiers must start
/// with a letter or underscore and contain only letters, digits, and
/// underscores, guarding the one place a table name is interpolated
/// directly into SQL rather than passed as a bound parameter.
fn validate_identifier(name: &str) -> error::Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidIdentifier("identifier cannot be empty".to_string()));
    }
    if name.len() > 63 {
        return Err(Error::InvalidIdentifier(format!(
            "identifier '{name}' exceeds maximum length of 63 characters"
        )));
    }
    let mut chars = name.chars();
    let first = chars.next().expect("non-empty checked above");
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(Error::InvalidIdentifier(format!(
            "identifier '{name}' must start with a letter or underscore"
        )));
    }
    for c in chars {
        if !c.is_ascii_alphanumeric() && c != '_' {
            return Err(Error::InvalidIdentifier(format!(
                "identifier '{name}' contains invalid character '{c}'"
            )));
        }
    }
    Ok(())
}

/// PostgreSQL-backed store, holding the main `(article|company)` record
/// table.
pub struct PostgresStore {
    client: Client,
    table_name: String,
}

impl PostgresStore {
    /// Connect using the default table name.
    pub async fn connect(connection_string: &str) -> error::Result<Self> {
        Self::with_table_name(connection_string, "questflow_records").await
    }

    /// Connect using a custom table name.
    pub async fn with_table_name(connection_string: &str, table_name: &str) -> error::Result<Self> {
        validate_identifier(table_name)?;

        let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgres connection error");
            }
        });

        let store = Self { client, table_name: table_name.to_string() };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> error::Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                app TEXT NOT NULL,
                slug TEXT NOT NULL,
                payload JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (app, kind, slug)
            );
            CREATE INDEX IF NOT EXISTS {table}_app_kind_slug_idx ON {table} (app, kind, slug);",
            table = self.table_name
        );
        self.client.batch_execute(&sql).await?;
        Ok(())
    }

    fn lock_key(app: &str, kind: &str, slug: &str) -> String {
        format!("{app}:{kind}:{slug}")
    }
}

#[async_trait]
impl StorePort for PostgresStore {
    async fn upsert(&self, request: StoreUpsertRequest) -> Result<StoreUpsertResponse> {
        let StoreUpsertRequest { kind, slug, app, payload } = request;
        let lock_key = Self::lock_key(&app, &kind, &slug);

        tracing::debug!(%kind, %app, %slug, "acquiring advisory lock for upsert");

        let txn = self
            .client
            .build_transaction()
            .start()
            .await
            .map_err(Error::Postgres)
            .map_err(questflow_core::QuestError::from)?;

        let lock_row = txn
            .query_one(
                "SELECT pg_try_advisory_xact_lock(hashtext($1)::bigint) AS locked",
                &[&lock_key],
            )
            .await
            .map_err(Error::Postgres)
            .map_err(questflow_core::QuestError::from)?;
        let locked: bool = lock_row.get("locked");

        if !locked {
            let existing_id = self.find_id(&txn, &kind, &app, &slug).await?;
            let _ = txn.rollback().await;
            tracing::info!(%kind, %app, %slug, "lost advisory lock race, reporting conflict");
            return Ok(StoreUpsertResponse {
                id: existing_id.unwrap_or_default(),
                outcome: StoreUpsertOutcome::Conflict,
            });
        }

        let existing_id = self.find_id(&txn, &kind, &app, &slug).await?;

        let (id, outcome) = match existing_id {
            Some(id) => {
                let sql = format!(
                    "UPDATE {table} SET payload = $1, updated_at = now() WHERE id = $2",
                    table = self.table_name
                );
                txn.execute(&sql, &[&payload, &id])
                    .await
                    .map_err(Error::Postgres)
                    .map_err(questflow_core::QuestError::from)?;
                (id, StoreUpsertOutcome::Updated)
            }
            None => {
                let id = Uuid::new_v4().to_string();
                let sql = format!(
                    "INSERT INTO {table} (id, kind, app, slug, payload) VALUES ($1, $2, $3, $4, $5)",
                    table = self.table_name
                );
                match txn.execute(&sql, &[&id, &kind, &app, &slug, &payload]).await {
                    Ok(_) => (id, StoreUpsertOutcome::Created),
                    Err(e) => {
                        let _ = txn.rollback().await;
                        return match Error::from_postgres_upsert(e) {
                            error::SlugAwareError::Conflict => Ok(StoreUpsertResponse {
                                id: String::new(),
                                outcome: StoreUpsertOutcome::Conflict,
                            }),
                            error::SlugAwareError::Other(err) => {
                                Err(questflow_core::QuestError::from(err))
                            }
                        };
                    }
                }
            }
        };

        txn.commit().await.map_err(Error::Postgres).map_err(questflow_core::QuestError::from)?;

        tracing::info!(%kind, %app, %slug, ?outcome, "store upsert committed");
        Ok(StoreUpsertResponse { id, outcome })
    }

    async fn delete_by_slug(&self, kind: &str, app: &str, slug: &str) -> Result<()> {
        let sql = format!(
            "DELETE FROM {table} WHERE kind = $1 AND app = $2 AND slug = $3",
            table = self.table_name
        );
        tracing::warn!(%kind, %app, %slug, "issuing compensating delete");
        self.client
            .execute(&sql, &[&kind, &app, &slug])
            .await
            .map_err(Error::Postgres)
            .map_err(questflow_core::QuestError::from)?;
        Ok(())
    }

    async fn exists(&self, kind: &str, app: &str, slug: &str) -> Result<bool> {
        let sql = format!(
            "SELECT 1 FROM {table} WHERE kind = $1 AND app = $2 AND slug = $3 LIMIT 1",
            table = self.table_name
        );
        let row = self
            .client
            .query_opt(&sql, &[&kind, &app, &slug])
            .await
            .map_err(Error::Postgres)
            .map_err(questflow_core::QuestError::from)?;
        Ok(row.is_some())
    }
}

impl PostgresStore {
    async fn find_id(
        &self,
        txn: &tokio_postgres::Transaction<'_>,
        kind: &str,
        app: &str,
        slug: &str,
    ) -> Result<Option<String>> {
        let sql = format!(
            "SELECT id FROM {table} WHERE kind = $1 AND app = $2 AND slug = $3",
            table = self.table_name
        );
        let row = txn
            .query_opt(&sql, &[&kind, &app, &slug])
            .await
            .map_err(Error::Postgres)
            .map_err(questflow_core::QuestError::from)?;
        Ok(row.map(|r| r.get::<_, String>("id")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_name_rejects_sql_injection_attempt() {
        let err = validate_identifier("records; DROP TABLE users;--").unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier(_)));
    }

    #[test]
    fn table_name_rejects_empty() {
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn table_name_accepts_valid_identifier() {
        assert!(validate_identifier("questflow_records").is_ok());
        assert!(validate_identifier("_private_table").is_ok());
    }

    #[test]
    fn lock_key_is_scoped_to_app_kind_and_slug() {
        let a = PostgresStore::lock_key("relocation", "article", "digital-nomad-visa-greece");
        let b = PostgresStore::lock_key("relocation", "company", "digital-nomad-visa-greece");
        assert_ne!(a, b);
    }
}
