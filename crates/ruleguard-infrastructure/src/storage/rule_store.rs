//! SQLite-backed durable rule catalog (C1).

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use ruleguard_domain::entities::Rule;
use ruleguard_domain::error::{Error, Result};
use ruleguard_domain::ports::{RuleFilter, RuleStore};

/// A single-writer SQLite-backed [`RuleStore`].
///
/// Each mutating call runs inside its own transaction so it either fully
/// commits or fully rolls back; `List` tolerates and skips individually
/// corrupt rows rather than failing the whole call.
pub struct SqliteRuleStore {
    pool: SqlitePool,
}

impl SqliteRuleStore {
    /// Open (creating if absent) the SQLite database at `path` and run
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the connection or migration fails.
    pub async fn open(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Open an in-memory database, primarily for tests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the connection or migration fails.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().filename(":memory:").create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS rules (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                description TEXT NOT NULL,
                severity    TEXT NOT NULL,
                tags        TEXT NOT NULL,
                expression  TEXT NOT NULL,
                enabled     INTEGER NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                version     INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_rule(row: &sqlx::sqlite::SqliteRow) -> Option<Rule> {
        let tags_json: String = row.try_get("tags").ok()?;
        let tags: Vec<String> = serde_json::from_str(&tags_json).ok()?;
        let created_at: String = row.try_get("created_at").ok()?;
        let updated_at: String = row.try_get("updated_at").ok()?;
        Some(Rule {
            id: row.try_get("id").ok()?,
            name: row.try_get("name").ok()?,
            description: row.try_get("description").ok()?,
            severity: row.try_get("severity").ok()?,
            tags,
            expression: row.try_get("expression").ok()?,
            enabled: row.try_get::<i64, _>("enabled").ok()? != 0,
            created_at: created_at.parse().ok()?,
            updated_at: updated_at.parse().ok()?,
            version: u64::try_from(row.try_get::<i64, _>("version").ok()?).ok()?,
        })
    }
}

#[async_trait]
impl RuleStore for SqliteRuleStore {
    async fn create(&self, rule: &Rule) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM rules WHERE id = ?")
            .bind(&rule.id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(Error::already_exists(rule.id.clone()));
        }
        let tags_json = serde_json::to_string(&rule.tags).map_err(|e| Error::internal(e.to_string()))?;
        sqlx::query(
            r"
            INSERT INTO rules (id, name, description, severity, tags, expression, enabled, created_at, updated_at, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&rule.id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(&rule.severity)
        .bind(tags_json)
        .bind(&rule.expression)
        .bind(i64::from(rule.enabled))
        .bind(rule.created_at.to_rfc3339())
        .bind(rule.updated_at.to_rfc3339())
        .bind(i64::try_from(rule.version).map_err(|e| Error::internal(e.to_string()))?)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, rule: &Rule) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let tags_json = serde_json::to_string(&rule.tags).map_err(|e| Error::internal(e.to_string()))?;
        let result = sqlx::query(
            r"
            UPDATE rules
            SET name = ?, description = ?, severity = ?, tags = ?, expression = ?,
                enabled = ?, updated_at = ?, version = ?
            WHERE id = ?
            ",
        )
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(&rule.severity)
        .bind(tags_json)
        .bind(&rule.expression)
        .bind(i64::from(rule.enabled))
        .bind(rule.updated_at.to_rfc3339())
        .bind(i64::try_from(rule.version).map_err(|e| Error::internal(e.to_string()))?)
        .bind(&rule.id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("rule:{}", rule.id)));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM rules WHERE id = ?").bind(id).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("rule:{id}")));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Rule> {
        let row = sqlx::query("SELECT * FROM rules WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let row = row.ok_or_else(|| Error::not_found(format!("rule:{id}")))?;
        Self::row_to_rule(&row).ok_or_else(|| Error::internal(format!("rule {id} row failed to deserialize")))
    }

    async fn list(&self, filter: &RuleFilter) -> Result<Vec<Rule>> {
        let rows = sqlx::query("SELECT * FROM rules").fetch_all(&self.pool).await?;
        let mut rules = Vec::with_capacity(rows.len());
        for row in &rows {
            match Self::row_to_rule(row) {
                Some(rule) => rules.push(rule),
                None => tracing::warn!("skipping rule row that failed to deserialize"),
            }
        }
        Ok(rules
            .into_iter()
            .filter(|rule| rule.matches_filter(filter.enabled_only, filter.severity.as_deref(), &filter.tags))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruleguard_domain::entities::NewRule;

    fn new_rule(name: &str) -> Rule {
        Rule::new(NewRule {
            name: name.to_owned(),
            description: "desc".to_owned(),
            expression: "span.duration > 1".to_owned(),
            enabled: true,
            severity: "warning".to_owned(),
            tags: vec!["latency".to_owned()],
        })
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = SqliteRuleStore::open_in_memory().await.unwrap();
        let rule = new_rule("r1");
        store.create(&rule).await.unwrap();
        let fetched = store.get("r1").await.unwrap();
        assert_eq!(fetched.id, "r1");
        assert_eq!(fetched.tags, vec!["latency".to_owned()]);
    }

    #[tokio::test]
    async fn create_duplicate_id_fails() {
        let store = SqliteRuleStore::open_in_memory().await.unwrap();
        store.create(&new_rule("r1")).await.unwrap();
        let err = store.create(&new_rule("r1")).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn update_unknown_rule_fails_and_nothing_persists() {
        let store = SqliteRuleStore::open_in_memory().await.unwrap();
        let rule = new_rule("r1");
        let err = store.update(&rule).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(store.get("r1").await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let store = SqliteRuleStore::open_in_memory().await.unwrap();
        store.create(&new_rule("r1")).await.unwrap();
        store.delete("r1").await.unwrap();
        assert!(store.get("r1").await.is_err());
    }

    #[tokio::test]
    async fn list_applies_enabled_only_filter() {
        let store = SqliteRuleStore::open_in_memory().await.unwrap();
        let mut disabled = new_rule("r2");
        disabled.enabled = false;
        store.create(&new_rule("r1")).await.unwrap();
        store.create(&disabled).await.unwrap();
        let filter = RuleFilter {
            enabled_only: true,
            severity: None,
            tags: vec![],
        };
        let rules = store.list(&filter).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, "r1");
    }
}
