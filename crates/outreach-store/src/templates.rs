use chrono::Utc;
use rusqlite::{OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use outreach_core::store::{LookupError, TemplateStore};

use crate::database::Database;
use crate::error::StoreError;

const MAX_PROMPT_CHARS: usize = 20_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRow {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub prompt_template: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TemplateRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            name: row.get(2)?,
            prompt_template: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

const COLUMNS: &str = "id, owner, name, prompt_template, created_at, updated_at";

/// Owner-scoped CRUD over `email_templates`.
#[derive(Clone)]
pub struct TemplateRepo {
    db: Database,
}

impl TemplateRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, prompt_template))]
    pub fn create(&self, owner: &str, name: &str, prompt_template: &str) -> Result<TemplateRow, StoreError> {
        validate(owner, name, prompt_template)?;
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO email_templates (owner, name, prompt_template, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![owner, name.trim(), prompt_template, now],
            )?;
            Ok(TemplateRow {
                id: conn.last_insert_rowid(),
                owner: owner.to_string(),
                name: name.trim().to_string(),
                prompt_template: prompt_template.to_string(),
                created_at: now.clone(),
                updated_at: now,
            })
        })
    }

    /// Fetch a template only if it belongs to `owner`.
    #[instrument(skip(self))]
    pub fn get(&self, id: i64, owner: &str) -> Result<Option<TemplateRow>, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM email_templates WHERE id = ?1 AND owner = ?2"),
                    rusqlite::params![id, owner],
                    TemplateRow::from_row,
                )
                .optional()?)
        })
    }

    #[instrument(skip(self))]
    pub fn list_for_owner(&self, owner: &str) -> Result<Vec<TemplateRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM email_templates WHERE owner = ?1 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map([owner], TemplateRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    #[instrument(skip(self, prompt_template))]
    pub fn update_prompt(&self, id: i64, owner: &str, prompt_template: &str) -> Result<(), StoreError> {
        validate(owner, "-", prompt_template)?;
        let changed = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE email_templates SET prompt_template = ?1, updated_at = ?2
                 WHERE id = ?3 AND owner = ?4",
                rusqlite::params![prompt_template, Utc::now().to_rfc3339(), id, owner],
            )?)
        })?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("template {id} for {owner}")));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn delete(&self, id: i64, owner: &str) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM email_templates WHERE id = ?1 AND owner = ?2",
                rusqlite::params![id, owner],
            )?;
            Ok(removed > 0)
        })
    }
}

fn validate(owner: &str, name: &str, prompt_template: &str) -> Result<(), StoreError> {
    if owner.trim().is_empty() {
        return Err(StoreError::Invalid("owner is required".into()));
    }
    if name.trim().is_empty() {
        return Err(StoreError::Invalid("name is required".into()));
    }
    if prompt_template.trim().is_empty() {
        return Err(StoreError::Invalid("prompt is empty".into()));
    }
    if prompt_template.chars().count() > MAX_PROMPT_CHARS {
        return Err(StoreError::Invalid(format!(
            "prompt exceeds {MAX_PROMPT_CHARS} characters"
        )));
    }
    Ok(())
}

impl TemplateStore for TemplateRepo {
    fn fetch_prompt(&self, template_id: i64, owner: &str) -> Result<Option<String>, LookupError> {
        match self.get(template_id, owner) {
            Ok(row) => Ok(row.map(|r| r.prompt_template)),
            Err(e) => {
                warn!(template_id, owner, error = %e, "template lookup failed");
                Err(LookupError::Unavailable(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> TemplateRepo {
        TemplateRepo::new(Database::in_memory().unwrap())
    }

    #[test]
    fn create_and_get() {
        let repo = repo();
        let row = repo.create("alice", " Sepsis intro ", "Write to {stakeholder_name}").unwrap();
        assert!(row.id > 0);
        assert_eq!(row.name, "Sepsis intro");

        let fetched = repo.get(row.id, "alice").unwrap().unwrap();
        assert_eq!(fetched, row);
    }

    #[test]
    fn get_is_owner_scoped() {
        let repo = repo();
        let row = repo.create("alice", "a", "prompt").unwrap();
        assert!(repo.get(row.id, "bob").unwrap().is_none());
        assert!(repo.get(row.id + 100, "alice").unwrap().is_none());
    }

    #[test]
    fn list_only_owner_rows() {
        let repo = repo();
        repo.create("alice", "one", "p1").unwrap();
        repo.create("bob", "two", "p2").unwrap();
        repo.create("alice", "three", "p3").unwrap();
        let names: Vec<_> = repo
            .list_for_owner("alice")
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["one", "three"]);
    }

    #[test]
    fn update_prompt_respects_owner() {
        let repo = repo();
        let row = repo.create("alice", "t", "old").unwrap();
        assert!(matches!(
            repo.update_prompt(row.id, "bob", "new"),
            Err(StoreError::NotFound(_))
        ));
        repo.update_prompt(row.id, "alice", "new").unwrap();
        assert_eq!(repo.get(row.id, "alice").unwrap().unwrap().prompt_template, "new");
    }

    #[test]
    fn delete_respects_owner() {
        let repo = repo();
        let row = repo.create("alice", "t", "p").unwrap();
        assert!(!repo.delete(row.id, "bob").unwrap());
        assert!(repo.delete(row.id, "alice").unwrap());
        assert!(repo.get(row.id, "alice").unwrap().is_none());
    }

    #[test]
    fn rejects_empty_fields() {
        let repo = repo();
        assert!(matches!(repo.create("", "n", "p"), Err(StoreError::Invalid(_))));
        assert!(matches!(repo.create("o", " ", "p"), Err(StoreError::Invalid(_))));
        assert!(matches!(repo.create("o", "n", "\n"), Err(StoreError::Invalid(_))));
    }

    #[test]
    fn implements_template_store() {
        let repo = repo();
        let row = repo.create("alice", "t", "stored prompt").unwrap();
        let store: &dyn TemplateStore = &repo;
        assert_eq!(store.fetch_prompt(row.id, "alice").unwrap().as_deref(), Some("stored prompt"));
        assert!(store.fetch_prompt(row.id, "mallory").unwrap().is_none());
    }
}
