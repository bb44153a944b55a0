use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::entities::messages;
use crate::db::types::MessageRole;

pub struct Repo {
    db: DatabaseConnection,
}

impl Repo {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn ping(&self) -> Result<()> {
        self.db.ping().await.context("Database ping failed")
    }

    // ==================== Messages ====================

    /// Append one entry to an owner's conversation log
    pub async fn insert_message(
        &self,
        owner_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<messages::Model> {
        // UTC so the ordering column never runs backwards across DST changes
        let now = Utc::now().naive_utc();

        let new_message = messages::ActiveModel {
            owner_id: Set(owner_id.to_string()),
            role: Set(role),
            content: Set(content.to_string()),
            created_at: Set(now),
            ..Default::default()
        };

        new_message
            .insert(&self.db)
            .await
            .context("Failed to save message")
    }

    /// Full conversation of an owner, oldest first
    pub async fn list_messages(&self, owner_id: &str) -> Result<Vec<messages::Model>> {
        messages::Entity::find()
            .filter(messages::Column::OwnerId.eq(owner_id))
            .order_by_asc(messages::Column::CreatedAt)
            .order_by_asc(messages::Column::Id)
            .all(&self.db)
            .await
            .context("Failed to list messages")
    }

    /// Delete the given messages, ignoring ids that belong to another owner
    pub async fn delete_messages(&self, owner_id: &str, ids: &[i32]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = messages::Entity::delete_many()
            .filter(messages::Column::OwnerId.eq(owner_id))
            .filter(messages::Column::Id.is_in(ids.iter().copied()))
            .exec(&self.db)
            .await
            .context("Failed to delete messages")?;

        Ok(result.rows_affected)
    }

    pub async fn clear_messages(&self, owner_id: &str) -> Result<u64> {
        let result = messages::Entity::delete_many()
            .filter(messages::Column::OwnerId.eq(owner_id))
            .exec(&self.db)
            .await
            .context("Failed to clear messages")?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, Database, DbBackend, Statement};
    use sea_orm_migration::MigratorTrait;

    pub(crate) async fn setup_test_db() -> Result<Repo> {
        // Create an in-memory SQLite database for testing
        let db = Database::connect("sqlite::memory:").await?;

        db.execute(Statement::from_string(
            DbBackend::Sqlite,
            r#"
            CREATE TABLE messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                owner_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        ))
        .await?;

        Ok(Repo::new(db))
    }

    #[tokio::test]
    async fn test_insert_message_assigns_id_and_timestamp() {
        let repo = setup_test_db().await.unwrap();

        let first = repo
            .insert_message("user-1", MessageRole::User, "Hello")
            .await
            .unwrap();
        let second = repo
            .insert_message("user-1", MessageRole::Assistant, "Hi there")
            .await
            .unwrap();

        assert!(second.id > first.id);
        assert_eq!(first.owner_id, "user-1");
        assert_eq!(first.role, MessageRole::User);
        assert_eq!(second.role, MessageRole::Assistant);
        assert_eq!(second.content, "Hi there");
        assert!(second.created_at >= first.created_at);
    }

    #[tokio::test]
    async fn test_list_messages_scoped_and_ordered() {
        let repo = setup_test_db().await.unwrap();

        repo.insert_message("alice", MessageRole::User, "one")
            .await
            .unwrap();
        repo.insert_message("bob", MessageRole::User, "other")
            .await
            .unwrap();
        repo.insert_message("alice", MessageRole::Assistant, "two")
            .await
            .unwrap();
        repo.insert_message("alice", MessageRole::User, "three")
            .await
            .unwrap();

        let alice = repo.list_messages("alice").await.unwrap();
        let contents: Vec<_> = alice.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);

        let bob = repo.list_messages("bob").await.unwrap();
        assert_eq!(bob.len(), 1);

        assert!(repo.list_messages("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_input_creates_distinct_records() {
        let repo = setup_test_db().await.unwrap();

        let a = repo
            .insert_message("alice", MessageRole::User, "same")
            .await
            .unwrap();
        let b = repo
            .insert_message("alice", MessageRole::User, "same")
            .await
            .unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(repo.list_messages("alice").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_messages_only_touches_owner() {
        let repo = setup_test_db().await.unwrap();

        let a1 = repo
            .insert_message("alice", MessageRole::User, "a1")
            .await
            .unwrap();
        let a2 = repo
            .insert_message("alice", MessageRole::Assistant, "a2")
            .await
            .unwrap();
        let b1 = repo
            .insert_message("bob", MessageRole::User, "b1")
            .await
            .unwrap();

        // bob's id is listed but must survive
        let deleted = repo
            .delete_messages("alice", &[a1.id, b1.id])
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let alice = repo.list_messages("alice").await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].id, a2.id);
        assert_eq!(repo.list_messages("bob").await.unwrap().len(), 1);

        assert_eq!(repo.delete_messages("alice", &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_messages() {
        let repo = setup_test_db().await.unwrap();

        repo.insert_message("alice", MessageRole::User, "a")
            .await
            .unwrap();
        repo.insert_message("alice", MessageRole::Assistant, "b")
            .await
            .unwrap();
        repo.insert_message("bob", MessageRole::User, "c")
            .await
            .unwrap();

        assert_eq!(repo.clear_messages("alice").await.unwrap(), 2);
        assert!(repo.list_messages("alice").await.unwrap().is_empty());
        assert_eq!(repo.list_messages("bob").await.unwrap().len(), 1);
        assert_eq!(repo.clear_messages("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ping() {
        let repo = setup_test_db().await.unwrap();
        assert!(repo.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_migrated_schema() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();

        let index = db
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                "SELECT name FROM sqlite_master WHERE type = 'index' AND name = 'idx_messages_owner_created'",
            ))
            .await
            .unwrap();
        assert!(index.is_some());

        let repo = Repo::new(db);
        let user = repo
            .insert_message("alice", MessageRole::User, "Hello")
            .await
            .unwrap();
        let assistant = repo
            .insert_message("alice", MessageRole::Assistant, "Hi there")
            .await
            .unwrap();

        let listed = repo.list_messages("alice").await.unwrap();
        assert_eq!(listed, vec![user, assistant]);
    }
}
