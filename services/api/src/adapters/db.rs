//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `StoryStore` and `UserStore` ports from the `core` crate. It handles all
//! interactions with the PostgreSQL database using `sqlx`.
//!
//! Every mutating operation runs inside a single transaction: read the current
//! state, apply the pure core logic, write the delta, commit. Mutual exclusion
//! is delegated entirely to the transaction boundary; nothing here retries a
//! failed commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use storynest_core::content::{deserialize_pages, serialize_pages};
use storynest_core::domain::{
    Author, SortDirection, SortKey, Story, StoryDraft, StoryFilter, StoryListing, StoryPatch,
    User, UserCredentials,
};
use storynest_core::engagement::{Engagement, Vote};
use storynest_core::ports::{PortError, PortResult, StoryStore, UserStore};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `StoryStore` and `UserStore` ports.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct StoryRow {
    id: Uuid,
    title: String,
    description: String,
    category: String,
    age_group: String,
    cover_image: Option<String>,
    content: String,
    is_interactive: bool,
    featured: bool,
    read_time_minutes: i32,
    read_count: i64,
    net_score: i64,
    author_id: Uuid,
    author_username: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StoryRow {
    fn to_domain(
        self,
        tags: Vec<String>,
        engagement: Engagement,
    ) -> PortResult<Story> {
        // A malformed persisted blob is surfaced, never silently repaired.
        let content = deserialize_pages(&self.content)?;
        Ok(Story {
            id: self.id,
            title: self.title,
            description: self.description,
            category: self.category,
            age_group: self.age_group,
            cover_image: self.cover_image,
            content,
            is_interactive: self.is_interactive,
            featured: self.featured,
            read_time_minutes: self.read_time_minutes,
            read_count: self.read_count,
            net_score: self.net_score,
            author: Author {
                id: self.author_id,
                username: self.author_username,
            },
            tags,
            engagement,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
}

impl UserRow {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct UserCredentialsRow {
    id: Uuid,
    username: String,
    email: String,
    hashed_password: String,
}

impl UserCredentialsRow {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            id: self.id,
            username: self.username,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

//=========================================================================================
// Shared Query Helpers
//=========================================================================================

const STORY_SELECT: &str = "SELECT s.id, s.title, s.description, s.category, s.age_group, \
     s.cover_image, s.content, s.is_interactive, s.featured, s.read_time_minutes, s.read_count, \
     s.net_score, s.author_id, u.username AS author_username, s.created_at, s.updated_at \
     FROM stories s JOIN users u ON u.id = s.author_id";

/// Loads one fully-assembled story (row, tag names, membership sets).
async fn fetch_story(conn: &mut PgConnection, story_id: Uuid) -> PortResult<Story> {
    let row = sqlx::query_as::<_, StoryRow>(&format!("{STORY_SELECT} WHERE s.id = $1"))
        .bind(story_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Story {} not found", story_id)))?;

    assemble_story(conn, row).await
}

async fn assemble_story(conn: &mut PgConnection, row: StoryRow) -> PortResult<Story> {
    let tags: Vec<String> = sqlx::query_scalar(
        "SELECT t.name FROM tags t \
         JOIN story_tags st ON st.tag_id = t.id \
         WHERE st.story_id = $1 ORDER BY t.name",
    )
    .bind(row.id)
    .fetch_all(&mut *conn)
    .await
    .map_err(unexpected)?;

    let engagement = load_engagement(conn, row.id).await?;
    row.to_domain(tags, engagement)
}

async fn load_engagement(conn: &mut PgConnection, story_id: Uuid) -> PortResult<Engagement> {
    let liked: Vec<Uuid> =
        sqlx::query_scalar("SELECT user_id FROM story_likes WHERE story_id = $1")
            .bind(story_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(unexpected)?;
    let disliked: Vec<Uuid> =
        sqlx::query_scalar("SELECT user_id FROM story_dislikes WHERE story_id = $1")
            .bind(story_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(unexpected)?;

    Engagement::from_members(liked, disliked).map_err(|e| PortError::Unexpected(e.to_string()))
}

/// Locks the story row and returns its author id, or `NotFound`.
async fn lock_story_author(conn: &mut PgConnection, story_id: Uuid) -> PortResult<Uuid> {
    sqlx::query_scalar::<_, Uuid>("SELECT author_id FROM stories WHERE id = $1 FOR UPDATE")
        .bind(story_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Story {} not found", story_id)))
}

fn require_author(story_id: Uuid, author_id: Uuid, caller_id: Uuid) -> PortResult<()> {
    if author_id != caller_id {
        return Err(PortError::Forbidden(format!(
            "User {} is not the author of story {}",
            caller_id, story_id
        )));
    }
    Ok(())
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &StoryFilter) {
    if let Some(category) = &filter.category {
        builder.push(" AND s.category = ").push_bind(category.clone());
    }
    if let Some(age_group) = &filter.age_group {
        builder.push(" AND s.age_group = ").push_bind(age_group.clone());
    }
    if let Some(featured) = filter.featured {
        builder.push(" AND s.featured = ").push_bind(featured);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        builder
            .push(" AND (s.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR s.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn order_clause(sort_key: SortKey, direction: SortDirection) -> &'static str {
    match (sort_key, direction) {
        (SortKey::CreatedAt, SortDirection::Asc) => " ORDER BY s.created_at ASC",
        (SortKey::CreatedAt, SortDirection::Desc) => " ORDER BY s.created_at DESC",
        (SortKey::NetScore, SortDirection::Asc) => " ORDER BY s.net_score ASC",
        (SortKey::NetScore, SortDirection::Desc) => " ORDER BY s.net_score DESC",
        (SortKey::ReadCount, SortDirection::Asc) => " ORDER BY s.read_count ASC",
        (SortKey::ReadCount, SortDirection::Desc) => " ORDER BY s.read_count DESC",
    }
}

//=========================================================================================
// `StoryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl StoryStore for PgStore {
    async fn create_story(&self, author_id: Uuid, draft: StoryDraft) -> PortResult<Story> {
        if draft.title.trim().is_empty() {
            return Err(PortError::InvalidInput("title must not be empty".to_string()));
        }
        if draft.category.trim().is_empty() {
            return Err(PortError::InvalidInput("category must not be empty".to_string()));
        }

        let story_id = Uuid::new_v4();
        let content = serialize_pages(&draft.content);

        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let inserted = sqlx::query(
            "INSERT INTO stories (id, title, description, category, age_group, cover_image, \
             content, is_interactive, read_time_minutes, author_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(story_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.category)
        .bind(&draft.age_group)
        .bind(&draft.cover_image)
        .bind(&content)
        .bind(draft.is_interactive)
        .bind(draft.read_time_minutes)
        .bind(author_id)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if e.as_database_error().is_some_and(|d| d.is_foreign_key_violation()) => {
                return Err(PortError::NotFound(format!("User {} not found", author_id)));
            }
            Err(e) => return Err(unexpected(e)),
        }

        // Resolve tag names to ids, creating unseen tags lazily. All of this
        // commits together with the story insert or not at all.
        let mut seen = Vec::new();
        for name in &draft.tags {
            let name = name.trim();
            if name.is_empty() || seen.iter().any(|s| s == name) {
                continue;
            }
            seen.push(name.to_string());

            sqlx::query("INSERT INTO tags (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
                .bind(Uuid::new_v4())
                .bind(name)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
            let tag_id: Uuid = sqlx::query_scalar("SELECT id FROM tags WHERE name = $1")
                .bind(name)
                .fetch_one(&mut *tx)
                .await
                .map_err(unexpected)?;
            sqlx::query("INSERT INTO story_tags (story_id, tag_id) VALUES ($1, $2)")
                .bind(story_id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }

        let story = fetch_story(&mut *tx, story_id).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(story)
    }

    async fn get_story(&self, story_id: Uuid) -> PortResult<Story> {
        let mut conn = self.pool.acquire().await.map_err(unexpected)?;
        fetch_story(&mut conn, story_id).await
    }

    async fn update_story(
        &self,
        story_id: Uuid,
        author_id: Uuid,
        patch: StoryPatch,
    ) -> PortResult<Story> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let owner = lock_story_author(&mut *tx, story_id).await?;
        require_author(story_id, owner, author_id)?;

        if !patch.is_empty() {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("UPDATE stories SET updated_at = now()");
            if let Some(title) = patch.title {
                builder.push(", title = ").push_bind(title);
            }
            if let Some(description) = patch.description {
                builder.push(", description = ").push_bind(description);
            }
            if let Some(category) = patch.category {
                builder.push(", category = ").push_bind(category);
            }
            if let Some(age_group) = patch.age_group {
                builder.push(", age_group = ").push_bind(age_group);
            }
            if let Some(cover_image) = patch.cover_image {
                builder.push(", cover_image = ").push_bind(cover_image);
            }
            if let Some(is_interactive) = patch.is_interactive {
                builder.push(", is_interactive = ").push_bind(is_interactive);
            }
            if let Some(read_time_minutes) = patch.read_time_minutes {
                builder.push(", read_time_minutes = ").push_bind(read_time_minutes);
            }
            builder.push(" WHERE id = ").push_bind(story_id);
            builder.build().execute(&mut *tx).await.map_err(unexpected)?;
        }

        let story = fetch_story(&mut *tx, story_id).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(story)
    }

    async fn delete_story(&self, story_id: Uuid, author_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let owner = lock_story_author(&mut *tx, story_id).await?;
        require_author(story_id, owner, author_id)?;

        // Join rows cascade through the foreign keys.
        sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(story_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn list_stories(
        &self,
        filter: StoryFilter,
        sort_key: SortKey,
        direction: SortDirection,
        limit: i64,
        offset: i64,
    ) -> PortResult<StoryListing> {
        let mut conn = self.pool.acquire().await.map_err(unexpected)?;

        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM stories s WHERE TRUE");
        push_filter(&mut count_builder, &filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&mut *conn)
            .await
            .map_err(unexpected)?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("{STORY_SELECT} WHERE TRUE"));
        push_filter(&mut builder, &filter);
        builder.push(order_clause(sort_key, direction));
        builder.push(" LIMIT ").push_bind(limit);
        builder.push(" OFFSET ").push_bind(offset);

        let rows: Vec<StoryRow> = builder
            .build_query_as()
            .fetch_all(&mut *conn)
            .await
            .map_err(unexpected)?;

        let mut stories = Vec::with_capacity(rows.len());
        for row in rows {
            stories.push(assemble_story(&mut conn, row).await?);
        }

        Ok(StoryListing { total, stories })
    }

    async fn record_read(&self, story_id: Uuid) -> PortResult<Story> {
        let mut conn = self.pool.acquire().await.map_err(unexpected)?;

        // A single atomic read-modify-write; concurrent reads serialize at the
        // row and never lose an increment.
        let updated = sqlx::query("UPDATE stories SET read_count = read_count + 1 WHERE id = $1")
            .bind(story_id)
            .execute(&mut *conn)
            .await
            .map_err(unexpected)?;
        if updated.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Story {} not found", story_id)));
        }

        fetch_story(&mut conn, story_id).await
    }

    async fn apply_vote(&self, story_id: Uuid, user_id: Uuid, vote: Vote) -> PortResult<Story> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Lock the story row so two toggles by different users serialize and
        // both see the membership sets they are about to change.
        lock_story_author(&mut *tx, story_id).await?;

        let user_exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?;
        if user_exists.is_none() {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }

        let mut engagement = load_engagement(&mut *tx, story_id).await?;
        let change = engagement.apply(user_id, vote);

        if change.like_removed() {
            sqlx::query("DELETE FROM story_likes WHERE story_id = $1 AND user_id = $2")
                .bind(story_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }
        if change.dislike_removed() {
            sqlx::query("DELETE FROM story_dislikes WHERE story_id = $1 AND user_id = $2")
                .bind(story_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }
        if change.like_added() {
            sqlx::query("INSERT INTO story_likes (story_id, user_id) VALUES ($1, $2)")
                .bind(story_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }
        if change.dislike_added() {
            sqlx::query("INSERT INTO story_dislikes (story_id, user_id) VALUES ($1, $2)")
                .bind(story_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }

        // The score is always the recomputed set difference, never a counter
        // nudged up or down.
        sqlx::query("UPDATE stories SET net_score = $1 WHERE id = $2")
            .bind(engagement.net_score())
            .bind(story_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let story = fetch_story(&mut *tx, story_id).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(story)
    }

    async fn set_cover_image(
        &self,
        story_id: Uuid,
        author_id: Uuid,
        image_path: &str,
    ) -> PortResult<Story> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let owner = lock_story_author(&mut *tx, story_id).await?;
        require_author(story_id, owner, author_id)?;

        sqlx::query("UPDATE stories SET cover_image = $1, updated_at = now() WHERE id = $2")
            .bind(image_path)
            .bind(story_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let story = fetch_story(&mut *tx, story_id).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(story)
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, username, email, hashed_password) \
             VALUES ($1, $2, $3, $4) RETURNING id, username, email",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                PortError::InvalidInput("username or email already registered".to_string())
            }
            _ => unexpected(e),
        })?;

        Ok(row.to_domain())
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let row = sqlx::query_as::<_, UserCredentialsRow>(
            "SELECT id, username, email, hashed_password FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))?;

        Ok(row.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
