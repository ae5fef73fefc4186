//! Integration tests for the Postgres store adapter.
//!
//! These run against a real database and are ignored by default; point
//! DATABASE_URL at a scratch Postgres and run with `cargo test -- --ignored`.

use api_lib::adapters::PgStore;
use sqlx::postgres::PgPoolOptions;
use storynest_core::content::Page;
use storynest_core::domain::{
    SortDirection, SortKey, StoryDraft, StoryFilter, StoryPatch,
};
use storynest_core::engagement::Vote;
use storynest_core::ports::{PortError, StoryStore, UserStore};
use uuid::Uuid;

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for these tests");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("failed to connect to Postgres");
    let store = PgStore::new(pool);
    store.run_migrations().await.expect("migrations failed");
    store
}

async fn new_user(store: &PgStore) -> Uuid {
    let suffix = Uuid::new_v4().simple().to_string();
    store
        .create_user(
            &format!("user_{suffix}"),
            &format!("{suffix}@example.com"),
            "not-a-real-hash",
        )
        .await
        .expect("failed to create user")
        .id
}

fn draft(title: &str, pages: Vec<Page>, tags: Vec<&str>) -> StoryDraft {
    StoryDraft {
        title: title.to_string(),
        description: "a test story".to_string(),
        category: "adventure".to_string(),
        age_group: "all".to_string(),
        cover_image: None,
        content: pages,
        is_interactive: true,
        read_time_minutes: 5,
        tags: tags.into_iter().map(str::to_string).collect(),
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn creating_a_story_persists_pages_and_tags_together() {
    let store = store().await;
    let author = new_user(&store).await;

    let pages = vec![
        Page::text("A"),
        Page {
            text: None,
            image: Some("x.png".to_string()),
        },
        Page {
            text: Some("B".to_string()),
            image: Some("y.png".to_string()),
        },
    ];
    let story = store
        .create_story(author, draft("Scenario", pages.clone(), vec!["forest", "bravery"]))
        .await
        .unwrap();

    assert_eq!(story.content, pages);
    assert_eq!(story.tags, vec!["bravery", "forest"]);
    assert_eq!(story.net_score, 0);
    assert_eq!(story.author.id, author);

    // Tags are shared: a second story reusing a name does not duplicate it.
    let second = store
        .create_story(author, draft("Scenario 2", vec![Page::text("C")], vec!["forest"]))
        .await
        .unwrap();
    assert_eq!(second.tags, vec!["forest"]);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn only_the_author_may_update_or_delete() {
    let store = store().await;
    let author = new_user(&store).await;
    let intruder = new_user(&store).await;

    let story = store
        .create_story(author, draft("Owned", vec![Page::text("A")], vec![]))
        .await
        .unwrap();

    let patch = StoryPatch {
        title: Some("Stolen".to_string()),
        ..StoryPatch::default()
    };
    let update = store.update_story(story.id, intruder, patch.clone()).await;
    assert!(matches!(update, Err(PortError::Forbidden(_))));

    let delete = store.delete_story(story.id, intruder).await;
    assert!(matches!(delete, Err(PortError::Forbidden(_))));

    let updated = store.update_story(story.id, author, patch).await.unwrap();
    assert_eq!(updated.title, "Stolen");
    // Unpatched fields are untouched.
    assert_eq!(updated.description, story.description);

    store.delete_story(story.id, author).await.unwrap();
    assert!(matches!(
        store.get_story(story.id).await,
        Err(PortError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn listing_counts_the_filter_before_pagination() {
    let store = store().await;
    let author = new_user(&store).await;

    // A category unique to this run keeps the filter isolated.
    let category = format!("cat-{}", Uuid::new_v4().simple());
    for i in 0..25 {
        let mut d = draft(&format!("Story {i}"), vec![Page::text("A")], vec![]);
        d.category = category.clone();
        store.create_story(author, d).await.unwrap();
    }

    let filter = StoryFilter {
        category: Some(category.clone()),
        ..StoryFilter::default()
    };

    let first = store
        .list_stories(filter.clone(), SortKey::CreatedAt, SortDirection::Desc, 10, 0)
        .await
        .unwrap();
    assert_eq!(first.total, 25);
    assert_eq!(first.stories.len(), 10);

    let tail = store
        .list_stories(filter, SortKey::CreatedAt, SortDirection::Desc, 10, 20)
        .await
        .unwrap();
    assert_eq!(tail.total, 25);
    assert_eq!(tail.stories.len(), 5);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn concurrent_reads_never_lose_an_increment() {
    let store = store().await;
    let author = new_user(&store).await;
    let story = store
        .create_story(author, draft("Counted", vec![Page::text("A")], vec![]))
        .await
        .unwrap();
    let start = story.read_count;

    let store = std::sync::Arc::new(store);
    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let store = store.clone();
            let id = story.id;
            tokio::spawn(async move { store.record_read(id).await })
        })
        .collect();
    for task in futures::future::join_all(tasks).await {
        task.unwrap().unwrap();
    }

    let refreshed = store.get_story(story.id).await.unwrap();
    assert_eq!(refreshed.read_count, start + 50);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn vote_toggles_keep_the_sets_exclusive_and_the_score_derived() {
    let store = store().await;
    let author = new_user(&store).await;
    let alice = new_user(&store).await;
    let bob = new_user(&store).await;

    let story = store
        .create_story(author, draft("Voted", vec![Page::text("A")], vec![]))
        .await
        .unwrap();

    let story = store.apply_vote(story.id, alice, Vote::Like).await.unwrap();
    assert_eq!(story.net_score, 1);

    let story = store.apply_vote(story.id, bob, Vote::Dislike).await.unwrap();
    assert_eq!(story.net_score, 0);

    // Alice switches sides: one like lost, one dislike gained.
    let story = store.apply_vote(story.id, alice, Vote::Dislike).await.unwrap();
    assert_eq!(story.net_score, -2);
    assert!(!story.engagement.liked().contains(&alice));
    assert!(story.engagement.disliked().contains(&alice));

    // Toggling off returns to neutral.
    let story = store.apply_vote(story.id, alice, Vote::Dislike).await.unwrap();
    assert_eq!(story.net_score, -1);
    assert!(!story.engagement.disliked().contains(&alice));

    let unknown_user = Uuid::new_v4();
    assert!(matches!(
        store.apply_vote(story.id, unknown_user, Vote::Like).await,
        Err(PortError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn the_featured_filter_only_returns_flagged_stories() {
    let store = store().await;
    let author = new_user(&store).await;

    let category = format!("cat-{}", Uuid::new_v4().simple());
    let mut ids = Vec::new();
    for i in 0..4 {
        let mut d = draft(&format!("Pick {i}"), vec![Page::text("A")], vec![]);
        d.category = category.clone();
        ids.push(store.create_story(author, d).await.unwrap().id);
    }

    // The flag is curated directly in the database, not through a port.
    let url = std::env::var("DATABASE_URL").unwrap();
    let pool = PgPoolOptions::new().connect(&url).await.unwrap();
    for id in &ids[..2] {
        sqlx::query("UPDATE stories SET featured = TRUE WHERE id = $1")
            .bind(*id)
            .execute(&pool)
            .await
            .unwrap();
    }

    let filter = StoryFilter {
        category: Some(category),
        featured: Some(true),
        ..StoryFilter::default()
    };
    let listing = store
        .list_stories(filter, SortKey::CreatedAt, SortDirection::Desc, 10, 0)
        .await
        .unwrap();
    assert_eq!(listing.total, 2);
    assert_eq!(listing.stories.len(), 2);
    assert!(listing.stories.iter().all(|s| s.featured));
}
