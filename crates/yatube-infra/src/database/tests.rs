use std::collections::BTreeMap;

use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
use uuid::Uuid;

use crate::database::entity::{follow, group, post};
use crate::database::postgres_repo::{
    PostgresFollowRepository, PostgresGroupRepository, PostgresPostRepository,
};
use yatube_core::domain::{Post, PostFeed};
use yatube_core::ports::{BaseRepository, FollowRepository, GroupRepository, PostRepository};

fn post_model(id: Uuid, author_id: Uuid, text: &str) -> post::Model {
    post::Model {
        id,
        text: text.to_owned(),
        pub_date: chrono::Utc::now().into(),
        author_id,
        group_id: None,
        image: None,
    }
}

#[tokio::test]
async fn test_find_post_by_id() {
    let post_id = Uuid::new_v4();
    let author_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![post_model(post_id, author_id, "Test post")]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

    let post = result.unwrap();
    assert_eq!(post.text, "Test post");
    assert_eq!(post.id, post_id);
    assert_eq!(post.author_id, author_id);
}

#[tokio::test]
async fn test_create_post_returns_inserted_row() {
    let author_id = Uuid::new_v4();
    let post = Post::new(author_id, "Created post".to_owned(), None, None);
    let mut model = post_model(post.id, author_id, "Created post");
    model.pub_date = post.pub_date.into();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![model]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let saved = repo.create(post.clone()).await.unwrap();

    assert_eq!(saved, post);
}

#[tokio::test]
async fn test_find_group_by_slug() {
    let group_id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![group::Model {
            id: group_id,
            title: "Test group".to_owned(),
            slug: "test-slug".to_owned(),
            description: "Description".to_owned(),
        }]])
        .into_connection();

    let repo = PostgresGroupRepository::new(db);

    let group = repo.find_by_slug("test-slug").await.unwrap().unwrap();
    assert_eq!(group.id, group_id);
    assert_eq!(group.title, "Test group");
}

#[tokio::test]
async fn test_feed_count_reads_aggregate() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![BTreeMap::from([(
            "num_items",
            Value::BigInt(Some(13)),
        )])]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let count = repo.count(PostFeed::FollowedBy(Uuid::new_v4())).await.unwrap();
    assert_eq!(count, 13);
}

#[tokio::test]
async fn test_follow_existing_edge_is_noop() {
    let user_id = Uuid::new_v4();
    let author_id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![follow::Model {
            id: Uuid::new_v4(),
            user_id,
            author_id,
        }]])
        .into_connection();

    let repo = PostgresFollowRepository::new(db);

    assert!(!repo.follow(user_id, author_id).await.unwrap());
}

#[tokio::test]
async fn test_unfollow_reports_removed_edge() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results(vec![
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
        ])
        .into_connection();

    let repo = PostgresFollowRepository::new(db);
    let (user_id, author_id) = (Uuid::new_v4(), Uuid::new_v4());

    assert!(repo.unfollow(user_id, author_id).await.unwrap());
    assert!(!repo.unfollow(user_id, author_id).await.unwrap());
}
