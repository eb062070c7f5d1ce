mod common;

use std::sync::Arc;

use common::{executor_with, Comment, Post, COMMENTS_DDL, POSTS, POSTS_DDL};
use spork_core::{Attributes, ColumnValues, Direction, Schema, SqlValue};
use spork_orm::{
    ColumnScope, DbRow, Enhancer, Executor, HasMany, HasOne, Model, OrmError, Record, Result,
};

async fn raw_count(executor: &Executor, sql: &str) -> i64 {
    let row = executor.first_row(sql, Vec::new()).await.unwrap().unwrap();
    row.get("n").unwrap()
}

async fn create(executor: &Executor, title: &str) -> Record<Post> {
    let mut post = Record::new(Post::titled(title));
    post.save(executor).await.unwrap();
    post
}

/// Posts scoped to tenant 7.
#[derive(Debug, Clone, Default)]
struct TenantPost(Post);

impl Attributes for TenantPost {
    fn attributes(&self) -> ColumnValues {
        self.0.attributes()
    }
}

impl Model for TenantPost {
    fn schema() -> &'static Schema {
        &POSTS
    }

    fn from_row(row: &DbRow) -> Result<Self> {
        Post::from_row(row).map(Self)
    }

    fn set_attribute(&mut self, column: &str, value: SqlValue) -> Result<()> {
        self.0.set_attribute(column, value)
    }

    fn enhancers() -> Vec<Arc<dyn Enhancer>> {
        vec![Arc::new(ColumnScope::new("tenant", "tenant_id", 7))]
    }
}

#[tokio::test]
async fn test_save_inserts_and_assigns_key() {
    let (executor, _) = executor_with(&[POSTS_DDL]).await;

    let mut post = Record::new(Post::titled("hello"));
    assert!(!post.exists());
    assert!(post.save(&executor).await.unwrap());

    assert!(post.exists());
    assert_eq!(post.model().id, 1);
    assert!(post.model().created_at.is_some());
    assert_eq!(post.model().created_at, post.model().updated_at);
    assert!(!post.is_dirty());

    let stored = Post::query().find(&executor, 1).await.unwrap().unwrap();
    assert_eq!(stored.model().title, "hello");
    assert_eq!(stored.model().views, Some(0));
    assert_eq!(stored.model().tenant_id, Some(0));
}

#[tokio::test]
async fn test_clean_record_is_not_written() {
    let (executor, source) = executor_with(&[POSTS_DDL]).await;
    let mut post = create(&executor, "hello").await;
    let before = source.acquired();

    assert!(!post.save(&executor).await.unwrap());
    assert_eq!(source.acquired(), before);
}

#[tokio::test]
async fn test_update_writes_only_dirty_columns() {
    let (executor, _) = executor_with(&[POSTS_DDL]).await;
    create(&executor, "hello").await;

    let mut post = Post::query().find(&executor, 1).await.unwrap().unwrap();
    executor
        .raw_execute("UPDATE posts SET views = 5 WHERE id = 1", Vec::new())
        .await
        .unwrap();

    post.model_mut().title = "edited".to_string();
    assert_eq!(post.dirty_columns(), vec!["title"]);
    assert!(post.save(&executor).await.unwrap());
    assert!(!post.is_dirty());

    let stored = Post::query().find(&executor, 1).await.unwrap().unwrap();
    assert_eq!(stored.model().title, "edited");
    assert_eq!(stored.model().views, Some(5));
    assert!(stored.model().updated_at >= stored.model().created_at);
}

#[tokio::test]
async fn test_delete_soft_deletes_record() {
    let (executor, _) = executor_with(&[POSTS_DDL]).await;
    let mut post = create(&executor, "hello").await;
    create(&executor, "other").await;

    assert!(post.delete(&executor).await.unwrap());
    assert!(post.is_trashed());
    assert_eq!(raw_count(&executor, "SELECT COUNT(*) AS n FROM posts").await, 2);

    assert_eq!(Post::query().get(&executor).await.unwrap().len(), 1);
    assert!(Post::query().find(&executor, 1).await.unwrap().is_none());
    assert_eq!(Post::query().with_trashed().get(&executor).await.unwrap().len(), 2);

    let trashed = Post::query().only_trashed().unwrap().get(&executor).await.unwrap();
    assert_eq!(trashed.len(), 1);
    assert_eq!(trashed[0].model().title, "hello");
    assert!(trashed[0].is_trashed());
}

#[tokio::test]
async fn test_restore_clears_deleted_at() {
    let (executor, _) = executor_with(&[POSTS_DDL]).await;
    let mut post = create(&executor, "hello").await;
    post.delete(&executor).await.unwrap();

    assert!(post.restore(&executor).await.unwrap());
    assert!(!post.is_trashed());
    assert!(Post::query().find(&executor, 1).await.unwrap().is_some());
}

#[tokio::test]
async fn test_force_delete_removes_row() {
    let (executor, _) = executor_with(&[POSTS_DDL]).await;
    let mut post = create(&executor, "hello").await;
    post.delete(&executor).await.unwrap();

    assert!(post.force_delete(&executor).await.unwrap());
    assert!(!post.exists());
    assert_eq!(raw_count(&executor, "SELECT COUNT(*) AS n FROM posts").await, 0);
}

#[tokio::test]
async fn test_bulk_delete_becomes_update() {
    let (executor, _) = executor_with(&[POSTS_DDL]).await;
    for title in ["a", "b", "c"] {
        create(&executor, title).await;
    }

    let affected = Post::query()
        .filter(|q| q.where_in("title", ["a", "b"]))
        .delete(&executor)
        .await
        .unwrap();
    assert_eq!(affected, 2);

    assert_eq!(raw_count(&executor, "SELECT COUNT(*) AS n FROM posts").await, 3);
    assert_eq!(
        raw_count(&executor, "SELECT COUNT(*) AS n FROM posts WHERE deleted_at IS NOT NULL").await,
        2
    );

    let restored = Post::query().restore(&executor).await.unwrap();
    assert_eq!(restored, 2);
    assert_eq!(Post::query().get(&executor).await.unwrap().len(), 3);

    let removed = Post::query()
        .with_trashed()
        .filter(|q| q.where_eq("title", "c"))
        .delete(&executor)
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(raw_count(&executor, "SELECT COUNT(*) AS n FROM posts").await, 2);
}

#[tokio::test]
async fn test_bulk_update_touches_updated_at() {
    let (executor, _) = executor_with(&[POSTS_DDL]).await;
    let post = create(&executor, "a").await;
    let created = post.model().updated_at;

    let affected = Post::query()
        .filter(|q| q.where_eq("title", "a"))
        .update(&executor, ColumnValues::new().with("views", 9))
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let stored = Post::query().first(&executor).await.unwrap().unwrap();
    assert_eq!(stored.model().views, Some(9));
    assert!(stored.model().updated_at >= created);
}

#[tokio::test]
async fn test_first_honors_ordering() {
    let (executor, _) = executor_with(&[POSTS_DDL]).await;
    for title in ["a", "b", "c"] {
        create(&executor, title).await;
    }

    let last = Post::query()
        .filter(|q| q.order_by("id", Direction::Desc))
        .first(&executor)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last.model().title, "c");
    assert!(Post::query()
        .filter(|q| q.where_eq("title", "c"))
        .exists(&executor)
        .await
        .unwrap());
}

#[test]
fn test_try_filter_rejects_unknown_operator() {
    let err = Post::query()
        .try_filter(|q| q.where_op("title", "LIKE'", "x"))
        .unwrap_err();
    assert!(matches!(err, OrmError::Query(_)));
}

#[tokio::test]
async fn test_column_scope_isolates_tenant() {
    let (executor, _) = executor_with(&[POSTS_DDL]).await;
    create(&executor, "public").await;

    let mut mine = Record::new(TenantPost(Post::titled("mine")));
    mine.save(&executor).await.unwrap();
    assert_eq!(mine.model().0.tenant_id, Some(7));

    let scoped = TenantPost::query().get(&executor).await.unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].model().0.title, "mine");

    let affected = TenantPost::query()
        .update(&executor, ColumnValues::new().with("views", 3))
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let deleted = TenantPost::query().delete(&executor).await.unwrap();
    assert_eq!(deleted, 1);

    let visible = Post::query().get(&executor).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].model().title, "public");
    assert_eq!(visible[0].model().views, Some(0));
}

#[tokio::test]
async fn test_skipping_scope_sees_every_tenant() {
    let (executor, _) = executor_with(&[POSTS_DDL]).await;
    create(&executor, "public").await;
    Record::new(TenantPost(Post::titled("mine")))
        .save(&executor)
        .await
        .unwrap();

    let all = TenantPost::query()
        .without_enhancer("tenant")
        .get(&executor)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn test_restore_requires_soft_deletes() {
    static PLAIN: Schema = Schema::new("plain", &[]);

    #[derive(Debug, Default)]
    struct Plain;

    impl Attributes for Plain {
        fn attributes(&self) -> ColumnValues {
            ColumnValues::new()
        }
    }

    impl Model for Plain {
        fn schema() -> &'static Schema {
            &PLAIN
        }

        fn from_row(_row: &DbRow) -> Result<Self> {
            Ok(Self)
        }

        fn set_attribute(&mut self, column: &str, _value: SqlValue) -> Result<()> {
            Err(OrmError::UnknownAttribute {
                table: "plain",
                column: column.to_string(),
            })
        }
    }

    assert!(matches!(
        Plain::query().only_trashed(),
        Err(OrmError::NotSoftDeleting("plain"))
    ));
}

#[tokio::test]
async fn test_failed_soft_delete_leaves_record_untouched() {
    let (executor, _) = executor_with(&[POSTS_DDL]).await;
    let mut post = create(&executor, "hello").await;
    executor.raw_execute("DROP TABLE posts", Vec::new()).await.unwrap();

    let err = post.delete(&executor).await.unwrap_err();
    assert!(matches!(err, OrmError::Database(_)));
    assert!(!post.is_trashed());
    assert!(!post.is_dirty());
    assert!(post.exists());
}

#[tokio::test]
async fn test_failed_restore_keeps_deleted_at() {
    let (executor, _) = executor_with(&[POSTS_DDL]).await;
    let mut post = create(&executor, "hello").await;
    post.delete(&executor).await.unwrap();
    executor.raw_execute("DROP TABLE posts", Vec::new()).await.unwrap();

    assert!(post.restore(&executor).await.is_err());
    assert!(post.is_trashed());
    assert!(!post.is_dirty());
}

#[tokio::test]
async fn test_failed_create_discards_enhancer_values() {
    let (executor, _) = executor_with(&[]).await;
    let mut post = Record::new(Post::titled("hello"));

    assert!(post.save(&executor).await.is_err());
    assert!(!post.exists());
    assert_eq!(post.model().created_at, None);
    assert_eq!(post.model().updated_at, None);
    assert_eq!(post.model().id, 0);
}

async fn comment(executor: &Executor, post_id: i64, body: &str) -> Record<Comment> {
    let mut comment = Record::new(Comment::on(post_id, body));
    comment.save(executor).await.unwrap();
    comment
}

#[tokio::test]
async fn test_has_many_loads_and_caches_children() {
    let (executor, source) = executor_with(&[POSTS_DDL, COMMENTS_DDL]).await;
    let post = create(&executor, "hello").await;
    let other = create(&executor, "other").await;
    comment(&executor, post.model().id, "first").await;
    comment(&executor, other.model().id, "elsewhere").await;
    comment(&executor, post.model().id, "second").await;

    let mut comments = HasMany::<Comment>::new("id", "post_id");
    assert!(!comments.is_loaded());
    let bodies: Vec<String> = comments
        .get(&executor, post.model())
        .await
        .unwrap()
        .iter()
        .map(|c| c.model().body.clone())
        .collect();
    assert_eq!(bodies, vec!["first", "second"]);
    assert!(comments.is_loaded());

    comment(&executor, post.model().id, "third").await;
    let before = source.acquired();
    assert_eq!(comments.get(&executor, post.model()).await.unwrap().len(), 2);
    assert_eq!(source.acquired(), before);

    comments.reset();
    assert_eq!(comments.get(&executor, post.model()).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_has_one_loads_parent() {
    let (executor, _) = executor_with(&[POSTS_DDL, COMMENTS_DDL]).await;
    let post = create(&executor, "hello").await;
    let reply = comment(&executor, post.model().id, "first").await;

    let mut parent = HasOne::<Post>::new("post_id", "id");
    let loaded = parent.get(&executor, reply.model()).await.unwrap().unwrap();
    assert_eq!(loaded.model().title, "hello");
    assert!(loaded.exists());
}

#[tokio::test]
async fn test_has_one_respects_soft_deletes() {
    let (executor, _) = executor_with(&[POSTS_DDL, COMMENTS_DDL]).await;
    let mut post = create(&executor, "hello").await;
    let reply = comment(&executor, post.model().id, "first").await;
    post.delete(&executor).await.unwrap();

    let mut parent = HasOne::<Post>::new("post_id", "id");
    assert!(parent.get(&executor, reply.model()).await.unwrap().is_none());
    assert!(parent.is_loaded());
}

#[tokio::test]
async fn test_null_parent_key_loads_nothing() {
    let (executor, source) = executor_with(&[POSTS_DDL, COMMENTS_DDL]).await;
    let orphan = Comment {
        post_id: None,
        ..Comment::default()
    };

    let mut parent = HasOne::<Post>::new("post_id", "id");
    assert!(parent.get(&executor, &orphan).await.unwrap().is_none());
    assert_eq!(source.acquired(), 0);
}

#[test]
fn test_relation_requires_parent_key() {
    let relation = HasMany::<Comment>::new("uuid", "post_id");
    let err = relation.query(&Post::titled("hello")).unwrap_err();
    assert!(matches!(err, OrmError::MissingColumn(column) if column == "uuid"));
}
