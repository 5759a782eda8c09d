use super::*;

/// Tests bulk inserting the blog definition.
///
/// Verifies that every stub of every model is written with its assigned id, the
/// association's foreign key and the stubbed time.
///
/// Expected: Ok with two users, three tags and two posts
#[tokio::test]
async fn inserts_every_stub() -> Result<(), StubError> {
    let test = TestBuilder::new().with_blog_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();
    let registry = Registry::new();
    let definition = fixture::blog();

    definition.insert(&registry, db).await?;

    assert_eq!(User::find().count(db).await?, 2);
    assert_eq!(Tag::find().count(db).await?, 3);
    assert_eq!(Post::find().count(db).await?, 2);

    let mx = definition.materializer(&registry);
    let admin = mx.resolve(&StubRef::new("users", "admin"))?;
    let post = mx.resolve(&StubRef::new("posts", "default"))?;
    let row = Post::find_by_id(post.id().unwrap()).one(db).await?.unwrap();

    assert_eq!(row.title, "initial");
    assert_eq!(row.user_id, admin.id());
    assert_eq!(
        row.published_at,
        Some(Utc.with_ymd_and_hms(2007, 6, 6, 0, 0, 0).unwrap())
    );
    assert_eq!(post.decode::<entity::post::Model>()?, row);

    Ok(())
}

/// Tests inserting the same definition twice.
///
/// Verifies that each model's table is purged before its stubs are written again, so the
/// ids assigned on the first run do not collide.
///
/// Expected: Ok with unchanged row counts
#[tokio::test]
async fn purges_before_inserting_again() -> Result<(), StubError> {
    let test = TestBuilder::new().with_blog_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();
    let registry = Registry::new();
    let definition = fixture::blog();

    definition.insert(&registry, db).await?;
    registry.clear_records();
    definition.insert(&registry, db).await?;

    assert_eq!(User::find().count(db).await?, 2);
    assert_eq!(Post::find().count(db).await?, 2);

    Ok(())
}

/// Tests bulk insert when a later model fails validation.
///
/// Verifies that the whole transaction is rolled back, including rows of models that were
/// inserted before the failing one.
///
/// Expected: Err(StubError::Validation) and no rows
#[tokio::test]
async fn rolls_back_every_model_on_failure() -> Result<(), StubError> {
    let test = TestBuilder::new().with_blog_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();
    let registry = Registry::new();
    let mut definition = Definition::new();
    fixture::declare_users(&mut definition)?;
    definition.model(
        Backing::of(Tag).validate(|_| vec!["tags are closed".to_string()]),
        ModelOptions::default(),
        |m| {
            m.default_stub(attrs! { "name" => "ruby" })?;
            Ok(())
        },
    )?;

    let result = definition.insert(&registry, db).await;

    assert!(matches!(result, Err(StubError::Validation(_))));
    assert_eq!(User::find().count(db).await?, 0);
    assert_eq!(Tag::find().count(db).await?, 0);

    Ok(())
}

/// Tests bulk insert with a storage failure.
///
/// Verifies that a row the database rejects aborts the insert and rolls it back.
///
/// Expected: Err(StubError::DbErr) and no rows
#[tokio::test]
async fn rolls_back_on_database_errors() -> Result<(), StubError> {
    let test = TestBuilder::new().with_table(User).build().await.unwrap();
    let db = test.db.as_ref().unwrap();
    let registry = Registry::new();
    let mut definition = Definition::new();
    fixture::declare_users(&mut definition)?;
    definition.model(Backing::new("Comment"), ModelOptions::default(), |m| {
        m.default_stub(attrs! { "body" => "first" })?;
        Ok(())
    })?;

    let result = definition.insert(&registry, db).await;

    assert!(matches!(result, Err(StubError::DbErr(_))));
    assert_eq!(User::find().count(db).await?, 0);

    Ok(())
}
