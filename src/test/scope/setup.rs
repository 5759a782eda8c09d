use super::*;

/// Tests the full lifecycle of one test against the blog definition.
///
/// Verifies that the records reached through the accessors carry the declared attributes,
/// the association to the admin user and the stubbed time, and that the rows inserted at
/// setup are visible inside the test's transaction.
///
/// Expected: Ok with matching records and rows
#[tokio::test]
async fn materializes_declared_blog() -> Result<(), StubError> {
    let mut test = TestBuilder::new().with_blog_tables().build().await.unwrap();
    let registry = blog_registry();
    let mut scope = TestScope::bind(&registry, "blog")?.with_database(test.connection().await.unwrap());

    scope.setup().await?;

    let admin = scope.get("users", "admin", &Attributes::new())?;
    let post = scope.get("posts", "default", &Attributes::new())?;
    assert_eq!(admin.text("name"), Some("bob"));
    assert_eq!(admin.bool("admin"), Some(true));
    assert_eq!(post.association("user"), Some(&admin));
    assert_eq!(
        post.time("published_at"),
        Some(scope.current_time() + Duration::days(5))
    );

    let txn = scope.transaction().unwrap();
    let row = Post::find_by_id(post.id().unwrap()).one(txn).await?.unwrap();
    assert_eq!(row.user_id, admin.id());
    assert_eq!(User::find().count(txn).await?, 2);

    scope.teardown().await?;
    Ok(())
}

/// Tests that a scope inserts its definition only on the first setup.
///
/// A row written between tests survives the second setup, which it would not if the
/// models were purged and inserted again.
///
/// Expected: Ok with the extra row still present
#[tokio::test]
async fn inserts_once_per_scope() -> Result<(), StubError> {
    let mut test = TestBuilder::new().with_blog_tables().build().await.unwrap();
    let db = test.connection().await.unwrap();
    let registry = blog_registry();
    let mut scope = TestScope::bind(&registry, "blog")?.with_database(db.clone());

    scope.setup().await?;
    assert!(scope.is_inserted());
    let extra = scope.new_record_dup("user", "default", &attrs! { "name" => "extra" })?;
    scope.teardown().await?;

    db.insert_row("user", extra.row()).await?;
    scope.setup().await?;

    let txn = scope.transaction().unwrap();
    assert_eq!(User::find().count(txn).await?, 3);

    scope.teardown().await?;
    Ok(())
}

/// Tests a definition that opts out of inserting.
///
/// Expected: Ok with records materialized in memory and empty tables
#[tokio::test]
async fn skips_insert_when_disabled() -> Result<(), StubError> {
    let mut test = TestBuilder::new().with_blog_tables().build().await.unwrap();
    let mut registry = Registry::new();
    registry.define("blog", |d| {
        d.options_mut().insert = false;
        fixture::declare_blog(d)
    })?;
    let mut scope = TestScope::bind(&registry, "blog")?.with_database(test.connection().await.unwrap());

    scope.setup().await?;

    let admin = scope.get("users", "admin", &Attributes::new())?;
    assert!(admin.id().is_some());
    assert!(!scope.is_inserted());
    assert_eq!(User::find().count(scope.transaction().unwrap()).await?, 0);

    scope.teardown().await?;
    Ok(())
}

/// Tests that setup surfaces bulk insert failures.
///
/// Expected: Err(StubError::DbErr) and the scope stays bound
#[tokio::test]
async fn reports_insert_failures() -> Result<(), StubError> {
    let mut test = TestBuilder::new().with_table(User).build().await.unwrap();
    let registry = blog_registry();
    let mut scope = TestScope::bind(&registry, "blog")?.with_database(test.connection().await.unwrap());

    let result = scope.setup().await;

    assert!(matches!(result, Err(StubError::DbErr(_))));
    assert!(!scope.is_inserted());
    assert!(scope.transaction().is_none());
    Ok(())
}
