use super::*;

/// Tests that teardown rolls back what a test wrote.
///
/// Expected: Ok with only the rows inserted at setup left
#[tokio::test]
async fn rolls_back_test_writes() -> Result<(), StubError> {
    let mut test = TestBuilder::new().with_blog_tables().build().await.unwrap();
    let db = test.connection().await.unwrap();
    let registry = blog_registry();
    let mut scope = TestScope::bind(&registry, "blog")?.with_database(db.clone());
    scope.setup().await?;
    scope
        .create("user", "default", &attrs! { "name" => "carol" })
        .await?;
    assert_eq!(User::find().count(scope.transaction().unwrap()).await?, 3);

    scope.teardown().await?;

    assert_eq!(User::find().count(&db).await?, 2);
    assert!(scope.transaction().is_none());
    Ok(())
}

/// Tests that teardown drops cached records while ids stay stable.
///
/// Expected: Ok with a rebuilt record carrying the same id
#[tokio::test]
async fn clears_cached_records() -> Result<(), StubError> {
    let registry = blog_registry();
    let mut scope = TestScope::bind(&registry, "blog")?;
    scope.setup().await?;
    let before = scope.get("posts", "nice_one", &Attributes::new())?;

    scope.teardown().await?;

    assert_eq!(registry.cached_len(), 0);
    scope.setup().await?;
    let after = scope.get("posts", "nice_one", &Attributes::new())?;
    assert!(!Rc::ptr_eq(&before, &after));
    assert_eq!(before.id(), after.id());
    assert_eq!(before.associations("tags"), after.associations("tags"));
    Ok(())
}
