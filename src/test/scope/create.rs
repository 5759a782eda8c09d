use super::*;

/// Tests creating a record inside a test.
///
/// Verifies that exactly one row is written to the test's transaction, with a fresh id
/// distinct from the stub's stable one.
///
/// Expected: Ok with one additional row
#[tokio::test]
async fn inserts_one_row() -> Result<(), StubError> {
    let mut test = TestBuilder::new().with_blog_tables().build().await.unwrap();
    let registry = blog_registry();
    let mut scope = TestScope::bind(&registry, "blog")?.with_database(test.connection().await.unwrap());
    scope.setup().await?;
    let admin = scope.get("users", "admin", &Attributes::new())?;

    let created = scope.create("user", "admin", &Attributes::new()).await?;

    let txn = scope.transaction().unwrap();
    assert_eq!(User::find().count(txn).await?, 3);
    let row = User::find_by_id(created.id().unwrap()).one(txn).await?.unwrap();
    assert!(row.admin);
    assert_ne!(created.id(), admin.id());
    assert!(!created.is_new_record());

    scope.teardown().await?;
    Ok(())
}

/// Tests that create runs the backing type's validation.
///
/// Expected: Err(StubError::Validation) and no additional row
#[tokio::test]
async fn validates_before_saving() -> Result<(), StubError> {
    let mut test = TestBuilder::new().with_blog_tables().build().await.unwrap();
    let mut registry = Registry::new();
    registry.define("strict", |d| {
        d.model(
            Backing::of(User).validate(|record| match record.text("name") {
                Some("") => vec!["name can't be blank".to_string()],
                _ => Vec::new(),
            }),
            ModelOptions::default(),
            |m| {
                m.default_stub(attrs! { "name" => "bob", "admin" => false })?;
                Ok(())
            },
        )?;
        Ok(())
    })?;
    let mut scope = TestScope::bind(&registry, "strict")?.with_database(test.connection().await.unwrap());
    scope.setup().await?;

    let result = scope.create("user", "default", &attrs! { "name" => "" }).await;

    assert!(matches!(result, Err(StubError::Validation(_))));
    assert_eq!(User::find().count(scope.transaction().unwrap()).await?, 1);

    scope.teardown().await?;
    Ok(())
}
