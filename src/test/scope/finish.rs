use super::*;

/// Tests finishing a scope in the middle of a test.
///
/// Verifies that the running test is torn down and the rows inserted at setup are purged.
///
/// Expected: Ok with empty tables
#[tokio::test]
async fn purges_inserted_rows() -> Result<(), StubError> {
    let mut test = TestBuilder::new().with_blog_tables().build().await.unwrap();
    let db = test.connection().await.unwrap();
    let registry = blog_registry();
    let mut scope = TestScope::bind(&registry, "blog")?.with_database(db.clone());
    scope.setup().await?;

    scope.finish().await?;

    assert_eq!(User::find().count(&db).await?, 0);
    assert_eq!(Post::find().count(&db).await?, 0);
    assert_eq!(registry.cached_len(), 0);
    Ok(())
}
