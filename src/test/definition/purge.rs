use super::*;

/// Tests purging an inserted definition.
///
/// Verifies that every model's table is emptied, children before parents.
///
/// Expected: Ok with empty tables
#[tokio::test]
async fn empties_every_table() -> Result<(), StubError> {
    let test = TestBuilder::new().with_blog_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();
    let registry = Registry::new();
    let definition = fixture::blog();
    definition.insert(&registry, db).await?;

    definition.purge(db).await?;

    assert_eq!(User::find().count(db).await?, 0);
    assert_eq!(Tag::find().count(db).await?, 0);
    assert_eq!(Post::find().count(db).await?, 0);

    Ok(())
}

/// Tests that purge leaves tables of other definitions alone.
///
/// Expected: Ok with only the purged definition's tables emptied
#[tokio::test]
async fn only_touches_declared_models() -> Result<(), StubError> {
    let test = TestBuilder::new().with_blog_tables().build().await.unwrap();
    let db = test.db.as_ref().unwrap();
    let registry = Registry::new();
    let definition = fixture::blog();
    definition.insert(&registry, db).await?;
    let mut tags_only = Definition::new();
    fixture::declare_tags(&mut tags_only)?;

    tags_only.purge(db).await?;

    assert_eq!(Tag::find().count(db).await?, 0);
    assert_eq!(User::find().count(db).await?, 2);

    Ok(())
}
