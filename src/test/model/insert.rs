use super::*;

fn users_named(name: &str, backing: Backing, options: ModelOptions) -> Definition {
    let mut definition = Definition::new();
    definition
        .model(backing, options, |m| {
            m.default_stub(attrs! { "name" => name, "admin" => false })?;
            Ok(())
        })
        .unwrap();
    definition
}

fn require_name(backing: Backing) -> Backing {
    backing.validate(|record| match record.text("name") {
        Some(name) if !name.is_empty() => Vec::new(),
        _ => vec!["name can't be blank".to_string()],
    })
}

/// Tests inserting an invalid stub with validation enabled and callbacks disabled.
///
/// Expected: Err(StubError::Validation) naming the model and stub, and no rows
#[tokio::test]
async fn invalid_stub_is_rejected_when_validating() -> Result<(), StubError> {
    let test = TestBuilder::new().with_table(User).build().await.unwrap();
    let db = test.db.as_ref().unwrap();
    let registry = Registry::new();
    let definition = users_named("", require_name(Backing::of(User)), ModelOptions::default());
    let users = definition.model_named("users").unwrap();

    let result = users
        .insert(&definition.materializer(&registry), &StubOptions::default(), db)
        .await;

    let error = match result {
        Err(StubError::Validation(error)) => error,
        other => panic!("expected a validation error, got {other:?}"),
    };
    assert_eq!(error.model, "users");
    assert_eq!(error.stub, "default");
    assert_eq!(error.messages, ["name can't be blank"]);
    assert_eq!(User::find().count(db).await?, 0);

    Ok(())
}

/// Tests inserting the same invalid stub with validation disabled on the model.
///
/// Expected: Ok with the row written as declared
#[tokio::test]
async fn invalid_stub_is_written_without_validation() -> Result<(), StubError> {
    let test = TestBuilder::new().with_table(User).build().await.unwrap();
    let db = test.db.as_ref().unwrap();
    let registry = Registry::new();
    let definition = users_named(
        "",
        require_name(Backing::of(User)),
        ModelOptions::default().validate(false),
    );
    let users = definition.model_named("users").unwrap();

    users
        .insert(&definition.materializer(&registry), &StubOptions::default(), db)
        .await?;

    let rows = User::find().all(db).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "");

    Ok(())
}

/// Tests the full save path.
///
/// Verifies that before-save callbacks change the written row but not the materialized
/// record.
///
/// Expected: Ok with the callback's value stored
#[tokio::test]
async fn callbacks_run_before_writing() -> Result<(), StubError> {
    let test = TestBuilder::new().with_table(User).build().await.unwrap();
    let db = test.db.as_ref().unwrap();
    let registry = Registry::new();
    let backing = Backing::of(User).before_save(|record, row| {
        let shouted = record.text("name").unwrap_or_default().to_uppercase();
        row.insert("name".to_string(), Value::from(shouted));
    });
    let definition = users_named("bob", backing, ModelOptions::default().callbacks(true));
    let users = definition.model_named("users").unwrap();
    let mx = definition.materializer(&registry);

    users.insert(&mx, &StubOptions::default(), db).await?;

    let record = users.retrieve_record(&mx, "default", &Default::default())?;
    let row = User::find_by_id(record.id().unwrap()).one(db).await?.unwrap();
    assert_eq!(row.name, "BOB");
    assert_eq!(record.text("name"), Some("bob"));

    Ok(())
}

/// Tests that the full save path validates even when validation is switched off.
///
/// Expected: Err(StubError::Validation) and no rows
#[tokio::test]
async fn callbacks_always_validate() -> Result<(), StubError> {
    let test = TestBuilder::new().with_table(User).build().await.unwrap();
    let db = test.db.as_ref().unwrap();
    let registry = Registry::new();
    let definition = users_named(
        "",
        require_name(Backing::of(User)),
        ModelOptions::default().callbacks(true).validate(false),
    );
    let users = definition.model_named("users").unwrap();

    let result = users
        .insert(&definition.materializer(&registry), &StubOptions::default(), db)
        .await;

    assert!(matches!(result, Err(StubError::Validation(_))));
    assert_eq!(User::find().count(db).await?, 0);

    Ok(())
}

/// Tests purging stale rows before inserting.
///
/// Expected: Ok with only the declared stubs left in the table
#[tokio::test]
async fn replaces_existing_rows() -> Result<(), StubError> {
    let test = TestBuilder::new().with_table(User).build().await.unwrap();
    let db = test.db.as_ref().unwrap();
    let registry = Registry::new();
    let definition = users_named("bob", Backing::of(User), ModelOptions::default());
    let users = definition.model_named("users").unwrap();
    let mx = definition.materializer(&registry);
    let stale = users.retrieve_record(
        &mx,
        "default",
        &attrs! { "id" => 1, "name" => "stale" },
    )?;
    db.insert_row("user", stale.row()).await?;

    users.insert(&mx, &StubOptions::default(), db).await?;

    let rows = User::find().all(db).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "bob");

    Ok(())
}

/// Tests a model declared with insert disabled.
///
/// Verifies that neither the purge nor the stub writes run, so rows already in the table
/// are left alone.
///
/// Expected: Ok with only the pre-existing row in the table
#[tokio::test]
async fn skipped_when_insert_is_disabled() -> Result<(), StubError> {
    let test = TestBuilder::new().with_table(User).build().await.unwrap();
    let db = test.db.as_ref().unwrap();
    let registry = Registry::new();
    let definition = users_named(
        "bob",
        Backing::of(User),
        ModelOptions::default().insert(false),
    );
    let users = definition.model_named("users").unwrap();
    let mx = definition.materializer(&registry);
    let existing = users.retrieve_record(
        &mx,
        "default",
        &attrs! { "id" => 1, "name" => "existing" },
    )?;
    db.insert_row("user", existing.row()).await?;

    definition.insert(&registry, db).await?;
    definition.purge(db).await?;

    let rows = User::find().all(db).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "existing");

    Ok(())
}

/// Tests a model that enables insert while the definition disables it.
///
/// Expected: Ok with the model's stub written
#[tokio::test]
async fn model_option_overrides_definition() -> Result<(), StubError> {
    let test = TestBuilder::new().with_table(User).build().await.unwrap();
    let db = test.db.as_ref().unwrap();
    let registry = Registry::new();
    let mut definition = users_named("bob", Backing::of(User), ModelOptions::default().insert(true));
    definition.options_mut().insert = false;

    definition.insert(&registry, db).await?;

    assert_eq!(User::find().count(db).await?, 1);

    Ok(())
}
