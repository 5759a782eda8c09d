//! Storage used by bulk insert and purge.
//!
//! Every SeaORM connection is a [`Store`], including `DatabaseTransaction`, so models insert
//! into whatever transaction the caller hands them. [`Detached`] is the store for pure
//! in-memory use: writes and deletes do nothing and record caching is the only persistence.

use sea_orm::{
    sea_query::{Alias, Expr, Query},
    ConnectionTrait, DbErr,
};

use crate::{error::StubError, record::Row, value::Value};

#[allow(async_fn_in_trait)]
pub trait Store {
    /// Deletes every row of `table`.
    async fn delete_all(&self, table: &str) -> Result<(), StubError>;

    /// Writes one flat row into `table`, bypassing any model callbacks.
    async fn insert_row(&self, table: &str, row: &Row) -> Result<(), StubError>;
}

impl<C: ConnectionTrait> Store for C {
    async fn delete_all(&self, table: &str) -> Result<(), StubError> {
        let stmt = Query::delete()
            .from_table(Alias::new(table.to_string()))
            .to_owned();

        self.execute(&stmt).await?;

        Ok(())
    }

    async fn insert_row(&self, table: &str, row: &Row) -> Result<(), StubError> {
        if row.is_empty() {
            return Ok(());
        }

        let mut stmt = Query::insert();
        stmt.into_table(Alias::new(table.to_string()))
            .columns(row.keys().map(|column| Alias::new(column.clone())));
        stmt.values(row.values().map(|value| Expr::val(sea_orm::Value::from(value))))
            .map_err(|e| DbErr::Custom(e.to_string()))?;

        self.execute(&stmt).await?;

        Ok(())
    }
}

/// Store for running without a database.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl Store for Detached {
    async fn delete_all(&self, _table: &str) -> Result<(), StubError> {
        Ok(())
    }

    async fn insert_row(&self, _table: &str, _row: &Row) -> Result<(), StubError> {
        Ok(())
    }
}

/// Renders the value a row column will be bound as; used in log output.
pub(crate) fn describe(row: &Row) -> String {
    row.iter()
        .map(|(column, value)| match value {
            Value::Null => format!("{column}=NULL"),
            Value::Text(text) => format!("{column}={text:?}"),
            other => format!("{column}={}", serde_json::to_string(other).unwrap_or_default()),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
