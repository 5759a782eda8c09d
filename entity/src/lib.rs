//! Sample SeaORM entities used to exercise model stubbing against a real database.

pub mod prelude;

pub mod post;
pub mod tag;
pub mod user;
