use chrono::{TimeZone, Utc};
use entity::prelude::{Post, Tag, User};
use sea_orm::{EntityTrait, PaginatorTrait};
use test_utils::builder::TestBuilder;

use crate::{
    attribute::StubRef,
    attrs,
    backing::Backing,
    definition::Definition,
    error::StubError,
    model::ModelOptions,
    registry::Registry,
    test::fixture,
};

mod insert;
mod purge;
