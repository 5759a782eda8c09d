use entity::prelude::User;
use sea_orm::{EntityTrait, PaginatorTrait};
use test_utils::builder::TestBuilder;

use crate::{
    attrs,
    backing::Backing,
    definition::{Definition, StubOptions},
    error::StubError,
    model::ModelOptions,
    registry::Registry,
    store::Store,
    value::Value,
};

mod insert;
