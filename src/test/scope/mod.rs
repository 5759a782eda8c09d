use std::rc::Rc;

use chrono::Duration;
use entity::prelude::{Post, User};
use sea_orm::{EntityTrait, PaginatorTrait};
use test_utils::builder::TestBuilder;

use crate::{
    attribute::Attributes,
    attrs,
    backing::Backing,
    error::StubError,
    model::ModelOptions,
    registry::Registry,
    scope::TestScope,
    store::Store,
    test::fixture,
};

mod create;
mod finish;
mod setup;
mod teardown;

fn blog_registry() -> Registry {
    let mut registry = Registry::new();
    registry.define("blog", fixture::declare_blog).unwrap();
    registry
}
