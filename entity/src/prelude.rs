pub use super::post::Entity as Post;
pub use super::tag::Entity as Tag;
pub use super::user::Entity as User;
