pub mod document;
pub mod user;

pub use user::Role;
