//! Domain entities

mod receipt;
mod user;

pub use receipt::{MediaRef, Receipt};
pub use user::User;
