pub mod auth;
pub mod claims;

pub use claims::Claims;
