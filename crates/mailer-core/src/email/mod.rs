/// Email message composition
pub mod composer;

pub use composer::{compose_welcome, welcome_body};
