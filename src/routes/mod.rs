//! HTTP route handlers.

pub mod cart;
pub mod conversion;
pub mod health;
pub mod logout;
pub mod regenerate;
pub mod session;
pub mod track;
