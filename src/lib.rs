#[macro_use]
extern crate lazy_static;

pub mod client;
pub mod error;
pub mod export;
pub mod html;
pub mod models;
pub mod templates;
