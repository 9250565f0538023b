#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod errors;
pub mod records;
pub mod traits;
pub mod types;
