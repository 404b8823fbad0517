// src/lib.rs

pub mod db;
pub mod repositories;
pub mod services;
pub mod test_utils;

pub use db::Database;
pub use lunary_common::error::Error;
pub use lunary_common::models;
