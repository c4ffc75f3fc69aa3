pub mod db;
pub mod models;
pub mod snapshot;

pub use rusqlite;
