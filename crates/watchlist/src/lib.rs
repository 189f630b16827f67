pub mod config;
pub mod database;
pub mod error;
pub mod manager;
pub mod store;
pub mod utils;

pub use watchlist_entity::entities::source::{ActiveStateChange, Model as Source, NewSource, SourceOrder};

pub use crate::error::SourceError;
pub use crate::manager::SourceManager;
