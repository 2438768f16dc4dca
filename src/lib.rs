pub mod config;
pub mod core;
pub mod dump;
pub mod error;
pub mod models;
pub mod notify;
pub mod observability;
pub mod retention;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod store;

pub use anyhow::{Context, Result};
pub use error::{CoreError, CoreResult};
