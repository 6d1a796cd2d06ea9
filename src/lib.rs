//! # filehost
//!
//! A small file hosting server: users sign in, create repositories backed by
//! object storage buckets, upload files into them and share a read-only link.
//! Usable both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! filehost = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use filehost::config::AppConfig;
//! use filehost::server::{AppState, create_router};
//! use filehost::store::{SqliteStore, Store};
//!
//! let config = AppConfig::load(None)?;
//! config.validate()?;
//!
//! let store = SqliteStore::new(config.server.db_path())?;
//! store.initialize()?;
//! let objects = filehost::storage::from_config(&config).await?;
//!
//! let state = Arc::new(AppState::new(&config, Arc::new(store), objects));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `filehost` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod server;
pub mod storage;
pub mod store;
pub mod types;
pub mod validation;
