//! Client-side session lifecycle for GroupSave.
//!
//! This crate owns everything that outlives a single request:
//!
//! - [`SessionStore`]: durable string key-value storage for the token,
//!   profile and expiry ([`FileStore`], [`MemoryStore`])
//! - [`SessionManager`]: the state machine that checks the stored session,
//!   arms the expiry timer and poll, and tears the session down exactly once
//! - [`Navigator`]: the seam through which the manager sends the user back
//!   to sign-in
//! - [`DashboardCache`]: single-slot read-through cache for the dashboard
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use groupsave_client::GroupSaveClient;
//! use groupsave_session::{FileStore, SessionConfig, SessionManager};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(FileStore::new(std::path::Path::new("/tmp/groupsave")));
//! let manager = SessionManager::new(store, SessionConfig::default());
//! manager.start().await;
//!
//! let client = GroupSaveClient::builder()
//!     .base_url("https://api.groupsave.example/api/")
//!     .session(Arc::new(manager.clone()))
//!     .build()?;
//! let dashboard = client.dashboard().get().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod manager;
pub mod navigator;
pub mod state;
pub mod store;

pub use cache::{DashboardCache, FetchMode, FetchOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use error::{Result, StoreError};
pub use manager::SessionManager;
pub use navigator::Navigator;
pub use state::{ExpiryCause, SessionEvent, SessionNotice, SessionState};
pub use store::{FileStore, MemoryStore, SessionStore, keys};
