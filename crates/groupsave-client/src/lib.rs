//! HTTP client SDK for the GroupSave API.
//!
//! This crate provides a typed client for the GroupSave savings-group API.
//! All requests go through a single gateway that attaches the bearer token
//! from a [`SessionHandle`] and reports authentication rejections back to it.
//!
//! # Example
//!
//! ```no_run
//! use groupsave_client::{GroupSaveClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = GroupSaveClient::builder()
//!     .base_url("https://api.groupsave.app/api")
//!     .build()?;
//!
//! let login = client.auth().login("ada@example.com", "secret").await?;
//! println!("token expires in {:?}s", login.expires_in);
//! # Ok(())
//! # }
//! ```
//!
//! # API Coverage
//!
//! - **Auth**: login, register, verify email, password reset flow
//! - **Dashboard**: suggested groups, the user's groups, counters
//! - **Groups**: details, join, create, approve/reject join requests
//! - **Notifications**: list, detail, mark read, mark all read

pub mod api;
pub mod client;
pub mod error;
pub mod handle;
pub mod types;

pub use client::{ClientBuilder, DEFAULT_TIMEOUT, GroupSaveClient};
pub use error::{Error, Result};
pub use handle::{SessionHandle, StaticToken};
pub use types::*;
