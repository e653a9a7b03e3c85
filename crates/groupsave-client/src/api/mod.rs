//! API endpoint implementations.

mod auth;
mod dashboard;
mod groups;
mod notifications;

pub use auth::AuthApi;
pub use dashboard::DashboardApi;
pub use groups::GroupsApi;
pub use notifications::NotificationsApi;
