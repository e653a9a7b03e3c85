//! CLI command handlers.

pub mod account;
pub mod auth;
pub mod dashboard;
pub mod group;
pub mod notifications;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use groupsave_client::GroupSaveClient;
use groupsave_config::GroupSaveConfig;
use groupsave_session::{
    DashboardCache, FileStore, SessionConfig, SessionManager, SessionState, SessionStore,
};

use crate::navigator::TerminalNavigator;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged file configuration.
    pub config: GroupSaveConfig,
    /// API base URL after flag and env overrides.
    pub api_url: String,
    /// Directory holding the session store.
    pub data_dir: PathBuf,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new()
            .with_expiry_margin(self.config.expiry_margin())
            .with_poll_interval(self.config.poll_interval())
            .with_dashboard_ttl(self.config.dashboard_ttl())
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::new(FileStore::new(&self.data_dir))
    }

    /// A manager over the on-disk store, not yet checked.
    pub fn session(&self) -> SessionManager {
        SessionManager::new(self.store(), self.session_config())
    }

    /// A dashboard cache sharing the manager's store.
    pub fn dashboard_cache(&self, manager: &SessionManager) -> DashboardCache {
        DashboardCache::new(manager.store().clone(), &self.session_config())
            .with_session(manager.clone())
    }

    /// A client with no session behind it, for the sign-in endpoints.
    pub fn anonymous_client(&self) -> Result<GroupSaveClient> {
        Ok(GroupSaveClient::builder()
            .base_url(&self.api_url)
            .timeout(self.config.api_timeout())
            .build()?)
    }

    /// A client whose token and 401 handling come from `manager`.
    pub fn client(&self, manager: &SessionManager) -> Result<GroupSaveClient> {
        Ok(GroupSaveClient::builder()
            .base_url(&self.api_url)
            .timeout(self.config.api_timeout())
            .session(Arc::new(manager.clone()))
            .build()?)
    }

    /// Check the stored session and fail unless it is usable.
    pub async fn signed_in(&self) -> Result<(SessionManager, GroupSaveClient)> {
        let manager = self.session();
        manager.attach_navigator(Arc::new(TerminalNavigator));
        match manager.check().await {
            SessionState::Authenticated { .. } => {
                let client = self.client(&manager)?;
                Ok((manager, client))
            }
            SessionState::Expired => bail!("Your session has expired"),
            _ => bail!("Not signed in. Run 'groupsave login' first."),
        }
    }
}

/// Turn a client error into a message fit for the terminal.
pub fn api_error(err: groupsave_client::Error) -> anyhow::Error {
    if let Some(fields) = err.field_errors() {
        let mut message = err.to_string();
        for (field, messages) in fields {
            for m in messages {
                message.push_str(&format!("\n  {}: {}", field, m));
            }
        }
        return anyhow!(message);
    }
    if err.is_transient() {
        return anyhow!("{}\nCheck your connection and try again.", err);
    }
    if err.is_auth_error() {
        return anyhow!("{}", err);
    }
    anyhow::Error::new(err)
}

/// Print a server acknowledgement, falling back to `default`.
pub fn print_ack(ctx: &Context, message: Option<String>, default: &str) -> Result<()> {
    let message = message.filter(|m| !m.is_empty());
    if ctx.json_output {
        let out = serde_json::json!({ "message": message.as_deref().unwrap_or(default) });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let green = console::Style::new().green();
        println!(
            "{} {}",
            green.apply_to("✓"),
            message.as_deref().unwrap_or(default)
        );
    }
    Ok(())
}

/// Read a password without echo, with an optional confirmation prompt.
pub fn prompt_password(prompt: &str, confirm: bool) -> Result<String> {
    let password = rpassword::prompt_password(prompt)?;
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    if confirm {
        let again = rpassword::prompt_password("Confirm password: ")?;
        if again != password {
            bail!("Passwords do not match");
        }
    }
    Ok(password)
}

/// Human form of a remaining duration.
pub fn format_remaining(remaining: std::time::Duration) -> String {
    let secs = remaining.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(Duration::from_secs(5)), "5s");
        assert_eq!(format_remaining(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_remaining(Duration::from_secs(7260)), "2h 1m");
    }

    #[test]
    fn test_api_error_lists_fields() {
        let err = groupsave_client::Error::Validation {
            status: 422,
            message: "The given data was invalid.".to_string(),
            errors: [("email".to_string(), vec!["has already been taken".to_string()])]
                .into_iter()
                .collect(),
        };
        let text = api_error(err).to_string();
        assert!(text.contains("email: has already been taken"));
    }
}
