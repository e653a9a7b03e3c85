//! Dashboard API.

use crate::client::GroupSaveClient;
use crate::error::Result;
use crate::types::{Dashboard, DashboardWire};

/// Dashboard API client.
pub struct DashboardApi {
    client: GroupSaveClient,
}

impl DashboardApi {
    pub(crate) fn new(client: GroupSaveClient) -> Self {
        Self { client }
    }

    /// Fetch the signed-in user's dashboard.
    pub async fn get(&self) -> Result<Dashboard> {
        let wire: DashboardWire = self.client.get("user/dashboard").await?;
        Ok(wire.into())
    }
}
