//! Notifications API.

use crate::client::GroupSaveClient;
use crate::error::{Error, Result};
use crate::types::{
    MessageResponse, NotificationDetail, NotificationDetailWire, NotificationListWire,
    NotificationPage,
};

/// Notifications API client.
pub struct NotificationsApi {
    client: GroupSaveClient,
}

impl NotificationsApi {
    pub(crate) fn new(client: GroupSaveClient) -> Self {
        Self { client }
    }

    /// List notifications, newest first as returned by the server.
    pub async fn list(&self) -> Result<NotificationPage> {
        let wire: NotificationListWire = self.client.get("user/notifications").await?;
        Ok(wire.into())
    }

    /// Get one notification with its related records.
    pub async fn get(&self, id: &str) -> Result<NotificationDetail> {
        let wire: NotificationDetailWire = self
            .client
            .get(&format!("user/notifications/{}", id))
            .await?;
        if wire.status != "success" {
            return Err(Error::UnexpectedResponse(format!(
                "notification status '{}'",
                wire.status
            )));
        }
        Ok(wire.data.into())
    }

    /// Mark one notification as read.
    pub async fn mark_read(&self, id: &str) -> Result<MessageResponse> {
        self.client
            .post_empty(&format!("user/notifications/{}/read", id))
            .await
    }

    /// Mark every notification as read.
    pub async fn mark_all_read(&self) -> Result<MessageResponse> {
        self.client.post_empty("user/notifications/read-all").await
    }
}
