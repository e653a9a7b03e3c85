//! Groups API.

use crate::client::GroupSaveClient;
use crate::error::Result;
use crate::types::{CreateGroupRequest, DataEnvelope, GroupDetail, MessageResponse};

/// Groups API client.
pub struct GroupsApi {
    client: GroupSaveClient,
}

impl GroupsApi {
    pub(crate) fn new(client: GroupSaveClient) -> Self {
        Self { client }
    }

    /// Get a group with its members.
    pub async fn get(&self, id: u64) -> Result<GroupDetail> {
        let envelope: DataEnvelope<GroupDetail> =
            self.client.get(&format!("user/group/{}", id)).await?;
        Ok(envelope.data)
    }

    /// Join a group, or request to join if the caller is not yet a member.
    pub async fn join(&self, id: u64) -> Result<MessageResponse> {
        self.client
            .post(&format!("user/group/{}/join", id), &serde_json::json!({}))
            .await
    }

    /// Create a group.
    pub async fn create(&self, request: &CreateGroupRequest) -> Result<MessageResponse> {
        self.client.post("user/group/store", request).await
    }

    /// Approve a pending join request.
    pub async fn approve_join_request(
        &self,
        group_id: u64,
        request_id: u64,
    ) -> Result<MessageResponse> {
        self.client
            .post_empty(&format!(
                "user/group/{}/join-requests/{}/approve",
                group_id, request_id
            ))
            .await
    }

    /// Reject a pending join request.
    pub async fn reject_join_request(
        &self,
        group_id: u64,
        request_id: u64,
    ) -> Result<MessageResponse> {
        self.client
            .post_empty(&format!(
                "user/group/{}/join-requests/{}/reject",
                group_id, request_id
            ))
            .await
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::{CreateGroupRequest, GroupSaveClient};

    #[tokio::test]
    async fn test_get_unwraps_data_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/group/12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "id": 12,
                    "title": "Christmas fund",
                    "target_amount": 2400,
                    "total_users": 12,
                    "active_users_count": 6,
                    "payment_out_day": 28,
                    "users": []
                }
            })))
            .mount(&server)
            .await;

        let client = GroupSaveClient::builder()
            .base_url(server.uri())
            .auth_token("t")
            .build()
            .unwrap();
        let group = client.groups().get(12).await.unwrap();
        assert_eq!(group.title, "Christmas fund");
        assert_eq!(group.target_amount, "2400");
        assert_eq!(group.payment_out_day, Some(28));
    }

    #[tokio::test]
    async fn test_create_sends_snake_case_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/group/store"))
            .and(body_json(serde_json::json!({
                "title": "Rent",
                "total_users": 4,
                "target_amount": 2000.0,
                "expected_start_date": "2026-01-01",
                "payment_out_day": 1,
                "members_emails": ["b@example.com"]
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"message": "Group created"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = GroupSaveClient::builder()
            .base_url(server.uri())
            .auth_token("t")
            .build()
            .unwrap();
        let response = client
            .groups()
            .create(&CreateGroupRequest {
                title: "Rent".into(),
                total_users: 4,
                target_amount: 2000.0,
                expected_start_date: "2026-01-01".into(),
                payment_out_day: 1,
                members_emails: vec!["b@example.com".into()],
            })
            .await
            .unwrap();
        assert_eq!(response.message.as_deref(), Some("Group created"));
    }
}
