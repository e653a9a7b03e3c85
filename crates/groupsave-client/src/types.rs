//! Request and response types for the GroupSave API.
//!
//! The API omits fields freely and sends `null` where a list or object is
//! expected. Those shapes are normalized here, at the boundary, so callers
//! always get a complete value.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Shape helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Amounts come back as `"1500.00"` or `1500`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawAmount> for String {
    fn from(raw: RawAmount) -> Self {
        match raw {
            RawAmount::Text(s) => s,
            RawAmount::Number(n) => n.to_string(),
        }
    }
}

fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<RawAmount>::deserialize(deserializer)?
        .map(String::from)
        .unwrap_or_default())
}

fn optional_amount<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawAmount>::deserialize(deserializer)?.map(String::from))
}

// ─────────────────────────────────────────────────────────────────────────────
// Profile & auth
// ─────────────────────────────────────────────────────────────────────────────

/// Denormalized copy of the signed-in user's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
}

impl Profile {
    /// First name, capitalized, for greetings.
    pub fn first_name(&self) -> Option<String> {
        let first = self.name.as_deref()?.split_whitespace().next()?;
        let mut chars = first.chars();
        let head = chars.next()?;
        Some(head.to_uppercase().chain(chars).collect())
    }
}

/// Credentials for `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer credential.
    pub token: String,
    /// Profile, when the server includes one.
    #[serde(default)]
    pub user: Option<Profile>,
    /// Lifetime of the token in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl LoginResponse {
    /// Absolute expiry in epoch milliseconds, given the current instant.
    pub fn expires_at(&self, now_ms: i64) -> Option<i64> {
        self.expires_in
            .map(|secs| {
                let secs = i64::try_from(secs).unwrap_or(i64::MAX);
                now_ms.saturating_add(secs.saturating_mul(1000))
            })
    }
}

/// Payload for `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Payload for `POST /auth/verify-email` and `POST /auth/verify-otp`.
#[derive(Debug, Clone, Serialize)]
pub struct OtpRequest {
    pub email: String,
    pub otp: String,
}

/// Payload for `POST /auth/reset-password`.
#[derive(Debug, Clone, Serialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Generic `{ message }` acknowledgement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Dashboard
// ─────────────────────────────────────────────────────────────────────────────

/// A group as listed on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: u64,
    pub title: String,
    #[serde(default, deserialize_with = "amount")]
    pub target_amount: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_members: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_members: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(
        default,
        deserialize_with = "optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub payable_amount: Option<String>,
}

impl GroupSummary {
    /// Share of seats filled, as a percentage.
    pub fn progress_percent(&self) -> f64 {
        progress(self.active_members, self.total_members)
    }
}

fn progress(active: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(active) / f64::from(total) * 100.0
    }
}

/// Dashboard counters. Missing counters are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    #[serde(deserialize_with = "null_as_default")]
    pub total_groups: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub owned_groups: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub member_groups: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub active_groups: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub pending_invitations: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub unread_notifications: u32,
}

/// Wire shape of `GET /user/dashboard`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DashboardWire {
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggested_groups: Vec<GroupSummary>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_groups: Vec<GroupSummary>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stats: DashboardStats,
    #[serde(default)]
    pub user: Option<Profile>,
}

/// The cacheable part of the dashboard.
///
/// Serialized with the persisted key names `topGroups`, `myGroups`, `stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub top_groups: Vec<GroupSummary>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub my_groups: Vec<GroupSummary>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stats: DashboardStats,
}

/// Normalized dashboard response.
#[derive(Debug, Clone)]
pub struct Dashboard {
    /// Groups and counters.
    pub snapshot: DashboardSnapshot,
    /// Fresh profile, when the server sent one.
    pub user: Option<Profile>,
}

impl From<DashboardWire> for Dashboard {
    fn from(wire: DashboardWire) -> Self {
        Self {
            snapshot: DashboardSnapshot {
                top_groups: wire.suggested_groups,
                my_groups: wire.user_groups,
                stats: wire.stats,
            },
            user: wire.user,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Groups
// ─────────────────────────────────────────────────────────────────────────────

/// A member's standing in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub role: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_position: Option<u32>,
}

/// A group member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub pivot: Membership,
}

/// Full group details from `GET /user/group/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDetail {
    pub id: u64,
    pub title: String,
    #[serde(default, deserialize_with = "amount")]
    pub target_amount: String,
    #[serde(default, deserialize_with = "optional_amount")]
    pub payable_amount: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_users: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_users_count: u32,
    #[serde(default)]
    pub current_month: Option<u32>,
    #[serde(default)]
    pub expected_start_date: Option<String>,
    #[serde(default)]
    pub payment_out_day: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<GroupMember>,
}

impl GroupDetail {
    /// Membership of the user with this email, if they are in the group.
    pub fn membership_for(&self, email: &str) -> Option<&Membership> {
        self.users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .map(|u| &u.pivot)
    }

    /// Share of seats filled, as a percentage.
    pub fn progress_percent(&self) -> f64 {
        progress(self.active_users_count, self.total_users)
    }
}

/// `{ data: ... }` envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

/// Payload for `POST /user/group/store`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateGroupRequest {
    pub title: String,
    pub total_users: u32,
    pub target_amount: f64,
    /// ISO date (`YYYY-MM-DD`).
    pub expected_start_date: String,
    pub payment_out_day: u32,
    pub members_emails: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Notifications
// ─────────────────────────────────────────────────────────────────────────────

/// Free-form payload of a notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub group_id: Option<u64>,
    #[serde(default, alias = "group_name")]
    pub group_title: Option<String>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "optional_amount")]
    pub amount: Option<String>,
    #[serde(default)]
    pub join_request_id: Option<u64>,
    /// Anything else the server attached.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A notification as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    /// Server-side class name, e.g. `App\Notifications\GroupJoinRequestNotification`.
    #[serde(default, rename = "type")]
    pub class: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: NotificationData,
    #[serde(default)]
    pub read_at: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Notification {
    /// Whether the notification has been read.
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// Snake-case kind, e.g. `group_join_request`.
    ///
    /// Uses `data.type` when present, otherwise derives it from the class
    /// name with its `Notification` suffix removed.
    pub fn kind(&self) -> String {
        if let Some(kind) = self.data.kind.as_deref().filter(|k| !k.is_empty()) {
            return kind.to_string();
        }

        let class = self.class.rsplit('\\').next().unwrap_or_default();
        let class = class.strip_suffix("Notification").unwrap_or(class);
        if class.is_empty() {
            return "default".to_string();
        }

        let mut out = String::with_capacity(class.len() + 4);
        for (i, ch) in class.chars().enumerate() {
            if ch.is_uppercase() {
                if i > 0 {
                    out.push('_');
                }
                out.extend(ch.to_lowercase());
            } else {
                out.push(ch);
            }
        }
        out
    }

    /// Title from the payload, or the kind in title case.
    pub fn title(&self) -> String {
        if let Some(title) = self.data.title.as_deref().filter(|t| !t.is_empty()) {
            return title.to_string();
        }
        self.kind()
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(head) => head.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Wire shapes accepted for `GET /user/notifications`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NotificationListWire {
    Paginated {
        notifications: PageWire,
        #[serde(default)]
        unread_count: Option<u32>,
    },
    Data {
        data: Vec<Notification>,
        #[serde(default)]
        unread_count: Option<u32>,
    },
    Bare(Vec<Notification>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageWire {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<Notification>,
}

/// Normalized notification list.
#[derive(Debug, Clone, Default)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    pub unread_count: u32,
}

impl From<NotificationListWire> for NotificationPage {
    fn from(wire: NotificationListWire) -> Self {
        let (items, unread) = match wire {
            NotificationListWire::Paginated {
                notifications,
                unread_count,
            } => (notifications.data, unread_count),
            NotificationListWire::Data { data, unread_count } => (data, unread_count),
            NotificationListWire::Bare(items) => (items, None),
        };
        let unread_count =
            unread.unwrap_or_else(|| items.iter().filter(|n| !n.is_read()).count() as u32);
        Self {
            items,
            unread_count,
        }
    }
}

/// Wire shape of `GET /user/notifications/{id}`.
#[derive(Debug, Deserialize)]
pub(crate) struct NotificationDetailWire {
    #[serde(default)]
    pub status: String,
    pub data: NotificationDetailData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NotificationDetailData {
    pub notification: Notification,
    #[serde(default)]
    pub related: serde_json::Value,
}

/// A notification with whatever related records the server attached.
#[derive(Debug, Clone)]
pub struct NotificationDetail {
    pub notification: Notification,
    /// Related records (`group`, `user`, ...). The server sends an empty
    /// array when there are none; that normalizes to `None`.
    pub related: Option<serde_json::Map<String, serde_json::Value>>,
}

impl From<NotificationDetailData> for NotificationDetail {
    fn from(data: NotificationDetailData) -> Self {
        let related = match data.related {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        };
        Self {
            notification: data.notification,
            related,
        }
    }
}
