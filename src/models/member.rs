//! Roster member model.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A team member whose calendar can be queried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Monotonically assigned identifier
    pub id: u32,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// External calendar address queried for availability
    #[serde(rename = "calendarId")]
    pub calendar_id: String,
}

/// Request body for creating a roster member.
///
/// Fields are optional at the serde layer so a missing field surfaces as a
/// 400 validation error rather than a deserialization rejection.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMemberRequest {
    #[validate(required(message = "name is required"), length(min = 1, message = "name is required"))]
    pub name: Option<String>,
    #[validate(required(message = "email is required"), length(min = 1, message = "email is required"))]
    pub email: Option<String>,
    #[serde(rename = "calendarId")]
    #[validate(
        required(message = "calendarId is required"),
        length(min = 1, message = "calendarId is required")
    )]
    pub calendar_id: Option<String>,
}
