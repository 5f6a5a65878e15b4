use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Role, SortDirection, UserId};

/// One row of the admin user/customer listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "phoneNumber", default)]
    pub phone_number: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersResponse {
    pub users: Vec<UserRecord>,
    pub total_pages: u32,
}

/// Query string sent to list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQueryParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    pub page: u32,
    pub limit: u32,
    pub sort_by: String,
    pub sort_order: SortDirection,
}

/// Body of the admin "add user" request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_record_accepts_backend_field_names() {
        let raw = r#"{
            "_id": "64f0c2",
            "username": "ann",
            "email": "ann@example.com",
            "phoneNumber": "+15550100",
            "role": "vendor",
            "last_activity": "2026-10-01T12:00:00Z",
            "createdAt": "ignored"
        }"#;
        let record: UserRecord = serde_json::from_str(raw).expect("parse");
        assert_eq!(record.id, UserId::new("64f0c2"));
        assert_eq!(record.phone_number, "+15550100");
        assert_eq!(record.role, Role::Vendor);
        assert!(record.last_activity.is_some());
    }

    #[test]
    fn unknown_role_is_preserved() {
        let raw = r#"{"_id": "1", "username": "x", "role": "organizer"}"#;
        let record: UserRecord = serde_json::from_str(raw).expect("parse");
        assert_eq!(record.role, Role::Other("organizer".into()));
        assert_eq!(record.role.as_str(), "organizer");
        assert!(record.last_activity.is_none());
    }

    #[test]
    fn query_params_omit_missing_search_term() {
        let params = ListQueryParams {
            search_term: None,
            page: 2,
            limit: 10,
            sort_by: "username".into(),
            sort_order: SortDirection::Desc,
        };
        let json = serde_json::to_value(&params).expect("serialize");
        assert!(json.get("searchTerm").is_none());
        assert_eq!(json["sortBy"], "username");
        assert_eq!(json["sortOrder"], "desc");
    }
}
