use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for account creation.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub dashboards: Vec<Uuid>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for password change.
#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub email: String,
    #[serde(rename = "currentPassword")]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

/// Query parameters for the unassigned-users listing.
#[derive(Debug, Deserialize)]
pub struct DashboardUsersQuery {
    #[serde(rename = "dashboardId")]
    pub dashboard_id: Option<Uuid>,
}

/// Reduced user projection returned to the client after login.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    #[serde(rename = "userObj")]
    pub user_obj: PublicUser,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UpdatePasswordResponse {
    pub message: String,
    #[serde(rename = "newToken")]
    pub new_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_serializes_without_password() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            roles: vec!["admin".to_string()],
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("admin"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn update_password_request_uses_camel_case_fields() {
        let body = r#"{"email":"a@b.co","currentPassword":"old","newPassword":"new"}"#;
        let req: UpdatePasswordRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.current_password, "old");
        assert_eq!(req.new_password, "new");
    }

    #[test]
    fn signup_request_defaults_roles_and_dashboards() {
        let body = r#"{"email":"a@b.co","password":"pw"}"#;
        let req: SignupRequest = serde_json::from_str(body).unwrap();
        assert!(req.roles.is_empty());
        assert!(req.dashboards.is_empty());
    }
}
