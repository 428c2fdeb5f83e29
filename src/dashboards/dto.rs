use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dashboards::repo::Dashboard;
use crate::dashboards::services::BatchOutcome;

/// Request body for creating a Power BI dashboard record.
#[derive(Debug, Deserialize)]
pub struct CreateDashboardRequest {
    pub name: String,
    pub url: String,
}

/// Request body for bulk-assigning dashboards to one user.
#[derive(Debug, Deserialize)]
pub struct AssignDashboardsRequest {
    pub dashboards: Vec<Uuid>,
}

/// Request body for the one-dashboard-to-many-users operations; the field is
/// named `user` on the wire.
#[derive(Debug, Deserialize)]
pub struct UserIdsRequest {
    pub user: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDashboardRequest {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Aggregate batch result: one blanket message plus per-user outcomes, so
/// callers can tell "all succeeded" apart from "some silently skipped".
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub message: String,
    pub results: Vec<BatchOutcome>,
}

#[derive(Debug, Serialize)]
pub struct BiUrlsResponse {
    #[serde(rename = "biUrls")]
    pub bi_urls: Vec<Dashboard>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_ids_request_reads_the_user_field() {
        let id = Uuid::new_v4();
        let body = format!(r#"{{"user":["{id}"]}}"#);
        let req: UserIdsRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(req.user, vec![id]);
    }

    #[test]
    fn bi_urls_response_uses_camel_case_key() {
        let resp = BiUrlsResponse { bi_urls: vec![] };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("biUrls"));
    }
}
