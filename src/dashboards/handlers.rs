use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{jwt::CurrentUser, repo::User},
    dashboards::{
        dto::{
            AssignDashboardsRequest, BatchResponse, BiUrlsResponse, CreateDashboardRequest,
            MessageResponse, UpdateDashboardRequest, UserIdsRequest,
        },
        repo::Dashboard,
        services,
    },
    error::ApiError,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bi", post(create_dashboard))
        .route("/get-bi/:userId", get(get_bi_urls))
        .route("/get-dashboards/:userId", get(get_dashboards))
        .route("/get-all-dashboards", get(get_all_dashboards))
        .route("/assign-dashboards/:userId", put(assign_dashboards))
        .route("/assign-dashboard/:dashboardId", put(assign_dashboard))
        .route(
            "/remove-dashboard-access/:dashboardId",
            put(remove_dashboard_access),
        )
        .route("/delete-dashboard/:dashboardId", delete(delete_dashboard))
        .route("/update-dashboard/:dashboardId", put(update_dashboard))
}

#[instrument(skip(state, requester, payload))]
async fn create_dashboard(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Json(payload): Json<CreateDashboardRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let dashboard =
        Dashboard::create(&state.db, &payload.name, &payload.url, requester.id).await?;
    info!(dashboard_id = %dashboard.id, owner = %requester.id, "dashboard created");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Power BI URL created successfully".into(),
        }),
    ))
}

/// BI URL records are looked up by matching the requester's dashboard ids
/// against the dashboard owner column (see DESIGN.md, cross-field query).
#[instrument(skip(state, requester))]
async fn get_bi_urls(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<BiUrlsResponse>, ApiError> {
    if requester.id != user_id {
        return Err(ApiError::Forbidden(
            "Forbidden - You are not allowed to access this resource".into(),
        ));
    }

    // Dangling ids drop out during resolution before the owner-column match.
    let resolved = Dashboard::list_by_ids(&state.db, &requester.dashboards).await?;
    let dashboard_ids: Vec<Uuid> = resolved.iter().map(|d| d.id).collect();
    let bi_urls = Dashboard::list_by_owner_ids(&state.db, &dashboard_ids).await?;

    Ok(Json(BiUrlsResponse { bi_urls }))
}

#[instrument(skip(state, requester))]
async fn get_dashboards(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Dashboard>>, ApiError> {
    if !services::is_admin_or_mod(&requester.roles) && requester.id != user_id {
        warn!(requester = %requester.id, target = %user_id, "cross-user dashboard listing denied");
        return Err(ApiError::Forbidden(
            "Forbidden - You are not allowed to access this resource".into(),
        ));
    }

    let target = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let dashboards = Dashboard::list_by_ids(&state.db, &target.dashboards).await?;
    Ok(Json(dashboards))
}

#[instrument(skip(state))]
async fn get_all_dashboards(
    State(state): State<AppState>,
) -> Result<Json<Vec<Dashboard>>, ApiError> {
    let dashboards = Dashboard::list_all(&state.db).await?;
    Ok(Json(dashboards))
}

/// Bulk-assign dashboards to one user: append the ids the user does not
/// already hold, then set the owner column on exactly those dashboards.
#[instrument(skip(state, _requester, payload))]
async fn assign_dashboards(
    State(state): State<AppState>,
    CurrentUser(_requester): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AssignDashboardsRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let fresh = services::new_assignments(&user.dashboards, &payload.dashboards);

    let mut dashboards = user.dashboards;
    dashboards.extend_from_slice(&fresh);
    User::set_dashboards(&state.db, user.id, &dashboards).await?;

    if !fresh.is_empty() {
        Dashboard::claim_for_user(&state.db, &fresh, user.id).await?;
        info!(user_id = %user.id, count = fresh.len(), "dashboards assigned");
    }

    Ok(Json(MessageResponse {
        message: "Assigned dashboards updated successfully".into(),
    }))
}

/// Assign one dashboard to many users, best-effort per user. A missing user
/// does not abort the batch; its outcome is reported in `results`.
#[instrument(skip(state, _requester, payload))]
async fn assign_dashboard(
    State(state): State<AppState>,
    CurrentUser(_requester): CurrentUser,
    Path(dashboard_id): Path<Uuid>,
    Json(payload): Json<UserIdsRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    Dashboard::find_by_id(&state.db, dashboard_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Dashboard not found".into()))?;

    let results = services::grant_access(&state.db, dashboard_id, &payload.user).await;
    Ok(Json(BatchResponse {
        message: "Dashboard assigned to users successfully".into(),
        results,
    }))
}

#[instrument(skip(state, _requester, payload))]
async fn remove_dashboard_access(
    State(state): State<AppState>,
    CurrentUser(_requester): CurrentUser,
    Path(dashboard_id): Path<Uuid>,
    Json(payload): Json<UserIdsRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    Dashboard::find_by_id(&state.db, dashboard_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Dashboard not found".into()))?;

    let results = services::revoke_access(&state.db, dashboard_id, &payload.user).await;
    Ok(Json(BatchResponse {
        message: "Access to dashboard removed for users successfully".into(),
        results,
    }))
}

#[instrument(skip(state, requester))]
async fn delete_dashboard(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(dashboard_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !services::is_admin_or_mod(&requester.roles) {
        warn!(requester = %requester.id, %dashboard_id, "dashboard delete denied");
        return Err(ApiError::Forbidden("Unauthorized to delete dashboard".into()));
    }

    // Dangling references in user lists are tolerated; see DESIGN.md.
    Dashboard::delete(&state.db, dashboard_id).await?;
    info!(%dashboard_id, "dashboard deleted");
    Ok(Json(MessageResponse {
        message: "Dashboard deleted successfully".into(),
    }))
}

#[instrument(skip(state, requester, payload))]
async fn update_dashboard(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(dashboard_id): Path<Uuid>,
    Json(payload): Json<UpdateDashboardRequest>,
) -> Result<Json<Dashboard>, ApiError> {
    if !services::is_admin_or_mod(&requester.roles) {
        warn!(requester = %requester.id, %dashboard_id, "dashboard update denied");
        return Err(ApiError::Forbidden("Unauthorized to update dashboard".into()));
    }

    let dashboard = Dashboard::update(&state.db, dashboard_id, &payload.name, &payload.url)
        .await?
        .ok_or_else(|| ApiError::NotFound("Dashboard not found".into()))?;

    info!(%dashboard_id, "dashboard updated");
    Ok(Json(dashboard))
}
