use axum::{
    extract::{FromRef, Query, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            DashboardUsersQuery, LoginRequest, LoginResponse, PublicUser, SignupRequest,
            SignupResponse, UpdatePasswordRequest, UpdatePasswordResponse,
        },
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::User,
    },
    dashboards::repo::Dashboard,
    error::ApiError,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/update-password", put(update_password))
        .route("/get-users", get(get_users))
        .route("/get-dashboard-users", get(get_dashboard_users))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// The frontend reads the token, so the cookie is deliberately not HttpOnly;
/// SameSite=None + Secure allows the cross-site portal origin.
fn session_cookie(token: &str) -> String {
    format!("token={token}; Max-Age=36000; Path=/; SameSite=None; Secure")
}

#[instrument(skip(state, payload))]
async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::Validation("Password is required".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        &payload.email,
        &hash,
        &payload.roles,
        &payload.dashboards,
    )
    .await?;

    // Initial dashboards are claimed for the new user on both sides of the
    // relation: the user's list above and the dashboards' owner column here.
    if !payload.dashboards.is_empty() {
        Dashboard::claim_for_user(&state.db, &payload.dashboards, user.id).await?;
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_session(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully".into(),
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<LoginResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::Unauthorized("User not found".into())
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Authentication failed".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_session(user.id)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        session_cookie(&token)
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("cookie header: {e}")))?,
    );

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        headers,
        Json(LoginResponse {
            message: "Login success".into(),
            user_obj: PublicUser {
                id: user.id,
                email: user.email,
                roles: user.roles,
            },
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn update_password(
    State(state): State<AppState>,
    Json(mut payload): Json<UpdatePasswordRequest>,
) -> Result<Json<UpdatePasswordResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(user_id = %user.id, "password change with wrong current password");
        return Err(ApiError::Unauthorized("Current password is incorrect".into()));
    }

    let hash = hash_password(&payload.new_password)?;
    User::update_password(&state.db, user.id, &hash).await?;

    let keys = JwtKeys::from_ref(&state);
    let new_token = keys.sign_session(user.id)?;

    info!(user_id = %user.id, "password updated");
    Ok(Json(UpdatePasswordResponse {
        message: "Password updated successfully".into(),
        new_token,
    }))
}

#[instrument(skip(state))]
async fn get_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = User::list_all(&state.db).await?;
    Ok(Json(users))
}

/// Without a `dashboardId` parameter this lists every account; with one it
/// lists the accounts the dashboard can still be assigned to.
#[instrument(skip(state))]
async fn get_dashboard_users(
    State(state): State<AppState>,
    Query(query): Query<DashboardUsersQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = match query.dashboard_id {
        Some(dashboard_id) => User::list_unassigned(&state.db, dashboard_id).await?,
        None => User::list_all(&state.db).await?,
    };
    Ok(Json(users))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@mail.com"));
    }

    #[test]
    fn session_cookie_is_cross_site_and_readable() {
        let cookie = session_cookie("abc.def.ghi");
        assert!(cookie.starts_with("token=abc.def.ghi"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Secure"));
        assert!(!cookie.contains("HttpOnly"));
    }
}
