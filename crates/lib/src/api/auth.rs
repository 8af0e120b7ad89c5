//! Account endpoints and the session extractor

use axum::{
    Json,
    extract::{FromRequestParts, State, rejection::JsonRejection},
    http::{StatusCode, request::Parts},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_cookies::{Cookie, Cookies, cookie::SameSite};
use uuid::Uuid;

use super::{ApiError, ApiResult, AppState};
use crate::{
    ledger::AccountProfile,
    namespace::FileNamespace,
    session::{Session, SessionToken},
};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "shelfs_session";

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// The authenticated caller of a request.
///
/// Extracting this rejects the request with 401 unless it carries a live
/// session cookie.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: SessionToken,
    pub session: Session,
}

impl AuthSession {
    pub fn username(&self) -> &str {
        &self.session.username
    }
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let cookies = cookies_from(parts, state).await?;
        let token = cookies
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or_else(ApiError::unauthorized)?;
        let session = state.sessions.validate(&token).await?;
        Ok(Self { token, session })
    }
}

async fn cookies_from(parts: &mut Parts, state: &AppState) -> ApiResult<Cookies> {
    Cookies::from_request_parts(parts, state)
        .await
        .map_err(|(_, reason)| {
            tracing::error!("Cookie layer missing: {reason}");
            ApiError::Internal
        })
}

/// Signup request body
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub message: &'static str,
    pub user: AccountProfile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<StatusUser>,
}

#[derive(Debug, Serialize)]
pub struct StatusUser {
    pub id: Uuid,
    pub username: String,
}

/// Pull username and password out of a body, treating empty as missing.
fn credentials(
    username: Option<String>,
    password: Option<String>,
) -> ApiResult<(String, String)> {
    match (username, password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Ok((u, p)),
        _ => Err(ApiError::bad_request("Username and password are required")),
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn set_session_cookie(cookies: &Cookies, token: SessionToken, secure: bool) {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure);
    cookies.add(cookie);
}

/// Handler for POST /auth/signup
///
/// Creates the account and its storage directory, then logs the new user in.
pub async fn handle_signup(
    State(state): State<AppState>,
    cookies: Cookies,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = json_body(payload)?;
    let (username, password) = credentials(body.username, body.password)?;

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if FileNamespace::validate_component(&username).is_err() {
        return Err(ApiError::bad_request("Invalid username"));
    }

    let record = state
        .ledger
        .create_account(&username, &password, body.email.as_deref())
        .await?;
    state.files.namespace().ensure_user_dir(&record.username).await?;

    let token = state
        .sessions
        .create_session(record.id, record.username.clone())
        .await;
    set_session_cookie(&cookies, token, state.secure_cookies);

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            message: "User registered successfully",
            user: record.profile(),
        }),
    ))
}

/// Handler for POST /auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    cookies: Cookies,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AccountResponse>> {
    let body = json_body(payload)?;
    let (username, password) = credentials(body.username, body.password)?;

    let record = match state.ledger.verify_credentials(&username, &password).await {
        Ok(record) => record,
        Err(e) => {
            if e.is_authentication_error() {
                tracing::info!("Failed login for {username}");
            }
            return Err(e.into());
        }
    };

    let token = state
        .sessions
        .create_session(record.id, record.username.clone())
        .await;
    set_session_cookie(&cookies, token, state.secure_cookies);
    tracing::info!("{} logged in", record.username);

    Ok(Json(AccountResponse {
        message: "Login successful",
        user: record.profile(),
    }))
}

/// Handler for POST /auth/logout
///
/// Always succeeds; logging out without a session is a no-op.
pub async fn handle_logout(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value()).await;
        cookies.remove(Cookie::from(SESSION_COOKIE));
    }
    Json(json!({ "message": "Logout successful" }))
}

/// Handler for GET /auth/status
pub async fn handle_status(State(state): State<AppState>, cookies: Cookies) -> Json<StatusResponse> {
    let session = match cookies.get(SESSION_COOKIE) {
        Some(cookie) => state.sessions.validate(cookie.value()).await.ok(),
        None => None,
    };

    Json(match session {
        Some(session) => StatusResponse {
            logged_in: true,
            user: Some(StatusUser {
                id: session.user_id,
                username: session.username,
            }),
        },
        None => StatusResponse {
            logged_in: false,
            user: None,
        },
    })
}
