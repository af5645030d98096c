//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user registration and login, issuing
//! HS256 bearer tokens, plus the current-user lookup.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use organizer_core::domain::User;
use organizer_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::state::{AppState, AuthUser};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// The JWT payload: subject user id and expiry.
#[derive(Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
}

/// Signs a token for `user_id` with the configured secret and lifetime.
pub fn issue_token(state: &AppState, user_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id,
        exp: (Utc::now() + Duration::hours(state.config.jwt_expires_hours)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.config.jwt_secret.as_bytes()),
    )
}

fn auth_response(user: User, token: String) -> AuthResponse {
    AuthResponse {
        user: UserResponse {
            id: user.id,
            email: user.email,
        },
        token,
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.email.trim().is_empty() || req.password.len() < 8 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Email and a password of at least 8 characters are required".to_string(),
        ));
    }

    // 1. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })?
        .to_string();

    // 2. Create user in database
    let user = state
        .db
        .create_user(&req.email, &password_hash)
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => (
                StatusCode::CONFLICT,
                "User with this email already exists".to_string(),
            ),
            other => {
                error!("Failed to create user: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "User registration failed".to_string())
            }
        })?;

    // 3. Issue the bearer token
    let token = issue_token(&state, user.id).map_err(|e| {
        error!("Failed to sign token: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "User registration failed".to_string())
    })?;

    info!("User registered successfully: {}", user.email);
    Ok((StatusCode::CREATED, Json(auth_response(user, token))))
}

/// POST /api/auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Get user by email. Bad email and bad password are
    // indistinguishable to the caller.
    let creds = state.db.get_user_by_email(&req.email).await.map_err(|_| {
        (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string())
    })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&creds.password_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();

    if !valid {
        return Err((StatusCode::UNAUTHORIZED, "Invalid email or password".to_string()));
    }

    // 3. Issue the bearer token
    let token = issue_token(&state, creds.id).map_err(|e| {
        error!("Failed to sign token: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Login failed".to_string())
    })?;

    info!("Login successful for user: {}", creds.email);
    let response = AuthResponse {
        user: UserResponse {
            id: creds.id,
            email: creds.email,
        },
        token,
    };
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/auth/me - Current authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // Fetch fresh user data rather than echoing the token claims.
    let user = state.db.get_user_by_id(auth.id).await.map_err(|e| {
        error!("Failed to load current user: {:?}", e);
        (StatusCode::NOT_FOUND, "User not found".to_string())
    })?;

    Ok(Json(UserResponse {
        id: user.id,
        email: user.email,
    }))
}
