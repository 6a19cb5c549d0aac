// src/access.rs

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use tracing::{error, info, warn};

use crate::models::Company;
use crate::{render, AppState};

/// Set by the platform's session layer in front of this service.
pub const USER_HEADER: &str = "x-moodle-user-id";

/// A caller who manages a company. Every report handler takes one, so a
/// report never runs without a resolved tenant.
#[derive(Debug, Clone)]
pub struct TenantManager {
    pub user_id: i64,
    pub company: Company,
}

#[derive(Debug)]
pub enum AccessError {
    NotLoggedIn { login_url: String, api: bool },
    Forbidden { api: bool },
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        match self {
            AccessError::NotLoggedIn { api: true, .. } => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "login required" })),
            )
                .into_response(),
            AccessError::NotLoggedIn { login_url, api: false } => {
                Redirect::to(&login_url).into_response()
            }
            AccessError::Forbidden { api: true } => (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "error": "company manager access required" })),
            )
                .into_response(),
            AccessError::Forbidden { api: false } => (
                StatusCode::FORBIDDEN,
                render::notice_page(
                    "Access denied",
                    "You need the company manager role in a school to view these reports.",
                ),
            )
                .into_response(),
        }
    }
}

fn user_id_from(parts: &Parts) -> Option<i64> {
    parts
        .headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
}

#[async_trait]
impl FromRequestParts<AppState> for TenantManager {
    type Rejection = AccessError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let api = parts.uri.path().starts_with("/api/");

        let Some(user_id) = user_id_from(parts) else {
            warn!(path = %parts.uri.path(), "report request without a user");
            return Err(AccessError::NotLoggedIn {
                login_url: state.config.login_url.clone(),
                api,
            });
        };

        match state.data.managed_company(user_id).await {
            Ok(Some(company)) => {
                info!(user_id, company_id = company.id, "company manager authorized");
                Ok(TenantManager { user_id, company })
            }
            Ok(None) => {
                warn!(user_id, "user is not a company manager");
                Err(AccessError::Forbidden { api })
            }
            Err(e) => {
                error!(user_id, error = %e, "failed to resolve managed company");
                Err(AccessError::Forbidden { api })
            }
        }
    }
}
