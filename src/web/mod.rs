//! HTTP layer: axum routers over the registries plus the error mapping
//! from the registry taxonomy onto status codes.

pub mod handlers;

use crate::core::{RegistryError, Violation};
use crate::registry::Registry;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Present on validation failures: every violated constraint, so a
    /// client can fix the whole payload in one round trip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Violation>>,
}

#[derive(Debug)]
pub struct ApiError(pub RegistryError);

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        let (status, code, violations) = match self.0 {
            RegistryError::Validation(violations) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                Some(violations),
            ),
            RegistryError::InvalidQuery(_) => (StatusCode::BAD_REQUEST, "invalid_query", None),
            RegistryError::DuplicateIdentifier(_) => {
                (StatusCode::CONFLICT, "duplicate_identifier", None)
            }
            RegistryError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
            RegistryError::StorageUnavailable(_) | RegistryError::StorageWriteError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
            violations,
        });

        (status, body).into_response()
    }
}

/// Routes for one entity collection.
pub fn entity_router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/:id",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )
        .with_state(registry)
}

/// The full application router.
pub fn app(patients: Arc<Registry>, employees: Arc<Registry>, books: Arc<Registry>) -> Router {
    Router::new()
        .route("/", get(handlers::service_root))
        .route("/about", get(handlers::service_about))
        .nest("/patients", entity_router(patients))
        .nest("/employees", entity_router(employees))
        .nest("/books", entity_router(books))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
