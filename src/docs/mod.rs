use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Session and host diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Current diagnostics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Live collaboration session of a document
#[utoipa::path(
    get,
    path = "/api/v1/documents/{doc_id}/session",
    params(
        ("doc_id" = String, Path, description = "Document identifier used by the collaboration socket")
    ),
    responses(
        (status = 200, description = "Session snapshot", body = DocSessionResponse),
        (status = 404, description = "No live session", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn doc_session_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        diagnostics_doc,
        doc_session_doc,
    ),
    components(
        schemas(HealthResponse, DiagnosticsResponse, DocSessionResponse, PresenceUser, ErrorResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
