use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Where the raw OpenAPI document is published.
pub const OPENAPI_JSON_PATH: &str = "/openapi.json";

/// Swagger UI for the participant socket and the public read endpoints.
pub fn router() -> Router<SharedState> {
    SwaggerUi::new("/docs")
        .url(OPENAPI_JSON_PATH, ApiDoc::openapi())
        .into()
}
