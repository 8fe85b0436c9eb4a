pub mod warehouse;
pub use warehouse::WarehouseService;

use crate::api::models::ApiResponse;
use axum::{Json, http::StatusCode, response::IntoResponse};
use tracing::warn;

pub struct AppError(pub common::Error);

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            common::Error::UnknownReport(_) => StatusCode::NOT_FOUND,
            common::Error::ModelNotBuilt => StatusCode::SERVICE_UNAVAILABLE,
            common::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            warn!(status = status_code.as_u16(), error = %self.0, "Request failed");
        }

        let body = Json(ApiResponse::<()>::error(self.0.to_string()));
        (status_code, body).into_response()
    }
}

impl From<common::Error> for AppError {
    fn from(err: common::Error) -> Self {
        AppError(err)
    }
}
