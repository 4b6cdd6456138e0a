use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use irops_core::IropsError;
use serde_json::json;

/// A top-level failure rendered as `{success: false, error}`.
///
/// `NotFound` maps to 404; everything else to 500.
#[derive(Debug)]
pub struct ApiError(pub IropsError);

impl From<IropsError> for ApiError {
    fn from(err: IropsError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({"success": false, "error": self.0.to_string()});
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = ApiError::from(IropsError::disruption_not_found(9));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let storage = ApiError::from(IropsError::Storage("disk full".into()));
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
