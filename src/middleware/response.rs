use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::database::pagination::Paginated;

/// Wrapper for API responses that automatically adds the success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: StatusCode,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self::with_status(data, StatusCode::OK, "success")
    }

    /// Create an API response with custom status code
    pub fn with_status(data: T, status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            data,
            status_code,
            message: message.into(),
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED, "created")
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

fn serialize_or_500<T: Serialize>(data: &T) -> Result<Value, Response> {
    serde_json::to_value(data).map_err(|e| {
        tracing::error!("Failed to serialize response data: {}", e);
        crate::error::ApiError::internal_server_error("Failed to serialize response data").into_response()
    })
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data = match serialize_or_500(&self.data) {
            Ok(value) => value,
            Err(response) => return response,
        };

        let envelope = json!({
            "code": self.status_code.as_u16(),
            "message": self.message,
            "data": data,
        });

        (self.status_code, Json(envelope)).into_response()
    }
}

/// A page of records with the paging metadata the clients expect at the top level.
#[derive(Debug)]
pub struct PagedResponse<T: Serialize> {
    pub page: Paginated<T>,
}

impl<T: Serialize> From<Paginated<T>> for PagedResponse<T> {
    fn from(page: Paginated<T>) -> Self {
        Self { page }
    }
}

impl<T: Serialize> IntoResponse for PagedResponse<T> {
    fn into_response(self) -> Response {
        let data = match serialize_or_500(&self.page.items) {
            Ok(value) => value,
            Err(response) => return response,
        };

        let envelope = json!({
            "code": StatusCode::OK.as_u16(),
            "message": "success",
            "data": data,
            "totalCount": self.page.total_count,
            "currentPage": self.page.page,
            "pageSize": self.page.page_size,
        });

        (StatusCode::OK, Json(envelope)).into_response()
    }
}

// Convenience type aliases
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
pub type PagedResult<T> = Result<PagedResponse<T>, crate::error::ApiError>;
