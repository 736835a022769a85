use crate::http::model_state::ModelState;
use crate::models::RepositoryError;
use axum::extract::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug)]
pub struct ApiSuccess<T: Serialize> {
    status: StatusCode,
    location: Option<String>,
    body: Json<T>,
}

impl<T: Serialize> ApiSuccess<T> {
    pub const fn new(status: StatusCode, data: T) -> Self {
        Self {
            status,
            location: None,
            body: Json(data),
        }
    }

    /// 201 pointing at the resource that was just created.
    pub const fn created(location: String, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            location: Some(location),
            body: Json(data),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        match self.location {
            Some(location) => {
                (self.status, [(header::LOCATION, location)], self.body).into_response()
            }
            None => (self.status, self.body).into_response(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    status_code: u16,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    const fn new(status: StatusCode, data: T) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    InternalServerError(String),
    BadRequest(String),
    NotFound(String),
    UnprocessableEntity(ModelState),
}

impl ApiError {
    pub fn author_not_found(author_id: uuid::Uuid) -> Self {
        Self::NotFound(format!("author with id \"{author_id}\" does not exist"))
    }

    pub fn book_not_found(author_id: uuid::Uuid, id: uuid::Uuid) -> Self {
        Self::NotFound(format!(
            "book with id \"{id}\" does not exist for author with id \"{author_id}\""
        ))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::InternalServerError(msg) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ApiResponse::new(status, msg))).into_response()
            }
            Self::BadRequest(msg) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ApiResponse::new(status, msg))).into_response()
            }
            Self::NotFound(msg) => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ApiResponse::new(status, msg))).into_response()
            }
            Self::UnprocessableEntity(model_state) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(model_state)).into_response()
            }
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        tracing::error!(error = ?err.0, "Library repository failed");
        Self::InternalServerError("Internal server error".to_string())
    }
}

impl From<ModelState> for ApiError {
    fn from(model_state: ModelState) -> Self {
        Self::UnprocessableEntity(model_state)
    }
}

/// Unwraps a JSON body that must be present. A missing, `null` or
/// unreadable body is the client's fault.
pub fn required_body<T>(payload: Result<Json<Option<T>>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(Some(body))) => Ok(body),
        Ok(Json(None)) => Err(ApiError::BadRequest("request body is required".to_string())),
        Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
    }
}

pub fn ensure_valid(model_state: ModelState) -> Result<(), ApiError> {
    if model_state.is_valid() {
        Ok(())
    } else {
        Err(model_state.into())
    }
}

/// A failed commit is not something the client can fix; the request is
/// aborted with a server error.
pub fn ensure_saved(saved: bool, failure: impl FnOnce() -> String) -> Result<(), ApiError> {
    if saved {
        return Ok(());
    }

    let message = failure();
    tracing::error!("{message}");
    Err(ApiError::InternalServerError(
        "Internal server error".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn created_sets_location_header() {
        let response =
            ApiSuccess::created("http://library.test/x".to_string(), vec![1, 2]).into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[header::LOCATION],
            "http://library.test/x"
        );
        assert_eq!(body_json(response).await, serde_json::json!([1, 2]));
    }

    #[tokio::test]
    async fn unprocessable_entity_body_is_the_error_map() {
        let mut model_state = ModelState::default();
        model_state.add_error("BookForCreationDto", "bad");

        let response = ApiError::from(model_state).into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "BookForCreationDto": ["bad"] })
        );
    }

    #[tokio::test]
    async fn not_found_uses_response_envelope() {
        let response = ApiError::NotFound("gone".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "statusCode": 404, "data": "gone" })
        );
    }

    #[test]
    fn null_body_is_a_bad_request() {
        let result = required_body::<Vec<u8>>(Ok(Json(None)));

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn failed_save_is_a_server_error() {
        assert!(ensure_saved(true, || unreachable!()).is_ok());
        assert!(matches!(
            ensure_saved(false, || "boom".to_string()),
            Err(ApiError::InternalServerError(_))
        ));
    }
}
