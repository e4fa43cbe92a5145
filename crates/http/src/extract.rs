//! Request extractors that reject with [`AppError`].

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::AppError;

/// A wrapper around [`axum::Json`] whose rejection is a `400` in the standard
/// error envelope instead of axum's plain-text response.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                tracing::debug!(rejection = ?rejection, "json body rejected");
                Err(rejection.into())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let kind = match &rejection {
            JsonRejection::JsonDataError(_) => "invalid_body",
            JsonRejection::JsonSyntaxError(_) => "malformed_json",
            JsonRejection::MissingJsonContentType(_) => "missing_content_type",
            _ => "unreadable_body",
        };

        AppError::validation(
            vec![json!({ "kind": kind, "reason": rejection.body_text() })],
            "request body is not valid",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::header::CONTENT_TYPE, http::StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        name: String,
        count: i32,
    }

    fn request(content_type: Option<&str>, body: &str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(value) = content_type {
            builder = builder.header(CONTENT_TYPE, value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn accepts_well_formed_body() {
        let ApiJson(payload) = ApiJson::<Payload>::from_request(
            request(Some("application/json"), r#"{"name":"a","count":3}"#),
            &(),
        )
        .await
        .unwrap();

        assert_eq!(payload.name, "a");
        assert_eq!(payload.count, 3);
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let err = ApiJson::<Payload>::from_request(
            request(Some("application/json"), r#"{"name":"a"}"#),
            &(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_content_type_is_bad_request() {
        let err = ApiJson::<Payload>::from_request(request(None, r#"{"name":"a","count":1}"#), &())
            .await
            .unwrap_err();

        match err {
            AppError::BadRequest { details, .. } => {
                assert_eq!(details[0]["kind"], "missing_content_type");
            }
            other => panic!("expected bad request, got {other:?}"),
        }
    }
}
