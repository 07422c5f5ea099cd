//! Request extractors whose rejections go through `AppError`, so malformed
//! bodies, ids and query strings answer with the usual `{kind, message}`.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::IntoResponse,
    };

    use super::*;
    use crate::recipes::dto::{Pagination, RecipeWrite};

    async fn error_body(err: AppError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn json_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/recipes")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn mistyped_json_field_is_a_validation_error() {
        let req = json_request(
            r#"{"name":"Tea","text":"Steep.","cooking_time":"five","ingredients":[]}"#,
        );
        let Err(err) = AppJson::<RecipeWrite>::from_request(req, &()).await else {
            panic!("string cooking_time must be rejected");
        };
        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation_error");
        assert!(body["message"].as_str().unwrap().contains("cooking_time"));
    }

    #[tokio::test]
    async fn fractional_and_overflowing_amounts_are_rejected() {
        let id = uuid::Uuid::new_v4();
        for amount in ["1.5", "4294967296"] {
            let req = json_request(&format!(
                r#"{{"name":"Tea","text":"Steep.","cooking_time":3,"ingredients":[{{"id":"{id}","amount":{amount}}}]}}"#
            ));
            let Err(err) = AppJson::<RecipeWrite>::from_request(req, &()).await else {
                panic!("amount {amount} must be rejected");
            };
            assert!(matches!(err, AppError::Validation(_)), "{amount}");
        }
    }

    #[tokio::test]
    async fn missing_field_and_missing_content_type_are_rejected() {
        let req = json_request(r#"{"name":"Tea","text":"Steep."}"#);
        let Err(err) = AppJson::<RecipeWrite>::from_request(req, &()).await else {
            panic!("cooking_time is required");
        };
        assert_eq!(err.kind(), "validation_error");

        let req = Request::builder()
            .method("POST")
            .uri("/recipes")
            .body(Body::from("{}"))
            .unwrap();
        let Err(err) = AppJson::<RecipeWrite>::from_request(req, &()).await else {
            panic!("body without a JSON content type must be rejected");
        };
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn well_formed_body_passes_through() {
        let req = json_request(r#"{"name":"Tea","text":"Steep.","cooking_time":3}"#);
        let Ok(AppJson(write)) = AppJson::<RecipeWrite>::from_request(req, &()).await else {
            panic!("valid body must parse");
        };
        assert_eq!(write.cooking_time, 3);
    }

    #[tokio::test]
    async fn bad_query_string_is_a_validation_error() {
        let (mut parts, _) = Request::builder()
            .uri("/recipes?limit=lots")
            .body(())
            .unwrap()
            .into_parts();
        let Err(err) = AppQuery::<Pagination>::from_request_parts(&mut parts, &()).await else {
            panic!("non-numeric limit must be rejected");
        };
        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation_error");
    }

    #[tokio::test]
    async fn path_outside_a_router_is_a_validation_error() {
        // no route matched, so there are no captured params to parse
        let (mut parts, _) = Request::builder().uri("/recipes/nope").body(()).unwrap().into_parts();
        let Err(err) = AppPath::<uuid::Uuid>::from_request_parts(&mut parts, &()).await else {
            panic!("path params are unavailable here");
        };
        assert_eq!(err.kind(), "validation_error");
    }
}
