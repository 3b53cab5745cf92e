pub mod create;
pub mod delete;
pub mod download;
pub mod get;
pub mod image;
pub mod list;
pub mod relations;
pub mod update;

use crate::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use foodgram_core::image::MAX_FILE_SIZE;
use utoipa::OpenApi;

/// Largest accepted recipe body: a base64 image of `MAX_FILE_SIZE` plus room for the
/// rest of the JSON, so oversized images reach validation and get a field error.
pub const RECIPE_BODY_LIMIT: usize = MAX_FILE_SIZE.div_ceil(3) * 4 + 1024 * 1024;

pub fn body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(RECIPE_BODY_LIMIT)
}

/// Returns the router for /api/recipes endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_recipes).post(create::create_recipe))
        .route(
            "/download_shopping_cart",
            get(download::download_shopping_cart),
        )
        .route(
            "/{id}",
            get(get::get_recipe)
                .put(update::update_recipe)
                .delete(delete::delete_recipe),
        )
        .route("/{id}/image", get(image::get_recipe_image))
        .route(
            "/{id}/favorite",
            post(relations::add_favorite).delete(relations::remove_favorite),
        )
        .route(
            "/{id}/shopping_cart",
            post(relations::add_to_shopping_cart).delete(relations::remove_from_shopping_cart),
        )
        .layer(body_limit())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list::list_recipes,
        create::create_recipe,
        get::get_recipe,
        update::update_recipe,
        delete::delete_recipe,
        image::get_recipe_image,
        relations::add_favorite,
        relations::remove_favorite,
        relations::add_to_shopping_cart,
        relations::remove_from_shopping_cart,
        download::download_shopping_cart,
    ),
    components(schemas(create::RecipeRequest, create::IngredientAmountRequest))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::json::ApiJson;
    use crate::error::ApiError;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use super::create::RecipeRequest;
    use foodgram_core::validate::validate_recipe;
    use foodgram_core::RecipeDraft;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Same extractor and body limit as the create/update routes, without the database.
    async fn validate_only(ApiJson(request): ApiJson<RecipeRequest>) -> axum::response::Response {
        match validate_recipe(RecipeDraft::from(request)) {
            Ok(_) => StatusCode::NO_CONTENT.into_response(),
            Err(e) => ApiError::from(e).into_response(),
        }
    }

    async fn post_json(body: String) -> (u16, String) {
        let app = Router::new()
            .route("/api/recipes", post(validate_only))
            .layer(body_limit());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let head = format!(
            "POST /api/recipes HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).await.unwrap();
        stream.write_all(body.as_bytes()).await.unwrap();

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        let response = String::from_utf8_lossy(&response).into_owned();
        let (head, body) = response.split_once("\r\n\r\n").unwrap();
        let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
        (status, body.to_string())
    }

    fn recipe_with_image(bytes: usize) -> String {
        // PNG signature so the format sniffing succeeds; the rest is padding
        let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
        data.resize(bytes, 0);
        serde_json::json!({
            "name": "Пирог",
            "text": "Испечь",
            "cooking_time": 60,
            "image": format!("data:image/png;base64,{}", STANDARD.encode(&data)),
            "tags": [uuid::Uuid::new_v4()],
            "ingredients": [{"id": uuid::Uuid::new_v4(), "amount": 1}],
        })
        .to_string()
    }

    #[test]
    fn test_limit_fits_largest_image() {
        let encoded = MAX_FILE_SIZE.div_ceil(3) * 4;
        assert!(RECIPE_BODY_LIMIT > encoded);
        assert!(recipe_with_image(MAX_FILE_SIZE).len() <= RECIPE_BODY_LIMIT);
    }

    #[tokio::test]
    async fn test_large_image_reaches_validation() {
        let (status, body) = post_json(recipe_with_image(3 * 1024 * 1024)).await;
        assert_eq!(status, 204, "{}", body);
    }

    #[tokio::test]
    async fn test_image_over_max_is_a_field_error() {
        let (status, body) = post_json(recipe_with_image(MAX_FILE_SIZE + 1)).await;
        assert_eq!(status, 400, "{}", body);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["fields"][0]["field"], "image");
    }
}
