pub mod ingredients;
pub mod json;
pub mod public;
pub mod recipes;
pub mod tags;
pub mod users;

use serde::Serialize;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{OpenApi, ToSchema};

use crate::types::{
    AuthorListResponse, AuthorResponse, IngredientResponse, PaginationMetadata,
    RecipeIngredientResponse, RecipeListResponse, RecipeResponse, RecipeSummaryResponse,
    TagResponse, UserResponse,
};

/// Shared error response used by all endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Per-field problems, present on validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldErrorResponse>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fields: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldErrorResponse {
    /// Request field path, e.g. `ingredients[0].amount`
    pub field: String,
    pub message: String,
}

/// Generate the complete OpenAPI spec by merging all module specs
pub fn openapi() -> utoipa::openapi::OpenApi {
    #[derive(OpenApi)]
    #[openapi(
        info(title = "Foodgram API"),
        components(schemas(
            ErrorResponse,
            FieldErrorResponse,
            UserResponse,
            TagResponse,
            IngredientResponse,
            RecipeIngredientResponse,
            RecipeResponse,
            RecipeSummaryResponse,
            AuthorResponse,
            PaginationMetadata,
            RecipeListResponse,
            AuthorListResponse,
        ))
    )]
    struct BaseApi;

    let mut spec = BaseApi::openapi();

    if let Some(components) = spec.components.as_mut() {
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }

    let modules: Vec<utoipa::openapi::OpenApi> = vec![
        public::ApiDoc::openapi(),
        users::ApiDoc::openapi(),
        tags::ApiDoc::openapi(),
        ingredients::ApiDoc::openapi(),
        recipes::ApiDoc::openapi(),
    ];

    for module_spec in modules {
        spec.paths.paths.extend(module_spec.paths.paths);

        if let Some(module_components) = module_spec.components {
            if let Some(spec_components) = spec.components.as_mut() {
                spec_components.schemas.extend(module_components.schemas);
            }
        }
    }

    spec
}
