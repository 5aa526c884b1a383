use axum::{Json, Router, extract::State, routing::post};
use axum_valid::Valid;

use crate::{
    dto::{
        menu::{MenuSuggestRequest, MenuSuggestResponse},
        places::{PlaceSearchRequest, PlaceSearchResponse},
    },
    error::AppError,
    services::{menu_service, places_service},
    state::SharedState,
};

/// External provider glue used by the front end.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/places/search", post(search_places))
        .route("/api/menu/suggest", post(suggest_menu))
}

/// Search places near the given coordinates. Korean locales use Kakao, others Google.
#[utoipa::path(
    post,
    path = "/api/places/search",
    tag = "api",
    request_body = PlaceSearchRequest,
    responses(
        (status = 200, description = "Normalized places", body = PlaceSearchResponse),
        (status = 502, description = "Provider failed"),
        (status = 503, description = "Provider not configured")
    )
)]
pub async fn search_places(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<PlaceSearchRequest>>,
) -> Result<Json<PlaceSearchResponse>, AppError> {
    Ok(Json(places_service::search(&state, payload).await?))
}

/// Generate menu entries for a theme.
#[utoipa::path(
    post,
    path = "/api/menu/suggest",
    tag = "api",
    request_body = MenuSuggestRequest,
    responses(
        (status = 200, description = "Generated menu", body = MenuSuggestResponse),
        (status = 502, description = "Provider failed"),
        (status = 503, description = "Provider not configured")
    )
)]
pub async fn suggest_menu(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<MenuSuggestRequest>>,
) -> Result<Json<MenuSuggestResponse>, AppError> {
    Ok(Json(menu_service::suggest(&state, payload).await?))
}
