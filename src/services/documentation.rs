use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the roulette room server.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::create_room,
        crate::routes::rooms::list_rooms,
        crate::routes::rooms::get_room,
        crate::routes::rooms::delete_room,
        crate::routes::rooms::read_path,
        crate::routes::rooms::write_path,
        crate::routes::rooms::delete_path,
        crate::routes::sse::room_stream,
        crate::routes::websocket::ws_handler,
        crate::routes::api::search_places,
        crate::routes::api::suggest_menu,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::CreateRoomResponse,
            crate::dto::room::RoomsResponse,
            crate::dto::room::RoomSummaryResponse,
            crate::dto::room::RoomSnapshot,
            crate::dto::room::RoomChangeEvent,
            crate::dto::ws::JoinRequest,
            crate::dto::ws::RoomInboundMessage,
            crate::dto::ws::RoomOutboundMessage,
            crate::dto::places::PlaceSearchRequest,
            crate::dto::places::PlaceSearchResponse,
            crate::dto::menu::MenuSuggestRequest,
            crate::dto::menu::MenuSuggestResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room documents and raw path access"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "clients", description = "WebSocket sessions for room clients"),
        (name = "api", description = "Place search and menu suggestions"),
    )
)]
pub struct ApiDoc;
