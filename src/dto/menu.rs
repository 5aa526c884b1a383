use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Default number of suggestions when the request does not say.
pub const DEFAULT_SUGGESTION_COUNT: u8 = 8;

/// Request for generated menu suggestions.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct MenuSuggestRequest {
    /// What the menu should be about, e.g. a category or a mood.
    #[validate(length(min = 1, max = 100))]
    pub theme: String,
    #[validate(range(min = 1, max = 20))]
    pub count: Option<u8>,
    #[validate(length(min = 2, max = 16))]
    pub locale: Option<String>,
}

impl MenuSuggestRequest {
    pub fn count(&self) -> u8 {
        self.count.unwrap_or(DEFAULT_SUGGESTION_COUNT)
    }
}

/// Generated menu entries, ready for `menu_items`.
#[derive(Debug, Serialize, ToSchema)]
pub struct MenuSuggestResponse {
    pub items: Vec<String>,
}
