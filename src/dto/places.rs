use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Nearby place search request.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSearchRequest {
    /// Free text, usually the winning menu item.
    #[validate(length(min = 1, max = 100))]
    pub query: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// BCP 47 tag; `ko*` selects the Kakao provider.
    #[validate(length(min = 2, max = 16))]
    pub locale: String,
    /// Search radius in meters; the configured default applies when absent.
    #[validate(range(min = 1, max = 20000))]
    pub radius: Option<u32>,
}

/// Provider that answered a place search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlaceProvider {
    Kakao,
    Google,
}

impl PlaceProvider {
    /// Korean locales use Kakao, everything else Google.
    pub fn for_locale(locale: &str) -> Self {
        if locale.trim().to_ascii_lowercase().starts_with("ko") {
            PlaceProvider::Kakao
        } else {
            PlaceProvider::Google
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PlaceProvider::Kakao => "kakao",
            PlaceProvider::Google => "google",
        }
    }
}

/// One normalized place.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Normalized place search response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSearchResponse {
    pub provider: PlaceProvider,
    pub places: Vec<Place>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn korean_locales_go_to_kakao() {
        assert_eq!(PlaceProvider::for_locale("ko-KR"), PlaceProvider::Kakao);
        assert_eq!(PlaceProvider::for_locale("ko"), PlaceProvider::Kakao);
        assert_eq!(PlaceProvider::for_locale("en-US"), PlaceProvider::Google);
        assert_eq!(PlaceProvider::for_locale("ja"), PlaceProvider::Google);
    }

    #[test]
    fn coordinates_are_range_checked() {
        let request = PlaceSearchRequest {
            query: "ramen".into(),
            latitude: 91.0,
            longitude: 0.0,
            locale: "en".into(),
            radius: None,
        };
        assert!(request.validate().is_err());
    }
}
