//! Nearby place search through Kakao Local (Korean locales) or Google Places (everything else).

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    config::PlaceSettings,
    dto::places::{Place, PlaceProvider, PlaceSearchRequest, PlaceSearchResponse},
    error::ServiceError,
    services::upstream::{UpstreamError, UpstreamResult, send_json},
    state::SharedState,
};

const KAKAO_KEYWORD_PATH: &str = "/v2/local/search/keyword.json";
const GOOGLE_TEXT_SEARCH_PATH: &str = "/v1/places:searchText";
const GOOGLE_FIELD_MASK: &str = "places.displayName,places.formattedAddress,places.location,places.primaryType,places.googleMapsUri";
/// Kakao's documented upper bound for `radius`.
const KAKAO_MAX_RADIUS: u32 = 20_000;
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Search places around the requested coordinates. Single attempt, no retry.
pub async fn search(
    state: &SharedState,
    request: PlaceSearchRequest,
) -> Result<PlaceSearchResponse, ServiceError> {
    let settings = &state.config().places;
    let provider = PlaceProvider::for_locale(&request.locale);
    let radius = request.radius.unwrap_or(settings.radius_meters);

    let result = match provider {
        PlaceProvider::Kakao => search_kakao(state.http(), settings, &request, radius).await,
        PlaceProvider::Google => search_google(state.http(), settings, &request, radius).await,
    };

    match result {
        Ok(places) => {
            info!(
                provider = provider.name(),
                query = %request.query,
                count = places.len(),
                "place search completed"
            );
            Ok(PlaceSearchResponse { provider, places })
        }
        Err(err) => {
            warn!(provider = provider.name(), error = %err, "place search failed");
            Err(err.into())
        }
    }
}

async fn search_kakao(
    http: &reqwest::Client,
    settings: &PlaceSettings,
    request: &PlaceSearchRequest,
    radius: u32,
) -> UpstreamResult<Vec<Place>> {
    let provider = PlaceProvider::Kakao.name();
    let key = settings
        .kakao_api_key
        .as_deref()
        .ok_or(UpstreamError::MissingKey { provider })?;

    let url = format!("{}{}", settings.kakao_base_url.trim_end_matches('/'), KAKAO_KEYWORD_PATH);
    let builder = http
        .get(url)
        .header("Authorization", format!("KakaoAK {key}"))
        .query(&[
            ("query", request.query.clone()),
            ("x", request.longitude.to_string()),
            ("y", request.latitude.to_string()),
            ("radius", radius.min(KAKAO_MAX_RADIUS).to_string()),
            ("sort", "distance".to_string()),
        ]);

    let response: KakaoResponse = send_json(provider, builder).await?;
    Ok(response.into_places())
}

async fn search_google(
    http: &reqwest::Client,
    settings: &PlaceSettings,
    request: &PlaceSearchRequest,
    radius: u32,
) -> UpstreamResult<Vec<Place>> {
    let provider = PlaceProvider::Google.name();
    let key = settings
        .google_api_key
        .as_deref()
        .ok_or(UpstreamError::MissingKey { provider })?;

    let url = format!(
        "{}{}",
        settings.google_base_url.trim_end_matches('/'),
        GOOGLE_TEXT_SEARCH_PATH
    );
    let body = json!({
        "textQuery": request.query,
        "languageCode": request.locale,
        "locationBias": {
            "circle": {
                "center": { "latitude": request.latitude, "longitude": request.longitude },
                "radius": f64::from(radius),
            }
        }
    });
    let builder = http
        .post(url)
        .header("X-Goog-Api-Key", key)
        .header("X-Goog-FieldMask", GOOGLE_FIELD_MASK)
        .json(&body);

    let response: GoogleResponse = send_json(provider, builder).await?;
    Ok(response.into_places(request.latitude, request.longitude))
}

#[derive(Debug, Deserialize)]
struct KakaoResponse {
    #[serde(default)]
    documents: Vec<KakaoDocument>,
}

/// Kakao encodes coordinates and distances as strings.
#[derive(Debug, Deserialize)]
struct KakaoDocument {
    place_name: String,
    #[serde(default)]
    address_name: String,
    #[serde(default)]
    road_address_name: String,
    #[serde(default)]
    category_name: String,
    x: String,
    y: String,
    #[serde(default)]
    distance: String,
    #[serde(default)]
    place_url: String,
}

impl KakaoResponse {
    fn into_places(self) -> Vec<Place> {
        self.documents
            .into_iter()
            .filter_map(|doc| {
                let (Ok(longitude), Ok(latitude)) = (doc.x.parse::<f64>(), doc.y.parse::<f64>())
                else {
                    warn!(place = %doc.place_name, "skipping Kakao place without coordinates");
                    return None;
                };
                let address = if doc.road_address_name.is_empty() {
                    doc.address_name
                } else {
                    doc.road_address_name
                };
                Some(Place {
                    name: doc.place_name,
                    address,
                    category: non_empty(doc.category_name),
                    latitude,
                    longitude,
                    distance_meters: doc.distance.parse().ok(),
                    url: non_empty(doc.place_url),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    places: Vec<GooglePlace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GooglePlace {
    display_name: Option<GoogleText>,
    #[serde(default)]
    formatted_address: String,
    location: Option<GoogleLocation>,
    primary_type: Option<String>,
    google_maps_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GoogleLocation {
    latitude: f64,
    longitude: f64,
}

impl GoogleResponse {
    fn into_places(self, origin_lat: f64, origin_lng: f64) -> Vec<Place> {
        self.places
            .into_iter()
            .filter_map(|place| {
                let (Some(name), Some(location)) = (place.display_name, place.location) else {
                    warn!("skipping Google place without name or location");
                    return None;
                };
                Some(Place {
                    name: name.text,
                    address: place.formatted_address,
                    category: place.primary_type,
                    latitude: location.latitude,
                    longitude: location.longitude,
                    distance_meters: Some(distance_meters(
                        origin_lat,
                        origin_lng,
                        location.latitude,
                        location.longitude,
                    )),
                    url: place.google_maps_uri,
                })
            })
            .collect()
    }
}

/// Great-circle distance, rounded to whole meters.
fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> u32 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    (EARTH_RADIUS_METERS * c).round() as u32
}

fn non_empty(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kakao_documents_are_normalized() {
        let response: KakaoResponse = serde_json::from_value(json!({
            "documents": [
                {
                    "place_name": "Noodle House",
                    "address_name": "Seoul Jung-gu 1",
                    "road_address_name": "Seoul Sejong-daero 110",
                    "category_name": "food > noodles",
                    "x": "126.9780",
                    "y": "37.5665",
                    "distance": "120",
                    "place_url": "http://place.map.kakao.com/1"
                },
                { "place_name": "Broken", "x": "", "y": "37.5" }
            ]
        }))
        .unwrap();

        let places = response.into_places();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].address, "Seoul Sejong-daero 110");
        assert_eq!(places[0].distance_meters, Some(120));
        assert_eq!(places[0].latitude, 37.5665);
    }

    #[test]
    fn google_places_get_a_distance() {
        let response: GoogleResponse = serde_json::from_value(json!({
            "places": [
                {
                    "displayName": { "text": "Trattoria" },
                    "formattedAddress": "1 Main St",
                    "location": { "latitude": 40.0, "longitude": -74.0 },
                    "primaryType": "italian_restaurant"
                },
                { "formattedAddress": "nameless" }
            ]
        }))
        .unwrap();

        let places = response.into_places(40.0, -74.0);
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name, "Trattoria");
        assert_eq!(places[0].distance_meters, Some(0));
        assert_eq!(places[0].category.as_deref(), Some("italian_restaurant"));
    }

    #[test]
    fn distance_is_roughly_right() {
        // One degree of latitude is about 111 km.
        let d = distance_meters(0.0, 0.0, 1.0, 0.0);
        assert!((110_000..112_500).contains(&d));
    }

    #[tokio::test]
    async fn missing_key_is_reported_before_any_request() {
        let settings = PlaceSettings::default();
        let request = PlaceSearchRequest {
            query: "ramen".into(),
            latitude: 37.5,
            longitude: 127.0,
            locale: "ko-KR".into(),
            radius: None,
        };
        let err = search_kakao(&reqwest::Client::new(), &settings, &request, 1000)
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::MissingKey { provider: "kakao" }));
        assert!(matches!(ServiceError::from(err), ServiceError::NotConfigured("kakao")));
    }
}
