use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

const GOOGLE_PLACES_API: &str = "https://maps.googleapis.com/maps/api/place";

/// Fields requested from the details endpoint; anything more is billed at
/// a higher SKU.
const DETAILS_FIELDS: &str = "name,formatted_address,geometry,rating,user_ratings_total,\
                              formatted_phone_number,international_phone_number,website,\
                              business_status,types,opening_hours,price_level";

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<RawPlace>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<RawDetails>,
    error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpeningHours {
    pub weekday_text: Option<Vec<String>>,
}

/// One entry from a text-search page.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlace {
    pub place_id: String,
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    pub geometry: Option<Geometry>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<i32>,
    pub business_status: Option<String>,
    pub types: Option<Vec<String>>,
}

/// Extended fields from the place-details endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDetails {
    pub formatted_address: Option<String>,
    pub geometry: Option<Geometry>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<i32>,
    pub formatted_phone_number: Option<String>,
    pub international_phone_number: Option<String>,
    pub website: Option<String>,
    pub business_status: Option<String>,
    pub types: Option<Vec<String>>,
    pub opening_hours: Option<OpeningHours>,
    pub price_level: Option<i32>,
}

/// The two cost-bearing remote operations the reconciliation engine is
/// built around. Both may fail or time out; callers own the retry and
/// budget policy.
#[async_trait::async_trait]
pub trait PlacesDirectory: Send + Sync {
    async fn text_search(&self, city: &str, category: &str) -> Result<Vec<RawPlace>>;

    async fn get_details(&self, external_id: &str) -> Result<RawDetails>;
}

#[derive(Clone)]
pub struct GooglePlacesClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GooglePlacesClient {
    /// Reuse a shared HTTP client (connection pooling, common timeout).
    #[must_use]
    pub fn with_shared_client(client: Client, api_key: String) -> Self {
        Self::with_base_url(client, GOOGLE_PLACES_API.to_string(), api_key)
    }

    #[must_use]
    pub const fn with_base_url(client: Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl PlacesDirectory for GooglePlacesClient {
    async fn text_search(&self, city: &str, category: &str) -> Result<Vec<RawPlace>> {
        let query = format!("{category} in {city}");
        let url = format!(
            "{}/textsearch/json?query={}&key={}",
            self.base_url,
            urlencoding::encode(&query),
            self.api_key
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Places API error: {} - {}", status, body));
        }

        let body: TextSearchResponse = response.json().await?;

        match body.status.as_str() {
            "OK" | "ZERO_RESULTS" => Ok(body.results),
            status => Err(anyhow::anyhow!(
                "Places text search failed: {} - {}",
                status,
                body.error_message.unwrap_or_default()
            )),
        }
    }

    async fn get_details(&self, external_id: &str) -> Result<RawDetails> {
        let url = format!(
            "{}/details/json?place_id={}&fields={}&key={}",
            self.base_url,
            urlencoding::encode(external_id),
            urlencoding::encode(DETAILS_FIELDS),
            self.api_key
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Places API error: {} - {}", status, body));
        }

        let body: DetailsResponse = response.json().await?;

        if body.status != "OK" {
            return Err(anyhow::anyhow!(
                "Places details lookup failed for {}: {} - {}",
                external_id,
                body.status,
                body.error_message.unwrap_or_default()
            ));
        }

        body.result
            .ok_or_else(|| anyhow::anyhow!("Places details response missing result body"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_search_response_parses_listing_fields() {
        let json = r#"{
            "status": "OK",
            "results": [{
                "place_id": "abc123",
                "name": "Blue Note Bakery",
                "formatted_address": "100 Main St, Austin, TX",
                "geometry": {"location": {"lat": 30.27, "lng": -97.74}},
                "rating": 4.6,
                "user_ratings_total": 321,
                "business_status": "OPERATIONAL",
                "types": ["bakery", "food"]
            }]
        }"#;

        let parsed: TextSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.status, "OK");
        assert_eq!(parsed.results.len(), 1);
        let place = &parsed.results[0];
        assert_eq!(place.place_id, "abc123");
        assert_eq!(place.rating, Some(4.6));
        assert_eq!(
            place.geometry.as_ref().unwrap().location.as_ref().unwrap().lat,
            Some(30.27)
        );
    }

    #[test]
    fn details_response_tolerates_missing_fields() {
        let json = r#"{
            "status": "OK",
            "result": {
                "formatted_address": "100 Main St",
                "opening_hours": {"weekday_text": ["Monday: 7AM-3PM"]}
            }
        }"#;

        let parsed: DetailsResponse = serde_json::from_str(json).unwrap();
        let details = parsed.result.unwrap();
        assert!(details.website.is_none());
        assert_eq!(
            details.opening_hours.unwrap().weekday_text.unwrap().len(),
            1
        );
    }
}
