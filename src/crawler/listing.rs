//! Listing fetcher for the paginated search endpoint

use crate::config::SearchConfig;
use crate::crawler::FetchError;
use crate::http::RequestClient;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Method;
use serde::{Deserialize, Deserializer};
use url::Url;

/// One posting as it appears on a listing page
///
/// Only `id` is needed by the crawl; the rest is kept for log lines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingSummary {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub advertiser: Option<Advertiser>,
    #[serde(default)]
    pub listing_date: Option<String>,
    #[serde(default, deserialize_with = "location_label")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Advertiser {
    #[serde(default)]
    pub description: Option<String>,
}

impl PostingSummary {
    /// Summary with only an identifier
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            advertiser: None,
            listing_date: None,
            location: None,
        }
    }

    /// `title @ advertiser`, for logs
    pub fn label(&self) -> String {
        let title = self.title.as_deref().unwrap_or("untitled");
        match self.advertiser.as_ref().and_then(|a| a.description.as_deref()) {
            Some(advertiser) => format!("{} @ {}", title, advertiser),
            None => title.to_string(),
        }
    }
}

/// Search response; a page past the end has no `data`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    #[serde(default)]
    pub data: Vec<PostingSummary>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

/// Identifiers arrive as numbers from some endpoints and strings from others
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    match Id::deserialize(deserializer)? {
        Id::Text(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        Id::Text(_) => Err(serde::de::Error::custom("posting id is blank")),
        Id::Number(number) => Ok(number.to_string()),
    }
}

/// Location is a plain label on older responses and an object on newer ones
fn location_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Location {
        Label(String),
        Detailed { label: Option<String> },
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Location>::deserialize(deserializer)? {
        Some(Location::Label(label)) => Some(label),
        Some(Location::Detailed { label }) => label,
        Some(Location::Other(_)) | None => None,
    })
}

/// Fetches listing pages with the configured fixed facets
#[derive(Debug, Clone)]
pub struct ListingClient {
    client: RequestClient,
    base_url: Url,
    search: SearchConfig,
    page_size: u32,
    headers: HeaderMap,
}

impl ListingClient {
    pub fn new(
        client: RequestClient,
        search: &SearchConfig,
        page_size: u32,
    ) -> Result<Self, FetchError> {
        let base_url = Url::parse(&search.listing_url)?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            client,
            base_url,
            search: search.clone(),
            page_size,
            headers,
        })
    }

    /// Builds the search URL for a 1-based page number
    pub fn page_url(&self, page: u32) -> Url {
        let search = &self.search;
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("siteKey", &search.site_key)
            .append_pair("sourceSystem", &search.source_system)
            .append_pair("where", &search.location)
            .append_pair("page", &page.to_string())
            .append_pair("classification", &search.classification)
            .append_pair("workType", &search.work_type)
            .append_pair("pageSize", &self.page_size.to_string())
            .append_pair("include", &search.include)
            .append_pair("locale", &search.locale)
            .append_pair("source", &search.source)
            .append_pair("relatedSearchesCount", &search.related_searches_count.to_string())
            .append_pair("queryHints", &search.query_hints)
            .append_pair("facets", &search.facets)
            .append_pair("sortMode", &search.sort_mode);
        url
    }

    /// Fetches one page of summaries
    ///
    /// An empty result is the normal end-of-listing signal, not an error.
    pub async fn fetch(&self, page: u32) -> Result<Vec<PostingSummary>, FetchError> {
        let url = self.page_url(page);
        let response = self
            .client
            .send(Method::GET, &url, &self.headers, None)
            .await?;

        let listing: ListingResponse =
            response.json().map_err(|source| FetchError::Decode {
                what: "listing",
                source,
            })?;

        if listing.total_count == Some(0) {
            return Ok(Vec::new());
        }

        Ok(listing.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryPolicy;

    fn client() -> ListingClient {
        let http = RequestClient::new(reqwest::Client::new(), RetryPolicy::none());
        ListingClient::new(http, &SearchConfig::default(), 25).unwrap()
    }

    #[test]
    fn test_page_url_carries_all_parameters() {
        let url = client().page_url(3);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };

        assert_eq!(get("page").as_deref(), Some("3"));
        assert_eq!(get("pageSize").as_deref(), Some("25"));
        assert_eq!(get("where").as_deref(), Some("All Australia"));
        assert_eq!(get("sortMode").as_deref(), Some("ListedDate"));
        for key in [
            "siteKey",
            "sourceSystem",
            "classification",
            "workType",
            "include",
            "locale",
            "source",
            "relatedSearchesCount",
            "queryHints",
            "facets",
        ] {
            assert!(get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_numeric_and_string_ids() {
        let listing: ListingResponse = serde_json::from_str(
            r#"{"data":[{"id":80123456,"title":"Data Engineer"},{"id":"80123457"}],"totalCount":2}"#,
        )
        .unwrap();

        assert_eq!(listing.data[0].id, "80123456");
        assert_eq!(listing.data[1].id, "80123457");
        assert_eq!(listing.data[0].label(), "Data Engineer");
    }

    #[test]
    fn test_blank_id_rejected() {
        let result: Result<ListingResponse, _> = serde_json::from_str(r#"{"data":[{"id":" "}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_data_is_empty_page() {
        let listing: ListingResponse = serde_json::from_str(r#"{"totalCount":0}"#).unwrap();
        assert!(listing.data.is_empty());
    }

    #[test]
    fn test_label_with_advertiser() {
        let summary: PostingSummary = serde_json::from_str(
            r#"{"id":"1","title":"Analyst","advertiser":{"description":"Acme"}}"#,
        )
        .unwrap();
        assert_eq!(summary.label(), "Analyst @ Acme");
    }

    #[test]
    fn test_location_shapes() {
        let listing: ListingResponse = serde_json::from_str(
            r#"{"data":[{"id":"1","location":"Sydney NSW"},{"id":"2","location":{"label":"Perth WA"}},{"id":"3","location":[1]}]}"#,
        )
        .unwrap();
        assert_eq!(listing.data[0].location.as_deref(), Some("Sydney NSW"));
        assert_eq!(listing.data[1].location.as_deref(), Some("Perth WA"));
        assert_eq!(listing.data[2].location, None);
    }
}
