//! Detail fetcher for the posting GraphQL endpoint

use crate::config::DetailConfig;
use crate::crawler::FetchError;
use crate::http::RequestClient;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

const OPERATION_NAME: &str = "jobDetails";

const JOB_DETAILS_QUERY: &str = "\
query jobDetails($jobId: ID!, $jobDetailsViewedCorrelationId: String!, $sessionId: String!, \
$zone: Zone!, $locale: Locale!, $languageCode: LanguageCodeIso!, $countryCode: CountryCodeIso2!, \
$timezone: Timezone!, $visitorId: UUID!) {
  jobDetails(id: $jobId, tracking: {channel: \"WEB\", jobDetailsViewedCorrelationId: $jobDetailsViewedCorrelationId, sessionId: $sessionId}) {
    job {
      id
      title
      content(platform: WEB)
    }
  }
}";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailRequest<'a> {
    operation_name: &'static str,
    variables: DetailVariables<'a>,
    query: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailVariables<'a> {
    job_id: &'a str,
    job_details_viewed_correlation_id: String,
    session_id: String,
    visitor_id: String,
    zone: &'a str,
    locale: &'a str,
    language_code: &'a str,
    country_code: &'a str,
    timezone: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailData {
    job_details: Option<JobDetails>,
}

#[derive(Debug, Deserialize)]
struct JobDetails {
    job: Option<Job>,
}

#[derive(Debug, Deserialize)]
struct Job {
    content: Option<String>,
}

/// Fetches the HTML description of a single posting
#[derive(Debug, Clone)]
pub struct DetailClient {
    client: RequestClient,
    url: Url,
    config: DetailConfig,
    headers: HeaderMap,
}

impl DetailClient {
    pub fn new(client: RequestClient, config: &DetailConfig) -> Result<Self, FetchError> {
        let url = Url::parse(&config.url)?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            client,
            url,
            config: config.clone(),
            headers,
        })
    }

    /// Request body for one posting; tracking ids are fresh on every call
    fn request_body(&self, job_id: &str) -> Result<serde_json::Value, FetchError> {
        let config = &self.config;
        let request = DetailRequest {
            operation_name: OPERATION_NAME,
            variables: DetailVariables {
                job_id,
                job_details_viewed_correlation_id: Uuid::new_v4().to_string(),
                session_id: Uuid::new_v4().to_string(),
                visitor_id: Uuid::new_v4().to_string(),
                zone: &config.zone,
                locale: &config.locale,
                language_code: &config.language_code,
                country_code: &config.country_code,
                timezone: &config.timezone,
            },
            query: JOB_DETAILS_QUERY,
        };

        serde_json::to_value(&request).map_err(|source| FetchError::Decode {
            what: "detail request",
            source,
        })
    }

    /// Fetches the description markup for `job_id`
    ///
    /// Returns an empty string when the posting exists but has no content.
    pub async fn fetch(&self, job_id: &str) -> Result<String, FetchError> {
        let body = self.request_body(job_id)?;
        let response = self
            .client
            .send(Method::POST, &self.url, &self.headers, Some(&body))
            .await?;

        let envelope: GraphQlResponse<DetailData> =
            response.json().map_err(|source| FetchError::Decode {
                what: "detail",
                source,
            })?;

        description_from(job_id, envelope)
    }
}

fn description_from(
    job_id: &str,
    envelope: GraphQlResponse<DetailData>,
) -> Result<String, FetchError> {
    match envelope.data {
        Some(data) => Ok(data
            .job_details
            .and_then(|details| details.job)
            .and_then(|job| job.content)
            .unwrap_or_default()),
        None if !envelope.errors.is_empty() => {
            let messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
            Err(FetchError::GraphQl {
                job_id: job_id.to_string(),
                messages: messages.join("; "),
            })
        }
        None => Ok(String::new()),
    }
}
