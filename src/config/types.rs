use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Tidemark
///
/// Built once at startup and handed to every component constructor.
/// Every key has a default so a run without a config file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub crawl: CrawlConfig,
    pub retry: RetryConfig,
    pub search: SearchConfig,
    pub detail: DetailConfig,
    pub extraction: ExtractionConfig,
    pub http: HttpConfig,
}

/// Where and how postings are recorded
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the CSV posting store
    pub store_path: String,

    /// Append a sentinel row for postings whose description is empty,
    /// so later runs do not fetch them again
    pub record_empty_descriptions: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            store_path: "data/postings.csv".to_string(),
            record_empty_descriptions: false,
        }
    }
}

/// Page loop limits and pacing
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Maximum number of listing pages per run
    pub max_pages: u32,

    /// Listing page size
    pub page_size: u32,

    /// Pause after each detail request (milliseconds)
    pub detail_delay_ms: u64,

    /// Pause after each extraction request (milliseconds)
    pub extraction_delay_ms: u64,

    /// Pause between listing pages (milliseconds)
    pub page_delay_ms: u64,
}

impl CrawlConfig {
    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }

    pub fn extraction_delay(&self) -> Duration {
        Duration::from_millis(self.extraction_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 20,
            page_size: 100,
            detail_delay_ms: 500,
            extraction_delay_ms: 4000,
            page_delay_ms: 1000,
        }
    }
}

/// Retry behaviour shared by every outbound request
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Total attempts per request, including the first
    pub max_attempts: u32,

    /// Base delay; attempt n+1 waits 2^n times this (milliseconds)
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 250,
        }
    }
}

/// Listing endpoint and its fixed search facets
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SearchConfig {
    pub listing_url: String,
    pub site_key: String,
    pub source_system: String,
    #[serde(rename = "where")]
    pub location: String,
    pub classification: String,
    pub work_type: String,
    pub include: String,
    pub locale: String,
    pub source: String,
    pub related_searches_count: u32,
    pub query_hints: String,
    pub facets: String,

    /// Must yield newest-first ordering; the frontier stop depends on it
    pub sort_mode: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://www.seek.com.au/api/jobsearch/v5/search".to_string(),
            site_key: "AU-Main".to_string(),
            source_system: "houston".to_string(),
            location: "All Australia".to_string(),
            classification: "6281".to_string(),
            work_type: "244".to_string(),
            include: "seodata,relatedsearches,joracrosslink,gptTargeting,pills".to_string(),
            locale: "en-AU".to_string(),
            source: "FE_SERP".to_string(),
            related_searches_count: 12,
            query_hints: "spellingCorrection".to_string(),
            facets: "salaryMin,workArrangement,workType".to_string(),
            sort_mode: "ListedDate".to_string(),
        }
    }
}

/// Detail (GraphQL) endpoint and request locale
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DetailConfig {
    pub url: String,
    pub zone: String,
    pub locale: String,
    pub language_code: String,
    pub country_code: String,
    pub timezone: String,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            url: "https://www.seek.com.au/graphql".to_string(),
            zone: "anz-1".to_string(),
            locale: "en-AU".to_string(),
            language_code: "en".to_string(),
            country_code: "AU".to_string(),
            timezone: "Australia/Sydney".to_string(),
        }
    }
}

/// Generative extraction endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractionConfig {
    /// API base, without the `/models/...` suffix
    pub endpoint: String,
    pub model: String,

    /// Name of the environment variable holding the API key
    pub credential_env: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            credential_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "Mozilla/5.0 (compatible; tidemark/{})",
                env!("CARGO_PKG_VERSION")
            ),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}
