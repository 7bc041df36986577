//! Crawl orchestrator - the page loop and per-posting pipeline
//!
//! Pages are fetched strictly in order. Each new posting goes through
//! detail fetch, normalization, extraction and a store append; a failure in
//! any of those is logged and confined to that posting. Only the stop
//! conditions end the page loop.

use crate::config::{Config, CrawlConfig, Credential};
use crate::crawler::detail::DetailClient;
use crate::crawler::listing::{ListingClient, PostingSummary};
use crate::crawler::normalize::normalize;
use crate::extract::Extractor;
use crate::http::{RequestClient, RetryPolicy};
use crate::state::{CrawlPhase, CrawlReport, PostingOutcome, StopReason};
use crate::store::{DedupStore, PostingRecord};
use crate::HarvestError;
use chrono::Utc;
use std::collections::HashSet;
use std::time::Duration;

/// Drives one crawl run against a dedup store
pub struct Orchestrator<S: DedupStore> {
    crawl: CrawlConfig,
    record_empty: bool,
    listing: ListingClient,
    detail: DetailClient,
    extractor: Extractor,
    store: S,
    phase: CrawlPhase,
}

impl<S: DedupStore> Orchestrator<S> {
    /// Builds the network clients from `config` around an opened store
    pub fn new(config: &Config, credential: &Credential, store: S) -> Result<Self, HarvestError> {
        let client = RequestClient::from_config(&config.http, RetryPolicy::from(&config.retry))?;
        let listing = ListingClient::new(client.clone(), &config.search, config.crawl.page_size)?;
        let detail = DetailClient::new(client.clone(), &config.detail)?;
        let extractor = Extractor::new(client, &config.extraction, credential)?;

        Ok(Self::from_parts(
            config.crawl.clone(),
            config.output.record_empty_descriptions,
            listing,
            detail,
            extractor,
            store,
        ))
    }

    /// Assembles an orchestrator from already-built components
    pub fn from_parts(
        crawl: CrawlConfig,
        record_empty: bool,
        listing: ListingClient,
        detail: DetailClient,
        extractor: Extractor,
        store: S,
    ) -> Self {
        Self {
            crawl,
            record_empty,
            listing,
            detail,
            extractor,
            store,
            phase: CrawlPhase::Paging,
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs the page loop until a stop condition applies
    ///
    /// Never fails: per-posting errors are counted in the report and a
    /// listing that stays unavailable ends the loop like any other stop.
    pub async fn run(&mut self) -> CrawlReport {
        let mut report = CrawlReport::default();
        let start_time = std::time::Instant::now();
        let mut page: u32 = 1;

        tracing::info!(
            "Starting crawl: up to {} pages of {} postings, {} already stored",
            self.crawl.max_pages,
            self.crawl.page_size,
            self.store.len()
        );

        let stop = loop {
            self.advance(CrawlPhase::FetchingListing);
            let summaries = match self.listing.fetch(page).await {
                Ok(summaries) => summaries,
                Err(e) => {
                    tracing::error!("Listing page {} unavailable: {}", page, e);
                    break StopReason::ListingUnavailable { page };
                }
            };
            report.pages_fetched += 1;

            if summaries.is_empty() {
                break StopReason::Exhausted { page };
            }

            self.advance(CrawlPhase::FilteringNew);
            let listed = summaries.len();
            let fresh = self.filter_new(summaries);
            if fresh.is_empty() {
                break StopReason::FrontierReached { page };
            }

            tracing::info!("Page {}: {} new of {} postings", page, fresh.len(), listed);

            self.advance(CrawlPhase::ProcessingPostings);
            for summary in &fresh {
                let outcome = self.process_posting(summary).await;
                report.record(outcome);
            }

            if page >= self.crawl.max_pages {
                break StopReason::MaxPages { page };
            }

            self.advance(CrawlPhase::Paging);
            pause(self.crawl.page_delay()).await;
            page += 1;
        };

        self.advance(CrawlPhase::Stopped);
        report.stop_reason = Some(stop);

        tracing::info!(
            "Crawl stopped ({}): {} new postings processed, {} empty, {} failed across {} pages in {:?}",
            stop,
            report.processed,
            report.skipped_empty,
            report.failed,
            report.pages_fetched,
            start_time.elapsed()
        );

        report
    }

    /// Keeps summaries not yet in the store, in listing order
    ///
    /// An id repeated within the page is kept once.
    fn filter_new(&self, summaries: Vec<PostingSummary>) -> Vec<PostingSummary> {
        let mut seen = HashSet::new();
        summaries
            .into_iter()
            .filter(|summary| !self.store.contains(&summary.id))
            .filter(|summary| seen.insert(summary.id.clone()))
            .collect()
    }

    async fn process_posting(&mut self, summary: &PostingSummary) -> PostingOutcome {
        match self.try_process(summary).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Skipping posting {}: {}", summary.id, e);
                PostingOutcome::Failed
            }
        }
    }

    async fn try_process(&mut self, summary: &PostingSummary) -> Result<PostingOutcome, HarvestError> {
        let job_id = summary.id.as_str();
        tracing::debug!("Processing posting {} ({})", job_id, summary.label());

        let description = self.detail.fetch(job_id).await;
        pause(self.crawl.detail_delay()).await;
        let text = normalize(&description?);

        if text.is_empty() {
            return self.handle_empty(job_id);
        }

        let signals = self.extractor.extract(&text).await;
        pause(self.crawl.extraction_delay()).await;

        let record = PostingRecord::new(job_id, Utc::now(), signals?);
        self.store.append(&record)?;

        tracing::debug!(
            "Recorded posting {}: duration={} months={} start={}",
            job_id,
            record.duration_specified,
            record.duration_months,
            record.start_descriptor
        );

        Ok(PostingOutcome::Recorded)
    }

    fn handle_empty(&mut self, job_id: &str) -> Result<PostingOutcome, HarvestError> {
        if self.record_empty {
            self.store
                .append(&PostingRecord::empty_description(job_id, Utc::now()))?;
            tracing::info!("Posting {} has no description; recorded as empty", job_id);
            return Ok(PostingOutcome::MarkedEmpty);
        }

        tracing::warn!(
            "Posting {} has no description; skipped, will be fetched again next run",
            job_id
        );
        Ok(PostingOutcome::SkippedEmpty)
    }

    fn advance(&mut self, next: CrawlPhase) {
        if !self.phase.can_advance_to(next) {
            tracing::debug!("Unexpected phase change {} -> {}", self.phase, next);
        }
        tracing::trace!("Phase {} -> {}", self.phase, next);
        self.phase = next;
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
