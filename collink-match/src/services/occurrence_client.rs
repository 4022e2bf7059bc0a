//! Occurrence search client (GBIF)
//!
//! Harvests `recordedBy` values for a taxon and year range, splitting each
//! into candidate names and deduplicating them into a `CollectorSet`.
//!
//! Pagination is exposed as a cursor (`OccurrencePages`) so a harvest can be
//! resumed from a known offset after a failure. Each cursor stops with
//! `PageLimitExceeded` if the source never reports the end of records.

use crate::error::{ReconcileError, ReconcileResult};
use crate::names::{split, DelimiterPattern};
use crate::services::http::{build_client, check_status, endpoint, read_json};
use crate::types::CollectorSet;
use crate::utils::retry::{retry_transient, RetryPolicy};
use collink_common::config::{HarvestConfig, HttpConfig, TomlConfig};
use reqwest::Client;
use serde::Deserialize;

/// One occurrence record; only the collector field is read
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OccurrenceRecord {
    #[serde(rename = "recordedBy", default)]
    pub recorded_by: Option<String>,
}

/// One page of occurrence search results
#[derive(Debug, Clone, Deserialize)]
pub struct OccurrencePage {
    pub results: Vec<OccurrenceRecord>,
    #[serde(rename = "endOfRecords")]
    pub end_of_records: bool,
}

#[derive(Debug, Deserialize)]
struct SpeciesResponse {
    #[serde(rename = "scientificName")]
    scientific_name: Option<String>,
}

/// Taxon and year range to harvest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceQuery {
    pub start_year: i32,
    pub end_year: i32,
    pub taxon_key: u64,
}

/// Occurrence search client
pub struct OccurrenceClient {
    http_client: Client,
    base_url: String,
    page_size: u32,
    max_pages: u32,
    basis_of_record: String,
    delimiters: DelimiterPattern,
    retry: RetryPolicy,
}

impl OccurrenceClient {
    pub fn new(
        base_url: impl Into<String>,
        http: &HttpConfig,
        harvest: &HarvestConfig,
    ) -> ReconcileResult<Self> {
        Ok(Self {
            http_client: build_client(http)?,
            base_url: base_url.into(),
            page_size: harvest.page_size.max(1),
            max_pages: harvest.max_pages.max(1),
            basis_of_record: harvest.basis_of_record.clone(),
            delimiters: DelimiterPattern::default(),
            retry: RetryPolicy::from_config(http),
        })
    }

    pub fn from_config(config: &TomlConfig) -> ReconcileResult<Self> {
        Self::new(&config.endpoints.occurrence_base, &config.http, &config.harvest)
    }

    /// Use a different delimiter set when splitting collector strings
    pub fn with_delimiters(mut self, delimiters: DelimiterPattern) -> Self {
        self.delimiters = delimiters;
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Cursor over result pages, starting at offset 0
    pub fn pages(&self, query: OccurrenceQuery) -> OccurrencePages<'_> {
        self.pages_from(query, 0)
    }

    /// Cursor over result pages, resuming at `offset`
    pub fn pages_from(&self, query: OccurrenceQuery, offset: u64) -> OccurrencePages<'_> {
        OccurrencePages {
            client: self,
            query,
            offset,
            pages_fetched: 0,
            finished: false,
        }
    }

    /// Collect every distinct collector name for the query
    ///
    /// Fails as a whole if any page request fails.
    pub async fn harvest(
        &self,
        start_year: i32,
        end_year: i32,
        taxon_key: u64,
    ) -> ReconcileResult<CollectorSet> {
        let query = OccurrenceQuery {
            start_year,
            end_year,
            taxon_key,
        };
        self.harvest_query(query).await
    }

    pub async fn harvest_query(&self, query: OccurrenceQuery) -> ReconcileResult<CollectorSet> {
        tracing::info!(
            start_year = query.start_year,
            end_year = query.end_year,
            taxon_key = query.taxon_key,
            "Harvesting collector names"
        );

        let mut collectors = CollectorSet::new();
        let mut records = 0usize;
        let mut pages = self.pages(query);

        while let Some(page) = pages.next_page().await? {
            records += page.results.len();
            self.collect_names(&page, &mut collectors);
        }

        tracing::info!(
            records,
            pages = pages.pages_fetched(),
            collectors = collectors.len(),
            "Harvest complete"
        );
        Ok(collectors)
    }

    /// Split every collector field on a page into `collectors`
    pub fn collect_names(&self, page: &OccurrencePage, collectors: &mut CollectorSet) {
        for recorded_by in page.results.iter().filter_map(|r| r.recorded_by.as_deref()) {
            collectors.extend(split(recorded_by, &self.delimiters));
        }
    }

    /// Human-readable scientific name for a species key
    pub async fn species_label(&self, species_key: u64) -> ReconcileResult<String> {
        let url = endpoint(&self.base_url, &format!("species/{}", species_key));

        let http_client = &self.http_client;
        let url = url.as_str();

        let species: SpeciesResponse =
            retry_transient("species lookup", self.retry, move || async move {
                tracing::debug!(species_key, url, "Querying species API");
                let response = check_status(http_client.get(url).send().await?).await?;
                read_json(response, "species").await
            })
            .await?;

        species.scientific_name.ok_or_else(|| {
            ReconcileError::Parse(format!("species {} has no scientificName", species_key))
        })
    }

    async fn fetch_page(&self, query: &OccurrenceQuery, offset: u64) -> ReconcileResult<OccurrencePage> {
        let url = endpoint(&self.base_url, "occurrence/search");
        let year = format!("{},{}", query.start_year, query.end_year);
        let params = [
            ("year", year),
            ("basisOfRecord", self.basis_of_record.clone()),
            ("taxonKey", query.taxon_key.to_string()),
            ("limit", self.page_size.to_string()),
            ("offset", offset.to_string()),
        ];

        let http_client = &self.http_client;
        let url = url.as_str();
        let params = &params;
        let taxon_key = query.taxon_key;

        retry_transient("occurrence search", self.retry, move || async move {
            tracing::debug!(offset, taxon_key, "Fetching occurrence page");
            let response = http_client.get(url).query(params).send().await?;
            let response = check_status(response).await?;
            read_json(response, "occurrence search").await
        })
        .await
    }
}

/// Lazy, resumable cursor over occurrence result pages
///
/// A failed `next_page` leaves the offset untouched, so calling it again
/// retries the same page.
pub struct OccurrencePages<'a> {
    client: &'a OccurrenceClient,
    query: OccurrenceQuery,
    offset: u64,
    pages_fetched: u32,
    finished: bool,
}

impl OccurrencePages<'_> {
    /// Offset of the next page to fetch
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fetch the next page, or `None` once the source reported the end
    pub async fn next_page(&mut self) -> ReconcileResult<Option<OccurrencePage>> {
        if self.finished {
            return Ok(None);
        }

        if self.pages_fetched >= self.client.max_pages {
            tracing::error!(
                pages = self.pages_fetched,
                offset = self.offset,
                "Occurrence source never reported end of records"
            );
            return Err(ReconcileError::PageLimitExceeded {
                pages: self.pages_fetched,
                offset: self.offset,
            });
        }

        let page = self.client.fetch_page(&self.query, self.offset).await?;

        self.pages_fetched += 1;
        self.offset += u64::from(self.client.page_size);
        self.finished = page.end_of_records;

        Ok(Some(page))
    }
}
