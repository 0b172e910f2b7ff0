//! Paginated scan driver
//!
//! Walks a whole table one page at a time, strictly sequentially, following
//! the store's continuation tokens. See [`Cursor::advance`] for how the next
//! position is chosen when the store omits a token.

use super::cursor::{Cursor, IncompleteReason, ScanStatus};
use crate::adapters::tablestore::{StoreResult, TableClient};
use crate::config::{ScanConfig, MAX_PAGE_SIZE};
use crate::domain::Record;
use futures::stream::{self, Stream, StreamExt};
use std::time::Duration;

/// Tuning for one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// `$top` hint, clamped to the store's per-request cap
    pub page_size: usize,
    /// Hard ceiling on pages fetched
    pub max_pages: usize,
    /// Pause between page requests
    pub page_delay: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&ScanConfig::default())
    }
}

impl From<&ScanConfig> for ScanOptions {
    fn from(config: &ScanConfig) -> Self {
        Self {
            page_size: config.page_size,
            max_pages: config.max_pages,
            page_delay: Duration::from_millis(config.page_delay_ms),
        }
    }
}

impl ScanOptions {
    fn hint(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

/// One delivered page
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number within the scan
    pub number: usize,
    pub records: Vec<Record>,
    /// Whether the store indicated more records after this page
    pub has_more: bool,
}

/// Everything a finished scan produced
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub records: Vec<Record>,
    pub pages: usize,
    pub status: ScanStatus,
}

impl ScanReport {
    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }
}

/// A lazy, finite, non-restartable scan over one table
///
/// Each call to [`TableScan::next_page`] issues at most one request. Once the
/// scan has finished, [`TableScan::status`] tells how.
pub struct TableScan {
    client: TableClient,
    table: String,
    options: ScanOptions,
    cursor: Cursor,
    pages: usize,
    status: Option<ScanStatus>,
}

impl TableScan {
    pub fn new(client: TableClient, table: impl Into<String>, options: ScanOptions) -> Self {
        Self {
            client,
            table: table.into(),
            options,
            cursor: Cursor::Start,
            pages: 0,
            status: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Pages delivered so far
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Final status, `None` while the scan can still deliver pages
    pub fn status(&self) -> Option<&ScanStatus> {
        self.status.as_ref()
    }

    /// Fetches the next page, or `None` once the scan has finished
    pub async fn next_page(&mut self) -> Option<Page> {
        if self.status.is_some() {
            return None;
        }
        if self.pages >= self.options.max_pages {
            self.finish(ScanStatus::PossiblyIncomplete(IncompleteReason::PageLimit {
                max_pages: self.options.max_pages,
            }));
            return None;
        }
        if self.pages > 0 && !self.options.page_delay.is_zero() {
            tokio::time::sleep(self.options.page_delay).await;
        }

        let hint = self.options.hint();
        let resume = self.cursor.token();
        let response = match self.client.query_page(&self.table, hint, resume.as_ref()).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    table = %self.table,
                    page = self.pages + 1,
                    error = %e,
                    "Scan page request failed, aborting scan"
                );
                self.finish(ScanStatus::Aborted(e));
                return None;
            }
        };

        let raw_len = response.records.len();
        let last_key = response.records.last().map(|r| r.key.clone());
        let mut records = response.records;

        // An anchored cursor is inclusive; the anchor was already delivered.
        if let Cursor::Anchored(anchor) = &self.cursor {
            if records.first().is_some_and(|r| &r.key == anchor) {
                records.remove(0);
            }
        }

        self.pages += 1;

        match self.cursor.advance(
            raw_len,
            hint,
            response.body_token,
            response.header_token,
            last_key.as_ref(),
        ) {
            Ok(Cursor::Exhausted) => {
                self.cursor = Cursor::Exhausted;
                self.finish(ScanStatus::Complete);
            }
            Ok(next) => {
                if matches!(next, Cursor::Anchored(_)) {
                    tracing::debug!(
                        table = %self.table,
                        page = self.pages,
                        "Full page without continuation token, resuming from last record"
                    );
                }
                self.cursor = next;
            }
            Err(reason) => self.finish(ScanStatus::PossiblyIncomplete(reason)),
        }

        let has_more = self.status.is_none();
        if has_more && self.pages >= self.options.max_pages {
            self.finish(ScanStatus::PossiblyIncomplete(IncompleteReason::PageLimit {
                max_pages: self.options.max_pages,
            }));
        }

        crate::log_scan_page!(self.table, self.pages, records.len(), has_more);

        Some(Page {
            number: self.pages,
            records,
            has_more,
        })
    }

    /// Pages as a stream; the scan's status is readable once it ends
    pub fn pages(&mut self) -> impl Stream<Item = Page> + '_ {
        stream::unfold(self, |scan| async move {
            let page = scan.next_page().await?;
            Some((page, scan))
        })
    }

    /// Records as a stream, in delivery order
    pub fn records(&mut self) -> impl Stream<Item = Record> + '_ {
        self.pages().flat_map(|page| stream::iter(page.records))
    }

    /// Drives the scan to the end and gathers every record
    pub async fn collect(mut self) -> ScanReport {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await {
            records.extend(page.records);
        }
        ScanReport {
            records,
            pages: self.pages,
            status: self.status.unwrap_or(ScanStatus::Complete),
        }
    }

    fn finish(&mut self, status: ScanStatus) {
        match &status {
            ScanStatus::Complete => {
                tracing::info!(table = %self.table, pages = self.pages, "Scan complete");
            }
            ScanStatus::PossiblyIncomplete(reason) => {
                tracing::warn!(
                    table = %self.table,
                    pages = self.pages,
                    reason = %reason,
                    "Scan stopped early, results may be incomplete"
                );
            }
            ScanStatus::Aborted(_) => {}
        }
        self.status = Some(status);
    }
}

/// First page of a table plus whether more exist
#[derive(Debug, Clone, PartialEq)]
pub struct FirstPage {
    pub records: Vec<Record>,
    pub has_more: bool,
}

/// Fetches only the first page of `table`
///
/// # Errors
///
/// Returns the store error if the page request fails.
pub async fn first_page(
    client: &TableClient,
    table: &str,
    options: ScanOptions,
) -> StoreResult<FirstPage> {
    let mut scan = TableScan::new(client.clone(), table, ScanOptions { max_pages: 1, ..options });
    let page = scan.next_page().await;
    match (page, scan.status) {
        (_, Some(ScanStatus::Aborted(e))) => Err(e),
        (Some(page), _) => Ok(FirstPage {
            records: page.records,
            has_more: page.has_more,
        }),
        (None, _) => Ok(FirstPage {
            records: Vec::new(),
            has_more: false,
        }),
    }
}
