//! Scan cursor and completion status

use crate::adapters::tablestore::ContinuationToken;
use crate::domain::{RecordKey, TableStoreError};
use std::fmt;

/// Position of a scan in its cursor chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// No page fetched yet
    Start,
    /// Resume at a token issued by the store
    Resume(ContinuationToken),
    /// Resume at (and including) a record key taken from the last full page
    /// because the store issued no token
    Anchored(RecordKey),
    /// The store reported the end of the table
    Exhausted,
}

impl Cursor {
    /// Continuation parameters for the next request
    pub fn token(&self) -> Option<ContinuationToken> {
        match self {
            Cursor::Resume(token) => Some(token.clone()),
            Cursor::Anchored(key) => Some(ContinuationToken {
                next_partition_key: key.partition_key().to_string(),
                next_row_key: Some(key.row_key().to_string()),
            }),
            Cursor::Start | Cursor::Exhausted => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Cursor::Exhausted)
    }

    /// Computes the cursor following a page
    ///
    /// A body token wins over a header token. A page shorter than `hint`
    /// without a token ends the scan. A full page without a token anchors at
    /// its last record.
    ///
    /// # Errors
    ///
    /// Returns the reason the chain cannot continue safely: a full page with
    /// no record to anchor at, or a cursor identical to the current one.
    pub fn advance(
        &self,
        page_len: usize,
        hint: usize,
        body_token: Option<ContinuationToken>,
        header_token: Option<ContinuationToken>,
        last_key: Option<&RecordKey>,
    ) -> Result<Cursor, IncompleteReason> {
        let next = match body_token.or(header_token) {
            Some(token) => Cursor::Resume(token),
            None if page_len < hint => return Ok(Cursor::Exhausted),
            None => match last_key {
                Some(key) => Cursor::Anchored(key.clone()),
                None => return Err(IncompleteReason::MissingCursor),
            },
        };

        if next == *self {
            return Err(IncompleteReason::StalledCursor);
        }
        Ok(next)
    }
}

/// Why a scan stopped before the store reported the end of the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteReason {
    /// The page ceiling was reached with more pages outstanding
    PageLimit { max_pages: usize },
    /// A full page arrived with no token and no record to resume from
    MissingCursor,
    /// The next cursor equals the current one; continuing would loop
    StalledCursor,
}

impl fmt::Display for IncompleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncompleteReason::PageLimit { max_pages } => {
                write!(f, "page limit of {max_pages} reached")
            }
            IncompleteReason::MissingCursor => write!(f, "continuation cursor missing"),
            IncompleteReason::StalledCursor => write!(f, "continuation cursor did not advance"),
        }
    }
}

/// Final state of a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    /// Every record was delivered
    Complete,
    /// The scan stopped early; records delivered so far are valid
    PossiblyIncomplete(IncompleteReason),
    /// A page request failed; records delivered before it are valid
    Aborted(TableStoreError),
}

impl ScanStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, ScanStatus::Complete)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanStatus::Complete => write!(f, "complete"),
            ScanStatus::PossiblyIncomplete(reason) => write!(f, "possibly incomplete ({reason})"),
            ScanStatus::Aborted(error) => write!(f, "aborted ({error})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(pk: &str, rk: &str) -> ContinuationToken {
        ContinuationToken {
            next_partition_key: pk.to_string(),
            next_row_key: Some(rk.to_string()),
        }
    }

    fn key(rk: &str) -> RecordKey {
        RecordKey::new("patient", rk).unwrap()
    }

    #[test]
    fn test_body_token_wins() {
        let next = Cursor::Start
            .advance(10, 10, Some(token("b", "1")), Some(token("h", "1")), None)
            .unwrap();
        assert_eq!(next, Cursor::Resume(token("b", "1")));
    }

    #[test]
    fn test_header_token_used_without_body_token() {
        let next = Cursor::Start
            .advance(3, 10, None, Some(token("h", "1")), None)
            .unwrap();
        assert_eq!(next, Cursor::Resume(token("h", "1")));
    }

    #[test]
    fn test_short_page_without_token_exhausts() {
        let next = Cursor::Start.advance(3, 10, None, None, Some(&key("File 3"))).unwrap();
        assert!(next.is_exhausted());
    }

    #[test]
    fn test_full_page_without_token_anchors_at_last_record() {
        let next = Cursor::Start
            .advance(10, 10, None, None, Some(&key("File 10")))
            .unwrap();
        assert_eq!(next, Cursor::Anchored(key("File 10")));
        assert_eq!(next.token(), Some(token("patient", "File 10")));
    }

    #[test]
    fn test_full_page_without_anchor_is_incomplete() {
        let result = Cursor::Start.advance(10, 10, None, None, None);
        assert_eq!(result, Err(IncompleteReason::MissingCursor));
    }

    #[test]
    fn test_repeated_cursor_is_stalled() {
        let anchored = Cursor::Anchored(key("File 1"));
        assert_eq!(
            anchored.advance(1, 1, None, None, Some(&key("File 1"))),
            Err(IncompleteReason::StalledCursor)
        );

        let resumed = Cursor::Resume(token("p", "r"));
        assert_eq!(
            resumed.advance(5, 5, Some(token("p", "r")), None, None),
            Err(IncompleteReason::StalledCursor)
        );
    }

    #[test]
    fn test_status_display() {
        let status = ScanStatus::PossiblyIncomplete(IncompleteReason::PageLimit { max_pages: 5 });
        assert_eq!(status.to_string(), "possibly incomplete (page limit of 5 reached)");
        assert!(ScanStatus::Complete.is_complete());
    }
}
