// 🧾 Canonical expense record + identity key
//
// Record   = one normalized export row (immutable once built)
// Identity = the 5-tuple that decides "already transcribed"
// The key is for DEDUPLICATION only; ordering never participates.

use crate::classifier::{Destination, DestinationLabels};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    date: NaiveDate,
    destination: Destination,
    mode: String,
    route: String,
    amount: i64,

    /// Line in the source feed (1-based, header = line 1)
    source_line: usize,
}

impl Record {
    pub fn new(
        date: NaiveDate,
        destination: Destination,
        mode: impl Into<String>,
        route: impl Into<String>,
        amount: i64,
        source_line: usize,
    ) -> Self {
        Record {
            date,
            destination,
            mode: mode.into(),
            route: route.into(),
            amount: amount.abs(),
            source_line,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn source_line(&self) -> usize {
        self.source_line
    }

    /// Identity key as it would read back from the ledger
    pub fn identity_key(&self, labels: &DestinationLabels) -> IdentityKey {
        IdentityKey::new(
            self.date,
            labels.label(self.destination),
            &self.mode,
            &self.route,
            self.amount,
        )
    }
}

// ============================================================================
// IDENTITY KEY
// ============================================================================

/// (date, destination, mode, route, amount) with text trimmed.
/// Two rows are the same ledger entry iff their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
    pub date: NaiveDate,
    pub destination: String,
    pub mode: String,
    pub route: String,
    pub amount: i64,
}

impl IdentityKey {
    pub fn new(date: NaiveDate, destination: &str, mode: &str, route: &str, amount: i64) -> Self {
        IdentityKey {
            date,
            destination: destination.trim().to_string(),
            mode: mode.trim().to_string(),
            route: route.trim().to_string(),
            amount,
        }
    }

    /// Stable hex digest, handy for logs and reports
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}",
            self.date, self.destination, self.mode, self.route, self.amount
        ));
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// TESTS
// ============================================================================
