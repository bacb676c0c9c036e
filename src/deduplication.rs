// 🔍 Deduplication Engine - keep only net-new records
// One strategy: exact IdentityKey membership against what the ledger already holds.

use crate::classifier::DestinationLabels;
use crate::record::{IdentityKey, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// DEDUPLICATION OUTCOME
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeduplicationOutcome {
    /// Records to append, in input order
    pub net_new: Vec<Record>,

    /// Records whose key is already in the ledger
    pub duplicates: Vec<Record>,
}

impl DeduplicationOutcome {
    pub fn skipped(&self) -> usize {
        self.duplicates.len()
    }
}

// ============================================================================
// DEDUPLICATION ENGINE
// ============================================================================

pub struct DeduplicationEngine<'a> {
    /// Keys read back from the ledger
    existing: &'a HashSet<IdentityKey>,

    /// Labels used to render a record's destination into its key
    labels: &'a DestinationLabels,
}

impl<'a> DeduplicationEngine<'a> {
    pub fn new(existing: &'a HashSet<IdentityKey>, labels: &'a DestinationLabels) -> Self {
        DeduplicationEngine { existing, labels }
    }

    pub fn is_transcribed(&self, record: &Record) -> bool {
        self.existing.contains(&record.identity_key(self.labels))
    }

    /// Pure filter; neither input is touched.
    ///
    /// Two identical records in the same feed are both kept when the ledger
    /// does not hold their key yet; only keys already in the ledger count.
    pub fn partition(&self, records: &[Record]) -> DeduplicationOutcome {
        let (duplicates, net_new): (Vec<Record>, Vec<Record>) = records
            .iter()
            .cloned()
            .partition(|record| self.is_transcribed(record));

        DeduplicationOutcome { net_new, duplicates }
    }

    pub fn filter_new(&self, records: &[Record]) -> Vec<Record> {
        self.partition(records).net_new
    }
}

// ============================================================================
// TESTS
// ============================================================================
