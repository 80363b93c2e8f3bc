use std::fmt;

use serde::Serialize;

use crate::KeyValue;

/// Phases a job moves through, in order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum JobState {
    Pending,
    Mapping,
    Shuffling,
    Reducing,
    Completed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Pending => "pending",
            JobState::Mapping => "mapping",
            JobState::Shuffling => "shuffling",
            JobState::Reducing => "reducing",
            JobState::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// A record the map function rejected. The record was skipped and
/// contributed nothing to the output.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RecordFailure {
    pub record: String,
    pub error: String,
}

/// A key whose reduce invocation failed. No result was written for it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct KeyFailure {
    pub key: String,
    pub error: String,
}

/// Everything a completed job produced.
#[derive(Clone, Debug, Default)]
pub struct JobReport {
    /// One entry per successfully reduced key, sorted by key.
    pub results: Vec<KeyValue>,
    pub failed_records: Vec<RecordFailure>,
    pub failed_keys: Vec<KeyFailure>,
    pub records: u64,
    pub emissions: u64,
    pub keys: u64,
}

impl JobReport {
    /// Whether every record and every key was processed without error.
    pub fn is_clean(&self) -> bool {
        self.failed_records.is_empty() && self.failed_keys.is_empty()
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            records: self.records,
            emissions: self.emissions,
            keys: self.keys,
            results: self.results.len() as u64,
            failed_records: self.failed_records.clone(),
            failed_keys: self.failed_keys.clone(),
        }
    }
}

/// Serializable digest of a [`JobReport`], without the results themselves.
#[derive(Clone, Debug, Serialize)]
pub struct JobSummary {
    pub records: u64,
    pub emissions: u64,
    pub keys: u64,
    pub results: u64,
    pub failed_records: Vec<RecordFailure>,
    pub failed_keys: Vec<KeyFailure>,
}
