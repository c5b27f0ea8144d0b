use std::fmt;

use serde::Serialize;

use crate::util::{quote_bytes, quote_str};

/// One registration row as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub raw_contact: Vec<u8>,
    pub created_at: String,
}

/// A record whose contact payload decoded, as handed to an observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditedRecord {
    pub id: i64,
    pub contacts: Vec<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProblemCategory {
    Unmarshal,
    Validation,
}

impl ProblemCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unmarshal => "unmarshal",
            Self::Validation => "validation",
        }
    }
}

/// A single diagnostic finding. Displays as one tab-separated report line,
/// newline included.
#[derive(Debug, Clone, Copy)]
pub struct Problem<'a> {
    pub id: i64,
    pub created_at: &'a str,
    pub category: ProblemCategory,
    pub subject: &'a [u8],
    pub reason: &'a str,
}

impl fmt::Display for Problem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.id,
            self.created_at,
            self.category.as_str(),
            quote_bytes(self.subject),
            quote_str(self.reason)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub records_scanned: u64,
    pub records_decoded: u64,
    pub unmarshal_problems: u64,
    pub validation_problems: u64,
    pub records_with_problems: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_renders_as_tab_separated_line() {
        let problem = Problem {
            id: 7,
            created_at: "2024-01-01T00:00:00Z",
            category: ProblemCategory::Validation,
            subject: b"tel:+123",
            reason: "missing 'mailto:' prefix",
        };

        assert_eq!(
            problem.to_string(),
            "7\t2024-01-01T00:00:00Z\tvalidation\t\"tel:+123\"\t\"missing 'mailto:' prefix\"\n"
        );
    }
}
