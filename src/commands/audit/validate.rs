use std::fmt::Write as _;

use thiserror::Error;

use crate::model::{Problem, ProblemCategory};
use crate::policy::EmailPolicy;

pub const MAILTO_PREFIX: &str = "mailto:";
pub const MISSING_PREFIX_REASON: &str = "missing 'mailto:' prefix";

/// Every failing contact of one record, pre-rendered as report lines in
/// contact order.
#[derive(Debug, Error)]
#[error("{report}")]
pub struct ContactViolations {
    report: String,
    count: u64,
}

impl ContactViolations {
    pub fn report(&self) -> &str {
        &self.report
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

pub fn validate_contacts<P>(
    policy: &P,
    id: i64,
    created_at: &str,
    contacts: &[String],
) -> Result<(), ContactViolations>
where
    P: EmailPolicy + ?Sized,
{
    let mut report = String::new();
    let mut count = 0_u64;

    let mut record_problem = |contact: &str, reason: &str| {
        let problem = Problem {
            id,
            created_at,
            category: ProblemCategory::Validation,
            subject: contact.as_bytes(),
            reason,
        };
        let _ = write!(report, "{problem}");
        count += 1;
    };

    for contact in contacts {
        match contact.strip_prefix(MAILTO_PREFIX) {
            Some(address) => {
                if let Err(err) = policy.check(address) {
                    record_problem(contact, &err.to_string());
                }
            }
            None => record_problem(contact, MISSING_PREFIX_REASON),
        }
    }

    if count == 0 {
        return Ok(());
    }
    Err(ContactViolations { report, count })
}
