use std::sync::mpsc::Sender;

use anyhow::{Result, bail};
use tracing::info;

use super::decode::decode_contacts;
use super::sink::ResultSink;
use super::source::RecordSource;
use super::validate::validate_contacts;
use crate::model::{AuditSummary, AuditedRecord, Problem, ProblemCategory, Record};
use crate::policy::EmailPolicy;

pub const INCOMPLETE_RESULTS_CONTEXT: &str = "audit was interrupted, results may be incomplete";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AuditState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// Drives one audit pass: every record from the source is decoded,
/// validated and reported before the next one is read.
pub struct Auditor<P> {
    policy: P,
    sink: ResultSink,
    observer: Option<Sender<AuditedRecord>>,
    state: AuditState,
}

impl<P: EmailPolicy> Auditor<P> {
    pub fn new(policy: P, sink: ResultSink) -> Self {
        Self {
            policy,
            sink,
            observer: None,
            state: AuditState::NotStarted,
        }
    }

    /// Receives a copy of every record whose payload decoded. The channel is
    /// closed once the run ends.
    #[allow(dead_code)]
    pub fn with_observer(mut self, observer: Sender<AuditedRecord>) -> Self {
        self.observer = Some(observer);
        self
    }

    #[allow(dead_code)]
    pub fn state(&self) -> AuditState {
        self.state
    }

    pub fn sink(&self) -> &ResultSink {
        &self.sink
    }

    pub fn run<S>(&mut self, source: &mut S) -> Result<AuditSummary>
    where
        S: RecordSource + ?Sized,
    {
        if self.state != AuditState::NotStarted {
            bail!("audit already ran (state {:?})", self.state);
        }

        self.state = AuditState::Running;
        let observer = self.observer.take();
        let mut summary = AuditSummary::default();

        info!("beginning database query");
        let streamed = source.stream(&mut |record: Record| {
            self.audit_record(record, observer.as_ref(), &mut summary);
        });
        drop(observer);

        match streamed {
            Ok(rows) => {
                self.state = AuditState::Completed;
                info!(rows, "query completed successfully");
                Ok(summary)
            }
            Err(err) => {
                self.state = AuditState::Failed;
                Err(anyhow::Error::new(err).context(INCOMPLETE_RESULTS_CONTEXT))
            }
        }
    }

    fn audit_record(
        &mut self,
        record: Record,
        observer: Option<&Sender<AuditedRecord>>,
        summary: &mut AuditSummary,
    ) {
        summary.records_scanned += 1;
        let mut has_problem = false;

        let decoded = decode_contacts(&record.raw_contact);
        let contacts: &[String] = match &decoded {
            Ok(contacts) => contacts.as_slice(),
            Err(err) => {
                let reason = err.to_string();
                let problem = Problem {
                    id: record.id,
                    created_at: &record.created_at,
                    category: ProblemCategory::Unmarshal,
                    subject: &record.raw_contact,
                    reason: &reason,
                };
                self.sink.write(&problem.to_string());
                summary.unmarshal_problems += 1;
                has_problem = true;
                &[]
            }
        };

        // An undecodable payload validates as an empty list and adds nothing.
        if let Err(violations) =
            validate_contacts(&self.policy, record.id, &record.created_at, contacts)
        {
            self.sink.write(violations.report());
            summary.validation_problems += violations.count();
            has_problem = true;
        }

        if has_problem {
            summary.records_with_problems += 1;
        }

        if let Ok(contacts) = decoded {
            summary.records_decoded += 1;
            if let Some(observer) = observer {
                // A dropped receiver only ends the observation.
                let _ = observer.send(AuditedRecord {
                    id: record.id,
                    contacts,
                    created_at: record.created_at,
                });
            }
        }
    }
}
