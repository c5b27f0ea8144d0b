use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use super::auditor::Auditor;
use super::sink::ResultSink;
use super::source::{SqliteRecordSource, open_store};
use crate::cli::Cli;
use crate::config::Config;
use crate::policy::MailboxPolicy;
use crate::util::{ensure_directory, report_file_name};

pub fn run(args: Cli) -> Result<()> {
    let config = Config::load(&args.config)?;
    let auditor_config = config.contact_auditor;

    let db_path = auditor_config
        .db
        .resolve_path()
        .context("couldn't load database path")?;
    let connection = open_store(&db_path, &auditor_config.db)
        .context("couldn't set up database client")?;
    let policy = MailboxPolicy::new(&auditor_config.forbidden_mail_domains)?;

    let mut sink = ResultSink::new();
    if args.to_stdout {
        sink = sink.with_stdout();
    }
    if args.to_file {
        ensure_directory(&args.output_dir)?;
        let report_path = args.output_dir.join(report_file_name(Local::now()));
        sink = sink.with_file(&report_path)?;
    }
    if sink.is_silent() {
        warn!("neither --to-stdout nor --to-file set; results will not be recorded");
    }

    info!(
        db_path = %db_path.display(),
        read_uncommitted = auditor_config.db.read_uncommitted,
        "running contact-auditor"
    );

    let mut source = SqliteRecordSource::new(&connection);
    let mut auditor = Auditor::new(policy, sink);
    let summary = auditor.run(&mut source)?;

    info!(
        records_scanned = summary.records_scanned,
        records_decoded = summary.records_decoded,
        records_with_problems = summary.records_with_problems,
        unmarshal_problems = summary.unmarshal_problems,
        validation_problems = summary.validation_problems,
        "audit finished successfully"
    );
    if let Some(path) = auditor.sink().report_path() {
        info!(path = %path.display(), "audit results were written");
    }

    Ok(())
}
