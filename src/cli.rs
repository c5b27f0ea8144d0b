use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "contact-auditor",
    version,
    about = "Audit stored registration contacts for corruption and policy violations"
)]
pub struct Cli {
    /// JSON config file.
    #[arg(long)]
    pub config: PathBuf,

    /// Print the audit results to stdout.
    #[arg(long, default_value_t = false)]
    pub to_stdout: bool,

    /// Write the audit results to a timestamped report file.
    #[arg(long, default_value_t = false)]
    pub to_file: bool,

    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}
