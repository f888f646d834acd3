//! CSV to database table loader.
//!
//! Reads a fixed set of CSV files from a directory and replaces one database
//! table per file. The run is sequential over a single connection and stops
//! at the first failure.
//!
//! # Guarantees
//! - Connection strings are only ever logged with the password redacted
//! - Each table is replaced inside its own transaction
//! - Tables are processed in list order; nothing after a failure is touched

use clap::Parser;
use csvload::{Cli, run};
use csvload_core::{Result, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.global.verbose, cli.global.quiet)?;

    run(&cli).await
}
