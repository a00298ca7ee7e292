use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use mail_attachments_archiver::{Archiver, ArchiverConfig, ImapBackend, ImapConfig};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON file holding the IMAP server and credentials
    #[clap(long)]
    imap: PathBuf,

    /// Path to the JSON file holding the mappings and the actions
    #[clap(long)]
    config: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let imap_config = ImapConfig::from_path(&args.imap)?;
    let config = ArchiverConfig::from_path(&args.config)?;

    let backend = ImapBackend::new(&imap_config)
        .with_context(|| format!("cannot open imap session for {}", imap_config.login))?;
    let report = Archiver::new(&config, &backend).run_and_close()?;

    info!("{}", report);

    Ok(())
}
