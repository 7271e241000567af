//! Battle ticket issuer CLI

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use battle_ticket::{
    ExportOutcome, KeySetupManager, ProofIssuer, Relation, SpartanBackend, TicketConfig,
    VerifierExporter,
};

const DEMO_ADDRESS: &str = "0x35134987bB541607Cd45e62Dd1feA4F587607817";

#[derive(Parser)]
#[command(name = "battle-ticket")]
#[command(about = "Issue a zero-knowledge battle ticket proof", long_about = None)]
struct Cli {
    /// Holder address (20-byte hex)
    #[arg(long, default_value = DEMO_ADDRESS)]
    user: String,

    /// Token contract address (20-byte hex)
    #[arg(long, default_value = DEMO_ADDRESS)]
    token: String,

    /// Token balance held by the user
    #[arg(long, default_value_t = 30, allow_hyphen_values = true)]
    balance: i128,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &cli.config {
        Some(path) => TicketConfig::load(path)?,
        None => TicketConfig::default(),
    };

    let backend = Arc::new(SpartanBackend::new(config.contract_name.clone()));
    let keys = Arc::new(KeySetupManager::new(backend, Relation::battle_ticket()));
    let issuer = ProofIssuer::new(Arc::clone(&keys));

    let issued = issuer
        .issue_proof(&cli.user, &cli.token, cli.balance)
        .context("failed to issue ticket proof")?;
    if !issuer.verify(&issued.proof, issued.ticket)? {
        bail!("issued proof did not verify");
    }
    let proof_size = issued
        .proof
        .to_bytes()
        .context("failed to serialize proof")?
        .len();

    let cached = keys.ensure_keys()?;
    let exporter = VerifierExporter::new(&config.artifact_path);
    match exporter.export(keys.backend(), &cached.verifying_key)? {
        ExportOutcome::Written => info!("verifier artifact written"),
        ExportOutcome::Unchanged => info!("verifier artifact unchanged"),
    }

    println!("Ticket: {}", issued.ticket);
    println!("Proof size: {proof_size} bytes");
    println!("Verifier: {}", exporter.path().display());

    Ok(())
}
