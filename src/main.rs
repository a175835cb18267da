use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use configuration::{Overrides, Settings};
use dedupe::{DedupeSummary, DuplicateGrouper, ResolutionOutcome};
use enricher::{enrich_batch, prepare_jobs, EnrichOptions, EnrichmentSummary, RecordEnricher};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use store::{apply_resolution, CardStore, FilePriceSource, TrashAction, TrashOptions};

/// The main entry point for the datwatch pipeline.
fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; it only carries optional overrides.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => configuration::load_config_from(path),
        None => configuration::load_config(),
    }
    .context("Failed to load configuration")?;
    cli.overrides
        .apply(&mut settings)
        .context("Invalid command-line option")?;

    let _log_guard = configuration::init_tracing(&settings.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Enrich(args) => {
            handle_enrich(&args, &settings)?;
        }
        Commands::Dedupe(args) => {
            handle_dedupe(&args, &settings)?;
        }
        Commands::Run(args) => {
            handle_enrich(&args.enrich, &settings)?;
            let dedupe = DedupeArgs {
                dir: args.enrich.dir.clone(),
                dry_run: args.dedupe.dry_run,
                remove: args.dedupe.remove,
                require_complete_key: args.dedupe.require_complete_key,
                report: args.dedupe.report.clone(),
            };
            handle_dedupe(&dedupe, &settings)?;
        }
    }

    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Enriches DAT fact cards with price performance and removes duplicate events.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach stock and token performance fields to every card in a folder.
    Enrich(EnrichArgs),
    /// Group duplicate cards and move the losers to the trash folder.
    Dedupe(DedupeArgs),
    /// Enrich, then dedupe, the same folder.
    Run(RunArgs),
}

#[derive(Parser, Clone)]
struct EnrichArgs {
    /// Folder of *.json fact cards, updated in place.
    dir: PathBuf,

    /// Processing date (format: YYYY-MM-DD). Defaults to today (UTC).
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Only process the first N cards (by file name).
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Parser, Clone)]
struct DedupeArgs {
    /// Folder of *.json fact cards.
    dir: PathBuf,

    /// Print the plan without moving or deleting anything.
    #[arg(long)]
    dry_run: bool,

    /// Delete duplicates instead of moving them to the trash folder.
    #[arg(long)]
    remove: bool,

    /// Only merge cards whose ticker, token and date are all present.
    #[arg(long)]
    require_complete_key: bool,

    /// Write the full dedupe report as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Parser)]
struct RunArgs {
    #[command(flatten)]
    enrich: EnrichArgs,

    #[command(flatten)]
    dedupe: RunDedupeArgs,
}

/// The dedupe flags of `run`; the folder comes from the enrich half.
#[derive(Parser, Clone)]
struct RunDedupeArgs {
    /// Print the dedupe plan without moving or deleting anything.
    #[arg(long)]
    dry_run: bool,
    /// Delete duplicates instead of moving them to the trash folder.
    #[arg(long)]
    remove: bool,
    /// Only merge cards whose ticker, token and date are all present.
    #[arg(long)]
    require_complete_key: bool,
    /// Write the full dedupe report as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

// ==============================================================================
// Enrich Command Logic
// ==============================================================================

/// Loads every card, enriches it against the price folder and saves it back.
fn handle_enrich(args: &EnrichArgs, settings: &Settings) -> anyhow::Result<EnrichmentSummary> {
    let store = CardStore::open(&args.dir)?;
    let mut batch = store.load(args.limit)?;

    let options = EnrichOptions {
        mode: settings.enrichment.mode,
        as_of: args.as_of.unwrap_or_else(|| Utc::now().date_naive()),
        token_anchor_fallback: settings.enrichment.token_anchor_fallback,
        merge: settings.enrichment.merge,
    };
    tracing::info!(
        dir = %args.dir.display(),
        mode = %options.mode,
        as_of = %options.as_of,
        workers = settings.enrichment.worker_limit,
        "Starting enrichment."
    );

    let enricher = RecordEnricher::new(options);
    let source = FilePriceSource::new(settings.prices.clone());
    let jobs = prepare_jobs(&enricher, std::mem::take(&mut batch.records), &source);

    // Set up the progress bar
    let progress_bar = ProgressBar::new(jobs.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );
    progress_bar.set_message("Enriching...");

    let outcomes = enrich_batch(&enricher, jobs, settings.enrichment.worker_limit, |_| {
        progress_bar.inc(1)
    })?;
    progress_bar.finish_with_message("Enrichment complete!");

    for outcome in &outcomes {
        for warning in &outcome.warnings {
            tracing::warn!(card = outcome.record.id(), %warning, "Data-quality warning.");
        }
    }

    let summary = EnrichmentSummary::from_outcomes(&outcomes);
    batch.records = outcomes.into_iter().map(|o| o.record).collect();
    store
        .save_all(&batch)
        .with_context(|| format!("Failed to save cards in {}", args.dir.display()))?;

    let mut table = new_table(vec!["Cards", "Ineligible", "Default token anchor", "With warnings", "Skipped files"]);
    table.add_row(vec![
        summary.records.to_string(),
        summary.ineligible.to_string(),
        summary.default_anchor.to_string(),
        summary.with_warnings.to_string(),
        batch.skipped.len().to_string(),
    ]);
    println!("{table}");

    Ok(summary)
}

// ==============================================================================
// Dedupe Command Logic
// ==============================================================================

/// Groups cards by identity, keeps one per group and trashes the rest.
fn handle_dedupe(args: &DedupeArgs, settings: &Settings) -> anyhow::Result<DedupeSummary> {
    let store = CardStore::open(&args.dir)?;
    let batch = store.load(None)?;
    let sizes = batch.sizes_by_id();

    let grouper = DuplicateGrouper::new()
        .with_require_complete_key(args.require_complete_key || settings.dedupe.require_complete_key);
    let groups = grouper.group(&batch.records);
    let policy = settings.dedupe.policy;
    let outcomes = grouper.resolve(&groups, policy, |r| sizes.get(r.id()).copied().unwrap_or(0));

    let options = TrashOptions {
        trash_dir_name: settings.dedupe.trash_dir_name.clone(),
        include_related: settings.dedupe.include_related,
        remove: args.remove,
        dry_run: args.dry_run,
    };
    let actions = apply_resolution(store.dir(), &batch.cards, &outcomes, &options)?;
    let summary = DedupeSummary::from_outcomes(&outcomes);

    print_dedupe(&outcomes, &actions, &summary, args.dry_run);

    if let Some(path) = &args.report {
        let report = serde_json::json!({
            "folder": args.dir,
            "policy": policy,
            "summary": summary,
            "outcomes": outcomes.iter().filter(|o| !o.discarded.is_empty()).collect::<Vec<_>>(),
            "actions": actions,
            "dry_run": args.dry_run,
        });
        std::fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    Ok(summary)
}

fn print_dedupe(outcomes: &[ResolutionOutcome], actions: &[TrashAction], summary: &DedupeSummary, dry_run: bool) {
    let mut groups = new_table(vec!["Event", "Kept", "Discarded", "Reason"]);
    for outcome in outcomes.iter().filter(|o| !o.discarded.is_empty()) {
        for discard in &outcome.discarded {
            groups.add_row(vec![
                outcome.key.to_string(),
                outcome.kept_id.clone(),
                discard.record_id.clone(),
                discard.reason.clone(),
            ]);
        }
    }
    if summary.groups_deduped > 0 {
        println!("{groups}");
    }

    let mut totals = new_table(vec!["Groups", "Deduped groups", "Kept", "Duplicates", "Files affected"]);
    totals.add_row(vec![
        summary.groups_considered.to_string(),
        summary.groups_deduped.to_string(),
        summary.kept_count.to_string(),
        summary.duplicate_count.to_string(),
        actions.len().to_string(),
    ]);
    println!("{totals}");

    if dry_run {
        for action in actions {
            if let TrashAction::Planned { path } = action {
                println!("would remove {}", path.display());
            }
        }
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}
