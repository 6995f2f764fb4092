use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use hub_distances::config::{PipelineConfig, RoutingBackend};
use hub_distances::error::ProviderError;
use hub_distances::job::{read_results, JobState};
use hub_distances::pipeline::{warm_places, BatchResolver, RunOptions, Strategy};
use hub_distances::place::{Geocoder, GooglePlacesGeocoder, PlaceCache, PlaceCandidate, PlaceResolver, QueryFormat};
use hub_distances::registry::PlaceRegistry;
use hub_distances::routing::{
    DistanceResolver, Estimator, GoogleDistanceMatrix, OsrmRouter, RateLimiter, RouteProvider,
};
use hub_distances::store::{DocumentStore, FileStore};
use hub_distances::verify::{apply_findings, read_report, write_report, Reconciler, Scope, Severity};
use hub_distances::{audit, logging};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

/// Create this file in the output directory to stop a run after the current pair.
const STOP_FILE: &str = "STOP";

/// hubdist: road distances from municipalities to taxi service hubs
///
/// Resolves driving distance and time for every municipality to its nearest
/// hubs, checkpointing as it goes, then verifies and repairs suspect values.
///
/// Examples:
///   hubdist resolve
///   hubdist resolve --municipality hostice-zvolen
///   hubdist places
///   hubdist verify --scope ambiguous
///   hubdist apply --min-severity large
///   hubdist audit
#[derive(Parser)]
#[command(name = "hubdist", version, about, long_about = None)]
struct Cli {
    /// Config file (TOML). Defaults to <config dir>/hubdist/config.toml.
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Debug logging.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Log as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve road distances for pending municipality → hub pairs.
    Resolve {
        /// Only this municipality slug.
        #[arg(long)]
        municipality: Option<String>,

        /// Attempt at most this many pending pairs.
        #[arg(long)]
        max_pairs: Option<usize>,

        #[arg(long, value_enum, default_value_t = Strategy::Coordinates)]
        strategy: Strategy,

        /// Forget the checkpoint and resolve every pair again.
        #[arg(long)]
        reset: bool,
    },

    /// Resolve place identities for every municipality and hub (cache-first).
    Places,

    /// Re-check stored distances with district-qualified identities.
    Verify {
        #[arg(long, value_enum, default_value_t = Scope::All)]
        scope: Scope,

        /// Check at most this many pairs.
        #[arg(long)]
        limit: Option<usize>,

        /// Write the findings of this run back into the results.
        #[arg(long)]
        apply: bool,

        /// Lowest severity applied with --apply.
        #[arg(long, value_enum, default_value_t = Severity::Small)]
        min_severity: Severity,
    },

    /// Apply a previously written findings file.
    Apply {
        #[arg(long, value_enum, default_value_t = Severity::Small)]
        min_severity: Severity,
    },

    /// Report suspicious stored distances. No network access.
    Audit,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = PipelineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let output_dir = config.data.output_dir.clone();
    let store: Rc<dyn DocumentStore> = Rc::new(FileStore::new(&output_dir));

    match cli.command {
        Command::Resolve {
            municipality,
            max_pairs,
            strategy,
            reset,
        } => {
            if strategy == Strategy::PlaceId && config.provider.routing == RoutingBackend::Osrm {
                bail!("the OSRM backend routes between coordinates only; use --strategy coordinates");
            }
            clear_stop_file(&output_dir)?;
            let registry = load_registry(&config)?;
            let limiter = Rc::new(RateLimiter::new(config.limits.min_interval()));
            let mut places = place_resolver(&config, store.clone(), limiter.clone())?;
            let distances = distance_resolver(&config, limiter)?;
            let mut job = JobState::load(store, config.limits.checkpoint_interval)?;
            if reset {
                job.reset()?;
            }

            let options = RunOptions {
                strategy,
                municipality,
                max_pairs,
                candidates: config.limits.candidates,
                progress_every: config.limits.checkpoint_interval,
            };
            let stop = stop_requested(&output_dir);
            let summary =
                BatchResolver::new(&registry, &mut places, &distances, &mut job).run(&options, &stop)?;
            print_json(&summary)
        }

        Command::Places => {
            clear_stop_file(&output_dir)?;
            let registry = load_registry(&config)?;
            let limiter = Rc::new(RateLimiter::new(config.limits.min_interval()));
            let mut places = place_resolver(&config, store, limiter)?;
            let stop = stop_requested(&output_dir);
            let summary = warm_places(&registry, &mut places, &stop)?;
            print_json(&summary)
        }

        Command::Verify {
            scope,
            limit,
            apply,
            min_severity,
        } => {
            if config.provider.routing == RoutingBackend::Osrm {
                bail!("verification routes between place identifiers; set provider.routing = \"google\"");
            }
            clear_stop_file(&output_dir)?;
            let registry = load_registry(&config)?;
            let limiter = Rc::new(RateLimiter::new(config.limits.min_interval()));
            let mut places = place_resolver(&config, store.clone(), limiter.clone())?;
            let distances = distance_resolver(&config, limiter)?;
            let mut job = JobState::load(store.clone(), config.limits.checkpoint_interval)?;

            let stop = stop_requested(&output_dir);
            let report = Reconciler::new(&registry, &mut places, &distances, config.verification)
                .verify(&job, scope, limit, &stop)?;
            write_report(store.as_ref(), &report)?;
            tracing::info!(path = %output_dir.join(hub_distances::verify::FINDINGS_FILE).display(), "findings written");

            if apply {
                let applied = apply_findings(&mut job, &report.findings, min_severity)?;
                print_json(&serde_json::json!({ "report": summary_of(&report), "applied": applied }))
            } else {
                print_json(&summary_of(&report))
            }
        }

        Command::Apply { min_severity } => {
            let Some(report) = read_report(store.as_ref())? else {
                bail!(
                    "no findings file in {}; run `hubdist verify` first",
                    output_dir.display()
                );
            };
            let mut job = JobState::load(store, config.limits.checkpoint_interval)?;
            let applied = apply_findings(&mut job, &report.findings, min_severity)?;
            print_json(&applied)
        }

        Command::Audit => {
            let pairs = read_results(store.as_ref())?;
            if pairs.is_empty() {
                tracing::warn!(dir = %output_dir.display(), "no stored distances");
            }
            print_json(&audit::audit(&pairs))
        }
    }
}

fn load_registry(config: &PipelineConfig) -> anyhow::Result<PlaceRegistry> {
    PlaceRegistry::load(&config.data.municipalities, &config.data.hubs).with_context(|| {
        format!(
            "loading sources {} and {}",
            config.data.municipalities.display(),
            config.data.hubs.display()
        )
    })
}

fn place_resolver(
    config: &PipelineConfig,
    store: Rc<dyn DocumentStore>,
    limiter: Rc<RateLimiter>,
) -> anyhow::Result<PlaceResolver> {
    let provider = &config.provider;
    let geocoder: Box<dyn Geocoder> = match config.api_key() {
        Some(key) => Box::new(GooglePlacesGeocoder::new(
            &provider.geocoder_url,
            key,
            &provider.language,
            Duration::from_secs(provider.timeout_secs),
        )),
        None => Box::new(NoGeocoder),
    };
    let cache = PlaceCache::load(store).context("loading the place cache")?;
    let format = QueryFormat {
        country: provider.country.clone(),
        district_label: provider.district_label.clone(),
    };
    Ok(PlaceResolver::new(geocoder, cache, limiter, format))
}

fn distance_resolver(config: &PipelineConfig, limiter: Rc<RateLimiter>) -> anyhow::Result<DistanceResolver> {
    let provider = &config.provider;
    let timeout = Duration::from_secs(provider.timeout_secs);
    let router: Box<dyn RouteProvider> = match provider.routing {
        RoutingBackend::Google => {
            let Some(key) = config.api_key() else {
                bail!("GOOGLE_API_KEY is not set (required by the Google routing backend)");
            };
            Box::new(GoogleDistanceMatrix::new(&provider.routing_url, key, &provider.language, timeout))
        }
        RoutingBackend::Osrm => Box::new(OsrmRouter::new(&provider.osrm_url, timeout)),
    };
    Ok(DistanceResolver::new(router, limiter, Estimator::from_config(&config.estimate)))
}

/// Stands in for the geocoder when no API key is configured. Every lookup
/// fails, so only cached identities are available.
struct NoGeocoder;

impl Geocoder for NoGeocoder {
    fn text_search(&self, _query: &str) -> Result<Vec<PlaceCandidate>, ProviderError> {
        Err(ProviderError::Unsupported("GOOGLE_API_KEY is not set".into()))
    }
}

fn clear_stop_file(output_dir: &Path) -> anyhow::Result<()> {
    let path = output_dir.join(STOP_FILE);
    if path.exists() {
        std::fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        tracing::info!(path = %path.display(), "cleared stale stop file");
    }
    Ok(())
}

fn stop_requested(output_dir: &Path) -> impl Fn() -> bool {
    let path = output_dir.join(STOP_FILE);
    move || path.exists()
}

fn summary_of(report: &hub_distances::verify::VerificationReport) -> serde_json::Value {
    serde_json::json!({
        "scope": report.scope,
        "checked": report.checked,
        "ok": report.ok,
        "problems": report.problems,
        "errors": report.errors,
        "bySeverity": report.by_severity,
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
