use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tabscore_common::EnvConfig;
use tabscore_font::FontLoadDetector;
use tabscore_host::{HostProfile, SimHost};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tabscore-cli", about = "Exercise the tabscore bootstrap on a simulated host")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Shape of the simulated page or worker.
#[derive(Args, Clone, Default)]
struct HostArgs {
    /// Simulate a background worker (no document)
    #[arg(long, conflicts_with = "headless")]
    worker: bool,
    /// Simulate a host with neither worker scope nor document
    #[arg(long)]
    headless: bool,
    /// Expose the native font-loading API
    #[arg(long)]
    native_api: bool,
    /// Source of the currently executing script element
    #[arg(long, value_name = "URL")]
    current_script: Option<String>,
    /// Source of a script element carrying the marker attribute
    #[arg(long, value_name = "URL")]
    marker_script: Option<String>,
    /// File holding the stack trace text the host reports ("-" for stdin)
    #[arg(long, value_name = "FILE")]
    stack: Option<PathBuf>,
    /// Probe widths returned by successive measurements; the last repeats
    #[arg(long, value_delimiter = ',', value_name = "PX")]
    widths: Vec<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Resolve the script location
    Locate {
        #[command(flatten)]
        host: HostArgs,
        /// YAML or JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run font load detection to completion
    Font {
        #[command(flatten)]
        host: HostArgs,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Give up after this many failed measurements
        #[arg(long)]
        max_attempts: Option<u32>,
        /// Stop the simulation after this many timer callbacks
        #[arg(long, default_value = "600")]
        max_checks: usize,
    },
    /// Run the full bootstrap and print the environment
    Init {
        #[command(flatten)]
        host: HostArgs,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "600")]
        max_checks: usize,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EnvConfig> {
    match path {
        Some(path) => EnvConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(EnvConfig::default()),
    }
}

fn read_stack(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read stack file {}", path.display()))
    }
}

fn build_host(args: &HostArgs, config: &EnvConfig) -> anyhow::Result<SimHost> {
    let mut host = if args.worker {
        SimHost::worker()
    } else if args.headless {
        SimHost::headless()
    } else {
        SimHost::document()
    };
    if args.native_api {
        host = host.with_native_font_api();
    }
    if let Some(url) = &args.current_script {
        host = host.with_current_script(url.clone());
    }
    if let Some(url) = &args.marker_script {
        host = host.with_marker_script(&config.locator.marker_attribute, url.clone());
    }
    if let Some(path) = &args.stack {
        host = host.with_stack(read_stack(path)?);
    }
    Ok(host.with_widths(args.widths.iter().copied()))
}

/// Lines printed by `locate`: the resolved location, or the host's warnings.
fn locate_report(sim: &SimHost, config: &EnvConfig) -> Vec<String> {
    let profile = HostProfile::detect(sim);
    if !profile.has_document() {
        return vec![format!("skipped: {profile} host has no document to search")];
    }
    match tabscore_locate::resolve_script_location(sim, &config.locator) {
        Some(location) => vec![format!("{} ({})", location.url, location.source)],
        None => sim
            .warnings()
            .into_iter()
            .map(|warning| format!("warning: {warning}"))
            .collect(),
    }
}

/// Deliver every pending host event, bounded by `max_checks` timer callbacks.
fn drive(host: &SimHost, max_checks: usize) -> usize {
    host.fire_document_ready();
    host.complete_font_loads();
    host.run_until_idle(max_checks)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("tabscore-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", tabscore_common::crate_info());
            println!("host: {}", tabscore_host::crate_info());
            println!("locate: {}", tabscore_locate::crate_info());
            println!("font: {}", tabscore_font::crate_info());
            println!("render: {}", tabscore_render::crate_info());
            println!("io: {}", tabscore_io::crate_info());
            println!("env: {}", tabscore_env::crate_info());
        }
        Commands::Locate { host, config } => {
            let config = load_config(config.as_deref())?;
            let sim = build_host(&host, &config)?;
            for line in locate_report(&sim, &config) {
                println!("{line}");
            }
        }
        Commands::Font {
            host,
            config,
            max_attempts,
            max_checks,
        } => {
            let mut config = load_config(config.as_deref())?;
            if max_attempts.is_some() {
                config.font.max_attempts = max_attempts;
            }
            config.validate()?;

            let sim = Rc::new(build_host(&host, &config)?);
            let profile = HostProfile::detect(&*sim);
            let detector = FontLoadDetector::new(config.font.clone());
            match detector.start(Rc::clone(&sim), profile) {
                Ok(strategy) => println!("profile={profile} strategy={strategy:?}"),
                Err(err) => println!("profile={profile}: {err}"),
            }

            let checks = drive(&sim, max_checks);
            for (i, width) in sim.measurements().iter().enumerate() {
                println!(
                    "  check {:>3} t={:>6}ms width={width:.1}",
                    i + 1,
                    i as u64 * config.font.poll_interval_ms
                );
            }
            for warning in sim.warnings() {
                println!("warning: {warning}");
            }
            println!(
                "state={} timers_fired={checks} pending_timers={}",
                detector.readiness().state(),
                sim.pending_timers()
            );
        }
        Commands::Init {
            host,
            config,
            max_checks,
        } => {
            let config = load_config(config.as_deref())?;
            let sim = Rc::new(build_host(&host, &config)?);
            let env = tabscore_env::platform_init(Rc::clone(&sim), &config);
            drive(&sim, max_checks);

            println!("{}", env.summary());
            for warning in sim.warnings() {
                println!("warning: {warning}");
            }
            for event in env.events() {
                println!("  {event:?}");
            }
            tracing::debug!(now_ms = sim.now().as_millis() as u64, "simulation finished");
        }
    }

    Ok(())
}
