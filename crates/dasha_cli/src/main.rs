use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dasha_base::Graha;
use dasha_base::dasha::date::parse_instant;
use dasha_base::dasha::{
    ALL_DASHA_SYSTEMS, BalancePolicy, DashaLevel, DashaNode, DashaSystem, Timeline,
    TimelineOptions, build_timeline,
};
use dasha_service::{
    ExpansionController, ExpansionDriver, ExpansionState, ExpansionWarning, HttpPeriodSource,
    PeriodSource, Resolution, ServiceConfig,
};

#[derive(Parser)]
#[command(name = "dasha", about = "Dasha period hierarchy CLI")]
struct Cli {
    /// Verbose logging to stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate a saved service response and print its period tree
    Show {
        /// JSON payload file ("-" reads stdin)
        payload: PathBuf,
        /// Dasha system (vimshottari, dwisaptati-sama, shashtihayani, ...)
        #[arg(long, default_value = "vimshottari")]
        system: String,
        /// Instant that decides the current period (default: now)
        #[arg(long)]
        now: Option<String>,
        /// Balance heuristic override: first-position or explicit-only
        #[arg(long)]
        balance: Option<String>,
        /// Deepest level to print (0 = Mahadasha .. 4 = Prana)
        #[arg(long, default_value = "4")]
        max_level: u8,
    },
    /// Drill down a lord path against the calculation service
    Fetch {
        /// Subject (chart) identifier sent with every request
        #[arg(long)]
        subject: String,
        /// Dasha system
        #[arg(long, default_value = "vimshottari")]
        system: String,
        /// Lords to descend through, outermost first (e.g. Ju Sa Me)
        #[arg(long, num_args = 0..)]
        path: Vec<String>,
        /// Override DASHA_SERVICE_URL
        #[arg(long)]
        endpoint: Option<String>,
        /// Override DASHA_SERVICE_TIMEOUT_SECS
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// List supported systems and their profiles
    Systems,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Show {
            payload,
            system,
            now,
            balance,
            max_level,
        } => show(&payload, &system, now.as_deref(), balance.as_deref(), max_level),
        Commands::Fetch {
            subject,
            system,
            path,
            endpoint,
            timeout_secs,
        } => fetch(subject, &system, &path, endpoint, timeout_secs).await,
        Commands::Systems => {
            print_systems();
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn show(
    payload: &Path,
    system: &str,
    now: Option<&str>,
    balance: Option<&str>,
    max_level: u8,
) -> Result<()> {
    let system: DashaSystem = system.parse()?;
    let now = parse_now(now)?;
    let value = read_payload(payload)?;

    let mut options = TimelineOptions::for_system(system);
    if let Some(policy) = balance {
        options = options.with_balance_policy(parse_balance(policy)?);
    }
    let timeline = build_timeline(&value, &options, now)?;
    info!(periods = timeline.nodes.len(), "timeline built");

    println!(
        "{} timeline at {} ({} periods)\n",
        system.name(),
        now.format("%Y-%m-%d %H:%M UTC"),
        timeline.nodes.len()
    );

    let max_level = DashaLevel::from_u8(max_level.min(4)).unwrap_or(DashaLevel::Prana);
    match &timeline.cycles {
        Some(groups) => {
            for cycle in &groups.cycles {
                let marker = if groups.active == Some(cycle.number) {
                    " (active)"
                } else {
                    ""
                };
                println!("Cycle {}{}", cycle.number, marker);
                print_tree(&timeline, &cycle.nodes, max_level, 1);
                println!();
            }
        }
        None => print_tree(&timeline, &timeline.nodes, max_level, 0),
    }

    if timeline.active.is_empty() {
        println!("\nNo period contains {}", now.format("%Y-%m-%d"));
    } else {
        println!("\nCurrent: {}", active_summary(&timeline));
    }
    if timeline.truncated > 0 {
        println!("({} periods after the stop planet omitted)", timeline.truncated);
    }
    for err in &timeline.errors {
        eprintln!("dropped: {err}");
    }
    for gap in &timeline.gaps {
        let kind = if gap.is_overlap() { "overlap" } else { "gap" };
        eprintln!(
            "{kind} of {} days between {} and {}",
            gap.gap.num_days().abs(),
            gap.before,
            gap.after
        );
    }
    Ok(())
}

async fn fetch(
    subject: String,
    system: &str,
    path: &[String],
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let system: DashaSystem = system.parse()?;
    let mut config = ServiceConfig::from_env();
    if let Some(endpoint) = endpoint {
        config.endpoint = endpoint;
    }
    if let Some(secs) = timeout_secs {
        config = config.with_timeout_secs(secs);
    }
    let timeout = config.timeout();
    let source = HttpPeriodSource::new(config)?;
    let controller = ExpansionController::for_system(subject, system);
    let mut driver = ExpansionDriver::new(source, controller, timeout);

    driver.start();
    settle(&mut driver).await?;
    walk_path(&mut driver, path).await?;

    let controller = driver.controller();
    let crumbs: Vec<String> = controller
        .breadcrumbs()
        .into_iter()
        .map(|c| c.label)
        .collect();
    println!("{}\n", crumbs.join(" > "));

    let timeline = controller
        .timeline()
        .ok_or_else(|| anyhow!("service returned no timeline"))?;
    for node in controller.viewing() {
        println!("{}", node_line(timeline, node));
    }
    if let Some(warning) = controller.last_warning() {
        match warning {
            ExpansionWarning::EmptyResult { level, .. } => {
                eprintln!("service returned no {level} periods");
            }
            ExpansionWarning::DroppedRecords(errors) => {
                for err in errors {
                    eprintln!("dropped: {err}");
                }
            }
        }
    }
    Ok(())
}

/// Drill down through `path`, one lord per level.
///
/// A level that comes back empty ends the walk; later lords would otherwise
/// be matched against the wrong level.
async fn walk_path<S: PeriodSource>(driver: &mut ExpansionDriver<S>, path: &[String]) -> Result<()> {
    for (i, code) in path.iter().enumerate() {
        let graha = Graha::parse(code).ok_or_else(|| anyhow!("unknown planet {code:?}"))?;
        let target = pick_period(driver.controller().viewing(), graha)
            .ok_or_else(|| anyhow!("no {} period at this level", graha.english_name()))?;
        debug!(%target.id, "drilling down");
        let id = target.id.clone();
        let label = format!("{} {}", target.lord, target.level);
        driver.drill_down(&id)?;
        let remaining = &path[i + 1..];
        if settle(driver).await? == Resolution::Empty && !remaining.is_empty() {
            bail!(
                "{label} has no sub-periods; cannot continue to {}",
                remaining.join(" ")
            );
        }
    }
    Ok(())
}

/// Wait for the latest request and turn a failure into an error.
async fn settle<S: PeriodSource>(driver: &mut ExpansionDriver<S>) -> Result<Resolution> {
    let resolution = driver
        .settle()
        .await
        .ok_or_else(|| anyhow!("no request in flight"))?;
    if let ExpansionState::Failed(reason) = driver.controller().state() {
        bail!("dasha request failed: {reason}");
    }
    Ok(resolution)
}

/// Prefer the running period when a lord repeats at one level.
fn pick_period(nodes: &[DashaNode], graha: Graha) -> Option<&DashaNode> {
    let mut matching = nodes.iter().filter(|n| n.lord.graha() == Some(graha));
    let first = matching.next()?;
    if first.is_current {
        return Some(first);
    }
    Some(matching.find(|n| n.is_current).unwrap_or(first))
}

fn print_tree(timeline: &Timeline, nodes: &[DashaNode], max_level: DashaLevel, indent: usize) {
    for node in nodes {
        println!("{}{}", "  ".repeat(indent), node_line(timeline, node));
        if node.level >= max_level {
            continue;
        }
        if let Some(children) = node.children() {
            print_tree(timeline, children, max_level, indent + 1);
        }
    }
}

fn node_line(timeline: &Timeline, node: &DashaNode) -> String {
    let mut line = format!(
        "[{}] {} {}: {} - {} ({})",
        node.order,
        node.lord,
        node.level,
        node.start.format("%Y-%m-%d"),
        node.end.format("%Y-%m-%d"),
        timeline.duration_of(node),
    );
    if node.is_balance {
        line.push_str(" [balance]");
    }
    if node.is_current {
        line.push_str(" *current*");
    }
    line
}

fn active_summary(timeline: &Timeline) -> String {
    timeline
        .active
        .periods
        .iter()
        .map(|n| n.lord.to_string())
        .collect::<Vec<_>>()
        .join(" > ")
}

fn print_systems() {
    println!(
        "{:<20} {:<20} {:>8} {:>7} {:>7}  notes",
        "id", "name", "years", "planets", "cycles"
    );
    for system in ALL_DASHA_SYSTEMS {
        let profile = system.profile();
        let mut notes = Vec::new();
        if let Some(stop) = profile.stop_at {
            notes.push(format!(
                "stops before {} #{}",
                stop.graha.english_name(),
                stop.occurrence
            ));
        }
        if profile.fixed_durations {
            notes.push("fixed durations".to_string());
        }
        if profile.balance_policy != BalancePolicy::FirstPosition {
            notes.push(format!("balance: {}", profile.balance_policy.name()));
        }
        println!(
            "{:<20} {:<20} {:>8.1} {:>7} {:>7}  {}",
            system.service_id(),
            system.name(),
            profile.cycle_years(),
            profile.periods_per_cycle(),
            profile.cycle_count,
            notes.join(", ")
        );
    }
}

fn read_payload(path: &Path) -> Result<Value> {
    let text = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("reading payload from stdin")?
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&text).context("payload is not valid JSON")
}

fn parse_now(s: Option<&str>) -> Result<DateTime<Utc>> {
    match s {
        None => Ok(Utc::now()),
        Some(s) => parse_instant(s).ok_or_else(|| anyhow!("unparsable date {s:?}")),
    }
}

fn parse_balance(s: &str) -> Result<BalancePolicy> {
    match s.trim().to_ascii_lowercase().as_str() {
        "first-position" | "first" => Ok(BalancePolicy::FirstPosition),
        "explicit-only" | "explicit" => Ok(BalancePolicy::ExplicitOnly),
        other => bail!("unknown balance policy {other:?} (first-position, explicit-only)"),
    }
}
