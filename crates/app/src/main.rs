use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use rhythm_judge_core::{
    autoplay, parse_chart, parse_script, ChartSummary, EffectLog, InputAction, InputEvent,
    Judgment, MockTimeProvider, Session, SessionConfig, SimulatedTransport,
};
use tracing_subscriber::EnvFilter;

fn main() -> rhythm_judge_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { chart, config } => run_check(&chart, config.as_deref()),
        Commands::Simulate {
            chart,
            config,
            script,
            autoplay,
            offset_ms,
        } => run_simulate(&chart, config.as_deref(), script.as_deref(), autoplay, offset_ms),
    }
}

fn run_check(chart: &Path, config: Option<&Path>) -> rhythm_judge_core::Result<()> {
    let config = load_config(config)?;
    let specs = parse_chart(&std::fs::read_to_string(chart)?)?;
    let summary = ChartSummary::from_specs(&specs);
    tracing::info!(?chart, notes = summary.total_notes, "chart is well formed");

    for lane in summary.lanes_outside(config.lane_count) {
        tracing::warn!(
            lane,
            lane_count = config.lane_count,
            "chart uses a lane outside the pad grid"
        );
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_simulate(
    chart: &Path,
    config: Option<&Path>,
    script: Option<&Path>,
    use_autoplay: bool,
    offset_ms: Option<i64>,
) -> rhythm_judge_core::Result<()> {
    let mut config = load_config(config)?;
    if let Some(offset_ms) = offset_ms {
        config.offset_ms = offset_ms;
    }

    let specs = parse_chart(&std::fs::read_to_string(chart)?)?;
    let events = match script {
        Some(path) => parse_script(&std::fs::read_to_string(path)?)?,
        None if use_autoplay => autoplay(&specs),
        None => Vec::new(),
    };
    tracing::info!(?chart, notes = specs.len(), inputs = events.len(), "running simulation");

    let deadline = simulation_deadline(&specs, &events, &config);
    let transport = SimulatedTransport::new();
    let time = MockTimeProvider::new();
    let mut session = Session::with_time_provider(config.clone(), transport.clone(), time.clone())?;
    session.load_chart(&specs)?;
    session.start();

    let step_ms = config.tick_interval_ms as i64;
    let mut effects = EffectLog::new();
    let mut pending = events.into_iter().peekable();
    let mut ticks: u64 = 0;

    loop {
        transport.advance_millis(step_ms);
        time.advance(step_ms * 1000);
        let now = session.now();

        // Input arriving between ticks is applied before the tick that follows.
        while let Some(event) = pending.next_if(|event| event.time <= now) {
            let result = match event.action {
                InputAction::Press => session.press(event.lane_id, &mut effects),
                InputAction::Release => session.release(event.lane_id, &mut effects),
            };
            if result == Judgment::None {
                tracing::debug!(
                    lane = event.lane_id,
                    now,
                    action = ?event.action,
                    "input had no effect"
                );
            }
        }

        session.tick(&mut effects);
        ticks += 1;

        for outcome in session.drain_outcomes() {
            tracing::info!(
                lane = outcome.lane_id,
                at = outcome.timestamp,
                result = ?outcome.result,
                score = outcome.score,
                combo = outcome.combo,
                "judgment"
            );
        }

        if session.is_finished() && pending.peek().is_none() {
            break;
        }
        if now > deadline {
            tracing::warn!(now, deadline, "simulation stopped before every note resolved");
            break;
        }
    }

    let report = serde_json::json!({
        "score": session.score(),
        "accuracy": session.score().accuracy(),
        "ticks": ticks,
        "effects": effects.effects().len(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Song time after which nothing in the chart or script can still change.
fn simulation_deadline(
    specs: &[rhythm_judge_core::NoteSpec],
    events: &[InputEvent],
    config: &SessionConfig,
) -> f64 {
    let chart_end = ChartSummary::from_specs(specs).end_time.unwrap_or(0.0);
    let script_end = events.iter().map(|event| event.time).fold(0.0, f64::max);
    chart_end.max(script_end) + config.windows.miss + 1.0
}

fn load_config(path: Option<&Path>) -> rhythm_judge_core::Result<SessionConfig> {
    let config = match path {
        Some(path) => SessionConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => SessionConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Rhythm game judgment core tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a chart file and print a summary of its notes.
    Check {
        /// Path to the chart JSON file.
        chart: PathBuf,
        /// Optional session configuration used for lane checks.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Play a chart on a simulated transport at the configured tick rate.
    Simulate {
        /// Path to the chart JSON file.
        chart: PathBuf,
        /// Optional session configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Scripted input events to replay.
        #[arg(short, long, conflicts_with = "autoplay")]
        script: Option<PathBuf>,
        /// Generate a perfect input script from the chart.
        #[arg(long)]
        autoplay: bool,
        /// Override the configured clock offset in milliseconds.
        #[arg(long, allow_hyphen_values = true)]
        offset_ms: Option<i64>,
    },
}
