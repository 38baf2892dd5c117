use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oilshock_core::config::{EngineConfig, Settings};
use oilshock_core::domain::contract::parse_intent_value;
use oilshock_core::domain::intent::ParsedIntent;
use oilshock_core::domain::simulation::SimulationResult;
use oilshock_core::engine::{ScenarioCatalog, Simulator};
use oilshock_core::llm::anthropic::AnthropicClient;
use oilshock_core::llm::{narrate, LlmClient, Narration};
use oilshock_core::model::sarimax::SarimaxModel;
use oilshock_core::report;

const DEFAULT_WEEKS: i64 = 12;

#[derive(Debug, Parser)]
#[command(name = "oilshock", about = "Brent crude scenario simulator")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the scenario catalog.
    List,

    /// Run a catalog scenario directly.
    Run {
        #[arg(long)]
        scenario: String,

        /// Multiplier on the scenario's base shock.
        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        magnitude: f64,

        #[arg(long, default_value_t = DEFAULT_WEEKS, allow_negative_numbers = true)]
        weeks: i64,

        /// Also write the output to this file.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Emit the raw result as JSON instead of the text report.
        #[arg(long)]
        json: bool,
    },

    /// Ask a free-text question; the language model picks the scenario.
    Ask {
        query: String,

        /// Overrides any horizon mentioned in the question.
        #[arg(long, allow_negative_numbers = true)]
        weeks: Option<i64>,

        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(args.command, &settings).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "command failed");
        return Err(err);
    }
    Ok(())
}

async fn run(command: Command, settings: &Settings) -> anyhow::Result<()> {
    let simulator = Simulator::new(
        ScenarioCatalog::builtin(),
        &EngineConfig::from_settings(settings)?,
    );

    match command {
        Command::List => {
            print!("{}", report::render_scenario_list(simulator.catalog()));
            Ok(())
        }
        Command::Run {
            scenario,
            magnitude,
            weeks,
            output,
            json,
        } => {
            let model = load_model(settings)?;
            let result = simulator.run_direct(Some(&model), &scenario, magnitude, weeks)?;
            let text = if json {
                render_json(&result, None, None)?
            } else {
                render_text(&result, None)
            };
            emit(&text, output.as_deref())
        }
        Command::Ask {
            query,
            weeks,
            output,
            json,
        } => {
            let model = load_model(settings)?;
            let llm = AnthropicClient::from_settings(settings, simulator.catalog())?;

            tracing::info!(%query, "parsing question");
            let descriptor = llm.parse_intent(&query).await?;
            let intent = parse_intent_value(&descriptor)?;
            let weeks = weeks
                .or(intent.forecast_weeks.map(i64::from))
                .unwrap_or(DEFAULT_WEEKS);
            tracing::info!(
                scenario = %intent.scenario_key,
                magnitude = intent.magnitude_modifier,
                confidence = %intent.confidence,
                weeks,
                "question matched"
            );

            let result = simulator.run(Some(&model), &intent, weeks)?;
            let narration = narrate(&llm, &result, &intent).await;
            let text = if json {
                render_json(&result, Some(&intent), Some(&narration))?
            } else {
                render_text(&result, Some(&narration))
            };
            emit(&text, output.as_deref())
        }
    }
}

fn load_model(settings: &Settings) -> anyhow::Result<SarimaxModel> {
    SarimaxModel::from_path(settings.require_model_path()?)
}

fn render_text(result: &SimulationResult, narration: Option<&Narration>) -> String {
    report::render_report(
        result,
        narration.map(|n| n.explanation.as_str()),
        narration.map(|n| n.uncertainty_note.as_str()),
        chrono::Local::now().naive_local(),
    )
}

fn render_json(
    result: &SimulationResult,
    intent: Option<&ParsedIntent>,
    narration: Option<&Narration>,
) -> anyhow::Result<String> {
    let value = serde_json::json!({
        "intent": intent,
        "result": result,
        "narration": narration,
    });
    serde_json::to_string_pretty(&value).context("failed to serialize simulation result")
}

fn emit(text: &str, output: Option<&Path>) -> anyhow::Result<()> {
    println!("{text}");
    if let Some(path) = output {
        std::fs::write(path, text)
            .with_context(|| format!("failed to write output to {}", path.display()))?;
        tracing::info!(path = %path.display(), "output saved");
    }
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
