//! learnpath CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

use commands::cache::CacheCommand;
use commands::validate::DocumentKind;

#[derive(Parser)]
#[command(
    name = "learnpath",
    version,
    about = "Placement quizzes, gap analysis and learning roadmaps"
)]
struct Cli {
    /// Config file path (default: ./learnpath.toml, then ~/.config/learnpath/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a placement quiz
    Quiz {
        /// What the learner wants to achieve
        #[arg(long)]
        goal: String,

        /// Self-reported skill level (1-5)
        #[arg(long, default_value = "1")]
        skill_level: f64,

        /// Hours per week
        #[arg(long, default_value = "5")]
        hours: f64,

        /// Focus areas (comma-separated)
        #[arg(long)]
        focus: Option<String>,

        /// Provider name from the config
        #[arg(long)]
        provider: Option<String>,

        /// Model identifier
        #[arg(long)]
        model: Option<String>,

        /// Fail instead of falling back to a local placeholder quiz
        #[arg(long)]
        no_fallback: bool,

        /// Write the quiz JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Score answered quiz questions and report knowledge gaps
    Analyze {
        /// Quiz JSON (as produced by `learnpath quiz`)
        #[arg(long)]
        quiz: PathBuf,

        /// Responses JSON: [{"questionId": "...", "answer": "..."}]
        #[arg(long)]
        responses: PathBuf,

        /// Self-reported skill level (1-5)
        #[arg(long, default_value = "1")]
        skill_level: f64,

        /// Write the analysis JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Generate a learning roadmap
    Roadmap {
        /// What the learner wants to achieve
        #[arg(long)]
        goal: String,

        /// Self-reported skill level (1-5)
        #[arg(long, default_value = "1")]
        skill_level: f64,

        /// Hours per week
        #[arg(long, default_value = "5")]
        hours: f64,

        /// Focus areas (comma-separated)
        #[arg(long)]
        focus: Option<String>,

        /// Preferred resource style, e.g. "visual" or "hands-on"
        #[arg(long)]
        learning_style: Option<String>,

        /// Total number of weeks
        #[arg(long)]
        weeks: Option<u32>,

        /// Quiz analysis JSON (as produced by `learnpath analyze`)
        #[arg(long)]
        analysis: Option<PathBuf>,

        /// Attach video resources to weeks that have none
        #[arg(long)]
        resources: bool,

        /// First week to print
        #[arg(long)]
        start: Option<u32>,

        /// Last week to print
        #[arg(long)]
        end: Option<u32>,

        /// Provider name from the config
        #[arg(long)]
        provider: Option<String>,

        /// Model identifier
        #[arg(long)]
        model: Option<String>,

        /// Write the roadmap JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Check a quiz or roadmap JSON document
    Validate {
        /// Document kind
        #[arg(value_enum)]
        kind: DocumentKind,

        /// Path to the JSON document (Markdown fences are stripped)
        file: PathBuf,

        /// Skip the four-option check and exact question counts
        #[arg(long)]
        lenient: bool,
    },

    /// Inspect or clear the cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// List models a provider offers
    Models {
        /// Provider name from the config
        #[arg(long)]
        provider: Option<String>,
    },

    /// Create a starter learnpath.toml
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("learnpath=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Quiz {
            goal,
            skill_level,
            hours,
            focus,
            provider,
            model,
            no_fallback,
            output,
        } => {
            commands::quiz::execute(commands::quiz::QuizArgs {
                goal,
                skill_level,
                hours,
                focus,
                provider,
                model,
                no_fallback,
                output,
                config,
            })
            .await
        }
        Commands::Analyze {
            quiz,
            responses,
            skill_level,
            output,
        } => commands::analyze::execute(quiz, responses, skill_level, output),
        Commands::Roadmap {
            goal,
            skill_level,
            hours,
            focus,
            learning_style,
            weeks,
            analysis,
            resources,
            start,
            end,
            provider,
            model,
            output,
        } => {
            commands::roadmap::execute(commands::roadmap::RoadmapArgs {
                goal,
                skill_level,
                hours,
                focus,
                learning_style,
                weeks,
                analysis,
                resources,
                start,
                end,
                provider,
                model,
                output,
                config,
            })
            .await
        }
        Commands::Validate {
            kind,
            file,
            lenient,
        } => commands::validate::execute(kind, file, lenient, config),
        Commands::Cache { command } => commands::cache::execute(command, config),
        Commands::Models { provider } => commands::models::execute(provider, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
