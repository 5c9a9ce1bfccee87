use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "aitas-cli", version, about = "Aitas CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Category management
    Category {
        #[command(subcommand)]
        action: commands::category::CategoryAction,
    },
    /// Long-term goal management
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Wellness score and self-reports
    Wellness {
        #[command(subcommand)]
        action: commands::wellness::WellnessAction,
    },
    /// Care mode and bulk rescheduling
    Care {
        #[command(subcommand)]
        action: commands::care::CareAction,
    },
    /// Classification and review pipeline
    Pipeline {
        #[command(subcommand)]
        action: commands::pipeline::PipelineAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action),
        Commands::Category { action } => commands::category::run(action),
        Commands::Goal { action } => commands::goal::run(action),
        Commands::Wellness { action } => commands::wellness::run(action),
        Commands::Care { action } => commands::care::run(action),
        Commands::Pipeline { action } => commands::pipeline::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
