mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Tether -- Telegram notifications and remote control for agent loops.
#[derive(Parser, Debug)]
#[command(name = "tether", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project directory holding the loop's state files
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// User config file (default: ~/.tether/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a notification to the operator
    Notify {
        /// Exit non-zero when the notification cannot be delivered
        #[arg(long, global = true)]
        strict: bool,

        #[command(subcommand)]
        kind: commands::notify::NotifyKindArgs,
    },

    /// Ask the operator a question and print the answer
    Ask {
        /// The question text
        question: String,

        /// Extra context shown under the question
        #[arg(long)]
        context: Option<String>,

        /// Current loop number
        #[arg(long = "loop")]
        loop_number: Option<u64>,

        /// Minutes to wait (default from config)
        #[arg(long)]
        timeout_minutes: Option<u64>,
    },

    /// Poll once for operator commands and run them
    Commands {
        /// Seconds to long-poll
        #[arg(long, default_value_t = 0)]
        wait: u64,
    },

    /// Read or discard the operator's pending answer
    Answer {
        #[command(subcommand)]
        action: AnswerCommands,
    },

    /// Inspect the pause and stop flags
    Flags {
        #[command(subcommand)]
        action: FlagCommands,
    },

    /// Check the bot token and send a test message
    Test,

    /// Configuration subcommands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum AnswerCommands {
    /// Print and delete the pending answer
    Take,
    /// Print the pending answer without deleting it
    Peek,
    /// Delete the pending answer
    Clear,
}

#[derive(Subcommand, Debug)]
enum FlagCommands {
    /// Print the pause and stop flags
    Show,
    /// Remove the pause flag
    ClearPause,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration and where each value came from
    Show,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let loaded = commands::load_config(&cli.global)?;

    // Logs go to stderr; stdout carries answers for the calling script.
    let default_level = if cli.global.debug || loaded.config.debug {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Notify { strict, kind } => {
            commands::notify::run(&cli.global, loaded.config, kind, strict)
        }
        Commands::Ask {
            question,
            context,
            loop_number,
            timeout_minutes,
        } => commands::ask::run(
            &cli.global,
            loaded.config,
            question,
            context,
            loop_number,
            timeout_minutes,
        ),
        Commands::Commands { wait } => commands::listen::run(&cli.global, loaded.config, wait),
        Commands::Answer { action } => match action {
            AnswerCommands::Take => commands::answer::take(&cli.global, &loaded.config),
            AnswerCommands::Peek => commands::answer::peek(&cli.global, &loaded.config),
            AnswerCommands::Clear => commands::answer::clear(&cli.global, &loaded.config),
        },
        Commands::Flags { action } => match action {
            FlagCommands::Show => commands::flags::show(&cli.global, &loaded.config),
            FlagCommands::ClearPause => commands::flags::clear_pause(&cli.global, &loaded.config),
        },
        Commands::Test => commands::test::run(&cli.global, loaded.config),
        Commands::Config { action } => match action {
            ConfigCommands::Show => commands::config::show(&loaded),
        },
    }
}
