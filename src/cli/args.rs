use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "vocalis")]
#[command(about = "AI voice companion for video meetings", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// Inspect or validate the configured backends
    Provider(ProviderCliArgs),
    /// List archived calls and their summaries
    Calls(CallsCliArgs),
    /// Poll a call's response feed and play new replies
    Listen(ListenCliArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ProviderCliArgs {
    #[command(subcommand)]
    pub command: ProviderCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProviderCommand {
    /// Show the current backend configuration
    Show,
    /// Validate the generation backend with a live round trip
    Test,
}

#[derive(ClapArgs, Debug)]
pub struct CallsCliArgs {
    /// Maximum number of calls to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
    /// Show a single call with its transcript and summary
    #[arg(long)]
    pub id: Option<i64>,
}

#[derive(ClapArgs, Debug)]
pub struct ListenCliArgs {
    /// Call identifier to poll
    #[arg(long)]
    pub call_id: String,
    /// Base URL of the Vocalis service
    #[arg(long, default_value = "http://127.0.0.1:8622")]
    pub base_url: String,
    /// Polling interval in milliseconds
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,
}
