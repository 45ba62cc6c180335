use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "ytx-api",
    about = "YouTube transcript HTTP service",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Config file (default: ~/.config/ytx-api/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Preferred caption language (overrides config)
    #[arg(short, long, global = true)]
    pub lang: Option<String>,

    /// Caption fetch timeout in seconds (overrides config)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Address to listen on (overrides config)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, global = true, env = "PORT")]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP service (default)
    Serve,

    /// Fetch one transcript and print it
    Get {
        /// YouTube video URL
        url: String,

        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(Cli::try_parse_from(["ytx-api", "--timeout", "0"]).is_err());
    }

    #[test]
    fn test_timeout_accepted() {
        let cli = Cli::try_parse_from(["ytx-api", "--timeout", "3", "serve"]).unwrap();
        assert_eq!(cli.timeout, Some(3));
    }
}
