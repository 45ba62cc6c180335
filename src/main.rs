use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use eyre::Result;
use log::{debug, info, warn};

mod cli;

use cli::{Cli, Command, OutputFormat};
use ytx_api::TranscriptResolver;
use ytx_api::config::{Config, config_path};
use ytx_api::server::TranscriptResponse;
use ytx_api::youtube::YouTubeCaptions;

fn setup_logging(log_file: Option<&Path>, verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} - {} - {} - {}",
            buf.timestamp(),
            record.target(),
            record.level(),
            record.args()
        )
    });

    if let Some(path) = log_file {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(path)?);
        builder.target(env_logger::Target::Pipe(target));
    }

    builder.init();

    if let Some(path) = log_file {
        info!("Logging initialized: {}", path.display());
    }
    Ok(())
}

fn build_after_help() -> String {
    let path = config_path();
    let status = if path.exists() { "found" } else { "not found, using defaults" };
    format!(
        "\nCONFIG:\n  {} ({status})\n\nThe listen port can also be set with the PORT environment variable.",
        path.display()
    )
}

fn build_resolver(config: &Config) -> Result<TranscriptResolver> {
    let source = YouTubeCaptions::new(
        config.languages.clone(),
        config.fallback_to_any_language,
        config.timeout(),
    )?;
    Ok(TranscriptResolver::new(Arc::new(source), config.timeout()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = <Cli as clap::CommandFactory>::command().after_help(build_after_help());
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // An explicit --config must load; a broken default file is reported once
    // logging is up, then defaults apply
    let loaded = match Config::load(cli.config.as_deref()) {
        Err(e) if cli.config.is_some() => return Err(e.wrap_err("loading --config file")),
        loaded => loaded,
    };
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default(),
    };

    setup_logging(config.log_file.as_deref(), cli.verbose)?;

    if let Err(e) = &loaded {
        warn!("Ignoring invalid config file: {e:#}");
    }

    // CLI flags take priority over the config file
    if let Some(lang) = cli.lang {
        config.languages = vec![lang];
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    debug!("Effective config: {config:?}");

    let resolver = build_resolver(&config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            ytx_api::server::serve(&config, resolver).await?;
        }
        Command::Get { url, format } => {
            let transcript = resolver.get_video_transcript(&url).await?;
            match format {
                OutputFormat::Text => println!("{transcript}"),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&TranscriptResponse { transcript })?);
                }
            }
        }
    }

    Ok(())
}
