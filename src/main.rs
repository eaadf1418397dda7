mod cli;
mod commands;
mod config;
mod credentials;
mod domain;
mod registry;
mod services;

use clap::{CommandFactory, FromArgMatches};
use cli::Cli;
use commands::{CliError, Dispatcher};
use config::Settings;
use credentials::KeySources;
use registry::CommandRegistry;
use std::process::ExitCode;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jaklis=warn".into()),
        )
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<CliError>() {
        Some(CliError::UnknownCommand(_)) => 70,
        _ => 1,
    }
}

/// Everything scoped to one invocation lives here, so guards are dropped
/// before `main` turns the outcome into an exit status.
fn run() -> anyhow::Result<()> {
    // Help and version still work with a broken settings file; commands fail.
    let loaded = Settings::load();
    let shown = match &loaded {
        Ok(settings) => settings.clone(),
        Err(e) => {
            tracing::warn!(error = %e, "settings unavailable, showing defaults");
            Settings::default()
        }
    };
    let registry = CommandRegistry::build()?;
    for spec in registry.iter() {
        tracing::trace!(command = %spec, domain = ?spec.domain, "registered");
        for argument in &spec.arguments {
            tracing::trace!(command = %spec.name, %argument, "argument");
        }
    }

    let mut command = Cli::command().after_help(format!(
        "current node: '{}', current pod: '{}'.",
        shown.node, shown.pod
    ));
    let matches = command
        .clone()
        .get_matches_from(registry.normalize_args(std::env::args_os()));
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    if cli.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let Some(cmd) = &cli.command else {
        command.print_help()?;
        println!();
        return Ok(());
    };
    let name = matches.subcommand_name().unwrap_or_default();
    let settings = loaded?;

    let temp_dir = std::env::temp_dir();
    let resolved = credentials::resolve(
        cmd.public_identifier(),
        &KeySources {
            flag: cli.key.as_deref(),
            configured: settings.dunikey.as_deref(),
            home: settings.home.as_deref(),
            temp_dir: &temp_dir,
        },
    )?;
    if let Some(key) = &resolved.ephemeral {
        tracing::debug!(
            path = %key.path().display(),
            "no keyfile configured, using a throwaway key"
        );
    }

    Dispatcher::new(&registry, &settings, cli.node.as_deref()).dispatch(
        name,
        cmd,
        &resolved.credential,
        resolved.no_credential_needed,
    )
}
