//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `social.rs` — Cesium+/Ḡchange pod commands (profiles, pages, stars, offers, geolocation).
//! - `ledger.rs` — Duniter GVA commands (balance, identity, history, wallet lists).
//!
//! ## Principles
//! - Route through the [`CommandRegistry`]; never match on raw names elsewhere.
//! - Delegate business logic to `services/*`.
//! - Keep behavior and output schema stable.

pub mod ledger;
pub mod social;

pub use ledger::handle_ledger_commands;
pub use social::handle_social_commands;

use crate::cli::Commands;
use crate::config::Settings;
use crate::credentials::Credential;
use crate::registry::{CommandRegistry, Domain};
use crate::services::compose::{Messenger, UnsignedMessenger};

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("`{0}` signs documents with the keyfile, which this client does not support")]
    Unsupported(&'static str),
    #[error("invalid public key: {0}")]
    InvalidPubkey(String),
}

/// Everything a handler needs besides its own arguments.
pub struct CommandContext<'a> {
    pub settings: &'a Settings,
    /// Pod base URL for social commands, GVA endpoint for ledger commands.
    pub address: &'a str,
    pub credential: &'a Credential,
    pub no_credential_needed: bool,
    pub messenger: &'a dyn Messenger,
}

pub struct Dispatcher<'a> {
    registry: &'a CommandRegistry,
    settings: &'a Settings,
    node_override: Option<&'a str>,
    messenger: &'a dyn Messenger,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        registry: &'a CommandRegistry,
        settings: &'a Settings,
        node_override: Option<&'a str>,
    ) -> Self {
        Self {
            registry,
            settings,
            node_override,
            messenger: &UnsignedMessenger,
        }
    }

    pub fn with_messenger(mut self, messenger: &'a dyn Messenger) -> Self {
        self.messenger = messenger;
        self
    }

    /// Backend address a command of `domain` talks to.
    pub fn address(&self, domain: Domain) -> &'a str {
        match (self.node_override, domain) {
            (Some(node), _) => node,
            (None, Domain::Social) => &self.settings.pod,
            (None, Domain::Ledger) => &self.settings.node,
        }
    }

    pub fn dispatch(
        &self,
        name: &str,
        command: &Commands,
        credential: &Credential,
        no_credential_needed: bool,
    ) -> anyhow::Result<()> {
        let spec = self
            .registry
            .get(name)
            .ok_or_else(|| CliError::UnknownCommand(name.to_string()))?;
        let ctx = CommandContext {
            settings: self.settings,
            address: self.address(spec.domain),
            credential,
            no_credential_needed,
            messenger: self.messenger,
        };
        tracing::debug!(
            command = name,
            domain = ?spec.domain,
            address = ctx.address,
            no_credential_needed,
            "dispatching"
        );
        match (spec.domain, command) {
            (Domain::Social, Commands::Social(cmd)) => handle_social_commands(cmd, &ctx),
            (Domain::Ledger, Commands::Ledger(cmd)) => handle_ledger_commands(cmd, &ctx),
            _ => Err(CliError::UnknownCommand(name.to_string()).into()),
        }
    }
}
