//! Command descriptor table.
//!
//! Built once at startup from the typed command enums in `cli.rs`: every
//! subcommand becomes a [`CommandSpec`] carrying its flags and the backend
//! domain that serves it. The dispatcher routes through this table, and
//! [`CommandRegistry::normalize_args`] uses it to accept the single-dash
//! multi-letter flags (`-nm`, `-pos`) clap cannot parse on its own.

use crate::cli::{Cli, LedgerCommand, SocialCommand};
use clap::builder::ValueParser;
use clap::{Arg, ArgAction, Command, CommandFactory, Subcommand};
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Cesium+ / Ḡchange pod.
    Social,
    /// Duniter GVA node.
    Ledger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Flag,
    Integer,
    Float,
    String,
    List,
    Tuple(usize),
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Flag => f.write_str("flag"),
            ValueKind::Integer => f.write_str("integer"),
            ValueKind::Float => f.write_str("float"),
            ValueKind::String => f.write_str("string"),
            ValueKind::List => f.write_str("list"),
            ValueKind::Tuple(n) => write!(f, "{}-tuple", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagIdentity {
    pub short: Option<char>,
    pub long: Option<String>,
    pub aliases: Vec<String>,
}

impl FlagIdentity {
    fn of(arg: &Arg) -> Self {
        Self {
            short: arg.get_short(),
            long: arg.get_long().map(str::to_string),
            aliases: arg
                .get_all_aliases()
                .unwrap_or_default()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Every spelling that selects this flag on the command line.
    pub fn spellings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(s) = self.short {
            out.push(format!("-{}", s));
        }
        if let Some(l) = &self.long {
            out.push(format!("--{}", l));
        }
        out.extend(self.aliases.iter().map(|a| format!("--{}", a)));
        out
    }

    /// `-nm` for a flag aliased `nm`; single-letter aliases are plain shorts.
    fn matches_single_dash(&self, token: &str) -> bool {
        match token.strip_prefix('-') {
            Some(rest) if !rest.starts_with('-') && rest.len() > 1 => {
                self.aliases.iter().any(|a| a == rest)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    pub id: String,
    pub flag: FlagIdentity,
    pub kind: ValueKind,
    pub default: Option<String>,
    pub required: bool,
    pub help: String,
}

#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: String,
    pub help: String,
    pub arguments: Vec<ArgumentSpec>,
    pub domain: Domain,
}

impl fmt::Display for ArgumentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} <{}>", self.id, self.flag.spellings().join("/"), self.kind)?;
        if let Some(default) = &self.default {
            write!(f, " [default: {}]", default)?;
        }
        if self.required {
            f.write_str(" (required)")?;
        }
        if !self.help.is_empty() {
            write!(f, " {}", self.help)?;
        }
        Ok(())
    }
}

impl CommandSpec {
    /// Canonical `--long` spelling for a legacy single-dash token.
    fn legacy_long(&self, token: &str) -> Option<String> {
        self.arguments
            .iter()
            .find(|a| a.flag.matches_single_dash(token))
            .and_then(|a| a.flag.long.as_ref())
            .map(|long| format!("--{}", long))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.help)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("duplicate command name: {0}")]
    DuplicateCommand(String),
    #[error("duplicate flag {flag} in command {command}")]
    DuplicateFlag { command: String, flag: String },
}

#[derive(Debug)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandSpec>,
}

impl CommandRegistry {
    pub fn build() -> Result<Self, RegistryError> {
        let social = SocialCommand::augment_subcommands(Command::new("social"));
        let ledger = LedgerCommand::augment_subcommands(Command::new("ledger"));

        let mut commands = BTreeMap::new();
        for (domain, group) in [(Domain::Social, &social), (Domain::Ledger, &ledger)] {
            for sub in group.get_subcommands() {
                let spec = command_spec(sub, domain)?;
                if commands.contains_key(&spec.name) {
                    return Err(RegistryError::DuplicateCommand(spec.name));
                }
                commands.insert(spec.name.clone(), spec);
            }
        }
        Ok(Self { commands })
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }

    /// Rewrites legacy single-dash spellings after the subcommand into their
    /// `--long` form. Tokens after `--` are left alone.
    pub fn normalize_args<I, T>(&self, args: I) -> Vec<OsString>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let top_level_values: HashSet<String> = Cli::command()
            .get_arguments()
            .filter(|a| a.get_action().takes_values())
            .flat_map(|a| FlagIdentity::of(a).spellings())
            .collect();

        let mut args = args.into_iter().map(Into::into);
        let mut out: Vec<OsString> = args.next().into_iter().collect();
        let mut active: Option<&CommandSpec> = None;
        let mut skip_value = false;
        let mut verbatim = false;
        for token in args {
            let Some(text) = token.to_str() else {
                out.push(token);
                continue;
            };
            match active {
                _ if verbatim => {}
                Some(spec) => {
                    if text == "--" {
                        verbatim = true;
                    } else if let Some(long) = spec.legacy_long(text) {
                        tracing::trace!(from = text, to = %long, "legacy flag");
                        out.push(long.into());
                        continue;
                    }
                }
                None if skip_value => skip_value = false,
                None if text.starts_with('-') => {
                    skip_value = top_level_values.contains(text);
                }
                None => active = self.get(text),
            }
            out.push(token);
        }
        out
    }
}

fn command_spec(cmd: &Command, domain: Domain) -> Result<CommandSpec, RegistryError> {
    let name = cmd.get_name().to_string();
    let mut seen = std::collections::HashSet::new();
    let mut arguments = Vec::new();
    for arg in cmd.get_arguments() {
        if matches!(
            arg.get_action(),
            ArgAction::Help | ArgAction::HelpShort | ArgAction::HelpLong
        ) {
            continue;
        }
        let spec = argument_spec(arg);
        for spelling in spec.flag.spellings() {
            if !seen.insert(spelling.clone()) {
                return Err(RegistryError::DuplicateFlag {
                    command: name,
                    flag: spelling,
                });
            }
        }
        arguments.push(spec);
    }
    Ok(CommandSpec {
        help: cmd.get_about().map(|a| a.to_string()).unwrap_or_default(),
        name,
        arguments,
        domain,
    })
}

fn argument_spec(arg: &Arg) -> ArgumentSpec {
    ArgumentSpec {
        id: arg.get_id().to_string(),
        flag: FlagIdentity::of(arg),
        kind: value_kind(arg),
        default: arg
            .get_default_values()
            .first()
            .map(|v| v.to_string_lossy().to_string()),
        required: arg.is_required_set(),
        help: arg.get_help().map(|h| h.to_string()).unwrap_or_default(),
    }
}

fn value_kind(arg: &Arg) -> ValueKind {
    if matches!(arg.get_action(), ArgAction::SetTrue | ArgAction::SetFalse) {
        return ValueKind::Flag;
    }
    // Fixed arity wins over the append action clap derives for `Vec` fields.
    if let Some(range) = arg.get_num_args() {
        if range.min_values() == range.max_values() && range.max_values() > 1 {
            return ValueKind::Tuple(range.max_values());
        }
        if range.max_values() > 1 {
            return ValueKind::List;
        }
    }
    if matches!(arg.get_action(), ArgAction::Append) {
        return ValueKind::List;
    }
    let parsed = arg.get_value_parser().type_id();
    if parsed == ValueParser::new(|s: &str| s.parse::<i64>()).type_id() {
        ValueKind::Integer
    } else if parsed == ValueParser::new(|s: &str| s.parse::<f64>()).type_id() {
        ValueKind::Float
    } else {
        ValueKind::String
    }
}
