//! Message drafting and delivery for `send`.

use anyhow::Context;
use std::io::{BufRead, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub title: String,
    pub body: String,
}

impl MessageDraft {
    /// File first, then `--titre` with `--message`, then prompts on `input`.
    pub fn resolve(
        titre: Option<&str>,
        message: Option<&str>,
        fichier: Option<&Path>,
        input: &mut dyn BufRead,
        prompt: &mut dyn Write,
    ) -> anyhow::Result<Self> {
        if let Some(path) = fichier {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read message file {}", path.display()))?;
            return Ok(Self::from_file(&raw, titre));
        }
        if let (Some(title), Some(body)) = (titre, message) {
            return Ok(Self {
                title: title.to_string(),
                body: body.to_string(),
            });
        }
        tracing::debug!("message incomplete on the command line, prompting");
        let title = ask(input, prompt, "Enter the message title: ")?;
        let body = ask(input, prompt, "Enter the message content: ")?;
        Ok(Self { title, body })
    }

    /// First line is the title unless one is forced, in which case the whole
    /// text is the body.
    fn from_file(raw: &str, forced_title: Option<&str>) -> Self {
        if let Some(title) = forced_title {
            return Self {
                title: title.to_string(),
                body: raw.to_string(),
            };
        }
        match raw.split_once('\n') {
            Some((first, rest)) => Self {
                title: first.trim_end_matches('\r').to_string(),
                body: rest.to_string(),
            },
            None => Self {
                title: raw.to_string(),
                body: String::new(),
            },
        }
    }
}

/// Delivers a composed message to its recipient.
pub trait Messenger {
    /// Whether [`Messenger::deliver`] can succeed at all. Checked before any
    /// prompt is shown.
    fn available(&self) -> bool;

    fn deliver(&self, recipient: &str, draft: &MessageDraft, outbox: bool) -> anyhow::Result<()>;
}

/// Messages must be signed with the keyfile, so nothing is ever delivered.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsignedMessenger;

impl Messenger for UnsignedMessenger {
    fn available(&self) -> bool {
        false
    }

    fn deliver(
        &self,
        recipient: &str,
        _draft: &MessageDraft,
        _outbox: bool,
    ) -> anyhow::Result<()> {
        anyhow::bail!("cannot deliver a message to {} without signing it", recipient)
    }
}

fn ask(
    input: &mut dyn BufRead,
    prompt: &mut dyn Write,
    question: &str,
) -> anyhow::Result<String> {
    write!(prompt, "{}", question)?;
    prompt.flush()?;
    let mut line = String::new();
    input.read_line(&mut line).context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
