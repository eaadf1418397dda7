//! Keyfile resolution and the throwaway key used when none is configured.

use ed25519_dalek::SigningKey;
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;
use std::path::{Path, PathBuf};

const EPHEMERAL_PREFIX: &str = "secret.dunikey-";

#[derive(thiserror::Error, Debug)]
pub enum KeyfileError {
    #[error("The keyfile {0} is not found.")]
    NotFound(PathBuf),
    #[error("could not read keyfile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("keyfile {0} is not a PubSec file (missing `pub:` line)")]
    Malformed(PathBuf),
}

/// What a command runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// A pubkey, username or profile name given on the command line.
    Identifier(String),
    Keyfile(PathBuf),
}

impl Credential {
    /// Public key of the account this credential designates.
    pub fn pubkey(&self) -> Result<String, KeyfileError> {
        match self {
            Credential::Identifier(id) => Ok(id.clone()),
            Credential::Keyfile(path) => read_pubsec_pubkey(path),
        }
    }
}

/// Owns a generated keyfile and deletes it when dropped.
#[derive(Debug)]
pub struct EphemeralKey {
    path: PathBuf,
}

impl EphemeralKey {
    pub fn create_in(dir: &Path) -> Result<Self, KeyfileError> {
        let nonce = Alphanumeric.sample_string(&mut OsRng, 32);
        let path = dir.join(format!("{}{}", EPHEMERAL_PREFIX, nonce));
        let key = SigningKey::generate(&mut OsRng);
        write_pubsec(&path, &key).map_err(|source| KeyfileError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "created ephemeral keyfile");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for EphemeralKey {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed ephemeral keyfile"),
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "could not remove ephemeral keyfile"
            ),
        }
    }
}

/// Result of key resolution. The ephemeral guard, if any, must outlive the
/// command that uses the credential.
#[derive(Debug)]
pub struct ResolvedCredential {
    pub credential: Credential,
    pub no_credential_needed: bool,
    pub ephemeral: Option<EphemeralKey>,
}

pub struct KeySources<'a> {
    pub flag: Option<&'a Path>,
    pub configured: Option<&'a Path>,
    pub home: Option<&'a Path>,
    pub temp_dir: &'a Path,
}

/// Picks the credential for one invocation: a public identifier skips keys
/// entirely; otherwise `--key`, then the configured path, then a fresh
/// ephemeral key.
pub fn resolve(
    public_identifier: Option<&str>,
    sources: &KeySources<'_>,
) -> Result<ResolvedCredential, KeyfileError> {
    if let Some(id) = public_identifier {
        return Ok(ResolvedCredential {
            credential: Credential::Identifier(id.to_string()),
            no_credential_needed: true,
            ephemeral: None,
        });
    }

    let (path, ephemeral) = match sources.flag.or(sources.configured) {
        Some(p) => (locate(p, sources.home)?, None),
        None => {
            let key = EphemeralKey::create_in(sources.temp_dir)?;
            (key.path().to_path_buf(), Some(key))
        }
    };
    Ok(ResolvedCredential {
        credential: Credential::Keyfile(path),
        no_credential_needed: false,
        ephemeral,
    })
}

fn locate(path: &Path, home: Option<&Path>) -> Result<PathBuf, KeyfileError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    let Some(home) = home else {
        return Err(KeyfileError::NotFound(path.to_path_buf()));
    };
    let relative = path.strip_prefix("/").unwrap_or(path);
    let under_home = home.join(relative);
    if under_home.is_file() {
        Ok(under_home)
    } else {
        Err(KeyfileError::NotFound(under_home))
    }
}

fn write_pubsec(path: &Path, key: &SigningKey) -> std::io::Result<()> {
    let public = key.verifying_key();
    let body = format!(
        "Type: PubSec\nVersion: 1\npub: {}\nsec: {}\n",
        bs58::encode(public.as_bytes()).into_string(),
        bs58::encode(key.to_keypair_bytes()).into_string()
    );
    std::fs::write(path, body)
}

fn read_pubsec_pubkey(path: &Path) -> Result<String, KeyfileError> {
    let raw = std::fs::read_to_string(path).map_err(|source| KeyfileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    raw.lines()
        .find_map(|l| l.trim().strip_prefix("pub:"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| KeyfileError::Malformed(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ephemeral_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .expect("read temp dir")
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(EPHEMERAL_PREFIX))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn sources<'a>(tmp: &'a Path) -> KeySources<'a> {
        KeySources {
            flag: None,
            configured: None,
            home: None,
            temp_dir: tmp,
        }
    }

    #[test]
    fn public_identifier_bypasses_key_resolution() {
        let tmp = TempDir::new().expect("temp dir");
        let missing = tmp.path().join("nope");
        let mut src = sources(tmp.path());
        src.flag = Some(missing.as_path());
        let resolved = resolve(Some("PUBKEY"), &src).expect("resolved");
        assert_eq!(resolved.credential, Credential::Identifier("PUBKEY".into()));
        assert!(resolved.no_credential_needed);
        assert!(resolved.ephemeral.is_none());
        assert!(ephemeral_files(tmp.path()).is_empty());
    }

    #[test]
    fn flag_takes_priority_over_configured_path() {
        let tmp = TempDir::new().expect("temp dir");
        let flag = tmp.path().join("flag.dunikey");
        let configured = tmp.path().join("env.dunikey");
        std::fs::write(&flag, "pub: A\n").expect("write");
        std::fs::write(&configured, "pub: B\n").expect("write");
        let mut src = sources(tmp.path());
        src.flag = Some(flag.as_path());
        src.configured = Some(configured.as_path());
        let resolved = resolve(None, &src).expect("resolved");
        assert_eq!(resolved.credential, Credential::Keyfile(flag.clone()));
        assert_eq!(resolved.credential.pubkey().expect("pubkey"), "A");

        src.flag = None;
        let resolved = resolve(None, &src).expect("resolved");
        assert_eq!(resolved.credential, Credential::Keyfile(configured.clone()));
    }

    #[test]
    fn missing_path_is_retried_under_home() {
        let tmp = TempDir::new().expect("temp dir");
        let home = tmp.path().join("home");
        std::fs::create_dir_all(home.join(".keys")).expect("mkdir");
        std::fs::write(home.join(".keys/me.dunikey"), "pub: HOMEKEY\n").expect("write");

        let given = PathBuf::from("/.keys/me.dunikey");
        let mut src = sources(tmp.path());
        src.configured = Some(given.as_path());
        src.home = Some(home.as_path());
        let resolved = resolve(None, &src).expect("resolved");
        assert_eq!(
            resolved.credential,
            Credential::Keyfile(home.join(".keys/me.dunikey"))
        );
    }

    #[test]
    fn unresolvable_path_reports_not_found() {
        let tmp = TempDir::new().expect("temp dir");
        let home = tmp.path().join("home");
        let given = tmp.path().join("absent.dunikey");
        let mut src = sources(tmp.path());
        src.flag = Some(given.as_path());
        src.home = Some(home.as_path());
        let err = resolve(None, &src).expect_err("must fail");
        assert!(matches!(err, KeyfileError::NotFound(_)));
        assert!(err.to_string().starts_with("The keyfile "));
        assert!(err.to_string().ends_with("absent.dunikey is not found."));
        assert!(ephemeral_files(tmp.path()).is_empty());
    }

    #[test]
    fn ephemeral_key_is_created_once_and_removed_on_drop() {
        let tmp = TempDir::new().expect("temp dir");
        let resolved = resolve(None, &sources(tmp.path())).expect("resolved");
        let files = ephemeral_files(tmp.path());
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().and_then(|n| n.to_str()).expect("name");
        assert_eq!(name.len(), EPHEMERAL_PREFIX.len() + 32);

        let pubkey = resolved.credential.pubkey().expect("pubsec pubkey");
        assert_eq!(bs58::decode(&pubkey).into_vec().expect("base58").len(), 32);

        drop(resolved);
        assert!(ephemeral_files(tmp.path()).is_empty());
    }

    #[test]
    fn ephemeral_key_is_removed_when_the_command_fails() {
        let tmp = TempDir::new().expect("temp dir");
        let run = || -> anyhow::Result<()> {
            let _resolved = resolve(None, &sources(tmp.path()))?;
            assert_eq!(ephemeral_files(tmp.path()).len(), 1);
            anyhow::bail!("backend unreachable")
        };
        assert!(run().is_err());
        assert!(ephemeral_files(tmp.path()).is_empty());
    }

    #[test]
    fn keyfile_without_pub_line_is_malformed() {
        let tmp = TempDir::new().expect("temp dir");
        let path = tmp.path().join("bad.dunikey");
        std::fs::write(&path, "Type: WIF\n").expect("write");
        let err = Credential::Keyfile(path).pubkey().expect_err("malformed");
        assert!(matches!(err, KeyfileError::Malformed(_)));
    }
}
