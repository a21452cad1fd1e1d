//! Where the base romfs and the mod directory come from.
//!
//! A root given on the command line is used as given. Otherwise the
//! environment override is tried, then `romfs-tools.toml`; the first
//! candidate that is an existing directory wins and every candidate tried is
//! kept for diagnostics.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub const CONFIG_FILE_NAME: &str = "romfs-tools.toml";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    pub base_romfs: Option<PathBuf>,
    pub mod_romfs: Option<PathBuf>,
}

impl ToolsConfig {
    pub fn parse_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reads `path`; a missing file is an empty config unless it was asked
    /// for explicitly.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {
                return Ok(Self::default())
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn root(&self, kind: RootKind) -> Option<&Path> {
        match kind {
            RootKind::Base => self.base_romfs.as_deref(),
            RootKind::Mod => self.mod_romfs.as_deref(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{kind} directory not set (use --{flag}, {env} or romfs-tools.toml)", flag = .kind.flag(), env = .kind.env_key())]
    MissingRoot { kind: RootKind },
    #[error("{kind} directory not found\n{candidates}")]
    RootNotFound { kind: RootKind, candidates: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootKind {
    Base,
    Mod,
}

impl RootKind {
    pub fn env_key(self) -> &'static str {
        match self {
            RootKind::Base => "ROMFS_TOOLS_BASE",
            RootKind::Mod => "ROMFS_TOOLS_MOD",
        }
    }

    fn flag(self) -> &'static str {
        match self {
            RootKind::Base => "base",
            RootKind::Mod => "mod",
        }
    }
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RootKind::Base => "base romfs",
            RootKind::Mod => "mod romfs",
        };
        write!(f, "{}", label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootSource {
    CliFlag,
    EnvOverride,
    ConfigFile,
}

impl fmt::Display for RootSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RootSource::CliFlag => "cli flag",
            RootSource::EnvOverride => "env override",
            RootSource::ConfigFile => "config file",
        };
        write!(f, "{}", label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootCandidate {
    pub source: RootSource,
    pub path: PathBuf,
    pub exists: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRoot {
    pub path: PathBuf,
    pub source: RootSource,
    pub candidates: Vec<RootCandidate>,
}

impl ResolvedRoot {
    pub fn describe(&self) -> String {
        format!(
            "root resolved ({}) -> {}\n{}",
            self.source,
            self.path.display(),
            format_candidates(&self.candidates)
        )
    }
}

/// An explicit CLI path wins even when it does not exist, so the romfs
/// loader reports it. Otherwise picks the first candidate that is an
/// existing directory. A missing mod root is not an error; a missing base
/// root is.
pub fn resolve_root(
    kind: RootKind,
    cli: Option<&Path>,
    env: Option<PathBuf>,
    config: &ToolsConfig,
) -> Result<Option<ResolvedRoot>, ConfigError> {
    if let Some(path) = cli {
        let exists = path.is_dir();
        if !exists {
            warn!(
                root = %kind,
                path = %path.display(),
                "root given on the command line does not exist"
            );
        }
        let candidate = RootCandidate {
            source: RootSource::CliFlag,
            path: path.to_path_buf(),
            exists,
        };
        return Ok(Some(ResolvedRoot {
            path: path.to_path_buf(),
            source: RootSource::CliFlag,
            candidates: vec![candidate],
        }));
    }

    let inputs = [
        (RootSource::EnvOverride, env),
        (RootSource::ConfigFile, config.root(kind).map(Path::to_path_buf)),
    ];

    let mut candidates = Vec::new();
    for (source, path) in inputs {
        let Some(path) = path else {
            continue;
        };
        let exists = path.is_dir();
        candidates.push(RootCandidate {
            source,
            path: path.clone(),
            exists,
        });
        if exists {
            return Ok(Some(ResolvedRoot {
                path,
                source,
                candidates,
            }));
        }
    }

    if !candidates.is_empty() {
        return Err(ConfigError::RootNotFound {
            kind,
            candidates: format_candidates(&candidates),
        });
    }
    match kind {
        RootKind::Base => Err(ConfigError::MissingRoot { kind }),
        RootKind::Mod => Ok(None),
    }
}

/// Reads `kind`'s environment override; empty values count as unset.
pub fn env_root(kind: RootKind) -> Option<PathBuf> {
    std::env::var_os(kind.env_key())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn format_candidates(candidates: &[RootCandidate]) -> String {
    candidates
        .iter()
        .map(|candidate| {
            let hit = if candidate.exists { " [hit]" } else { "" };
            format!(
                "- {}: {}{}",
                candidate.source,
                candidate.path.display(),
                hit
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_roots() {
        let config = ToolsConfig::parse_toml(
            "base_romfs = \"/games/romfs\"\nmod_romfs = \"/games/mod\"\n",
        )
        .unwrap();
        assert_eq!(config.base_romfs, Some(PathBuf::from("/games/romfs")));
        assert_eq!(config.mod_romfs, Some(PathBuf::from("/games/mod")));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(ToolsConfig::parse_toml("romfs = \"/x\"\n").is_err());
    }

    #[test]
    fn missing_optional_config_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert_eq!(ToolsConfig::load(&path, false).unwrap(), ToolsConfig::default());
        assert!(matches!(
            ToolsConfig::load(&path, true),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn cli_flag_wins_over_env_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let cli = dir.path().join("cli");
        let env = dir.path().join("env");
        fs::create_dir_all(&cli).unwrap();
        fs::create_dir_all(&env).unwrap();
        let config = ToolsConfig {
            base_romfs: Some(dir.path().to_path_buf()),
            mod_romfs: None,
        };
        let resolved = resolve_root(RootKind::Base, Some(&cli), Some(env), &config)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.source, RootSource::CliFlag);
        assert_eq!(resolved.path, cli);
        assert_eq!(resolved.candidates.len(), 1);
    }

    #[test]
    fn missing_cli_path_is_used_as_given() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolsConfig {
            base_romfs: Some(dir.path().to_path_buf()),
            mod_romfs: None,
        };
        let missing = dir.path().join("nope");
        let resolved = resolve_root(
            RootKind::Base,
            Some(&missing),
            Some(dir.path().to_path_buf()),
            &config,
        )
        .unwrap()
        .unwrap();
        assert_eq!(resolved.source, RootSource::CliFlag);
        assert_eq!(resolved.path, missing);
        assert!(!resolved.candidates[0].exists);
    }

    #[test]
    fn falls_through_missing_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolsConfig {
            base_romfs: Some(dir.path().to_path_buf()),
            mod_romfs: None,
        };
        let missing = dir.path().join("nope");
        let resolved = resolve_root(RootKind::Base, None, Some(missing), &config)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.source, RootSource::ConfigFile);
        assert!(!resolved.candidates[0].exists);
        assert!(resolved.describe().contains("[hit]"));
    }

    #[test]
    fn unset_roots() {
        let config = ToolsConfig::default();
        assert!(matches!(
            resolve_root(RootKind::Base, None, None, &config),
            Err(ConfigError::MissingRoot {
                kind: RootKind::Base
            })
        ));
        assert_eq!(resolve_root(RootKind::Mod, None, None, &config).unwrap(), None);
    }

    #[test]
    fn every_missing_candidate_is_listed() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolsConfig {
            base_romfs: None,
            mod_romfs: Some(dir.path().join("a")),
        };
        let err = resolve_root(RootKind::Mod, None, Some(dir.path().join("b")), &config)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("env override"));
        assert!(message.contains("config file"));
    }
}
