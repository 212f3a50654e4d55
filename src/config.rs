//! Configuration loading and management

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use hotkeys::{ManagerConfig, Shortcut};

const REGISTER_TIMEOUT_VAR: &str = "HOTKEYS_REGISTER_TIMEOUT_MS";
const BINDINGS_VAR: &str = "HOTKEYS_BINDINGS";

const DEFAULT_REGISTER_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_BINDINGS: &str = "id1=ALT+A;id2=CTRL+ALT+S";

/// A hot key to register at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub id: String,
    pub shortcut: Shortcut,
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// How long to wait for each listener to report its registration
    pub register_timeout: Duration,

    /// Hot keys registered at startup
    pub bindings: Vec<Binding>,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let register_timeout = match lookup(REGISTER_TIMEOUT_VAR) {
            Some(raw) => {
                let ms: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{REGISTER_TIMEOUT_VAR} must be milliseconds, got '{raw}'"))?;
                if ms == 0 {
                    bail!("{REGISTER_TIMEOUT_VAR} must be greater than zero");
                }
                Duration::from_millis(ms)
            }
            None => Duration::from_millis(DEFAULT_REGISTER_TIMEOUT_MS),
        };

        let raw_bindings = lookup(BINDINGS_VAR).unwrap_or_else(|| DEFAULT_BINDINGS.to_string());
        let bindings = parse_bindings(&raw_bindings)
            .with_context(|| format!("invalid {BINDINGS_VAR}"))?;

        Ok(Self {
            register_timeout,
            bindings,
        })
    }

    /// Settings for the hot key manager
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            register_timeout: self.register_timeout,
        }
    }
}

/// Parse `id=shortcut` entries separated by `;`
fn parse_bindings(raw: &str) -> Result<Vec<Binding>> {
    let mut seen = HashSet::new();
    let mut bindings = Vec::new();

    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (id, shortcut) = entry
            .split_once('=')
            .with_context(|| format!("entry '{entry}' is not of the form id=shortcut"))?;
        let id = id.trim();
        if id.is_empty() {
            bail!("entry '{entry}' has an empty id");
        }
        if !seen.insert(id.to_string()) {
            bail!("id '{id}' appears more than once");
        }
        let shortcut: Shortcut = shortcut.parse()?;
        bindings.push(Binding {
            id: id.to_string(),
            shortcut,
        });
    }

    Ok(bindings)
}
