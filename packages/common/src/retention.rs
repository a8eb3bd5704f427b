//! Sources for the "disable global file removal" switch.
//!
//! The registry asks its policy on every delete, so a policy must never memoize
//! the answer: operators toggle retention without restarting the process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Environment variable consulted by [`EnvRemovalPolicy::default`].
pub const DISABLE_REMOVE_GLOBAL_FILE: &str = "DISABLE_REMOVE_GLOBAL_FILE";

/// Decides whether orphaned global file entries are kept instead of removed.
pub trait RemovalPolicy: Send + Sync {
    /// `true` when orphan sweeps must be skipped.
    fn removal_disabled(&self) -> bool;
}

impl RemovalPolicy for bool {
    fn removal_disabled(&self) -> bool {
        *self
    }
}

impl<P: RemovalPolicy + ?Sized> RemovalPolicy for Arc<P> {
    fn removal_disabled(&self) -> bool {
        (**self).removal_disabled()
    }
}

/// Reads an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvRemovalPolicy {
    var: String,
    fallback: bool,
}

impl EnvRemovalPolicy {
    pub fn new(var: impl Into<String>, fallback: bool) -> Self {
        Self {
            var: var.into(),
            fallback,
        }
    }

    /// Value used when the variable is unset (typically the configured startup value).
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }
}

impl Default for EnvRemovalPolicy {
    fn default() -> Self {
        Self::new(DISABLE_REMOVE_GLOBAL_FILE, false)
    }
}

impl RemovalPolicy for EnvRemovalPolicy {
    fn removal_disabled(&self) -> bool {
        match std::env::var(&self.var) {
            Ok(raw) => parse_flag(&raw),
            Err(std::env::VarError::NotPresent) => self.fallback,
            Err(std::env::VarError::NotUnicode(_)) => {
                tracing::warn!(var = %self.var, "ignoring non-unicode flag value");
                self.fallback
            }
        }
    }
}

/// Runtime-togglable switch shared between the registry and whoever flips it.
#[derive(Debug, Clone, Default)]
pub struct SwitchRemovalPolicy(Arc<AtomicBool>);

impl SwitchRemovalPolicy {
    pub fn new(disabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(disabled)))
    }

    pub fn set(&self, disabled: bool) {
        self.0.store(disabled, Ordering::SeqCst);
    }
}

impl RemovalPolicy for SwitchRemovalPolicy {
    fn removal_disabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Interpret a flag string. Only explicit truthy spellings enable the flag.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
