//! Subscriber installation for binaries and demos.
//!
//! Library code only emits events; whoever owns `main` picks a [`Profile`].

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Environment variable naming a profile, overriding the caller's choice.
pub const ENV_LOG_PROFILE: &str = "PROBITY_LOG_PROFILE";

/// How log output is rendered and how much of it is kept. Every profile
/// writes to stderr so stdout stays free for command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable, debug level for probity crates
    Development,
    /// One JSON object per event, info level
    Production,
    /// Warnings and errors only, without targets
    Cli,
}

impl Profile {
    /// Parse `dev`, `json` or `cli` (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Some(Profile::Development),
            "json" | "production" => Some(Profile::Production),
            "cli" => Some(Profile::Cli),
            _ => None,
        }
    }

    /// The profile named by `PROBITY_LOG_PROFILE`, else `fallback`.
    pub fn from_env_or(fallback: Profile) -> Self {
        resolve(std::env::var(ENV_LOG_PROFILE).ok().as_deref(), fallback)
    }

    /// Filter used when `RUST_LOG` is unset.
    pub fn default_directive(self) -> &'static str {
        match self {
            Profile::Development => "probity=debug,probity_core=debug",
            Profile::Production => "probity=info,probity_core=info",
            Profile::Cli => "warn",
        }
    }
}

fn resolve(raw: Option<&str>, fallback: Profile) -> Profile {
    raw.and_then(Profile::parse).unwrap_or(fallback)
}

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber for `profile`.
///
/// Only the first call in a process does anything. A subscriber that is
/// already installed, such as test capture, is left in place.
///
/// ```
/// use probity_core::logging_facility::{init, Profile};
///
/// init(Profile::from_env_or(Profile::Cli));
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(profile.default_directive()));
        let builder = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter);
        let _ = match profile {
            Profile::Development => builder.try_init(),
            Profile::Production => builder.json().try_init(),
            Profile::Cli => builder.with_target(false).try_init(),
        };
    });
}
