//! Resolved assertion policy.
//!
//! One global [`Configuration`] exists per process. An active assertion
//! context carries its own clone, taken when the context begins; edits to
//! that clone stay local. [`Configuration::current`] resolves whichever
//! applies to the calling flow.

use crate::approx::DEFAULT_EPSILON;
use crate::compare::{Comparator, DEFAULT_MAX_DEPTH};
use crate::context;
use crate::reporting::{AssertionObserver, PanicAdapter, ReportingAdapter};
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Default cap on sub-failures folded into one failure.
pub const DEFAULT_MAX_SUB_FAILURES: usize = 10;

pub const ENV_TOLERANCE: &str = "PROBITY_TOLERANCE";
pub const ENV_MAX_DEPTH: &str = "PROBITY_MAX_DEPTH";
pub const ENV_COLOR: &str = "PROBITY_COLOR";
pub const ENV_THROW: &str = "PROBITY_THROW";

#[derive(Clone)]
pub struct Configuration {
    /// Hand failures to the adapter when no context is active
    pub throw_on_failure: bool,
    pub tolerance_default: f64,
    pub max_recursion_depth: usize,
    pub colorize: bool,
    /// Read the literal source line into failure locations
    pub include_source_line: bool,
    pub max_sub_failures: usize,
    pub reporting_adapter: Arc<dyn ReportingAdapter>,
    pub listener: Option<Arc<dyn AssertionObserver>>,
    pub observer: Option<Arc<dyn AssertionObserver>>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            throw_on_failure: true,
            tolerance_default: DEFAULT_EPSILON,
            max_recursion_depth: DEFAULT_MAX_DEPTH,
            colorize: false,
            include_source_line: true,
            max_sub_failures: DEFAULT_MAX_SUB_FAILURES,
            reporting_adapter: Arc::new(PanicAdapter),
            listener: None,
            observer: None,
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("throw_on_failure", &self.throw_on_failure)
            .field("tolerance_default", &self.tolerance_default)
            .field("max_recursion_depth", &self.max_recursion_depth)
            .field("colorize", &self.colorize)
            .field("include_source_line", &self.include_source_line)
            .field("max_sub_failures", &self.max_sub_failures)
            .field("reporting_adapter", &self.reporting_adapter.name())
            .field("listener", &self.listener.is_some())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

static GLOBAL: OnceLock<RwLock<Configuration>> = OnceLock::new();

fn global_lock() -> &'static RwLock<Configuration> {
    GLOBAL.get_or_init(|| RwLock::new(Configuration::from_env()))
}

impl Configuration {
    pub fn with_throw_on_failure(mut self, throw_on_failure: bool) -> Self {
        self.throw_on_failure = throw_on_failure;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance_default = tolerance;
        self
    }

    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    pub fn with_colorize(mut self, colorize: bool) -> Self {
        self.colorize = colorize;
        self
    }

    pub fn with_source_line(mut self, include: bool) -> Self {
        self.include_source_line = include;
        self
    }

    pub fn with_max_sub_failures(mut self, max: usize) -> Self {
        self.max_sub_failures = max;
        self
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn ReportingAdapter>) -> Self {
        self.reporting_adapter = adapter;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn AssertionObserver>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn AssertionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Structural comparator using this tolerance and depth bound.
    pub fn comparator(&self) -> Comparator {
        Comparator::from_config(self)
    }

    /// Defaults with `PROBITY_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up by variable name. Unparseable values are
    /// logged and ignored.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_TOLERANCE) {
            match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => self.tolerance_default = v,
                _ => ignored(ENV_TOLERANCE, &raw),
            }
        }
        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            match raw.trim().parse::<usize>() {
                Ok(v) => self.max_recursion_depth = v,
                Err(_) => ignored(ENV_MAX_DEPTH, &raw),
            }
        }
        if let Some(raw) = lookup(ENV_COLOR) {
            match parse_flag(&raw) {
                Some(v) => self.colorize = v,
                None => ignored(ENV_COLOR, &raw),
            }
        }
        if let Some(raw) = lookup(ENV_THROW) {
            match parse_flag(&raw) {
                Some(v) => self.throw_on_failure = v,
                None => ignored(ENV_THROW, &raw),
            }
        }
        self
    }

    /// Copy of the process-wide configuration.
    pub fn global() -> Self {
        global_lock()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Edit the process-wide configuration in place.
    pub fn update_global(f: impl FnOnce(&mut Configuration)) {
        let mut guard = global_lock()
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }

    /// Restore the process-wide configuration to defaults plus environment.
    pub fn reset_global() {
        let fresh = Self::from_env();
        *global_lock()
            .write()
            .unwrap_or_else(PoisonError::into_inner) = fresh;
    }

    /// The active context's configuration, or the global one.
    pub fn current() -> Self {
        match context::current() {
            Some(handle) => handle.configuration(),
            None => Self::global(),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn ignored(var: &str, raw: &str) {
    tracing::warn!(
        component = module_path!(),
        var,
        value = raw,
        "ignoring invalid configuration override"
    );
}
