//! Process-wide engine options and the host logger capability.
//!
//! Misuse of the public contracts (empty labels, missing required params,
//! malformed records) is surfaced exclusively through the logger; it never
//! alters control flow. Hosts install their own sink once at startup via
//! [`initialize`]; the default forwards to `tracing`.

use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use crate::error::Violation;

/// Diagnostics sink provided by the host.
pub trait OperationLogger: Send + Sync {
    /// A non-fatal contract violation. The engine has already applied its
    /// best-effort fallback; escalation (e.g. panicking in a test
    /// harness) is the host's choice.
    fn exception(&self, message: &str, violation: &Violation);

    /// High-volume diagnostics emitted for debug-flagged descriptors.
    fn verbose(&self, message: &str);

    /// Diagnostics with a structured data snapshot attached.
    fn info(&self, message: &str, data: serde_json::Value);
}

/// Default sink: forwards to the `tracing` macros.
pub struct TracingLogger;

impl OperationLogger for TracingLogger {
    fn exception(&self, message: &str, violation: &Violation) {
        tracing::error!(%violation, "{message}");
    }

    fn verbose(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn info(&self, message: &str, data: serde_json::Value) {
        tracing::info!(%data, "{message}");
    }
}

/// Process-wide options, installed once before use.
pub struct EngineOptions {
    pub logger: Arc<dyn OperationLogger>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            logger: Arc::new(TracingLogger),
        }
    }
}

lazy_static! {
    static ref OPTIONS: RwLock<EngineOptions> = RwLock::new(EngineOptions::default());
}

/// Install process-wide options. Intended to be called once at startup;
/// calling again replaces the previous options wholesale.
pub fn initialize(options: EngineOptions) {
    *OPTIONS.write().unwrap() = options;
}

/// The currently installed logger.
pub fn logger() -> Arc<dyn OperationLogger> {
    OPTIONS.read().unwrap().logger.clone()
}
