//! Per-extension handle to the bot runtime.

use crate::{Core, Settings};
use std::sync::Arc;
use tracing::Span;
use versa_cache::Cache;

use crate::db::Database;

/// What an extension gets to work with: the runtime, the database, the
/// cache and the settings, plus a tracing span named after the extension.
///
/// The span logs at debug level in test mode and at info level otherwise.
#[derive(Debug, Clone)]
pub struct Controller {
    core: Arc<Core>,
    extension: String,
    span: Span,
}

impl Controller {
    /// Handle for `extension`.
    pub fn new(core: Arc<Core>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        let logger = Self::logger_name_for(&extension);
        let span = if core.mode().is_test() {
            tracing::debug_span!("controller", logger = %logger, extension = %extension)
        } else {
            tracing::info_span!("controller", logger = %logger, extension = %extension)
        };
        Self {
            core,
            extension,
            span,
        }
    }

    fn logger_name_for(extension: &str) -> String {
        format!("versa.extensions.{extension}.controller")
    }

    /// Bot runtime.
    pub fn core(&self) -> &Arc<Core> {
        &self.core
    }

    /// Database adapter.
    pub fn db(&self) -> &Database {
        self.core.db()
    }

    /// Key-value cache.
    pub fn cache(&self) -> &Cache {
        self.core.cache()
    }

    /// Bot settings.
    pub fn settings(&self) -> &Settings {
        self.core.settings()
    }

    /// Name of the extension this handle belongs to.
    pub fn extension_name(&self) -> &str {
        &self.extension
    }

    /// Logger name, `versa.extensions.<name>.controller`.
    pub fn logger_name(&self) -> String {
        Self::logger_name_for(&self.extension)
    }

    /// Span extension work is recorded in.
    pub fn span(&self) -> &Span {
        &self.span
    }
}
