//! Extensions: named bundles of commands and event listeners.
//!
//! Extensions are compiled into the binary and registered by name in an
//! [`ExtensionRegistry`]; the `extensions.txt` and `local_extensions.txt`
//! files select which of them a bot loads.

use crate::command::{Args, CommandContext, CommandSpec};
use crate::config::{EXTENSIONS_FILE, LOCAL_EXTENSIONS_FILE, read_extension_list};
use crate::{Controller, Event};
use async_trait::async_trait;
use regex::Regex;
use serenity::all::Context;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};
use versa_error::{ConfigError, VersaResult};

/// A named bundle of commands and listeners.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Unique extension name, as written in the extension list files.
    fn name(&self) -> &str;

    /// Semantic version string without a leading `v`.
    fn version(&self) -> &str;

    /// Short description shown by `help`.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Commands this extension handles.
    fn commands(&self) -> Vec<CommandSpec>;

    /// Run the command `ctx.command`.
    async fn invoke(&self, ctx: CommandContext, args: Args) -> VersaResult<()>;

    /// React to a gateway event.
    async fn on_event(
        &self,
        _ctx: &Context,
        _event: &Event,
        _controller: &Controller,
    ) -> VersaResult<()> {
        Ok(())
    }
}

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(0|[1-9]\d*)\.",
        r"(0|[1-9]\d*)\.",
        r"(0|[1-9]\d*)?",
        r"(?:-(0|[1-9]\d*|\d*[A-Za-z][\dA-Za-z]*))?",
        r"(?:\.(0|[1-9]\d*|\d*[A-Za-z][\dA-Za-z]*))*",
    ))
    .expect("version pattern is valid")
});

/// Parsed extension version.
///
/// Numeric parts keep their digits as written, so versions of any length
/// parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    /// Major version digits
    pub major: String,
    /// Minor version digits
    pub minor: String,
    /// Micro (patch) version digits, `0` when omitted
    pub micro: String,
    /// Pre-release label such as `beta`
    pub release_level: Option<String>,
    /// Pre-release serial
    pub serial: Option<String>,
}

impl Version {
    /// Parse `value`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `value` does not start with a
    /// semantic version (a leading `v` is rejected).
    #[track_caller]
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let invalid = || {
            ConfigError::new(format!(
                "Invalid extension version string: {value}\n\
                 Follow semantic versioning and do NOT include a leading 'v'"
            ))
        };
        let caps = VERSION_PATTERN.captures(value).ok_or_else(invalid)?;
        let number = |idx: usize| {
            caps.get(idx)
                .map_or_else(|| "0".to_string(), |m| m.as_str().to_string())
        };

        Ok(Self {
            major: number(1),
            minor: number(2),
            micro: number(3),
            release_level: caps.get(4).map(|m| m.as_str().to_string()),
            serial: caps.get(5).map(|m| m.as_str().to_string()),
        })
    }
}

impl FromStr for Version {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if let Some(level) = &self.release_level {
            write!(f, "-{level}")?;
            if let Some(serial) = &self.serial {
                write!(f, ".{serial}")?;
            }
        }
        Ok(())
    }
}

/// Builds an extension instance.
pub type ExtensionFactory = fn() -> Arc<dyn Extension>;

/// Extensions available to a bot, by name.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    factories: BTreeMap<String, ExtensionFactory>,
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ExtensionRegistry {
    /// Name of the extension every bot loads.
    pub const ESSENTIALS: &'static str = crate::extensions::essentials::NAME;

    /// Registry with only the built-in extensions.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.register(Self::ESSENTIALS, crate::extensions::essentials::factory);
        registry
    }

    /// Make `factory` available as `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, factory: ExtensionFactory) -> &mut Self {
        let name = name.into();
        debug!(extension = %name, "Registered extension factory");
        self.factories.insert(name, factory);
        self
    }

    /// Whether `name` is available.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Names of all available extensions.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiate the essentials (when available) followed by `names`, in
    /// order and without duplicates.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for names that are not registered.
    pub fn resolve<I, S>(&self, names: I) -> Result<Vec<Arc<dyn Extension>>, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut loaded: Vec<String> = Vec::new();
        let mut extensions = Vec::new();

        let requested = self
            .contains(Self::ESSENTIALS)
            .then(|| Self::ESSENTIALS.to_string())
            .into_iter()
            .chain(names.into_iter().map(|name| name.as_ref().to_string()));

        for name in requested {
            if loaded.contains(&name) {
                continue;
            }
            let factory = self
                .factories
                .get(&name)
                .ok_or_else(|| ConfigError::new(format!("Unknown extension: {name}")))?;
            extensions.push(factory());
            loaded.push(name);
        }

        info!(extensions = ?loaded, "Resolved extensions");
        Ok(extensions)
    }

    /// Instantiate the extensions listed in the extension list files of
    /// `root`.
    pub fn load_lists(&self, root: &Path) -> Result<Vec<Arc<dyn Extension>>, ConfigError> {
        let mut names = read_extension_list(&root.join(EXTENSIONS_FILE))?;
        names.extend(read_extension_list(&root.join(LOCAL_EXTENSIONS_FILE))?);
        self.resolve(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_version() {
        let version = Version::parse("0.1.0-beta.8").unwrap();
        assert_eq!(version.major, "0");
        assert_eq!(version.minor, "1");
        assert_eq!(version.micro, "0");
        assert_eq!(version.release_level.as_deref(), Some("beta"));
        assert_eq!(version.serial.as_deref(), Some("8"));
        assert_eq!(version.to_string(), "0.1.0-beta.8");
    }

    #[test]
    fn test_parse_plain_version() {
        let version: Version = "12.0.3".parse().unwrap();
        assert_eq!(version.to_string(), "12.0.3");
        assert!(version.release_level.is_none());
    }

    #[test]
    fn test_parse_long_numbers() {
        let version = Version::parse("1.0.99999999999999999999").unwrap();
        assert_eq!(version.micro, "99999999999999999999");
        assert_eq!(version.to_string(), "1.0.99999999999999999999");
    }

    #[test]
    fn test_missing_micro_defaults_to_zero() {
        let version = Version::parse("2.5.-rc.1").unwrap();
        assert_eq!(version.micro, "0");
        assert_eq!(version.release_level.as_deref(), Some("rc"));
    }

    #[test]
    fn test_leading_v_is_rejected() {
        let err = Version::parse("v1.0.0").unwrap_err();
        assert!(err.message.contains("v1.0.0"));
        assert!(Version::parse("1.0").is_err());
        assert!(Version::parse("01.0.0").is_err());
    }

    #[test]
    fn test_unknown_extension_is_config_error() {
        let registry = ExtensionRegistry::builtin();
        let err = registry.resolve(["music"]).err().unwrap();
        assert!(err.message.contains("music"));
    }

    #[test]
    fn test_essentials_loaded_once() {
        let registry = ExtensionRegistry::builtin();
        let extensions = registry.resolve(["essentials"]).unwrap();
        assert_eq!(extensions.len(), 1);
        assert_eq!(extensions[0].name(), "essentials");
    }
}
