//! Command argument tokenizer.

use std::str::FromStr;
use versa_error::{CommandError, CommandErrorKind};

/// Arguments following the command name.
///
/// Words are split on whitespace; a word starting with `"` runs to the
/// matching closing quote, with `\"` standing for a literal quote.
///
/// # Example
///
/// ```
/// use versa_core::Args;
///
/// let mut args = Args::new(r#"add "two words" and the rest"#);
/// assert_eq!(args.next().as_deref(), Some("add"));
/// assert_eq!(args.next().as_deref(), Some("two words"));
/// assert_eq!(args.rest().as_deref(), Some("and the rest"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    raw: String,
    pos: usize,
}

impl Args {
    /// Tokenize `raw`.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            pos: 0,
        }
    }

    /// Text that has not been consumed yet.
    pub fn remainder(&self) -> &str {
        &self.raw[self.pos..]
    }

    /// Whether all arguments have been consumed.
    pub fn is_empty(&self) -> bool {
        self.remainder().trim().is_empty()
    }

    fn skip_whitespace(&mut self) {
        let remainder = self.remainder();
        self.pos += remainder.len() - remainder.trim_start().len();
    }

    /// Next word, or `None` when nothing is left.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<String> {
        self.skip_whitespace();
        let remainder = self.remainder();
        if remainder.is_empty() {
            return None;
        }

        if let Some(quoted) = remainder.strip_prefix('"') {
            let mut word = String::new();
            let mut chars = quoted.char_indices();
            let mut consumed = quoted.len();
            while let Some((idx, ch)) = chars.next() {
                match ch {
                    '\\' => match chars.next() {
                        Some((_, '"')) => word.push('"'),
                        Some((_, other)) => {
                            word.push('\\');
                            word.push(other);
                        }
                        None => word.push('\\'),
                    },
                    '"' => {
                        consumed = idx + 1;
                        break;
                    }
                    other => word.push(other),
                }
            }
            self.pos += 1 + consumed;
            return Some(word);
        }

        let end = remainder
            .find(char::is_whitespace)
            .unwrap_or(remainder.len());
        let word = remainder[..end].to_string();
        self.pos += end;
        Some(word)
    }

    /// Everything left as one string ("consume rest").
    ///
    /// Returns `None` when nothing but whitespace is left.
    pub fn rest(&mut self) -> Option<String> {
        let rest = self.remainder().trim().to_string();
        self.pos = self.raw.len();
        (!rest.is_empty()).then_some(rest)
    }

    /// All remaining words.
    pub fn remaining(&mut self) -> Vec<String> {
        std::iter::from_fn(|| self.next()).collect()
    }

    /// Next word, failing with a missing-argument error.
    #[track_caller]
    pub fn required(&mut self, command: &str, arg_name: &str) -> Result<String, CommandError> {
        self.next()
            .ok_or_else(|| missing_argument(command, arg_name))
    }

    /// Remaining text, failing with a missing-argument error.
    #[track_caller]
    pub fn required_rest(&mut self, command: &str, arg_name: &str) -> Result<String, CommandError> {
        self.rest()
            .ok_or_else(|| missing_argument(command, arg_name))
    }

    /// Next word parsed as `T`.
    ///
    /// Returns `Ok(None)` when nothing is left.
    #[track_caller]
    pub fn parse<T>(&mut self, command: &str, arg_name: &str) -> Result<Option<T>, CommandError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.next() {
            None => Ok(None),
            Some(word) => word.parse().map(Some).map_err(|e: T::Err| {
                CommandError::new(CommandErrorKind::InvalidArgument {
                    command: command.to_string(),
                    arg_name: arg_name.to_string(),
                    reason: e.to_string(),
                })
            }),
        }
    }
}

#[track_caller]
fn missing_argument(command: &str, arg_name: &str) -> CommandError {
    CommandError::new(CommandErrorKind::MissingArgument {
        command: command.to_string(),
        arg_name: arg_name.to_string(),
    })
}
