//! Command framework: prefixes, arguments, checks, cooldowns and the
//! registry that maps command names to extensions.

mod args;
mod check;
mod context;
mod cooldown;
mod prefix;
mod registry;
mod spec;

pub use args::Args;
pub use check::{Check, CheckInput, run_checks};
pub use context::{CommandContext, MAX_MESSAGE_LEN, split_message};
pub use cooldown::{BucketIds, BucketType, Cooldown, CooldownBuckets};
pub use prefix::{command_prefixes, match_prefix, mention_prefixes};
pub use registry::{CommandRegistry, RegisteredCommand};
pub use spec::CommandSpec;
