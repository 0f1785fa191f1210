//! Command prefix matching.

/// Prefixes that address the bot by mention.
pub fn mention_prefixes(bot_id: u64) -> [String; 2] {
    [format!("<@{bot_id}> "), format!("<@!{bot_id}> ")]
}

/// Prefix a message starts with, and the text after it.
///
/// When several prefixes match, the longest one wins, so `!!` beats `!`.
pub fn match_prefix<'a>(content: &'a str, prefixes: &[String]) -> Option<(String, &'a str)> {
    prefixes
        .iter()
        .filter(|prefix| !prefix.is_empty() && content.starts_with(prefix.as_str()))
        .max_by_key(|prefix| prefix.len())
        .map(|prefix| (prefix.clone(), &content[prefix.len()..]))
}

/// All prefixes the bot answers to: the configured ones plus its mentions.
pub fn command_prefixes(configured: &[String], bot_id: Option<u64>) -> Vec<String> {
    let mut prefixes = configured.to_vec();
    if let Some(bot_id) = bot_id {
        prefixes.extend(mention_prefixes(bot_id));
    }
    prefixes
}
