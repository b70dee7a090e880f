//! Identifier normalization and the identity types shared by every module

use std::fmt;

/// Normalize free text into an identifier.
///
/// Lowercases ASCII letters and drops everything that is not `[a-z0-9]`.
/// Player ids, format ids, alias keys and resolver tokens all go through
/// this function, so `"Reverse Trivia"`, `"reverse-trivia"` and
/// `"REVERSETRIVIA"` all name the same thing.
///
/// # Example
/// ```
/// use parlor_core::to_id;
///
/// assert_eq!(to_id("Reverse Trivia"), "reversetrivia");
/// assert_eq!(to_id("  Bob_42! "), "bob42");
/// ```
pub fn to_id(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Identity of a communication channel.
///
/// A direct-message context is a channel whose id equals the invoker's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(to_id(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A chat user as seen by the host: only the display name is authoritative,
/// the id is always derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn id(&self) -> String {
        to_id(&self.name)
    }
}
