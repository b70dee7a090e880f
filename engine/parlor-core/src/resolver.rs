//! Format resolution: `"trivia,reverse,team"` -> one merged descriptor
//!
//! The first token names the format (directly or through an alias); the
//! remaining tokens select a variation and/or a mode in any order. When two
//! tokens select the same kind of thing the later one wins.

use tracing::trace;

use crate::format::FormatDescriptor;
use crate::id::to_id;
use crate::registry::FormatRegistry;

impl FormatRegistry {
    /// Resolve a textual request into a working copy of a format.
    ///
    /// Returns `None` for unknown or inherit-only formats; user-supplied text
    /// naming no format is an ordinary outcome, not an error.
    pub fn resolve(&self, target: &str) -> Option<FormatDescriptor> {
        self.resolve_with(target, true)
    }

    fn resolve_with(&self, target: &str, follow_alias: bool) -> Option<FormatDescriptor> {
        let mut tokens = target.split(',');
        let head = to_id(tokens.next()?);
        let rest: Vec<&str> = tokens.collect();

        if follow_alias {
            if let Some(aliased) = self.aliases.get(&head) {
                let mut substituted = aliased.clone();
                for token in &rest {
                    substituted.push(',');
                    substituted.push_str(token);
                }
                trace!(alias = %head, target = %substituted, "Following format alias");
                return self.resolve_with(&substituted, false);
            }
        }

        let stored = self.formats.get(&head).filter(|f| !f.inherit_only)?;
        let mut format = stored.clone();

        let mut variation = None;
        let mut mode = None;
        for token in rest {
            let token = to_id(token);
            if token.is_empty() {
                continue;
            }
            if !format.variations.is_empty() {
                let key = format.variation_aliases.get(&token).unwrap_or(&token);
                if let Some(found) = format.variations.get(key) {
                    variation = Some(found.clone());
                }
            }
            if !format.modes.is_empty() {
                let key = format.mode_aliases.get(&token).unwrap_or(&token);
                if let Some(found) = format.modes.get(key) {
                    mode = Some(found.clone());
                }
            }
        }

        if let Some(variation) = variation {
            format.merge_variation(&variation);
        }
        if let Some(mode) = mode {
            format.mode_id = Some(mode);
        }
        Some(format)
    }
}
