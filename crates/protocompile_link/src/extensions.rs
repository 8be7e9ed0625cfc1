//! Cross-file extension tag collision detection.
//!
//! Two files extending the same message with the same field number is an
//! error even though neither file's own symbol table sees the other's
//! extension — spec.md §4.6 requires checking it at the whole-compile
//! level. [`ExtensionRegistry`] is the shared, mutex-guarded map the
//! linker's extendee-resolution pass (`resolve.rs`) consults and updates
//! for every extension field it resolves.
//!
//! Scoped to a single `Compile` call (an Open Question the design ledger
//! resolves explicitly): a registry is built fresh per compile and
//! dropped with it, so two unrelated compiles in the same process never
//! see each other's extensions.

use std::collections::HashMap;
use std::sync::Mutex;

/// `(extendee FQN, field number)` — the identity spec.md treats as
/// globally unique across every file in one compile.
pub type ExtensionKey = (String, i32);

/// Where an extension claiming a given `(extendee, tag)` was declared,
/// for the "previous declaration here" half of a collision diagnostic.
#[derive(Debug, Clone)]
pub struct ExtensionOrigin {
    pub file: String,
    pub field_name: String,
}

#[derive(Default)]
pub struct ExtensionRegistry {
    claims: Mutex<HashMap<ExtensionKey, ExtensionOrigin>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        ExtensionRegistry::default()
    }

    /// Attempts to claim `key` for `origin`. Returns `Ok(())` if this is
    /// the first claim; returns the existing claimant's origin if someone
    /// already holds it — the caller turns that into a collision
    /// diagnostic rather than aborting outright, since spec §4.6 treats
    /// this as an ordinary (non-internal) linking error.
    pub fn claim(&self, key: ExtensionKey, origin: ExtensionOrigin) -> Result<(), ExtensionOrigin> {
        let mut claims = self.claims.lock().expect("extension registry mutex poisoned");
        if let Some(existing) = claims.get(&key) {
            return Err(existing.clone());
        }
        claims.insert(key, origin);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(file: &str, field: &str) -> ExtensionOrigin {
        ExtensionOrigin {
            file: file.to_string(),
            field_name: field.to_string(),
        }
    }

    #[test]
    fn first_claim_on_a_key_succeeds() {
        let registry = ExtensionRegistry::new();
        let result = registry.claim(("foo.Base".to_string(), 100), origin("a.proto", "x"));
        assert!(result.is_ok());
    }

    #[test]
    fn second_claim_on_the_same_key_returns_the_first_origin() {
        let registry = ExtensionRegistry::new();
        registry
            .claim(("foo.Base".to_string(), 100), origin("a.proto", "x"))
            .unwrap();
        let collision = registry.claim(("foo.Base".to_string(), 100), origin("b.proto", "y"));
        match collision {
            Err(existing) => assert_eq!(existing.file, "a.proto"),
            Ok(()) => panic!("expected a collision"),
        }
    }

    #[test]
    fn different_extendees_do_not_collide_on_the_same_tag() {
        let registry = ExtensionRegistry::new();
        registry
            .claim(("foo.Base".to_string(), 100), origin("a.proto", "x"))
            .unwrap();
        let result = registry.claim(("foo.Other".to_string(), 100), origin("b.proto", "y"));
        assert!(result.is_ok());
    }
}
