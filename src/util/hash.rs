//! Hashing utilities for object-file naming.
//!
//! Intermediate objects are named by a digest of the owning target's full
//! dependency-inclusive identity plus the source file and build mode, so
//! the same (target, source, mode) triple always compiles to the same name.

use sha2::{Digest, Sha256};

/// A hasher for building fingerprints from an ordered sequence of strings.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    /// Create a new fingerprint builder.
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add a string component to the fingerprint.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self.hasher.update(b"\0"); // Separator
        self
    }

    /// Finalize and return the fingerprint as a hex string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Hash an ordered sequence of strings into a hex digest.
///
/// Order-sensitive: permuting the inputs changes the digest.
pub fn hash_strings<I, S>(strings: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut fp = Fingerprint::new();
    for s in strings {
        fp.update_str(s.as_ref());
    }
    fp.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_strings_deterministic() {
        let a = hash_strings(["(", ")", "libc", "Drydock.toml:3"]);
        let b = hash_strings(["(", ")", "libc", "Drydock.toml:3"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_strings_order_sensitive() {
        let a = hash_strings(["one", "two"]);
        let b = hash_strings(["two", "one"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_strings_not_confused_by_concatenation() {
        // "ab" + "c" must hash differently from "a" + "bc".
        let a = hash_strings(["ab", "c"]);
        let b = hash_strings(["a", "bc"]);
        assert_ne!(a, b);
    }
}
