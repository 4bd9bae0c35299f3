//! Disallowed-intent policy check.

/// Guardrail label recorded when a request is blocked by policy.
pub const POLICY_BLOCK: &str = "policy_block";

/// Phrases blocked when no configuration overrides them.
pub const DEFAULT_DISALLOWED_PHRASES: &[&str] = &[
    "steal credentials",
    "bypass access controls",
    "phish",
    "exfiltrate data",
];

/// Case-insensitive substring match against a list of disallowed phrases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyGuard {
    phrases: Vec<String>,
}

impl PolicyGuard {
    /// Build a guard from configured phrases. Phrases are lowercased; blank
    /// entries are dropped so they cannot match every input.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// True if any text contains any disallowed phrase.
    pub fn is_blocked<'a, I>(&self, texts: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        texts.into_iter().any(|text| {
            let lower = text.to_lowercase();
            self.phrases.iter().any(|p| lower.contains(p.as_str()))
        })
    }
}

impl Default for PolicyGuard {
    fn default() -> Self {
        Self::new(DEFAULT_DISALLOWED_PHRASES)
    }
}
