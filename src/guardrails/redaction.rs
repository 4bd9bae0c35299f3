//! PII and secret redaction for log output.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

pub const EMAIL_PLACEHOLDER: &str = "[EMAIL_REDACTED]";
pub const TOKEN_PLACEHOLDER: &str = "[TOKEN_REDACTED]";

static RE_EMAIL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}").ok()
});

// sk-..., sk_live_..., bearer..., key-..., and friends.
static RE_TOKEN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:sk|api|key|token|bearer|secret)[-_]?[a-zA-Z0-9_-]{16,}").ok()
});

/// Replace e-mail addresses and token-like strings with placeholders.
///
/// Returns the input unchanged (borrowed) when nothing matches.
pub fn redact_pii(text: &str) -> Cow<'_, str> {
    let after_email = replace(&RE_EMAIL, text, EMAIL_PLACEHOLDER);
    let after_token = match replace(&RE_TOKEN, &after_email, TOKEN_PLACEHOLDER) {
        Cow::Owned(s) => Some(s),
        Cow::Borrowed(_) => None,
    };
    match after_token {
        Some(s) => Cow::Owned(s),
        None => after_email,
    }
}

fn replace<'a>(re: &LazyLock<Option<Regex>>, text: &'a str, placeholder: &str) -> Cow<'a, str> {
    match re.as_ref() {
        Some(re) => re.replace_all(text, placeholder),
        None => Cow::Borrowed(text),
    }
}
