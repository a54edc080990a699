//! Deterministic document key derivation.
//!
//! Keys are pure functions of a record's stable identifying fields, so a
//! re-run lands on the same documents. Records without such a field get a
//! synthetic key and are therefore duplicated by every re-run.

use rand::distr::Alphanumeric;
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

/// Fixed key of the aggregate socials document.
pub const SOCIALS_KEY: &str = "links";

/// Length of the random suffix on nameless legacy user keys.
const RANDOM_SUFFIX_LEN: usize = 8;

/// Anything that is not a lowercase identifier character.
static NON_IDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9_]").unwrap());

/// Anything that is not a lowercase alphanumeric.
static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]").unwrap());

/// Lowercase and replace every non-identifier character with `_`.
///
/// # Examples
///
/// ```
/// use hubmigrate_core::keys::sanitize_identifier;
///
/// assert_eq!(sanitize_identifier("Jane.Doe@Example.com"), "jane_doe_example_com");
/// ```
pub fn sanitize_identifier(value: &str) -> String {
    NON_IDENT
        .replace_all(&value.trim().to_lowercase(), "_")
        .into_owned()
}

/// Key of a team member: lowercased name words stripped of punctuation, joined by `_`.
///
/// Returns `None` when nothing alphanumeric is left.
///
/// # Examples
///
/// ```
/// use hubmigrate_core::keys::team_member_key;
///
/// assert_eq!(team_member_key("Jane", "Doe").as_deref(), Some("jane_doe"));
/// assert_eq!(team_member_key("  ", "").as_deref(), None);
/// ```
pub fn team_member_key(first_name: &str, last_name: &str) -> Option<String> {
    let full = format!("{first_name} {last_name}").to_lowercase();
    let words: Vec<String> = full
        .split_whitespace()
        .map(|w| NON_ALNUM.replace_all(w, "").into_owned())
        .filter(|w| !w.is_empty())
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join("_"))
    }
}

/// Key of an event: the legacy event ID as given.
///
/// `/` is a path separator in the store and is the only character replaced.
pub fn event_key(legacy_id: Option<&str>) -> Option<String> {
    legacy_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| id.replace('/', "_"))
}

/// Key of a user: the sanitized email, or a salted `legacy_<name>` key.
pub fn user_key(email: Option<&str>, name: Option<&str>) -> String {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => sanitize_identifier(email),
        None => {
            let name = name
                .map(sanitize_identifier)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "unknown".to_string());
            format!("legacy_{}_{}", name, random_suffix())
        }
    }
}

/// Key of a certificate: `<email>_<event-name>`, sanitized.
pub fn certificate_key(email: &str, event_name: &str) -> String {
    sanitize_identifier(&format!("{email}_{event_name}"))
}

/// Key of a registration: `<email>_<event-id>`, sanitized.
pub fn registration_key(email: &str, event_id: &str) -> String {
    sanitize_identifier(&format!("{email}_{event_id}"))
}

/// A fresh key for records without any stable identifying field.
pub fn synthetic_key(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}
