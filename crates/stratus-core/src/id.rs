//! Identifier validation and normalization.
//!
//! Namespace ids, resource ids, and MCIS/VM ids all follow one rule:
//! `[a-z]([-a-z0-9]*[a-z0-9])?` matched against the entire value. The rule
//! is enforced before every create/register call.

use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

use crate::error::{Error, Result};

fn id_rule() -> &'static Regex {
    static RULE: OnceLock<Regex> = OnceLock::new();
    RULE.get_or_init(|| Regex::new(r"^[a-z]([-a-z0-9]*[a-z0-9])?$").expect("id rule regex"))
}

/// Validate an identifier against the naming rule.
///
/// The value must start with a lowercase letter, continue with lowercase
/// letters, digits, or dashes, and must not end in a dash. Empty strings are
/// rejected.
pub fn check_id(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::Validation("identifier is empty".to_string()));
    }
    if !id_rule().is_match(value) {
        return Err(Error::Validation(format!(
            "invalid identifier {value:?}: must start with a lowercase letter, \
             continue with lowercase letters, digits, or dashes, and not end in a dash"
        )));
    }
    Ok(())
}

/// Normalize an arbitrary provider-native string into a rule-compatible id.
///
/// Runs of characters outside `[a-zA-Z0-9]` collapse into a single dash, the
/// result is lowercased, and a trailing dash is patched with an `r` so the
/// output always satisfies the naming rule. Used for catalog ids built from
/// provider spec names (e.g. `aws+ap-northeast-2+t3.large`
/// becomes `aws-ap-northeast-2-t3-large`).
pub fn to_safe_id(value: &str) -> String {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    let re = NON_ALNUM.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]+").expect("safe id regex"));

    let mut out = re.replace_all(value, "-").to_lowercase();
    if out.ends_with('-') {
        out.push('r');
    }
    out
}

/// Generate a new globally-unique, immutable uid for a resource object.
pub fn new_uid() -> String {
    Uuid::new_v4().simple().to_string()
}
