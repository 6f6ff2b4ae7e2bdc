//! Detection of flags placed after positional arguments.
//!
//! Flag parsing stops at the first positional argument, so `deployctl targets
//! shop --label a=b` silently treats `--label` as a positional value. We only
//! flag tokens naming a recognised flag, which keeps hyphen-prefixed
//! positional values usable.

use std::collections::BTreeSet;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Flags must be specified before positional arguments in the CLI command.\n\
     For example \"deployctl targets --example project\" not \"deployctl targets project --example\".\n\
     Please reorder your arguments and try again.\n\n\
     Misplaced flags: {}",
    .flags.join(", ")
)]
pub struct FlagAfterArgsError {
    /// Recognised flag names found after the first positional argument.
    pub flags: Vec<String>,
}

/// Fail if any argument before a literal `--` names a recognised flag.
///
/// `args` are the positional arguments left after flag parsing; `recognized`
/// holds flag names without leading hyphens.
pub fn check_flags_after_args(
    args: &[String],
    recognized: &BTreeSet<String>,
) -> Result<(), FlagAfterArgsError> {
    let mut misplaced = Vec::new();
    for arg in args {
        if arg == "--" {
            break;
        }
        let Some(name) = flag_token(arg) else {
            continue;
        };
        if recognized.contains(name) && !misplaced.iter().any(|seen| seen == name) {
            misplaced.push(name.to_string());
        }
    }

    if misplaced.is_empty() {
        Ok(())
    } else {
        Err(FlagAfterArgsError { flags: misplaced })
    }
}

/// Extract the flag name from `-name`, `--name` or `--name=value`.
///
/// Returns `None` for non-flags and for three or more leading hyphens.
fn flag_token(arg: &str) -> Option<&str> {
    if arg.len() < 2 {
        return None;
    }
    let rest = arg.strip_prefix('-')?;
    let rest = rest.strip_prefix('-').unwrap_or(rest);
    if rest.starts_with('-') {
        return None;
    }
    let name = match rest.find('=') {
        Some(idx) => &rest[..idx],
        None => rest,
    };
    Some(name)
}
