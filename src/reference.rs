//! Parsing of typed references such as `Foo::Bar#baz -ss` into a `Reference`.

use crate::error::Error;
use crate::types::{Reference, TargetKind};

/// Build an `InvalidReference` error for `raw`.
fn invalid(raw: &str, reason: &str) -> Error {
    return Error::InvalidReference {
        input: raw.to_string(),
        reason: reason.to_string(),
    };
}

/// Whether a namespace segment is a plain identifier (`Foo`, `BAR_2`, `_x`).
fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    return chars.all(|c| return c.is_alphanumeric() || c == '_');
}

/// Parse a raw reference.
///
/// Accepts `Const`, `A::B`, `::A`, `A#method`, `A.method`, `A::B#method`, a
/// trailing ` -s`/` -ss`/... super modifier, and the whole thing wrapped in
/// single or double quotes.
///
/// # Errors
///
/// Returns `Error::InvalidReference` when the input is empty, the modifier is
/// not a run of `s`, or a namespace segment or member name is malformed.
pub fn parse(raw: &str) -> Result<Reference, Error> {
    let unquoted = unwrap_string_literal(raw.trim());
    let (target, super_levels) = split_super_modifier(raw, unquoted)?;

    if target.is_empty() {
        return Err(invalid(raw, "empty reference"));
    }

    // `#` wins over `.`: `Foo#bar.baz` is an instance method named `bar.baz`.
    let split = target
        .split_once('#')
        .map(|(owner, member)| return (owner, Some(member), TargetKind::InstanceMethod))
        .or_else(|| {
            return target
                .split_once('.')
                .map(|(owner, member)| return (owner, Some(member), TargetKind::ClassMethod));
        });
    let (owner, member, kind) = split.unwrap_or((target, None, TargetKind::Constant));

    let owner_path = parse_owner_path(raw, owner)?;
    if kind == TargetKind::Constant && owner_path.is_empty() {
        return Err(invalid(raw, "empty constant name"));
    }

    let member_name = match member {
        None => None,
        Some("") => return Err(invalid(raw, "missing method name")),
        Some(name) if name.contains(char::is_whitespace) => {
            return Err(invalid(raw, "method name contains whitespace"));
        },
        Some(name) => Some(name.to_string()),
    };

    return Ok(Reference {
        kind,
        member_name,
        owner_path,
        super_levels,
    });
}

/// Split `Foo::Bar` (or `::Foo::Bar`) into segments. An empty owner is the top level.
///
/// # Errors
///
/// Returns `Error::InvalidReference` for empty or non-identifier segments.
fn parse_owner_path(raw: &str, owner: &str) -> Result<Vec<String>, Error> {
    let owner = owner.strip_prefix("::").unwrap_or(owner);
    if owner.is_empty() {
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    for segment in owner.split("::") {
        if segment.is_empty() {
            return Err(invalid(raw, "empty namespace segment"));
        }
        if !is_identifier(segment) {
            return Err(invalid(raw, &format!("`{segment}` is not a constant name")));
        }
        segments.push(segment.to_string());
    }
    return Ok(segments);
}

/// Split a trailing ` -s...` modifier off the reference. The count of `s` is the super level.
///
/// # Errors
///
/// Returns `Error::InvalidReference` if the modifier is anything other than a run of `s`.
fn split_super_modifier<'a>(raw: &str, text: &'a str) -> Result<(&'a str, usize), Error> {
    let Some((target, modifier)) = text.split_once(" -") else {
        return Ok((text.trim(), 0));
    };

    let modifier = modifier.trim();
    if modifier.is_empty() || !modifier.chars().all(|c| return c == 's') {
        return Err(invalid(raw, &format!("unknown option `-{modifier}`")));
    }
    return Ok((target.trim(), modifier.len()));
}

/// Strip one pair of matching surrounding quotes, if present.
fn unwrap_string_literal(text: &str) -> &str {
    for quote in ['"', '\''] {
        let inner = text
            .strip_prefix(quote)
            .and_then(|rest| return rest.strip_suffix(quote));
        if let Some(inner) = inner {
            return inner.trim();
        }
    }
    return text;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_constant() {
        let r = parse("String").unwrap();
        assert_eq!(r.kind, TargetKind::Constant);
        assert_eq!(r.owner_path, owner(&["String"]));
        assert_eq!(r.member_name, None);
        assert_eq!(r.super_levels, 0);
    }

    #[test]
    fn nested_constant_with_leading_separator() {
        let r = parse("::IRB::Context").unwrap();
        assert_eq!(r.kind, TargetKind::Constant);
        assert_eq!(r.owner_path, owner(&["IRB", "Context"]));
    }

    #[test]
    fn instance_method_in_namespace() {
        let r = parse("Foo::Bar#baz").unwrap();
        assert_eq!(r.kind, TargetKind::InstanceMethod);
        assert_eq!(r.owner_path, owner(&["Foo", "Bar"]));
        assert_eq!(r.member_name.as_deref(), Some("baz"));
    }

    #[test]
    fn class_method() {
        let r = parse("String.new").unwrap();
        assert_eq!(r.kind, TargetKind::ClassMethod);
        assert_eq!(r.owner_path, owner(&["String"]));
        assert_eq!(r.member_name.as_deref(), Some("new"));
    }

    #[test]
    fn hash_takes_priority_over_dot() {
        let r = parse("Foo#bar.baz").unwrap();
        assert_eq!(r.kind, TargetKind::InstanceMethod);
        assert_eq!(r.member_name.as_deref(), Some("bar.baz"));
    }

    #[test]
    fn operator_and_predicate_members() {
        assert_eq!(parse("Foo#==").unwrap().member_name.as_deref(), Some("=="));
        assert_eq!(parse("Foo.empty?").unwrap().member_name.as_deref(), Some("empty?"));
    }

    #[test]
    fn top_level_method_has_empty_owner() {
        let r = parse("#helper").unwrap();
        assert_eq!(r.kind, TargetKind::InstanceMethod);
        assert!(r.owner_path.is_empty());
    }

    #[test]
    fn super_modifier_counts_esses() {
        assert_eq!(parse("Foo#bar -s").unwrap().super_levels, 1);
        assert_eq!(parse("Foo#bar -sss").unwrap().super_levels, 3);
        assert_eq!(parse("Foo#bar").unwrap().super_levels, 0);
    }

    #[test]
    fn quoted_reference_is_unwrapped() {
        let r = parse("\"Foo#bar -s\"").unwrap();
        assert_eq!(r.member_name.as_deref(), Some("bar"));
        assert_eq!(r.super_levels, 1);
        assert_eq!(parse("'String'").unwrap().owner_path, owner(&["String"]));
    }

    #[test]
    fn display_name_round_trips_typed_form() {
        assert_eq!(parse("::Foo::Bar#baz -s").unwrap().display_name(), "Foo::Bar#baz");
        assert_eq!(parse("Foo.baz").unwrap().display_name(), "Foo.baz");
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["", "   ", "Foo#", "Foo::::Bar", "Foo::", "Foo -x", "Foo -", "Foo bar#baz", "::"] {
            let err = parse(input).unwrap_err();
            assert!(
                matches!(err, Error::InvalidReference { .. }),
                "expected InvalidReference for {input:?}, got {err:?}"
            );
        }
    }
}
