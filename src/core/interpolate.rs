//! Variable interpolation for compose files.
//!
//! Resolves `$VAR`, `${VAR}`, `${VAR:-default}`, `${VAR-default}`,
//! `${VAR:+alt}`, `${VAR+alt}`, `${VAR:?message}` and `${VAR?message}` against
//! an environment snapshot. `$$` is an escaped dollar sign.

use indexmap::IndexMap;
use serde_yaml_ng::Value;

/// Interpolation outcome for one string.
#[derive(Debug, Default)]
pub struct Interpolated {
    pub value: String,
    /// Variables referenced without a value or default
    pub unset: Vec<String>,
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Find the `}` closing a `${` that starts at `open`, skipping nested `${...}`.
fn find_closing_brace(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            depth += 1;
            i += 2;
            continue;
        }
        if bytes[i] == b'}' {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Interpolate a single string.
pub fn interpolate(template: &str, env: &IndexMap<String, String>) -> Result<Interpolated, String> {
    let mut out = Interpolated::default();
    let mut rest = template;

    while let Some(dollar) = rest.find('$') {
        out.value.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        if let Some(stripped) = after.strip_prefix('$') {
            out.value.push('$');
            rest = stripped;
            continue;
        }

        if after.starts_with('{') {
            let close = find_closing_brace(rest, dollar)
                .ok_or_else(|| format!("unclosed variable reference in '{}'", template))?;
            let expr = &rest[dollar + 2..close];
            let resolved = resolve_braced(expr, env, &mut out.unset)?;
            out.value.push_str(&resolved);
            rest = &rest[close + 1..];
            continue;
        }

        let name_len = after
            .char_indices()
            .take_while(|(i, c)| if *i == 0 { is_name_start(*c) } else { is_name_char(*c) })
            .count();
        if name_len == 0 {
            out.value.push('$');
            rest = after;
            continue;
        }
        let name = &after[..name_len];
        match env.get(name) {
            Some(v) => out.value.push_str(v),
            None => out.unset.push(name.to_string()),
        }
        rest = &after[name_len..];
    }
    out.value.push_str(rest);
    Ok(out)
}

fn resolve_braced(
    expr: &str,
    env: &IndexMap<String, String>,
    unset: &mut Vec<String>,
) -> Result<String, String> {
    let name_len = expr
        .char_indices()
        .take_while(|(i, c)| if *i == 0 { is_name_start(*c) } else { is_name_char(*c) })
        .count();
    if name_len == 0 {
        return Err(format!("invalid variable reference '${{{}}}'", expr));
    }
    let (name, modifier) = expr.split_at(name_len);
    let value = env.get(name);

    let nested = |text: &str, unset: &mut Vec<String>| -> Result<String, String> {
        let inner = interpolate(text, env)?;
        unset.extend(inner.unset);
        Ok(inner.value)
    };

    if modifier.is_empty() {
        return Ok(match value {
            Some(v) => v.clone(),
            None => {
                unset.push(name.to_string());
                String::new()
            }
        });
    }

    let (op, arg) = if let Some(arg) = modifier.strip_prefix(":-") {
        (":-", arg)
    } else if let Some(arg) = modifier.strip_prefix(":?") {
        (":?", arg)
    } else if let Some(arg) = modifier.strip_prefix(":+") {
        (":+", arg)
    } else if let Some(arg) = modifier.strip_prefix('-') {
        ("-", arg)
    } else if let Some(arg) = modifier.strip_prefix('?') {
        ("?", arg)
    } else if let Some(arg) = modifier.strip_prefix('+') {
        ("+", arg)
    } else {
        return Err(format!("invalid variable reference '${{{}}}'", expr));
    };

    let set_non_empty = value.is_some_and(|v| !v.is_empty());
    match op {
        ":-" if set_non_empty => Ok(value.cloned().unwrap_or_default()),
        ":-" => nested(arg, unset),
        "-" => match value {
            Some(v) => Ok(v.clone()),
            None => nested(arg, unset),
        },
        ":+" if set_non_empty => nested(arg, unset),
        ":+" => Ok(String::new()),
        "+" if value.is_some() => nested(arg, unset),
        "+" => Ok(String::new()),
        ":?" if set_non_empty => Ok(value.cloned().unwrap_or_default()),
        "?" if value.is_some() => Ok(value.cloned().unwrap_or_default()),
        _ => {
            let message = nested(arg, unset)?;
            if message.is_empty() {
                Err(format!("required variable {} is missing a value", name))
            } else {
                Err(format!("required variable {} is missing a value: {}", name, message))
            }
        }
    }
}

/// Interpolate every string scalar in a YAML tree in place. Mapping keys are
/// left untouched. Returns the names of unset variables that were referenced.
pub fn interpolate_value(
    value: &mut Value,
    env: &IndexMap<String, String>,
) -> Result<Vec<String>, String> {
    let mut unset = Vec::new();
    walk(value, env, &mut unset)?;
    unset.sort();
    unset.dedup();
    Ok(unset)
}

fn walk(
    value: &mut Value,
    env: &IndexMap<String, String>,
    unset: &mut Vec<String>,
) -> Result<(), String> {
    match value {
        Value::String(s) => {
            if s.contains('$') {
                let resolved = interpolate(s, env)?;
                unset.extend(resolved.unset);
                *s = resolved.value;
            }
        }
        Value::Sequence(items) => {
            for item in items {
                walk(item, env, unset)?;
            }
        }
        Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                walk(v, env, unset)?;
            }
        }
        Value::Tagged(tagged) => walk(&mut tagged.value, env, unset)?,
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}
