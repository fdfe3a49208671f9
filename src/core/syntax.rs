//! Short-syntax parsing for compose fields.
//!
//! Ports (`[ip:][published:]target[/proto]` with optional ranges), volumes
//! (`[source:]target[:mode]`), and shell-style command strings.

use super::types::{PortConfig, ServiceVolume};

/// Split a command string into words, honouring single quotes, double quotes,
/// and backslash escapes.
pub fn split_shell_words(input: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err(format!("unterminated single quote in: {}", input)),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch @ ('"' | '\\' | '$' | '`')) => current.push(ch),
                            Some(ch) => {
                                current.push('\\');
                                current.push(ch);
                            }
                            None => {
                                return Err(format!("unterminated double quote in: {}", input))
                            }
                        },
                        Some(ch) => current.push(ch),
                        None => return Err(format!("unterminated double quote in: {}", input)),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(ch) => current.push(ch),
                    None => return Err(format!("trailing backslash in: {}", input)),
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Parse `N` or `N-M` into an inclusive range.
pub fn parse_port_range(spec: &str) -> Result<(u16, u16), String> {
    let parse = |s: &str| {
        s.trim()
            .parse::<u16>()
            .map_err(|_| format!("invalid port '{}'", s))
    };
    match spec.split_once('-') {
        None => {
            let p = parse(spec)?;
            Ok((p, p))
        }
        Some((start, end)) => {
            let (start, end) = (parse(start)?, parse(end)?);
            if end < start {
                return Err(format!("invalid port range '{}'", spec));
            }
            Ok((start, end))
        }
    }
}

/// Parse a short-syntax port declaration. Ranges expand to one entry per port.
pub fn parse_port_spec(spec: &str) -> Result<Vec<PortConfig>, String> {
    let (body, protocol) = match spec.rsplit_once('/') {
        Some((body, proto)) if !proto.is_empty() => (body, proto.to_lowercase()),
        Some(_) => return Err(format!("invalid port spec '{}'", spec)),
        None => (spec, "tcp".to_string()),
    };

    let parts: Vec<&str> = body.rsplitn(3, ':').collect();
    let (host_ip, published, target) = match parts.as_slice() {
        [target] => (None, None, *target),
        [target, published] => (None, Some(*published), *target),
        [target, published, ip] => {
            let ip = ip.trim_start_matches('[').trim_end_matches(']');
            (Some(ip.to_string()), Some(*published), *target)
        }
        _ => return Err(format!("invalid port spec '{}'", spec)),
    };

    let (target_start, target_end) =
        parse_port_range(target).map_err(|e| format!("{} in '{}'", e, spec))?;
    let published = match published {
        None | Some("") => None,
        Some(p) => Some(parse_port_range(p).map_err(|e| format!("{} in '{}'", e, spec))?),
    };

    let count = target_end - target_start;
    if let Some((pub_start, pub_end)) = published {
        let pub_count = pub_end - pub_start;
        if count > 0 && pub_count != count {
            return Err(format!("port ranges do not match in '{}'", spec));
        }
    }

    Ok((0..=count)
        .map(|offset| PortConfig {
            target: target_start + offset,
            published: published.map(|(start, end)| {
                if start == end || count == 0 {
                    start
                } else {
                    start + offset
                }
            }),
            protocol: protocol.clone(),
            host_ip: host_ip.clone(),
            mode: None,
        })
        .collect())
}

/// True when a volume source names a filesystem location rather than a volume.
pub fn looks_like_path(source: &str) -> bool {
    source.starts_with('/')
        || source.starts_with('.')
        || source.starts_with('~')
        || source.contains('/')
        || source.contains('\\')
}

/// Parse a short-syntax volume declaration.
pub fn parse_volume_spec(spec: &str) -> Result<ServiceVolume, String> {
    if spec.is_empty() {
        return Err("empty volume spec".to_string());
    }
    let parts: Vec<&str> = spec.split(':').collect();
    let (source, target, mode) = match parts.as_slice() {
        [target] => (None, *target, None),
        [source, target] => (Some(*source), *target, None),
        [source, target, mode] => (Some(*source), *target, Some(*mode)),
        _ => return Err(format!("invalid volume spec '{}'", spec)),
    };
    if target.is_empty() {
        return Err(format!("volume spec '{}' has no target", spec));
    }
    let read_only = mode.is_some_and(|m| m.split(',').any(|opt| opt == "ro"));
    Ok(ServiceVolume {
        declared_type: None,
        source: source.filter(|s| !s.is_empty()).map(str::to_string),
        target: target.to_string(),
        read_only,
    })
}
