//! Data paths: `source.record.field.nested[0]` addressing.
//!
//! Paths are split on `.` with bracket segments (`[0]`, `['key']`, `["key"]`)
//! treated as separate keys. The normalized form joins all segments with `.`,
//! so `users.u1.tags[0]` and `users.u1.tags.0` name the same location.

use serde_json::Value;

/// Split a path string into its segments.
///
/// Empty segments are dropped, so `"a..b"` and `".a.b"` both give `["a", "b"]`.
pub fn string_to_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => flush(&mut current, &mut segments),
            '[' => {
                flush(&mut current, &mut segments);
                let quote = match chars.peek() {
                    Some(&q) if q == '\'' || q == '"' => {
                        chars.next();
                        Some(q)
                    }
                    _ => None,
                };
                let mut key = String::new();
                while let Some(c) = chars.next() {
                    match quote {
                        Some(q) if c == q => {
                            // Consume through the closing bracket.
                            for rest in chars.by_ref() {
                                if rest == ']' {
                                    break;
                                }
                            }
                            break;
                        }
                        None if c == ']' => break,
                        _ => key.push(c),
                    }
                }
                if !key.is_empty() {
                    segments.push(key);
                }
            }
            _ => current.push(ch),
        }
    }
    flush(&mut current, &mut segments);
    segments
}

fn flush(current: &mut String, segments: &mut Vec<String>) {
    if !current.is_empty() {
        segments.push(std::mem::take(current));
    }
}

/// Normalized dotted form of a path.
pub fn normalize_path(path: &str) -> String {
    string_to_path(path).join(".")
}

/// Join two path fragments, skipping empty ones.
pub fn join_path(base: &str, tail: &str) -> String {
    match (base.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_owned(),
        (_, true) => base.to_owned(),
        _ => format!("{base}.{tail}"),
    }
}

/// Look up a nested value by segments.
///
/// Objects are indexed by key, arrays by numeric segment.
pub fn get_in<'a, S: AsRef<str>>(value: &'a Value, segments: &[S]) -> Option<&'a Value> {
    segments.iter().try_fold(value, |current, seg| {
        let seg = seg.as_ref();
        match current {
            Value::Object(map) => map.get(seg),
            Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

/// Write a nested value by segments, creating intermediate objects.
///
/// Returns `false` when an intermediate value is a scalar or an array index
/// is out of range.
pub fn set_in<S: AsRef<str>>(target: &mut Value, segments: &[S], value: Value) -> bool {
    let Some((last, parents)) = segments.split_last() else {
        *target = value;
        return true;
    };

    let mut current = target;
    for seg in parents {
        let seg = seg.as_ref();
        current = match current {
            Value::Object(map) => map
                .entry(seg.to_owned())
                .or_insert_with(|| Value::Object(Default::default())),
            Value::Array(items) => match seg.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                Some(v) => v,
                None => return false,
            },
            _ => return false,
        };
    }

    let last = last.as_ref();
    match current {
        Value::Object(map) => {
            map.insert(last.to_owned(), value);
            true
        }
        Value::Array(items) => match last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        },
        _ => false,
    }
}
