//! Filenames for split clips.
//!
//! The remainder of a split takes its parent's filename with a `{n}`
//! suffix, numbered past every sibling already present in the table.

/// Split `name` into its base and numeric `{n}` suffix, if it has one.
pub fn split_suffix(name: &str) -> (&str, Option<u64>) {
    let Some(open) = name.rfind('{') else {
        return (name, None);
    };
    if !name[open..].contains('}') {
        return (name, None);
    }
    let base = &name[..open];
    let number = name[open + 1..].trim_end_matches('}').parse().ok();
    (base, number)
}

/// Filename for the remainder split off from a row named `filename`.
///
/// `existing` is every filename currently in the table.
pub fn next_split_name<'a, I>(filename: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let (base, current) = split_suffix(filename);
    let mut counter = current.map_or(1, |n| n + 1);

    let prefix = format!("{base}{{");
    for name in existing {
        if let Some(rest) = name.strip_prefix(&prefix) {
            if let Ok(n) = rest.trim_end_matches('}').parse::<u64>() {
                counter = counter.max(n + 1);
            }
        }
    }

    format!("{base}{{{counter}}}")
}
