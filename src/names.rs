use once_cell::sync::Lazy;
use regex::Regex;

/// Generational suffixes that can end up in the surname slot. Matched case-sensitively.
const SUFFIXES: &[&str] = &["jnr", "jr", "junior"];

/// Lowercase particles that belong to the surname.
const PARTICLES: &[&str] = &["ben", "van", "der", "de", "la", "le"];

/// Split a raw `and`-joined author field and normalise every name in it.
///
/// Empty names are dropped, the rest keep their input order.
pub fn normalize_all(raw: &str) -> Vec<String> {
    raw.replace('\n', " ")
        .split(" and ")
        .filter_map(normalize)
        .collect()
}

/// Turn one author name, `Last, First Middle` or `First Middle Last`, into
/// `First Middle Last`.
///
/// Returns `None` for blank input. Anything else degrades to a best-effort string.
pub fn normalize(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (mut surname, mut given): (String, Vec<String>) = match raw.split_once(',') {
        Some((last, firsts)) => (
            last.trim().to_string(),
            firsts.split_whitespace().map(str::to_string).collect(),
        ),
        None => {
            let mut words: Vec<&str> = raw.split_whitespace().collect();
            let last = words.pop().unwrap_or(raw).to_string();
            (last, words.into_iter().map(space_initials).collect())
        }
    };

    if SUFFIXES.contains(&surname.as_str())
        && let Some(last) = given.pop()
    {
        surname = last;
    }

    // Every particle seen while walking the given names pulls the trailing given name into
    // the surname. The list shrinks as we go, so index rather than iterate.
    let mut i = 0;
    while i < given.len() {
        if PARTICLES.contains(&given[i].as_str())
            && let Some(tail) = given.pop()
        {
            surname = format!("{tail} {surname}");
        }
        i += 1;
    }

    let name = if given.is_empty() {
        surname
    } else {
        format!("{} {}", given.join(" "), surname)
    };

    Some(name.replace(['{', '}'], "").replace("\\,", " "))
}

/// `J.R.` becomes `J. R.` so initials read naturally.
fn space_initials(word: &str) -> String {
    static INITIAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(\p{L})").unwrap());
    INITIAL_RE.replace_all(word, ". $1").into_owned()
}
