use crate::record::Record;

/// Whether `record` belongs in a list restricted to `author_filter`.
///
/// An empty filter lets everything through. Otherwise the raw author field must contain the
/// filter verbatim: case-sensitive and blind to word boundaries, so `Li` also matches
/// `Libby`. Records without an author never match a non-empty filter.
pub fn passes(record: &Record, author_filter: &str) -> bool {
    author_filter.is_empty()
        || record
            .author
            .as_deref()
            .is_some_and(|author| author.contains(author_filter))
}
