use crate::record::Record;

/// Put records in display order: newest year first, authors alphabetical within a year.
///
/// Two stable passes over the raw field text, first by author ascending and then by year
/// descending. Both keys compare as strings, so a malformed year such as `n.d.` sorts by
/// its text rather than being rejected.
pub fn sort(records: &mut [Record]) {
    records.sort_by(|a, b| a.author_key().cmp(b.author_key()));
    records.sort_by(|a, b| b.year_key().cmp(a.year_key()));
}
