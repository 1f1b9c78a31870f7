use std::{collections::HashSet, fs, path::Path};

use anyhow::Context;
use biblatex::{Bibliography, Chunk, Entry, RawBibliography, Spanned};

/// URL prefixes under which a DOI is served by a resolver.
///
/// NOTE: Ordering matters, the first prefix found in a link wins.
pub const DOI_RESOLVER_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
];

/// One bibliography entry with every optional field made explicit.
///
/// Values are the raw field text as it came out of the BibTeX file. Nothing in this crate
/// mutates a record once it has been loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Citation key, kept for reporting.
    pub key: String,
    /// Lowercase BibTeX entry type, e.g. `article`.
    pub entry_type: String,
    /// Author names joined by ` and `.
    pub author: Option<String>,
    pub title: Option<String>,
    pub year: Option<String>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub pages: Option<String>,
    /// `art_number`, first substitute for `pages`.
    pub art_number: Option<String>,
    /// `article-number`, second substitute for `pages`.
    pub article_number: Option<String>,
    pub doi: Option<String>,
    /// Alternate external link, sometimes a DOI resolver URL.
    pub url_link: Option<String>,
    /// Full-text PDF, either absolute or a bare file name.
    pub url_paper: Option<String>,
    /// Set when a `highlycited` field is present, whatever its value.
    pub highly_cited: bool,
}

impl Record {
    pub fn is_article(&self) -> bool {
        self.entry_type == "article"
    }

    /// Key for the author sort pass. Missing authors sort first.
    pub fn author_key(&self) -> &str {
        self.author.as_deref().unwrap_or_default()
    }

    /// Key for the year sort pass. Missing years sort last once reversed.
    pub fn year_key(&self) -> &str {
        self.year.as_deref().unwrap_or_default()
    }

    /// Pages, or the first article-number substitute that is present.
    pub fn page_range(&self) -> Option<&str> {
        self.pages
            .as_deref()
            .or(self.art_number.as_deref())
            .or(self.article_number.as_deref())
    }

    /// DOI to query citation counts with: `doi` if present, otherwise whatever follows a
    /// resolver prefix inside `url_link`.
    pub fn lookup_doi(&self) -> Option<&str> {
        if let Some(doi) = self.doi.as_deref() {
            return Some(doi);
        }
        let link = self.url_link.as_deref()?;
        DOI_RESOLVER_PREFIXES
            .iter()
            .find_map(|prefix| link.split_once(prefix).map(|(_, rest)| rest))
            .filter(|doi| !doi.is_empty())
    }

    fn from_entry(entry: &Entry) -> Self {
        let fields: Vec<(String, String)> = entry
            .fields
            .iter()
            .map(|(k, v)| (k.to_lowercase(), flatten(v)))
            .collect();
        let field = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };

        Record {
            key: entry.key.clone(),
            entry_type: entry.entry_type.to_string().to_lowercase(),
            author: field("author"),
            title: field("title"),
            year: field("year"),
            journal: field("journal").or_else(|| field("journaltitle")),
            volume: field("volume"),
            pages: field("pages"),
            art_number: field("art_number"),
            article_number: field("article-number"),
            doi: field("doi"),
            url_link: field("url_link"),
            url_paper: field("url_paper"),
            highly_cited: field("highlycited").is_some(),
        }
    }
}

/// Join the chunks of a field back into plain text. Math is re-wrapped in dollars so that
/// title macros such as `$\mu$` can still be recognised.
fn flatten(chunks: &[Spanned<Chunk>]) -> String {
    chunks
        .iter()
        .map(|spanned| match &spanned.v {
            Chunk::Normal(s) => s.clone(),
            Chunk::Verbatim(s) => s.clone(),
            Chunk::Math(s) => format!("${s}$"),
        })
        .collect()
}

/// An entry that was dropped while loading. The rest of the file still loads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryError {
    #[error("entry `{0}` reuses the key of an earlier entry")]
    DuplicateKey(String),
    #[error("entry `{key}` is malformed: {reason}")]
    Malformed { key: String, reason: String },
}

/// Records of one bibliography, plus the entries that could not be used.
#[derive(Debug, Default)]
pub struct Loaded {
    pub records: Vec<Record>,
    pub rejected: Vec<EntryError>,
}

impl From<Vec<Record>> for Loaded {
    fn from(records: Vec<Record>) -> Self {
        Self {
            records,
            rejected: Vec::new(),
        }
    }
}

/// Parse BibTeX source into records, in file order.
///
/// Only text that can't be read as BibTeX at all is an error. Entries are resolved one at a
/// time against the file's `@string` abbreviations. A duplicated key keeps the first entry.
/// Crossrefs between entries are not followed.
pub fn parse(src: &str) -> anyhow::Result<Loaded> {
    let raw =
        RawBibliography::parse(src).map_err(|e| anyhow::anyhow!("failed to parse BibTeX: {e}"))?;

    let mut seen = HashSet::new();
    let mut loaded = Loaded::default();
    for entry in raw.entries {
        let key = entry.v.key.v.to_string();
        if !seen.insert(key.clone()) {
            tracing::warn!(key = %key, "duplicate citation key, keeping the first entry");
            loaded.rejected.push(EntryError::DuplicateKey(key));
            continue;
        }

        let single = RawBibliography {
            preamble: String::new(),
            entries: vec![entry],
            abbreviations: raw.abbreviations.clone(),
        };
        match Bibliography::from_raw(single) {
            Ok(bib) => loaded.records.extend(bib.iter().map(Record::from_entry)),
            Err(e) => {
                tracing::warn!(key = %key, "malformed entry dropped: {e}");
                loaded.rejected.push(EntryError::Malformed {
                    key,
                    reason: e.kind.to_string(),
                });
            }
        }
    }
    Ok(loaded)
}

/// Read and parse a UTF-8 BibTeX file.
pub fn load(path: &Path) -> anyhow::Result<Loaded> {
    let src = fs::read_to_string(path)
        .with_context(|| format!("failed to read bibliography {}", path.display()))?;
    parse(&src).with_context(|| format!("in {}", path.display()))
}
