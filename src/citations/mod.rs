use std::collections::{BTreeSet, HashMap};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

pub mod scopus;

/// Why a citation count could not be obtained. None of these ever fail a render.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("no Scopus API key configured (set {0} or scopus.api_key)")]
    MissingCredentials(String),
    #[error("request failed: {0}")]
    Http(#[from] ureq::Error),
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("no record found for DOI {0}")]
    NotFound(String),
    #[error("unexpected response: {0}")]
    Response(String),
    #[error("DOI {0} was not prefetched")]
    NotPrefetched(String),
}

/// Something that can tell how often a DOI has been cited.
pub trait CitationLookup {
    fn citation_count(&self, doi: &str) -> Result<u64, LookupError>;
}

/// Citation counts resolved ahead of the render pass, keyed by DOI.
#[derive(Debug, Default)]
pub struct Prefetched {
    counts: HashMap<String, u64>,
}

impl Prefetched {
    /// Resolve every distinct DOI on a pool of at most `parallelism` threads. Failed lookups
    /// are logged and left out.
    pub fn fetch<'a, L>(
        lookup: &L,
        dois: impl IntoIterator<Item = &'a str>,
        parallelism: usize,
    ) -> anyhow::Result<Self>
    where
        L: CitationLookup + Sync,
    {
        let dois: Vec<&str> = dois.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        if dois.is_empty() {
            return Ok(Self::default());
        }

        let pb = ProgressBar::new(dois.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} citations [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism.max(1))
            .build()?;
        let pairs = pool.install(|| {
            dois.par_iter()
                .filter_map(|doi| {
                    let res = lookup.citation_count(doi);
                    pb.inc(1);
                    match res {
                        Ok(n) => {
                            tracing::debug!(doi, count = n, "citation count");
                            Some((doi.to_string(), n))
                        }
                        Err(e) => {
                            tracing::warn!(doi, "citation lookup failed: {e}");
                            None
                        }
                    }
                })
                .collect::<Vec<_>>()
        });
        pb.finish_and_clear();

        Ok(pairs.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }
}

impl FromIterator<(String, u64)> for Prefetched {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

impl CitationLookup for Prefetched {
    fn citation_count(&self, doi: &str) -> Result<u64, LookupError> {
        self.counts
            .get(doi)
            .copied()
            .ok_or_else(|| LookupError::NotPrefetched(doi.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Knows DOIs starting with `10.1/`, counts every call.
    struct Stub {
        calls: AtomicUsize,
    }

    impl CitationLookup for Stub {
        fn citation_count(&self, doi: &str) -> Result<u64, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match doi.strip_prefix("10.1/") {
                Some(rest) => Ok(rest.len() as u64),
                None => Err(LookupError::NotFound(doi.to_string())),
            }
        }
    }

    #[test]
    fn fetch_dedupes_and_drops_failures() {
        let stub = Stub {
            calls: AtomicUsize::new(0),
        };
        let counts =
            Prefetched::fetch(&stub, ["10.1/abc", "10.2/zz", "10.1/abc", "10.1/a"], 2).unwrap();
        assert_eq!(stub.calls.load(Ordering::SeqCst), 3);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.citation_count("10.1/abc").unwrap(), 3);
        assert_eq!(counts.citation_count("10.1/a").unwrap(), 1);
        assert!(matches!(
            counts.citation_count("10.2/zz"),
            Err(LookupError::NotPrefetched(_))
        ));
    }

    #[test]
    fn fetch_with_nothing_to_do() {
        let stub = Stub {
            calls: AtomicUsize::new(0),
        };
        let counts = Prefetched::fetch(&stub, std::iter::empty(), 0).unwrap();
        assert_eq!(counts.len(), 0);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn collects_from_pairs() {
        let counts: Prefetched = [("10.1/x".to_string(), 7)].into_iter().collect();
        assert_eq!(counts.citation_count("10.1/x").unwrap(), 7);
    }
}
