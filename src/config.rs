use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Root configuration, loaded from `~/.config/bib2html/config.toml` when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub html: HtmlConfig,
    pub scopus: ScopusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Bibliography looked up in the working directory when `--input` is not given.
    pub default_file: String,
    /// Further candidates, tried in order. A leading `~` is expanded.
    pub search_paths: Vec<String>,
}

/// Markup around and inside the rendered entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlConfig {
    pub preamble: String,
    pub postamble: String,
    /// First line of the body-only variant.
    pub body_heading: String,
    /// Prepended to the `doi` field to build the DOI link.
    pub doi_resolver: String,
    /// Prepended to `url_paper` values that are bare file names.
    pub pdf_base_url: String,
    /// DOI link, `{url}` is replaced by the target.
    pub doi_link: String,
    /// PDF link, `{url}` is replaced by the target.
    pub pdf_link: String,
    /// Badge for entries flagged `highlycited`.
    pub highly_cited: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopusConfig {
    /// Abstract retrieval endpoint, the DOI is appended.
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insttoken: Option<String>,
    pub timeout_secs: u64,
    /// Upper bound on concurrent lookups.
    pub parallelism: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            default_file: "bibtexmaster.bib".into(),
            search_paths: Vec::new(),
        }
    }
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            preamble: concat!(
                "\n<!DOCTYPE html>\n<html>\n<head>\n",
                "<meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\">\n",
                "<title>Publication List</title>\n</head>\n",
                "<body style=\"font-family:Sans-serif;\">\n<h1>Publications</h1>\n",
            )
            .into(),
            postamble: "\n</body></html>\n".into(),
            body_heading: "<h1>Attosecond Science Publications</h1>\n".into(),
            doi_resolver: "http://dx.doi.org/".into(),
            pdf_base_url: "https://www.attoscience.ca/pdf/".into(),
            doi_link: "  <a href=\"{url}\" target=\"_blank\">DOI</a> ".into(),
            pdf_link: " <a href=\"{url}\" target=\"_blank\">PDF</a>".into(),
            highly_cited: concat!(
                " <img src=\"https://www.attoscience.ca/images/highlycited.png\" ",
                "alt=\"Highly Cited\" title=\"Judged by Web of Science to be in the top 1% ",
                "of papers in physics for that year.\"> ",
            )
            .into(),
        }
    }
}

impl Default for ScopusConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elsevier.com/content/abstract/doi/".into(),
            api_key: None,
            api_key_env: "SCOPUS_API_KEY".into(),
            insttoken: None,
            timeout_secs: 10,
            parallelism: 4,
        }
    }
}

impl Config {
    /// Standard config file path: `~/.config/bib2html/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("bib2html").join("config.toml"))
    }

    /// Load `explicit` if given (it must exist), else the standard path if it exists, else
    /// the defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match Self::config_path() {
                Some(p) if p.is_file() => p,
                _ => return Ok(Self::default()),
            },
        };
        tracing::debug!(path = %path.display(), "loading config");
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl InputConfig {
    /// Candidate bibliography files, in lookup order.
    pub fn candidates(&self) -> Vec<PathBuf> {
        std::iter::once(self.default_file.as_str())
            .chain(self.search_paths.iter().map(String::as_str))
            .map(expand_home)
            .collect()
    }

    /// First candidate that exists.
    pub fn locate(&self) -> anyhow::Result<PathBuf> {
        let candidates = self.candidates();
        for path in &candidates {
            tracing::debug!(path = %path.display(), "trying bibliography");
            if path.is_file() {
                return Ok(path.clone());
            }
        }
        let tried: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
        anyhow::bail!(
            "no bibliography found (tried {}); pass one with --input",
            tried.join(", ")
        )
    }
}

impl ScopusConfig {
    /// API key from the config file, falling back to the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
