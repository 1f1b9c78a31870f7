use std::time::Duration;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use url::Url;

use crate::{
    citations::{CitationLookup, LookupError},
    config::ScopusConfig,
};

const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Scopus Abstract Retrieval client, asking for `citedby-count` by DOI.
pub struct ScopusClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    insttoken: Option<String>,
}

impl ScopusClient {
    pub fn from_config(cfg: &ScopusConfig) -> Result<Self, LookupError> {
        let api_key = cfg
            .resolve_api_key()
            .ok_or_else(|| LookupError::MissingCredentials(cfg.api_key_env.clone()))?;
        let agent_cfg = ureq::Agent::config_builder()
            .timeout_connect(Some(Duration::from_secs(5)))
            .timeout_global(Some(Duration::from_secs(cfg.timeout_secs)))
            .build();
        Ok(ScopusClient {
            agent: ureq::Agent::new_with_config(agent_cfg),
            base_url: cfg.base_url.clone(),
            api_key,
            insttoken: cfg.insttoken.clone(),
        })
    }

    fn to_url(&self, doi: &str) -> Result<Url, LookupError> {
        let enc = utf8_percent_encode(doi.trim(), PATH_SEGMENT_ENCODE_SET).to_string();
        Ok(Url::parse(&format!("{}{}", self.base_url, enc))?)
    }
}

impl CitationLookup for ScopusClient {
    fn citation_count(&self, doi: &str) -> Result<u64, LookupError> {
        let url = self.to_url(doi)?;
        tracing::debug!(%url, "querying Scopus");
        let mut req = self
            .agent
            .get(url.as_str())
            .header("Accept", "application/json")
            .header("X-ELS-APIKey", &self.api_key);
        if let Some(token) = &self.insttoken {
            req = req.header("X-ELS-Insttoken", token);
        }
        let body = match req.call() {
            Ok(mut res) => res.body_mut().read_to_string()?,
            Err(ureq::Error::StatusCode(404)) => return Err(LookupError::NotFound(doi.into())),
            Err(e) => return Err(e.into()),
        };
        parse_count(&body)
    }
}

/// Pull `citedby-count` out of an abstract retrieval response. Scopus sends it as a string,
/// a bare number is accepted as well.
fn parse_count(body: &str) -> Result<u64, LookupError> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|e| LookupError::Response(e.to_string()))?;
    let field = json
        .pointer("/abstract-retrieval-response/coredata/citedby-count")
        .ok_or_else(|| LookupError::Response("missing citedby-count".into()))?;
    let count = match field {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    count.ok_or_else(|| LookupError::Response(format!("bad citedby-count: {field}")))
}
