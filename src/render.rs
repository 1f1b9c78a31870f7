use crate::{citations::CitationLookup, config::HtmlConfig, names, record::Record};

const CONTAINER_OPEN: &str =
    "<div style=\"width:90%;padding:0.5em 0px 0.5em 0px;border-bottom:thin solid #0000ff;\">";
const CONTAINER_CLOSE: &str = "</div>\n";
const LINKS_OPEN: &str = "<span style=\"font-size:small;float:right;\">  ";

/// LaTeX that survives into titles, with its HTML replacement.
const TITLE_MACROS: &[(&str, &str)] = &[("$\\mu$", "&mu;")];

/// Acronyms mangled by title-casing journal names.
const JOURNAL_ACRONYMS: &[(&str, &str)] = &[("Ieee", "IEEE"), ("Acs", "ACS"), ("Josa", "JOSA")];

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("entry `{key}` has no {field} field")]
    MissingField { key: String, field: &'static str },
}

/// Year of the most recent header, carried from one render to the next.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct YearState {
    current: Option<i64>,
}

impl YearState {
    pub fn current(&self) -> Option<i64> {
        self.current
    }
}

/// HTML for one record, including its year header when it opened a new year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFragment {
    pub key: String,
    pub year: Option<String>,
    pub year_header: bool,
    pub html: String,
}

/// Turns records into HTML fragments.
pub struct Renderer<'a> {
    html: &'a HtmlConfig,
    citations: Option<&'a dyn CitationLookup>,
}

impl<'a> Renderer<'a> {
    pub fn new(html: &'a HtmlConfig) -> Self {
        Renderer {
            html,
            citations: None,
        }
    }

    /// Also print citation counts, taken from `lookup`.
    pub fn with_citations(mut self, lookup: &'a dyn CitationLookup) -> Self {
        self.citations = Some(lookup);
        self
    }

    pub fn html(&self) -> &HtmlConfig {
        self.html
    }

    /// Render `record`. A year header is emitted first when its year parses as an integer
    /// different from the one in `year`, which is then updated.
    ///
    /// Fails only when the record has no author or title, in which case `year` is left alone.
    pub fn render(
        &self,
        record: &Record,
        year: &mut YearState,
    ) -> Result<RenderedFragment, RenderError> {
        let author = required(record, record.author.as_deref(), "author")?;
        let title = required(record, record.title.as_deref(), "title")?;

        let mut out = String::new();

        let mut year_header = false;
        if let Some(text) = record.year.as_deref()
            && let Ok(n) = text.trim().parse::<i64>()
            && year.current != Some(n)
        {
            out.push_str(&format!("<div style=\"clear:both;\"><h3>{text}</h3></div>\n"));
            year.current = Some(n);
            year_header = true;
        }

        out.push_str(CONTAINER_OPEN);

        out.push_str("<span>");
        for name in names::normalize_all(author) {
            out.push_str(&name);
            out.push_str(", ");
        }
        out.push_str("</span><br/><span style=\"font-style:italic;\">");
        out.push_str(&clean_title(title));
        out.push_str(", </span><br/><span>");
        out.push_str(&citation_line(record));
        out.push_str("</span>");

        out.push_str(LINKS_OPEN);
        if record.highly_cited {
            out.push_str(&self.html.highly_cited);
        }
        if let Some(count) = self.citation_count(record) {
            out.push_str(&format!("{count} "));
        }
        if let Some(doi) = &record.doi {
            let url = format!("{}{}", self.html.doi_resolver, doi);
            out.push_str(&link(&self.html.doi_link, &url));
        } else if let Some(url) = &record.url_link {
            out.push_str(&link(&self.html.doi_link, url));
        }
        if let Some(pdf) = &record.url_paper {
            let url = if pdf.contains('/') {
                pdf.clone()
            } else {
                format!("{}{}", self.html.pdf_base_url, pdf)
            };
            out.push_str(&link(&self.html.pdf_link, &url));
        }
        out.push_str("</span>");

        out.push_str(CONTAINER_CLOSE);

        Ok(RenderedFragment {
            key: record.key.clone(),
            year: record.year.clone(),
            year_header,
            html: out,
        })
    }

    fn citation_count(&self, record: &Record) -> Option<u64> {
        let lookup = self.citations?;
        let doi = record.lookup_doi()?;
        match lookup.citation_count(doi) {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::debug!(key = %record.key, doi, "no citation count: {e}");
                None
            }
        }
    }
}

fn required<'r>(
    record: &Record,
    value: Option<&'r str>,
    field: &'static str,
) -> Result<&'r str, RenderError> {
    value.ok_or_else(|| RenderError::MissingField {
        key: record.key.clone(),
        field,
    })
}

fn link(template: &str, url: &str) -> String {
    template.replace("{url}", url)
}

/// Drop grouping braces and translate the few LaTeX macros that show up in titles.
fn clean_title(title: &str) -> String {
    let mut t = title.replace(['{', '}'], "");
    for (from, to) in TITLE_MACROS {
        t = t.replace(from, to);
    }
    t
}

/// `Journal Volume, Pages (Year)`, with a placeholder for each missing piece except the year.
fn citation_line(record: &Record) -> String {
    let journal = match record.journal.as_deref() {
        Some(j) => journal_name(j),
        None => "JOURNAL".to_string(),
    };
    let volume = record.volume.as_deref().unwrap_or("VOLUME");
    let pages = record.page_range().unwrap_or("PAGES");
    let mut line = format!("{journal} {volume}, {pages}");
    if let Some(year) = &record.year {
        line.push_str(&format!(" ({year})"));
    }
    line
}

fn journal_name(raw: &str) -> String {
    let mut name = title_case(raw);
    for (from, to) in JOURNAL_ACRONYMS {
        name = name.replace(from, to);
    }
    name
}

/// Upper-case the first letter of every run of letters, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if in_word {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        in_word = c.is_alphabetic();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::LookupError;
    use std::cell::RefCell;

    struct Fixed(u64);

    impl CitationLookup for Fixed {
        fn citation_count(&self, _doi: &str) -> Result<u64, LookupError> {
            Ok(self.0)
        }
    }

    struct Down;

    impl CitationLookup for Down {
        fn citation_count(&self, doi: &str) -> Result<u64, LookupError> {
            Err(LookupError::NotFound(doi.to_string()))
        }
    }

    #[derive(Default)]
    struct Recording(RefCell<Vec<String>>);

    impl CitationLookup for Recording {
        fn citation_count(&self, doi: &str) -> Result<u64, LookupError> {
            self.0.borrow_mut().push(doi.to_string());
            Ok(1)
        }
    }

    fn article() -> Record {
        Record {
            key: "lee2021".into(),
            entry_type: "article".into(),
            author: Some("Lee, Kim and\n  Park, Jin".into()),
            title: Some("{Quantum} pulses".into()),
            year: Some("2021".into()),
            journal: Some("physical review letters".into()),
            volume: Some("126".into()),
            pages: Some("1--5".into()),
            doi: Some("10.1/x".into()),
            ..Default::default()
        }
    }

    fn render(record: &Record) -> RenderedFragment {
        let html = HtmlConfig::default();
        Renderer::new(&html)
            .render(record, &mut YearState::default())
            .expect("render")
    }

    #[test]
    fn renders_full_fragment() {
        let frag = render(&article());
        let expected = concat!(
            "<div style=\"clear:both;\"><h3>2021</h3></div>\n",
            "<div style=\"width:90%;padding:0.5em 0px 0.5em 0px;border-bottom:thin solid #0000ff;\">",
            "<span>Kim Lee, Jin Park, </span><br/>",
            "<span style=\"font-style:italic;\">Quantum pulses, </span><br/>",
            "<span>Physical Review Letters 126, 1--5 (2021)</span>",
            "<span style=\"font-size:small;float:right;\">    ",
            "<a href=\"http://dx.doi.org/10.1/x\" target=\"_blank\">DOI</a> </span></div>\n",
        );
        assert_eq!(frag.html, expected);
        assert!(frag.year_header);
        assert_eq!(frag.year.as_deref(), Some("2021"));
        assert_eq!(frag.key, "lee2021");
    }

    #[test]
    fn year_header_once_per_year() {
        let html = HtmlConfig::default();
        let renderer = Renderer::new(&html);
        let mut year = YearState::default();
        let first = renderer.render(&article(), &mut year).unwrap();
        let second = renderer.render(&article(), &mut year).unwrap();
        assert!(first.year_header);
        assert!(!second.year_header);
        assert_eq!(year.current(), Some(2021));
        assert_eq!(first.html.matches("<h3>").count(), 1);
        assert!(!second.html.contains("<h3>"));
        assert!(first.html.ends_with(&second.html));

        let mut older = article();
        older.year = Some("2020".into());
        assert!(renderer.render(&older, &mut year).unwrap().year_header);
        assert_eq!(year.current(), Some(2020));
    }

    #[test]
    fn missing_year_skips_header_and_suffix() {
        let mut r = article();
        r.year = None;
        let html = HtmlConfig::default();
        let mut year = YearState::default();
        let frag = Renderer::new(&html).render(&r, &mut year).unwrap();
        assert!(!frag.year_header);
        assert_eq!(year.current(), None);
        assert!(frag.html.contains("Physical Review Letters 126, 1--5</span>"));
    }

    #[test]
    fn malformed_year_is_printed_but_gets_no_header() {
        let mut r = article();
        r.year = Some("in press".into());
        let frag = render(&r);
        assert!(!frag.year_header);
        assert!(!frag.html.contains("<h3>"));
        assert!(frag.html.contains("1--5 (in press)</span>"));
    }

    #[test]
    fn missing_author_fails_without_touching_state() {
        let mut r = article();
        r.author = None;
        let html = HtmlConfig::default();
        let mut year = YearState::default();
        let err = Renderer::new(&html).render(&r, &mut year).unwrap_err();
        assert!(matches!(err, RenderError::MissingField { field: "author", .. }));
        assert_eq!(err.to_string(), "entry `lee2021` has no author field");
        assert_eq!(year, YearState::default());
    }

    #[test]
    fn missing_title_fails() {
        let mut r = article();
        r.title = None;
        let html = HtmlConfig::default();
        let err = Renderer::new(&html)
            .render(&r, &mut YearState::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::MissingField { field: "title", .. }));
    }

    #[test]
    fn placeholders_for_missing_citation_fields() {
        let r = Record {
            year: None,
            ..Record {
                journal: None,
                volume: None,
                pages: None,
                ..article()
            }
        };
        assert!(render(&r).html.contains("<span>JOURNAL VOLUME, PAGES</span>"));
    }

    #[test]
    fn article_number_stands_in_for_pages() {
        let mut r = article();
        r.pages = None;
        r.art_number = Some("013901".into());
        r.article_number = Some("ignored".into());
        assert!(render(&r).html.contains("Physical Review Letters 126, 013901 (2021)"));

        r.art_number = None;
        assert!(render(&r).html.contains("Physical Review Letters 126, ignored (2021)"));
    }

    #[test]
    fn title_is_cleaned_and_italic() {
        let mut r = article();
        r.title = Some("{Quantum} control of $\\mu$m {{waves}}".into());
        assert!(
            render(&r)
                .html
                .contains("<span style=\"font-style:italic;\">Quantum control of &mu;m waves, </span>")
        );
    }

    #[test]
    fn doi_beats_url_link() {
        let mut r = article();
        r.url_link = Some("https://example.org/elsewhere".into());
        let html = render(&r).html;
        assert!(html.contains("href=\"http://dx.doi.org/10.1/x\""));
        assert!(!html.contains("example.org"));
    }

    #[test]
    fn url_link_used_without_doi() {
        let mut r = article();
        r.doi = None;
        r.url_link = Some("https://example.org/paper".into());
        assert!(
            render(&r)
                .html
                .contains("  <a href=\"https://example.org/paper\" target=\"_blank\">DOI</a> ")
        );
    }

    #[test]
    fn pdf_links() {
        let mut r = article();
        r.url_paper = Some("lee2021.pdf".into());
        assert!(
            render(&r)
                .html
                .contains(" <a href=\"https://www.attoscience.ca/pdf/lee2021.pdf\" target=\"_blank\">PDF</a></span>")
        );
        r.url_paper = Some("https://example.org/files/lee.pdf".into());
        assert!(render(&r).html.contains("href=\"https://example.org/files/lee.pdf\""));
    }

    #[test]
    fn highly_cited_badge_comes_first() {
        let mut r = article();
        r.highly_cited = true;
        let html = render(&r).html;
        let badge = html.find("alt=\"Highly Cited\"").expect("badge");
        assert!(badge < html.find(">DOI<").expect("doi link"));
    }

    #[test]
    fn citation_count_before_links() {
        let html_cfg = HtmlConfig::default();
        let lookup = Fixed(42);
        let frag = Renderer::new(&html_cfg)
            .with_citations(&lookup)
            .render(&article(), &mut YearState::default())
            .unwrap();
        assert!(frag.html.contains("float:right;\">  42   <a href="));
    }

    #[test]
    fn failed_lookup_renders_as_if_disabled() {
        let html_cfg = HtmlConfig::default();
        let plain = render(&article());
        let down = Renderer::new(&html_cfg)
            .with_citations(&Down)
            .render(&article(), &mut YearState::default())
            .unwrap();
        assert_eq!(plain, down);
    }

    #[test]
    fn lookup_doi_from_resolver_link() {
        let html_cfg = HtmlConfig::default();
        let seen = Recording::default();
        let renderer = Renderer::new(&html_cfg).with_citations(&seen);

        let mut r = article();
        r.doi = None;
        r.url_link = Some("http://dx.doi.org/10.1364/OL.1.000001".into());
        renderer.render(&r, &mut YearState::default()).unwrap();

        r.url_link = Some("https://example.org/no-doi".into());
        let frag = renderer.render(&r, &mut YearState::default()).unwrap();

        assert_eq!(*seen.0.borrow(), vec!["10.1364/OL.1.000001".to_string()]);
        assert!(frag.html.contains("float:right;\">    <a href=\"https://example.org/no-doi\""));
    }

    #[test]
    fn journal_names_are_title_cased() {
        assert_eq!(journal_name("physical review letters"), "Physical Review Letters");
        assert_eq!(journal_name("JOURNAL OF PHYSICS B"), "Journal Of Physics B");
        assert_eq!(
            journal_name("ieee journal of quantum electronics"),
            "IEEE Journal Of Quantum Electronics"
        );
        assert_eq!(journal_name("acs photonics"), "ACS Photonics");
        assert_eq!(journal_name("josa b"), "JOSA B");
        assert_eq!(journal_name("J. Phys. B: At. Mol."), "J. Phys. B: At. Mol.");
        assert_eq!(journal_name("nature 2d materials"), "Nature 2D Materials");
    }
}
