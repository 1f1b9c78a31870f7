use crate::{
    document::{self, Document},
    filter,
    record::{EntryError, Loaded, Record},
    render::{RenderError, RenderedFragment, Renderer, YearState},
    sort,
};

/// An entry left out because it is not an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub key: String,
    pub entry_type: String,
}

/// Articles that made it through the author filter, in display order.
#[derive(Debug, Default)]
pub struct Selection {
    pub records: Vec<Record>,
    pub skipped: Vec<Skipped>,
    pub filtered_out: usize,
    /// Entries dropped while loading the file.
    pub rejected: Vec<EntryError>,
}

impl Selection {
    /// DOIs worth asking a citation service about, one per record that has one.
    pub fn lookup_dois(&self) -> impl Iterator<Item = &str> {
        self.records.iter().filter_map(Record::lookup_doi)
    }
}

/// What happened to every record of a run.
#[derive(Debug, Default)]
pub struct Report {
    pub rendered: usize,
    pub skipped: Vec<Skipped>,
    pub filtered_out: usize,
    pub rejected: Vec<EntryError>,
    pub failed: Vec<RenderError>,
}

impl Report {
    /// Entries that were meant to be listed but could not be.
    pub fn failures(&self) -> usize {
        self.rejected.len() + self.failed.len()
    }
}

pub struct Output {
    pub document: Document,
    pub report: Report,
}

/// Keep the articles matching `author_filter` and sort them for display.
pub fn select(loaded: impl Into<Loaded>, author_filter: &str) -> Selection {
    let Loaded { records, rejected } = loaded.into();
    let mut selection = Selection {
        rejected,
        ..Default::default()
    };
    for record in records {
        if !record.is_article() {
            tracing::info!(
                key = %record.key,
                entry_type = %record.entry_type,
                "entry type ignored"
            );
            selection.skipped.push(Skipped {
                key: record.key,
                entry_type: record.entry_type,
            });
        } else if filter::passes(&record, author_filter) {
            selection.records.push(record);
        } else {
            selection.filtered_out += 1;
        }
    }
    sort::sort(&mut selection.records);
    selection
}

/// Render the selection in order. Records that fail are reported and left out, the rest of
/// the pass carries on.
pub fn render_all(
    selection: Selection,
    renderer: &Renderer<'_>,
) -> (Vec<RenderedFragment>, Report) {
    let mut report = Report {
        skipped: selection.skipped,
        filtered_out: selection.filtered_out,
        rejected: selection.rejected,
        ..Default::default()
    };
    let mut year = YearState::default();
    let mut fragments = Vec::with_capacity(selection.records.len());
    for record in &selection.records {
        match renderer.render(record, &mut year) {
            Ok(fragment) => {
                tracing::debug!(
                    key = %fragment.key,
                    year = ?fragment.year,
                    header = fragment.year_header,
                    "rendered"
                );
                fragments.push(fragment);
            }
            Err(e) => {
                tracing::warn!("skipping entry: {e}");
                report.failed.push(e);
            }
        }
    }
    report.rendered = fragments.len();
    tracing::debug!(last_year = ?year.current(), rendered = report.rendered, "render pass done");
    (fragments, report)
}

/// Render a selection and assemble both documents.
pub fn run(selection: Selection, renderer: &Renderer<'_>) -> Output {
    let (fragments, report) = render_all(selection, renderer);
    Output {
        document: document::assemble(&fragments, renderer.html()),
        report,
    }
}
