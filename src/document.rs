use crate::{config::HtmlConfig, render::RenderedFragment};

/// The two artefacts of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Standalone page: preamble, entries, postamble.
    pub full: String,
    /// Heading and entries only, for pasting into an editor.
    pub body: String,
}

/// Join fragments, in the order given, into both document variants.
pub fn assemble(fragments: &[RenderedFragment], html: &HtmlConfig) -> Document {
    let entries: String = fragments.iter().map(|f| f.html.as_str()).collect();
    Document {
        full: format!("{}{}{}", html.preamble, entries, html.postamble),
        body: format!("{}{}", html.body_heading, entries),
    }
}
