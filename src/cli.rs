use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Turn the articles of a BibTeX file into an HTML publication list", long_about = None)]
pub struct Cli {
    /// BibTeX file to read. Defaults to `bibtexmaster.bib`, then the configured search paths
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// HTML file to write
    #[arg(short, long, value_name = "FILE", default_value = "testbib.html")]
    pub output: PathBuf,

    /// Only list entries whose author field contains NAME (case-sensitive, e.g. `Staudte`)
    #[arg(short = 'n', long = "name", value_name = "NAME")]
    pub name: Option<String>,

    /// Look up citation counts on Scopus (needs an API key)
    #[arg(short, long)]
    pub citations: bool,

    /// Also write the body-only HTML to FILE
    #[arg(long, value_name = "FILE")]
    pub body: Option<PathBuf>,

    /// Do not copy the body-only HTML to the clipboard
    #[arg(long)]
    pub no_clipboard: bool,

    /// Configuration file to use instead of the standard one
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The author filter, empty when none was given.
    pub fn author_filter(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}
