use std::{fs, path::Path};

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use crate::{
    citations::{Prefetched, scopus::ScopusClient},
    cli::Cli,
    config::Config,
    pipeline::{Report, Selection},
    render::Renderer,
};

mod citations;
mod cli;
mod config;
mod document;
mod filter;
mod names;
mod pipeline;
mod record;
mod render;
mod sort;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let config = Config::load(args.config.as_deref())?;
    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let input = match &args.input {
        Some(path) => path.clone(),
        None => config.input.locate()?,
    };
    let loaded = record::load(&input)?;
    tracing::debug!(
        input = %input.display(),
        entries = loaded.records.len(),
        rejected = loaded.rejected.len(),
        "bibliography loaded"
    );

    let selection = pipeline::select(loaded, args.author_filter());
    let counts = if args.citations {
        prefetch_counts(&config, &selection)
    } else {
        None
    };

    let mut renderer = Renderer::new(&config.html);
    if let Some(counts) = &counts {
        renderer = renderer.with_citations(counts);
    }
    let pipeline::Output {
        document: doc,
        report,
    } = pipeline::run(selection, &renderer);

    fs::write(&args.output, &doc.full)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    if let Some(path) = &args.body {
        fs::write(path, &doc.body)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if !args.no_clipboard {
        copy_to_clipboard(&doc.body);
    }

    print_summary(&report, &input, &args.output);
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("bib2html=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Citation counts for every selected DOI, or `None` when the service can't be used. Never
/// fatal: the list is still produced, just without counts.
fn prefetch_counts(config: &Config, selection: &Selection) -> Option<Prefetched> {
    let client = match ScopusClient::from_config(&config.scopus) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("citation counts disabled: {e}");
            return None;
        }
    };
    match Prefetched::fetch(&client, selection.lookup_dois(), config.scopus.parallelism) {
        Ok(counts) => {
            tracing::debug!(resolved = counts.len(), "citation counts ready");
            Some(counts)
        }
        Err(e) => {
            tracing::warn!("citation counts disabled: {e:#}");
            None
        }
    }
}

fn copy_to_clipboard(text: &str) {
    match arboard::Clipboard::new().and_then(|mut c| c.set_text(text)) {
        Ok(()) => eprintln!("HTML body copied to clipboard."),
        Err(e) => tracing::warn!("could not copy to clipboard: {e}"),
    }
}

fn print_summary(report: &Report, input: &Path, output: &Path) {
    for skipped in &report.skipped {
        eprintln!(
            "{} {} ({})",
            "skipped".dimmed(),
            skipped.key,
            skipped.entry_type
        );
    }
    for rejected in &report.rejected {
        eprintln!("{} {rejected}", "error:".red().bold());
    }
    for failure in &report.failed {
        eprintln!("{} {failure}", "error:".red().bold());
    }
    eprintln!(
        "{} {}  {} {}  {} skipped  {} filtered out  {} -> {}",
        "✓".green(),
        report.rendered,
        "✗".red(),
        report.failures(),
        report.skipped.len(),
        report.filtered_out,
        input.display(),
        output.display()
    );
}
