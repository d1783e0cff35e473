//! Terminal rendering for progress events and tables.

use owo_colors::OwoColorize;
use tern_core::event::{Event, EventSink};

/// Event sink rendering progress lines to stderr.
///
/// The core stays silent; this is the single place where its structured
/// event stream becomes user-visible text.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    quiet: bool,
}

impl ConsoleSink {
    /// A sink honoring `--quiet`.
    #[must_use]
    pub const fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: &Event) {
        if self.quiet {
            return;
        }
        match event {
            Event::RepoLoaded { name, versions } => {
                eprintln!("{} {name} ({versions} versions)", "loaded".dimmed());
            }
            Event::ResolveIteration { round, packages } => {
                tracing::debug!(round, packages, "resolve iteration");
            }
            Event::ResolveConverged { packages, settings } => {
                eprintln!(
                    "{} {packages} packages, {settings} settings",
                    "resolved".green()
                );
            }
            Event::DownloadStarted { repo, commit } => {
                eprintln!("{} {repo} @ {commit}", "downloading".cyan());
            }
            Event::DownloadFinished { repo } => {
                eprintln!("{} {repo}", "downloaded".green());
            }
            Event::JobQueued { .. } => {}
            Event::JobFinished { source } => {
                eprintln!("{} {}", "compiled".dimmed(), source.display());
            }
            _ => {}
        }
    }
}

/// A standard table with the house style.
#[must_use]
pub fn table(headers: &[&str]) -> comfy_table::Table {
    let mut table = comfy_table::Table::new();
    table.load_preset(comfy_table::presets::UTF8_BORDERS_ONLY);
    table.set_header(headers.iter().map(ToString::to_string));
    table
}
