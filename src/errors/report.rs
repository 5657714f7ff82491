// src/errors/report.rs
//! Rendering of accumulated check diagnostics.

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, ThemeCharacters, ThemeStyles};

use crate::errors::CheckError;

fn themed(characters: ThemeCharacters, styles: ThemeStyles) -> GraphicalReportHandler {
    GraphicalReportHandler::new_themed(GraphicalTheme { characters, styles })
}

/// Handler for terminal output (unicode, ANSI colors).
pub fn terminal_handler() -> GraphicalReportHandler {
    themed(ThemeCharacters::unicode(), ThemeStyles::ansi())
}

/// Handler for stable test output (ascii, no colors).
pub fn plain_handler() -> GraphicalReportHandler {
    themed(ThemeCharacters::ascii(), ThemeStyles::none())
}

/// Render one diagnostic to a plain string.
pub fn render_to_string(report: &dyn Diagnostic) -> String {
    let mut out = String::new();
    let _ = plain_handler().render_report(&mut out, report);
    out
}

/// Render every diagnostic the checker accumulated against the unit's
/// source text and print them to stderr.
pub fn emit_all(errors: &[CheckError], source_name: &str, source: &str) {
    let handler = terminal_handler();
    for err in errors {
        let report = miette::Report::new(err.clone())
            .with_source_code(miette::NamedSource::new(source_name, source.to_string()));
        let mut out = String::new();
        if handler.render_report(&mut out, report.as_ref()).is_ok() {
            eprint!("{out}");
        }
    }
}
