//! Semantic color palette for terminal output.

use owo_colors::{OwoColorize, Style};

fn allowed_style() -> Style {
    Style::new().green().bold()
}

fn denied_style() -> Style {
    Style::new().red().bold()
}

fn warning_style() -> Style {
    Style::new().yellow()
}

fn muted_style() -> Style {
    Style::new().dimmed()
}

fn code_style() -> Style {
    Style::new().blue()
}

/// Applies a semantic style unless colors are disabled.
pub trait SemanticStyle {
    /// Green bold: granted access, passed checks.
    fn allowed(&self) -> String;
    /// Red bold: denied access, failures.
    fn denied(&self) -> String;
    fn warning(&self) -> String;
    fn muted(&self) -> String;
    /// Blue: identifiers such as policy IDs and paths.
    fn code(&self) -> String;
}

fn styled<T: std::fmt::Display + ?Sized>(value: &T, style: Style) -> String {
    if super::no_color() {
        value.to_string()
    } else {
        value.style(style).to_string()
    }
}

impl<T: std::fmt::Display + ?Sized> SemanticStyle for T {
    fn allowed(&self) -> String {
        styled(self, allowed_style())
    }

    fn denied(&self) -> String {
        styled(self, denied_style())
    }

    fn warning(&self) -> String {
        styled(self, warning_style())
    }

    fn muted(&self) -> String {
        styled(self, muted_style())
    }

    fn code(&self) -> String {
        styled(self, code_style())
    }
}
