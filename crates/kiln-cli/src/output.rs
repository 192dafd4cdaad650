//! Colored terminal output for the CLI.
//!
//! Thin `termcolor` wrapper; honors `NO_COLOR` and the `--color` flag.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Pick a `ColorChoice`. `NO_COLOR` beats the flag, the flag beats
/// TTY auto-detection.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Styled output writer for terminal.
pub struct StyledOutput {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl StyledOutput {
    /// Create a new styled output with the given color choice.
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    /// Plain line to stdout.
    pub fn line(&mut self, text: &str) {
        let _ = writeln!(self.stdout, "{}", text);
    }

    /// Bold header line to stdout.
    pub fn header(&mut self, text: &str) {
        let mut spec = ColorSpec::new();
        spec.set_bold(true);
        let _ = self.stdout.set_color(&spec);
        let _ = writeln!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    /// Green `ok:` line to stdout.
    pub fn success(&mut self, text: &str) {
        self.prefixed(Color::Green, "ok", text);
    }

    /// Red `error:` line to stderr.
    pub fn error(&mut self, text: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red)).set_bold(true);
        let _ = self.stderr.set_color(&spec);
        let _ = write!(self.stderr, "error: ");
        let _ = self.stderr.reset();
        let _ = writeln!(self.stderr, "{}", text);
    }

    fn prefixed(&mut self, color: Color, prefix: &str, text: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(color)).set_bold(true);
        let _ = self.stdout.set_color(&spec);
        let _ = write!(self.stdout, "{prefix}: ");
        let _ = self.stdout.reset();
        let _ = writeln!(self.stdout, "{}", text);
    }
}
