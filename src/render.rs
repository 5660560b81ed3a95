//! Output rendering for the chat application.
//!
//! Everything the chat session shows the user goes through a [`Renderer`].

use std::io::{self, Stdout, Write};

use crate::reassemble::ReassemblyObserver;

const ANSI_DIM: &str = "\x1b[2m";
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RED: &str = "\x1b[31m";
const ANSI_RESET: &str = "\x1b[0m";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print a labelled message, such as `User:` or `Assistant:` followed by
    /// the text.
    fn print_turn(&mut self, speaker: &str, text: &str);

    /// Print a turn as it crosses the wire in `--echo` mode.
    fn print_echo(&mut self, speaker: &str, text: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);
}

/// Plain text renderer writing to stdout, with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_turn(&mut self, speaker: &str, text: &str) {
        if self.use_color {
            println!("{ANSI_BOLD}{speaker}:{ANSI_RESET} {text}");
        } else {
            println!("{speaker}: {text}");
        }
        self.flush();
    }

    fn print_echo(&mut self, speaker: &str, text: &str) {
        if self.use_color {
            println!("{ANSI_DIM}[{speaker}] {text}{ANSI_RESET}");
        } else {
            println!("[{speaker}] {text}");
        }
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error:{ANSI_RESET} {error}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

/// Echoes every turn sent and every fragment received through a renderer.
pub struct EchoObserver<'a> {
    renderer: &'a mut dyn Renderer,
}

impl<'a> EchoObserver<'a> {
    /// Wrap `renderer`.
    pub fn new(renderer: &'a mut dyn Renderer) -> Self {
        Self { renderer }
    }
}

impl ReassemblyObserver for EchoObserver<'_> {
    fn on_send(&mut self, text: &str) {
        self.renderer.print_echo("User", text);
    }

    fn on_fragment(&mut self, fragment: &str) {
        self.renderer.print_echo("Assistant", fragment);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Captures rendered output as `(kind, text)` pairs.
    #[derive(Debug, Default)]
    pub(crate) struct CapturingRenderer {
        pub(crate) lines: Vec<(String, String)>,
    }

    impl Renderer for CapturingRenderer {
        fn print_turn(&mut self, speaker: &str, text: &str) {
            self.lines.push((speaker.to_string(), text.to_string()));
        }

        fn print_echo(&mut self, speaker: &str, text: &str) {
            self.lines.push((format!("echo:{speaker}"), text.to_string()));
        }

        fn print_info(&mut self, info: &str) {
            self.lines.push(("info".to_string(), info.to_string()));
        }

        fn print_error(&mut self, error: &str) {
            self.lines.push(("error".to_string(), error.to_string()));
        }
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::default();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn echo_observer_labels_direction() {
        let mut renderer = CapturingRenderer::default();
        {
            let mut echo = EchoObserver::new(&mut renderer);
            echo.on_send("question");
            echo.on_fragment("answer");
        }
        assert_eq!(
            renderer.lines,
            vec![
                ("echo:User".to_string(), "question".to_string()),
                ("echo:Assistant".to_string(), "answer".to_string()),
            ]
        );
    }
}
