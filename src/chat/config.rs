//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! [`ChatConfig`] the session runs with.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::error::{Error, Result};
use crate::prompt::DEFAULT_EXTENSIONS;
use crate::reassemble::{FOLLOW_UP_ATTEMPTS, INITIAL_ATTEMPTS};
use crate::types::Model;

/// Default per-attempt receive timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(50);

/// Command-line arguments for the ppxity tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Directories to walk for source files.
    #[arrrg(optional, "Comma-separated directories to include", "DIRS")]
    pub directories: Option<String>,

    /// Individual files to include.
    #[arrrg(optional, "Comma-separated files to include", "FILES")]
    pub files: Option<String>,

    /// File extensions picked up from directories.
    #[arrrg(
        optional,
        "Comma-separated extensions (default: go,txt,mod,cs,c,rs,js,ts)",
        "EXTS"
    )]
    pub extensions: Option<String>,

    /// Model to use.
    #[arrrg(optional, "Model to use (default: claude-3-haiku-20240307)", "MODEL")]
    pub model: Option<String>,

    /// Initial instruction.
    #[arrrg(optional, "Prompt to send with the files (required)", "PROMPT")]
    pub prompt: Option<String>,

    /// Seconds to wait for each response fragment.
    #[arrrg(optional, "Seconds to wait for each response (default: 50)", "SECS")]
    pub timeout: Option<u64>,

    /// Log every frame sent and received.
    #[arrrg(flag, "Log every frame sent and received")]
    pub debug: bool,

    /// Print the compiled prompt rather than a short notice.
    #[arrrg(flag, "Print the full initial prompt")]
    pub show_initial_prompt: bool,

    /// Echo every turn as it crosses the wire.
    #[arrrg(flag, "Echo each turn as it is sent and received")]
    pub echo: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// The model answering every turn.
    pub model: Model,

    /// The initial instruction sent along with the files.
    pub prompt: String,

    /// Files included verbatim, in order.
    pub files: Vec<PathBuf>,

    /// Directories walked for files with an allowed extension.
    pub directories: Vec<PathBuf>,

    /// Extensions accepted during directory walks.
    pub extensions: Vec<String>,

    /// How long to wait for each response fragment.
    pub timeout: Duration,

    /// Attempt budget for the initial exchange.
    pub initial_attempts: usize,

    /// Attempt budget for each interactive turn.
    pub follow_up_attempts: usize,

    /// Whether every frame is logged.
    pub debug: bool,

    /// Whether the compiled prompt is printed in full.
    pub show_initial_prompt: bool,

    /// Whether turns are echoed as they cross the wire.
    pub echo: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a configuration for `prompt` with default values.
    ///
    /// Defaults:
    /// - Model: claude-3-haiku-20240307
    /// - Extensions: go, txt, mod, cs, c, rs, js, ts
    /// - Timeout: 50 seconds
    /// - Attempts: 10 initially, 20 per follow-up
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: Model::default(),
            prompt: prompt.into(),
            files: Vec::new(),
            directories: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
            initial_attempts: INITIAL_ATTEMPTS,
            follow_up_attempts: FOLLOW_UP_ATTEMPTS,
            debug: false,
            show_initial_prompt: false,
            echo: false,
            use_color: true,
        }
    }

    /// Resolves parsed arguments. `free` holds positional arguments, which
    /// are treated as additional files.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `--prompt` is missing or empty, or if
    /// `--timeout` is zero.
    pub fn from_args(args: ChatArgs, free: &[String]) -> Result<Self> {
        let prompt = args
            .prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| Error::validation("--prompt is required", Some("prompt".into())))?;
        let mut config = ChatConfig::new(prompt);

        if let Some(model) = args.model {
            config = config.with_model(model.parse().unwrap_or(Model::Custom(model)));
        }
        if let Some(extensions) = args.extensions {
            config = config.with_extensions(split_list(&extensions));
        }
        if let Some(secs) = args.timeout {
            if secs == 0 {
                return Err(Error::validation(
                    "--timeout must be at least one second",
                    Some("timeout".into()),
                ));
            }
            config = config.with_timeout(Duration::from_secs(secs));
        }

        let mut files: Vec<PathBuf> = args
            .files
            .as_deref()
            .map(split_list)
            .unwrap_or_default()
            .into_iter()
            .map(PathBuf::from)
            .collect();
        files.extend(free.iter().map(PathBuf::from));
        let directories = args
            .directories
            .as_deref()
            .map(split_list)
            .unwrap_or_default()
            .into_iter()
            .map(PathBuf::from)
            .collect();

        config.files = files;
        config.directories = directories;
        config.debug = args.debug;
        config.show_initial_prompt = args.show_initial_prompt;
        config.echo = args.echo;
        config.use_color = !args.no_color;
        Ok(config)
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Adds a file to include.
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.files.push(file.into());
        self
    }

    /// Adds a directory to walk.
    pub fn with_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directories.push(dir.into());
        self
    }

    /// Replaces the accepted extensions.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Sets the per-attempt receive timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the attempt budgets for the initial exchange and follow-ups.
    pub fn with_attempts(mut self, initial: usize, follow_up: usize) -> Self {
        self.initial_attempts = initial;
        self.follow_up_attempts = follow_up;
        self
    }

    /// Enables turn echoing.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    fn args_with_prompt() -> ChatArgs {
        ChatArgs {
            prompt: Some("review this".to_string()),
            ..ChatArgs::default()
        }
    }

    #[test]
    fn default_config() {
        let config = ChatConfig::new("hi");
        assert_eq!(config.model, Model::Known(KnownModel::Claude3Haiku20240307));
        assert_eq!(config.prompt, "hi");
        assert_eq!(config.timeout, Duration::from_secs(50));
        assert_eq!(config.initial_attempts, 10);
        assert_eq!(config.follow_up_attempts, 20);
        assert_eq!(
            config.extensions,
            vec!["go", "txt", "mod", "cs", "c", "rs", "js", "ts"]
        );
        assert!(config.files.is_empty());
        assert!(config.directories.is_empty());
        assert!(!config.debug);
        assert!(!config.echo);
        assert!(config.use_color);
    }

    #[test]
    fn prompt_is_required() {
        let err = ChatConfig::from_args(ChatArgs::default(), &[]).unwrap_err();
        assert!(err.is_validation());

        let args = ChatArgs {
            prompt: Some("   ".to_string()),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::from_args(args, &[]).unwrap_err().is_validation());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let args = ChatArgs {
            timeout: Some(0),
            ..args_with_prompt()
        };
        assert!(ChatConfig::from_args(args, &[]).unwrap_err().is_validation());
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from_args(args_with_prompt(), &[]).unwrap();
        assert_eq!(config, ChatConfig::new("review this"));
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            directories: Some("src, lib".to_string()),
            files: Some("main.go,,go.mod".to_string()),
            extensions: Some("rs,toml".to_string()),
            model: Some("mixtral-8x7b-instruct".to_string()),
            timeout: Some(5),
            debug: true,
            show_initial_prompt: true,
            echo: true,
            no_color: true,
            ..args_with_prompt()
        };
        let config = ChatConfig::from_args(args, &["extra.txt".to_string()]).unwrap();
        assert_eq!(config.model, Model::Known(KnownModel::Mixtral8x7bInstruct));
        assert_eq!(
            config.files,
            vec![
                PathBuf::from("main.go"),
                PathBuf::from("go.mod"),
                PathBuf::from("extra.txt"),
            ]
        );
        assert_eq!(
            config.directories,
            vec![PathBuf::from("src"), PathBuf::from("lib")]
        );
        assert_eq!(config.extensions, vec!["rs", "toml"]);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.debug);
        assert!(config.show_initial_prompt);
        assert!(config.echo);
        assert!(!config.use_color);
    }

    #[test]
    fn unknown_model_is_custom() {
        let args = ChatArgs {
            model: Some("my-model".to_string()),
            ..args_with_prompt()
        };
        let config = ChatConfig::from_args(args, &[]).unwrap();
        assert_eq!(config.model, Model::Custom("my-model".to_string()));
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new("p")
            .with_model(Model::Custom("x".to_string()))
            .with_file("a.rs")
            .with_directory("src")
            .with_extensions(vec!["py".to_string()])
            .with_timeout(Duration::from_secs(3))
            .with_attempts(2, 4)
            .with_echo(true)
            .without_color();
        assert_eq!(config.model, Model::Custom("x".to_string()));
        assert_eq!(config.files, vec![PathBuf::from("a.rs")]);
        assert_eq!(config.directories, vec![PathBuf::from("src")]);
        assert_eq!(config.extensions, vec!["py"]);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.initial_attempts, 2);
        assert_eq!(config.follow_up_attempts, 4);
        assert!(config.echo);
        assert!(!config.use_color);
    }
}
