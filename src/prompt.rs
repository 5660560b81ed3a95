//! Assembly of the initial prompt from local files.
//!
//! Each file is wrapped in `----start <path>----` / `----end <path>----`
//! markers, followed by the user's instruction and a directive asking the
//! model to finish its answer with [`TERMINATOR`](crate::reassemble::TERMINATOR).

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::reassemble::TERMINATOR;

/// Extensions picked up by directory walks when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["go", "txt", "mod", "cs", "c", "rs", "js", "ts"];

/// Collects files and an instruction into a single prompt.
///
/// # Examples
///
/// ```no_run
/// # use ppxity::Prompt;
/// # fn main() -> ppxity::Result<()> {
/// let mut prompt = Prompt::new("Explain this code", &["rs"]);
/// prompt.add_directory("src")?;
/// let text = prompt.compile()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    files: Vec<PathBuf>,
    instruction: String,
    extensions: Vec<String>,
}

impl Prompt {
    /// Create a prompt with `instruction` that accepts files ending in one of
    /// `extensions` during directory walks.
    pub fn new<S: AsRef<str>>(instruction: impl Into<String>, extensions: &[S]) -> Self {
        Self {
            files: Vec::new(),
            instruction: instruction.into(),
            extensions: extensions
                .iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// The files queued so far, in the order they will be emitted.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// The user's instruction.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Queue a single file. Explicit files bypass the extension filter.
    ///
    /// # Errors
    ///
    /// Fails immediately if the file does not exist.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::metadata(path).map_err(|e| {
            Error::io(format!("cannot add file {}", path.display()), e)
        })?;
        self.files.push(path.to_path_buf());
        Ok(())
    }

    /// Walk `dir` recursively and queue every file whose extension is allowed.
    ///
    /// Entries are visited in lexical order. Files without an extension are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Any error while reading a directory aborts the walk.
    pub fn add_directory(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let before = self.files.len();
        self.walk(dir)?;
        tracing::debug!(
            dir = %dir.display(),
            added = self.files.len() - before,
            "walked directory"
        );
        Ok(())
    }

    fn walk(&mut self, dir: &Path) -> Result<()> {
        let read_dir = fs::read_dir(dir)
            .map_err(|e| Error::io(format!("cannot read directory {}", dir.display()), e))?;
        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry
                .map_err(|e| Error::io(format!("cannot read directory {}", dir.display()), e))?;
            entries.push(entry.path());
        }
        entries.sort();

        for path in entries {
            let metadata = fs::metadata(&path)
                .map_err(|e| Error::io(format!("cannot stat {}", path.display()), e))?;
            if metadata.is_dir() {
                self.walk(&path)?;
            } else if self.accepts(&path) {
                self.files.push(path);
            }
        }
        Ok(())
    }

    fn accepts(&self, path: &Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            }
            _ => false,
        }
    }

    /// Read every queued file and produce the final prompt text.
    ///
    /// # Errors
    ///
    /// Fails if any queued file can no longer be read.
    pub fn compile(&self) -> Result<String> {
        let mut result = String::new();
        for file in &self.files {
            let bytes = fs::read(file)
                .map_err(|e| Error::io(format!("cannot read {}", file.display()), e))?;
            let path = file.display();
            result.push_str(&format!("----start {path}----\r\n"));
            result.push_str(&String::from_utf8_lossy(&bytes));
            result.push_str(&format!("\r\n----end {path}----\r\n\r\n"));
        }
        result.push_str("\r\n\r\n");
        result.push_str(&self.instruction);
        result.push_str(&format!(
            ". Your FINAL prompt response NEEDS to end with {TERMINATOR} but ONLY if it is the \
             final response and no more. Do NOT use {TERMINATOR} if you haven't finished \
             writing a function or text."
        ));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTIVE: &str = ". Your FINAL prompt response NEEDS to end with <end> but ONLY if it is the final response and no more. Do NOT use <end> if you haven't finished writing a function or text.";

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ppxity-prompt-{name}-{}-{:08x}",
            std::process::id(),
            rand::random::<u32>()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn single_file_layout() {
        let dir = scratch_dir("single");
        let file = dir.join("a.txt");
        fs::write(&file, "X").unwrap();

        let mut prompt = Prompt::new("hello", DEFAULT_EXTENSIONS);
        prompt.add_file(&file).unwrap();
        let compiled = prompt.compile().unwrap();

        let path = file.display();
        let expected =
            format!("----start {path}----\r\nX\r\n----end {path}----\r\n\r\n\r\n\r\nhello{DIRECTIVE}");
        assert_eq!(compiled, expected);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn no_files() {
        let prompt = Prompt::new("hello", DEFAULT_EXTENSIONS);
        assert_eq!(prompt.compile().unwrap(), format!("\r\n\r\nhello{DIRECTIVE}"));
    }

    #[test]
    fn missing_file_fails_immediately() {
        let dir = scratch_dir("missing");
        let mut prompt = Prompt::new("hello", DEFAULT_EXTENSIONS);
        let err = prompt.add_file(dir.join("nope.rs")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(prompt.files().is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn directory_walk_filters_extensions() {
        let dir = scratch_dir("walk");
        fs::create_dir_all(dir.join("nested/deeper")).unwrap();
        fs::write(dir.join("b.rs"), "fn b() {}").unwrap();
        fs::write(dir.join("a.RS"), "fn a() {}").unwrap();
        fs::write(dir.join("Makefile"), "all:").unwrap();
        fs::write(dir.join("image.png"), [0u8, 1, 2]).unwrap();
        fs::write(dir.join("nested/c.go"), "package c").unwrap();
        fs::write(dir.join("nested/deeper/d.txt"), "d").unwrap();

        let mut prompt = Prompt::new("explain", &["rs", ".GO", "txt"]);
        prompt.add_directory(&dir).unwrap();
        let expected = vec![
            dir.join("a.RS"),
            dir.join("b.rs"),
            dir.join("nested/c.go"),
            dir.join("nested/deeper/d.txt"),
        ];
        assert_eq!(prompt.files(), expected.as_slice());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_directory_aborts() {
        let dir = scratch_dir("nodir");
        let mut prompt = Prompt::new("hello", DEFAULT_EXTENSIONS);
        assert!(prompt.add_directory(dir.join("absent")).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn files_keep_insertion_order() {
        let dir = scratch_dir("order");
        fs::write(dir.join("z.txt"), "last").unwrap();
        fs::write(dir.join("a.txt"), "first").unwrap();

        let mut prompt = Prompt::new("go", DEFAULT_EXTENSIONS);
        prompt.add_file(dir.join("z.txt")).unwrap();
        prompt.add_file(dir.join("a.txt")).unwrap();
        let compiled = prompt.compile().unwrap();
        let z = compiled.find("last").unwrap();
        let a = compiled.find("first").unwrap();
        assert!(z < a);
        fs::remove_dir_all(&dir).unwrap();
    }
}
