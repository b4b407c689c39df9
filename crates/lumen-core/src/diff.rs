//! External diff tool invocation.
//!
//! When an activation fails and a rollback is about to happen, the engine
//! can show the operator what changed between the last good version and
//! the file currently on disk. The comparison is delegated to an external
//! command; everything about it is best-effort and non-fatal.

use std::io::Write;
use std::path::Path;
use std::process::Command;

/// Substitution token for the path holding the previous version.
pub const OLD_FILE_TOKEN: &str = "<oldFile>";
/// Substitution token for the path of the current on-disk file.
pub const NEW_FILE_TOKEN: &str = "<newFile>";

/// Runs a configured diff command against two files.
///
/// The command is a template containing [`OLD_FILE_TOKEN`] and
/// [`NEW_FILE_TOKEN`]; the previous version is written to a temporary
/// file before substitution. Tool availability is checked once and a
/// missing tool disables diffing for the rest of the process.
#[derive(Debug)]
pub struct DiffRunner {
    command_template: String,
    available: Option<bool>,
}

impl DiffRunner {
    pub fn new(command_template: impl Into<String>) -> Self {
        Self {
            command_template: command_template.into(),
            available: None,
        }
    }

    /// Compare a previous content version against the file at `new_path`,
    /// logging the tool's output. Launch failures and non-zero exits are
    /// swallowed; `diff` exits non-zero whenever the files differ.
    pub fn run(&mut self, old_data: &[u8], new_path: &Path) {
        if !self.check_available() {
            return;
        }

        let mut old_file = match tempfile::Builder::new().prefix("lumen_diff_").tempfile() {
            Ok(file) => file,
            Err(e) => {
                log::warn!("Could not create temporary file for diff: {}", e);
                return;
            }
        };

        if let Err(e) = old_file.write_all(old_data) {
            log::warn!(
                "Could not write temporary file for diff. file:'{}': {}",
                new_path.display(),
                e
            );
            return;
        }

        let command = substitute(&self.command_template, old_file.path(), new_path);

        let output = match Command::new("sh").arg("-c").arg(&command).output() {
            Ok(output) => output,
            Err(e) => {
                log::warn!(
                    "Could not run diff. command:'{}', file:'{}': {}",
                    command,
                    new_path.display(),
                    e
                );
                return;
            }
        };

        let diff_output = String::from_utf8_lossy(&output.stdout);
        log::info!(
            "File diff. file:'{}', diff results:\n{}",
            new_path.display(),
            diff_output
        );
    }

    /// Resolve the template's command name once. A tool that cannot be
    /// found produces a single warning instead of a warning per reload.
    fn check_available(&mut self) -> bool {
        if let Some(available) = self.available {
            return available;
        }

        let program = self
            .command_template
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();

        let available = if program.is_empty() {
            log::warn!("Empty diff command template, diff disabled");
            false
        } else {
            match which::which(&program) {
                Ok(path) => {
                    log::debug!("Diff tool: {}", path.display());
                    true
                }
                Err(_) => {
                    log::warn!("Diff tool '{}' not found in PATH, diff disabled", program);
                    false
                }
            }
        };

        self.available = Some(available);
        available
    }
}

/// Render the command template with both substitution tokens replaced.
fn substitute(template: &str, old_path: &Path, new_path: &Path) -> String {
    template
        .replace(OLD_FILE_TOKEN, &old_path.to_string_lossy())
        .replace(NEW_FILE_TOKEN, &new_path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_substitute_tokens() {
        let command = substitute(
            "diff --unified '<oldFile>' '<newFile>'",
            Path::new("/tmp/lumen_diff_abc"),
            Path::new("data/demo.rhai"),
        );
        assert_eq!(
            command,
            "diff --unified '/tmp/lumen_diff_abc' 'data/demo.rhai'"
        );
    }

    #[test]
    fn test_substitute_without_tokens_is_identity() {
        let command = substitute("diff -u a b", Path::new("old"), Path::new("new"));
        assert_eq!(command, "diff -u a b");
    }

    #[test]
    fn test_missing_tool_is_nonfatal() {
        let mut runner = DiffRunner::new("definitely-no-such-tool <oldFile> <newFile>");
        runner.run(b"old", &PathBuf::from("/tmp/whatever"));
        assert_eq!(runner.available, Some(false));
    }

    #[test]
    fn test_empty_template_is_nonfatal() {
        let mut runner = DiffRunner::new("");
        runner.run(b"old", &PathBuf::from("/tmp/whatever"));
        assert_eq!(runner.available, Some(false));
    }

    #[test]
    fn test_runs_configured_command() {
        let dir = tempfile::tempdir().unwrap();
        let new_path = dir.path().join("new.txt");
        std::fs::write(&new_path, b"new content\n").unwrap();

        // `diff` exits 1 on differing files; that must not matter
        let mut runner =
            DiffRunner::new("diff --ignore-all-space --unified '<oldFile>' '<newFile>'");
        runner.run(b"old content\n", &new_path);
        assert_eq!(runner.available, Some(true));
    }
}
