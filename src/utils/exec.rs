//! Running external transforms.

use anyhow::{Context, Result, bail};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// An argv to run to completion with captured output.
#[derive(Debug, Clone)]
pub struct Cmd {
    argv: Vec<OsString>,
    dir: Option<PathBuf>,
}

impl Cmd {
    /// `argv[0]` is the program. Empty arguments are dropped.
    pub fn from_slice<S: AsRef<std::ffi::OsStr>>(argv: &[S]) -> Self {
        Self {
            argv: argv
                .iter()
                .map(|a| a.as_ref().to_owned())
                .filter(|a| !a.is_empty())
                .collect(),
            dir: None,
        }
    }

    pub fn cwd(mut self, dir: &Path) -> Self {
        self.dir = Some(dir.to_path_buf());
        self
    }

    /// Run and return stdout. A non-zero exit fails with the trimmed stderr.
    pub fn stdout(self) -> Result<Vec<u8>> {
        let Some((program, args)) = self.argv.split_first() else {
            bail!("empty command");
        };
        let name = program.to_string_lossy();

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.dir {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .with_context(|| format!("cannot run `{name}`"))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("`{name}` exited with {}:\n{}", output.status, stderr.trim());
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_arguments_dropped() {
        let cmd = Cmd::from_slice(&["esbuild", "", "--minify"]);
        assert_eq!(cmd.argv, vec![OsString::from("esbuild"), OsString::from("--minify")]);
        assert!(Cmd::from_slice(&[""]).stdout().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_and_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = Cmd::from_slice(&["sh", "-c", "pwd"]).cwd(dir.path()).stdout().unwrap();
        let printed = String::from_utf8(out).unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(Path::new(printed.trim()).canonicalize().unwrap(), expected);

        let err = Cmd::from_slice(&["sh", "-c", "echo broken >&2; exit 3"])
            .stdout()
            .unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
