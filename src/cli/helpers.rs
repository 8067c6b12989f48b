//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use console::style;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{Config, Sampler};
use crate::stack::StackFile;

/// Read and parse a stack file, reporting syntax errors against its source
pub fn read_stack_file(path: &Path) -> Result<StackFile> {
    let source = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    let file = StackFile::parse(&source, &path.display().to_string())?;
    Ok(file)
}

/// Sampler from layered config, with command-line overrides applied last
pub fn build_sampler(config: &Config, samples: Option<usize>, seed: Option<u64>) -> Sampler {
    let mut config = config.clone();
    if samples.is_some() {
        config.samples = samples;
    }
    if seed.is_some() {
        config.seed = seed;
    }
    config.sampler()
}

/// Write content to a file, or to stdout when no path is given
pub fn write_output(content: &str, output_path: Option<PathBuf>, quiet: bool) -> Result<()> {
    if let Some(path) = output_path {
        let file = File::create(&path).into_diagnostic()?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes()).into_diagnostic()?;
        writer.flush().into_diagnostic()?;
        if !quiet {
            println!("{} Report written to {}", style("✓").green(), style(path.display()).cyan());
        }
    } else {
        print!("{}", content);
    }
    Ok(())
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        assert_eq!(truncate_str("±±±±±", 4), "±...");
    }

    #[test]
    fn test_build_sampler_overrides() {
        let config = Config {
            samples: Some(500),
            ..Config::default()
        };
        assert_eq!(build_sampler(&config, None, None).sample_count(), 500);
        assert_eq!(build_sampler(&config, Some(50), Some(1)).sample_count(), 50);
    }

    #[test]
    fn test_write_output_to_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("report.txt");
        write_output("hello\n", Some(path.clone()), true).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "hello\n");
    }

    #[test]
    fn test_read_stack_file_missing() {
        let tmp = TempDir::new().unwrap();
        let err = read_stack_file(&tmp.path().join("nope.tsf")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
