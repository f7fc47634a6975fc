//! Command-line argument definitions for the Novaflow CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control the input source, the output path,
//! configuration file selection, and logging verbosity.

use clap::Parser;

/// Command-line arguments for the Novaflow chart renderer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input markup, or `-` for stdin
    #[arg(help = "Path to the input file, or - to read stdin")]
    pub input: String,

    /// Path to the output file
    #[arg(short, long, default_value = "out.svg")]
    pub output: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Treat the input as a generation API response (`{"mermaidCode": ...}`)
    #[arg(long)]
    pub json: bool,

    /// Write the sanitized markup instead of rendering it
    #[arg(long)]
    pub sanitize_only: bool,
}

impl Args {
    /// Arguments for rendering `input` into `output` with defaults elsewhere.
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            config: None,
            log_level: "info".to_string(),
            json: false,
            sanitize_only: false,
        }
    }

    /// Returns true when markup is read from stdin.
    pub fn reads_stdin(&self) -> bool {
        self.input == "-"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["novaflow", "chart.mmd"]);

        assert_eq!(args.input, "chart.mmd");
        assert_eq!(args.output, "out.svg");
        assert_eq!(args.log_level, "info");
        assert!(args.config.is_none());
        assert!(!args.json);
        assert!(!args.sanitize_only);
        assert!(!args.reads_stdin());
    }

    #[test]
    fn test_flags() {
        let args = Args::parse_from([
            "novaflow",
            "-",
            "-o",
            "clean.mmd",
            "--json",
            "--sanitize-only",
            "-c",
            "novaflow.toml",
        ]);

        assert!(args.reads_stdin());
        assert_eq!(args.output, "clean.mmd");
        assert_eq!(args.config.as_deref(), Some("novaflow.toml"));
        assert!(args.json);
        assert!(args.sanitize_only);
    }
}
