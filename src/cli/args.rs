//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    analyze::AnalyzeArgs, check::CheckArgs, completions::CompletionsArgs, expand::ExpandArgs,
};

#[derive(Parser)]
#[command(name = "tolstack")]
#[command(author, version, about = "Tolerance stack analysis")]
#[command(long_about = "Evaluates dimensional tolerance stacks by worst case and by Monte Carlo \
statistics, with sensitivities, tolerance contributions and where-used reports.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct GlobalOpts {
    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (info-level logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate every expression in a stack file and print the report
    Analyze(AnalyzeArgs),

    /// Parse a stack file and list every row error
    Check(CheckArgs),

    /// Print each expression's canonical expansion and RPN
    Expand(ExpandArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain-text report with tables and bar charts
    #[default]
    Text,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze_flags() {
        let cli = Cli::parse_from([
            "tolstack", "-v", "analyze", "stack.tsf", "-S", "-W", "-f", "json", "--seed", "7",
        ]);
        assert!(cli.global.verbose);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert!(args.sensitivity && args.where_used && !args.contributions);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.seed, Some(7));
    }
}
