//! `tolstack analyze` command - evaluate a stack file and print the report

use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{build_sampler, read_stack_file, write_output};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;
use crate::report::{self, ReportHeader};
use crate::stack::{analyze, AnalysisOptions, Stack, StackErrors, StackFile};

#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// Stack file to analyze
    pub file: PathBuf,

    /// Write the report to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Include sensitivities for every expression
    #[arg(long, short = 'S')]
    pub sensitivity: bool,

    /// Include tolerance contributions for every expression
    #[arg(long, short = 'T')]
    pub contributions: bool,

    /// Show which expressions use each constant and dimension
    #[arg(long, short = 'W')]
    pub where_used: bool,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Monte Carlo samples per quantity
    #[arg(long)]
    pub samples: Option<usize>,

    /// Seed for reproducible Monte Carlo results
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Report sections requested by flags, the file, or config
fn analysis_options(args: &AnalyzeArgs, file: &StackFile, config: &Config) -> AnalysisOptions {
    AnalysisOptions {
        sensitivity: args.sensitivity
            || file.options.sensitivity
            || config.sensitivity.unwrap_or(false),
        contributions: args.contributions
            || file.options.contributions
            || config.contributions.unwrap_or(false),
    }
}

fn report_header(args: &AnalyzeArgs, file: &StackFile, config: &Config) -> ReportHeader {
    let units = if file.options.units.trim().is_empty() {
        config.units.clone().unwrap_or_else(|| "mm".to_string())
    } else {
        file.options.units.clone()
    };
    ReportHeader {
        info: file.info.clone(),
        units,
        where_used: args.where_used || file.options.where_used || config.where_used.unwrap_or(false),
    }
}

pub fn run(args: AnalyzeArgs, global: &GlobalOpts) -> Result<()> {
    let file = read_stack_file(&args.file)?;
    let config = Config::load();
    let mut sampler = build_sampler(&config, args.samples, args.seed);

    let (stack, errors) = Stack::parse_partial(&file.rows, &mut sampler);
    let options = analysis_options(&args, &file, &config);
    let outcomes = analyze(&stack, &options, &mut sampler);

    let content = match args.format {
        OutputFormat::Text => {
            let header = report_header(&args, &file, &config);
            report::text::render(&stack, &header, &outcomes)
        }
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&outcomes).into_diagnostic()?;
            json.push('\n');
            json
        }
        OutputFormat::Csv => report::csv::render(&outcomes).into_diagnostic()?,
    };
    write_output(&content, args.output, global.quiet)?;

    if !errors.is_empty() {
        return Err(StackErrors::new(errors).into());
    }

    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    if failed > 0 {
        return Err(miette::miette!(
            "{} of {} expressions failed to evaluate",
            failed,
            outcomes.len()
        ));
    }

    Ok(())
}
