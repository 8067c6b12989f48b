//! `tolstack check` command - parse a stack file without analysing it

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::read_stack_file;
use crate::cli::GlobalOpts;
use crate::core::Config;
use crate::stack::{Stack, StackErrors};

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Stack file to check
    pub file: PathBuf,
}

pub fn run(args: CheckArgs, global: &GlobalOpts) -> Result<()> {
    let file = read_stack_file(&args.file)?;
    let mut sampler = Config::load().sampler();

    let (stack, errors) = Stack::parse_partial(&file.rows, &mut sampler);
    if !errors.is_empty() {
        return Err(StackErrors::new(errors).into());
    }

    if !global.quiet {
        println!(
            "{} {} is valid (format {})",
            style("✓").green(),
            style(args.file.display()).cyan(),
            file.format_version
        );
        println!(
            "   {} constants, {} dimensions, {} expressions",
            style(stack.constants().count()).cyan(),
            style(stack.dimensions().count()).cyan(),
            style(stack.expressions().len()).cyan()
        );
    }

    Ok(())
}
