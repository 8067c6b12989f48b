//! `tolstack expand` command - show how each expression resolves

use miette::Result;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{read_stack_file, truncate_str};
use crate::cli::GlobalOpts;
use crate::core::Config;
use crate::expr::{format_rpn, infix_to_rpn};
use crate::stack::Stack;

#[derive(clap::Args, Debug)]
pub struct ExpandArgs {
    /// Stack file whose expressions to expand
    pub file: PathBuf,
}

pub fn run(args: ExpandArgs, global: &GlobalOpts) -> Result<()> {
    let file = read_stack_file(&args.file)?;
    let mut sampler = Config::load().sampler();
    let stack = Stack::parse(&file.rows, &mut sampler)?;

    if stack.expressions().is_empty() {
        if !global.quiet {
            println!("No expressions found.");
        }
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["ID", "EXPANSION", "RPN", "NOTE"]);
    for expression in stack.expressions() {
        let rpn = infix_to_rpn(&expression.expr)?;
        builder.push_record([
            expression.key.clone(),
            expression.expand(stack.symbols()),
            format_rpn(&rpn),
            truncate_str(expression.note.as_deref().unwrap_or(""), 40),
        ]);
    }
    println!("{}", builder.build().with(Style::markdown()));

    Ok(())
}
