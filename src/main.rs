use clap::Parser;
use miette::Result;
use tolstack::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    // RUST_LOG takes precedence over --verbose
    let level = if global.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Analyze(args) => tolstack::cli::commands::analyze::run(args, &global),
        Commands::Check(args) => tolstack::cli::commands::check::run(args, &global),
        Commands::Expand(args) => tolstack::cli::commands::expand::run(args, &global),
        Commands::Completions(args) => tolstack::cli::commands::completions::run(args),
    }
}
