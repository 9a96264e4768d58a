use clap::Parser;
use miette::Result;
use pbfe::cli::commands::utils::Session;
use pbfe::cli::{Cli, Commands, GlobalOpts};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
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
    init_tracing(&cli.global);

    match cli.command {
        Commands::Completions(args) => pbfe::cli::commands::completions::run(args),
        command => dispatch(command, &Session::load(&cli.global)?),
    }
}

fn dispatch(command: Commands, session: &Session) -> Result<()> {
    match command {
        Commands::Init(args) => pbfe::cli::commands::init::run(args, session),
        Commands::Derive(args) => pbfe::cli::commands::derive::run(args, session),
        Commands::Cost(args) => pbfe::cli::commands::cost::run(args, session),
        Commands::Finance(args) => pbfe::cli::commands::finance::run(args, session),
        Commands::Breakeven(args) => pbfe::cli::commands::breakeven::run(args, session),
        Commands::Simulate(args) => pbfe::cli::commands::simulate::run(args, session),
        Commands::Report(args) => pbfe::cli::commands::report::run(args, session),
        Commands::List(args) => pbfe::cli::commands::list::run(args, session),
        Commands::Params(args) => pbfe::cli::commands::params::run(args, session),
        Commands::Completions(args) => pbfe::cli::commands::completions::run(args),
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(global: &GlobalOpts) {
    let default_level = if global.verbose { "pbfe=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
