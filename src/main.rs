use tracing::level_filters::LevelFilter;

use unsubscriber::app::{App, EXIT_USAGE};
use unsubscriber::cli::Cli;
use unsubscriber::errors::ErrorCategory;

/// Map the numeric `--verbose` level onto a tracing filter.
fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::OFF,
        1 => LevelFilter::ERROR,
        2 => LevelFilter::WARN,
        3 | 4 => LevelFilter::INFO,
        _ => LevelFilter::TRACE,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::from_args();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level_for(cli.verbose))
        .with_target(cli.is_trace())
        .with_ansi(!cli.no_color && std::env::var("NO_COLOR").is_err())
        .init();

    let code = match App::run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            if cli.error_enabled() {
                eprintln!("Error: {e}");
            }
            match e.category() {
                ErrorCategory::Input => EXIT_USAGE,
                _ => 1,
            }
        }
    };

    std::process::exit(code);
}
