use std::path::PathBuf;

use clap::Parser;
use fern::colors::{Color, ColoredLevelConfig};
use log::{error, info, LevelFilter};

use chugg::{client::CheggClient, error::Result, export};

/// Download a Chegg e-textbook as locally browsable HTML.
#[derive(Parser, Debug)]
#[command(name = "chugg", version, about)]
struct Cli {
    /// ISBN number of the book.
    isbn: String,

    /// UUID of the book.
    book_id: String,

    /// Skip sections that are already downloaded.
    #[arg(short, long)]
    skip_downloaded: bool,

    /// The directory that will contain the exported book assets.
    #[arg(short = 'd', long, default_value = "export")]
    output_directory: PathBuf,

    /// Provide a user agent to use rather than a randomly selected one.
    #[arg(short, long)]
    user_agent: Option<String>,

    /// JSON file holding the authentication cookies as name/value pairs.
    #[arg(long, default_value = "cookies.json")]
    cookies: PathBuf,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn setup_logger(verbose: u8) -> std::result::Result<(), fern::InitError> {
    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red)
        .debug(Color::BrightBlack);

    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                colors.color(record.level()),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}

async fn run(cli: &Cli) -> Result<()> {
    info!("Book info:");
    info!("    ISBN: {}", cli.isbn);
    info!("    BOOK_ID: {}", cli.book_id);

    let client = CheggClient::new(
        &cli.isbn,
        &cli.book_id,
        &cli.cookies,
        cli.user_agent.as_deref(),
    )?;

    export::export_book(&client, &cli.output_directory, cli.skip_downloaded).await?;

    info!("Done.");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = setup_logger(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", err);
    }

    if let Err(err) = run(&cli).await {
        error!("{}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_positionals_and_defaults() {
        let cli = Cli::try_parse_from(["chugg", "9781234567988", "6f3cb0de"]).unwrap();
        assert_eq!(cli.isbn, "9781234567988");
        assert_eq!(cli.book_id, "6f3cb0de");
        assert!(!cli.skip_downloaded);
        assert_eq!(cli.output_directory, PathBuf::from("export"));
        assert_eq!(cli.cookies, PathBuf::from("cookies.json"));
        assert!(cli.user_agent.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "chugg",
            "9781234567988",
            "6f3cb0de",
            "-s",
            "-d",
            "books/calculus",
            "-u",
            "Custom/1.0",
            "--cookies",
            "auth.json",
            "-vv",
        ])
        .unwrap();
        assert!(cli.skip_downloaded);
        assert_eq!(cli.output_directory, PathBuf::from("books/calculus"));
        assert_eq!(cli.user_agent.as_deref(), Some("Custom/1.0"));
        assert_eq!(cli.cookies, PathBuf::from("auth.json"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn cli_requires_both_positionals() {
        assert!(Cli::try_parse_from(["chugg", "9781234567988"]).is_err());
    }
}
