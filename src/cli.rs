use clap::{Parser, Subcommand};

use crate::commands;
use crate::commands::analyze::AnalysisKind;
use crate::utils::{get_port, init_tracing};

#[derive(Parser)]
#[command(name = "niftydash")]
#[command(about = "Indian stock market dashboard: fetch, store and analyze NSE daily prices", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web dashboard and API server
    Serve {
        /// Port to listen on (default: PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Download daily prices and store them
    Fetch {
        /// Comma-separated symbols, e.g. TCS.NS,INFY.NS (default: whole universe)
        #[arg(short, long)]
        symbols: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD, default: today)
        #[arg(long)]
        end: Option<String>,
        /// Days before the end date when --start is absent
        #[arg(short, long)]
        days: Option<i64>,
    },
    /// Show what is stored
    Status,
    /// Copy CSV data into the database
    Migrate,
    /// Delete one date from storage
    Clear {
        /// Date to remove (YYYY-MM-DD)
        date: String,
    },
    /// Ask a question, e.g. "top 5 gainers last week"
    Query {
        text: String,
        /// Answer as of this date (default: latest stored date)
        #[arg(long)]
        date: Option<String>,
    },
    /// Run one analysis and print a table
    Analyze {
        #[arg(value_enum)]
        kind: AnalysisKind,
        #[arg(short, long)]
        symbol: Option<String>,
        /// Reference date (default: latest stored date)
        #[arg(long)]
        date: Option<String>,
        /// Look-back window in days
        #[arg(short, long)]
        days: Option<i64>,
    },
}

pub fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            init_tracing("niftydash=info,tower_http=info");
            commands::serve::run(port.unwrap_or_else(get_port));
        }
        Commands::Fetch {
            symbols,
            start,
            end,
            days,
        } => {
            init_tracing("niftydash=warn");
            commands::fetch::run(symbols, start, end, days);
        }
        Commands::Status => {
            init_tracing("niftydash=warn");
            commands::status::run();
        }
        Commands::Migrate => {
            init_tracing("niftydash=warn");
            commands::migrate::run();
        }
        Commands::Clear { date } => {
            init_tracing("niftydash=warn");
            commands::clear::run(date);
        }
        Commands::Query { text, date } => {
            init_tracing("niftydash=warn");
            commands::query::run(text, date);
        }
        Commands::Analyze {
            kind,
            symbol,
            date,
            days,
        } => {
            init_tracing("niftydash=warn");
            commands::analyze::run(kind, symbol, date, days);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from(["niftydash", "fetch", "--symbols", "TCS.NS,INFY.NS", "--days", "10"]).unwrap();
        match cli.command {
            Commands::Fetch { symbols, days, start, .. } => {
                assert_eq!(symbols.as_deref(), Some("TCS.NS,INFY.NS"));
                assert_eq!(days, Some(10));
                assert!(start.is_none());
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from(["niftydash", "analyze", "volume", "--symbol", "TCS.NS"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Analyze {
                kind: AnalysisKind::Volume,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["niftydash", "analyze", "bogus"]).is_err());
    }
}
