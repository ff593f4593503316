use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gtt-desk")]
#[command(about = "GTT order desk for Kite Connect: dashboard API, shadow orders and CSV sync")]
#[command(version)]
pub struct Cli {
    /// TOML config file (defaults to ./gtt-desk.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API
    Serve {
        /// Overrides `server.bind`
        #[arg(long)]
        bind: Option<String>,
    },
    /// Place or modify GTT triggers from a CSV file
    ImportCsv { file: PathBuf },
    /// Write live GTT triggers to a CSV file
    ExportCsv { file: PathBuf },
    /// Reconcile shadow orders with triggers on Kite
    Sync,
    /// Load symbol reference data (symbol, company_name, nifty_rank, close_price)
    LoadSymbols { file: PathBuf },
    /// Check Kite credentials by fetching the profile
    CheckKite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["gtt-desk", "serve", "--bind", "0.0.0.0:8000", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Serve { bind: Some(ref b) } if b == "0.0.0.0:8000"));

        let cli = Cli::parse_from([
            "gtt-desk",
            "--config",
            "desk.toml",
            "import-csv",
            "orders.csv",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("desk.toml")));
        assert!(matches!(cli.command, Command::ImportCsv { .. }));
    }
}
