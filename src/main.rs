use clap::Parser;
use gtt_desk::adapters::{LocalStorage, OrderStore};
use gtt_desk::app::{self, AppState};
use gtt_desk::core::csv_sync;
use gtt_desk::domain::ports::Broker;
use gtt_desk::utils::error::{ErrorSeverity, GttError, Result};
use gtt_desk::utils::logger;
use gtt_desk::utils::monitor::SystemMonitor;
use gtt_desk::utils::validation::validate_file_extensions;
use gtt_desk::{AppConfig, Cli, Command, GttService};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 先載入，讓 ${VAR} 與 KITE_* 變數生效
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose, "info");
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(exit_code(e.severity()));
        }
    };

    // 初始化日誌
    if config.logging.json {
        logger::init_json_logger(&config.logging.level);
    } else {
        logger::init_cli_logger(cli.verbose, &config.logging.level);
    }
    tracing::info!("Starting gtt-desk");
    if cli.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    let monitor = cli.verbose.then(SystemMonitor::new);
    let result = run(cli.command, &config).await;
    if let Some(monitor) = &monitor {
        monitor.log_stats("finished");
    }

    if let Err(e) = result {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let code = exit_code(e.severity());
        if code > 0 {
            std::process::exit(code);
        }
    }

    Ok(())
}

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn broker(config: &AppConfig) -> Option<Arc<dyn Broker>> {
    config
        .kite
        .client()
        .map(|client| Arc::new(client) as Arc<dyn Broker>)
}

fn require_broker(config: &AppConfig) -> Result<Arc<dyn Broker>> {
    broker(config).ok_or(GttError::BrokerUnavailable)
}

async fn open_store(config: &AppConfig) -> Result<Arc<OrderStore>> {
    if let Some(parent) = Path::new(&config.database.path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(Arc::new(OrderStore::open(&config.database.path).await?))
}

fn ensure_csv(file: &Path) -> Result<()> {
    validate_file_extensions("file", &[file.to_string_lossy().to_string()], &["csv"])
}

async fn run(command: Command, config: &AppConfig) -> Result<()> {
    match command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let store = open_store(config).await?;
            let broker = broker(config);
            if broker.is_none() {
                tracing::warn!("⚠️ Serving without Kite: broker routes will return errors");
            }
            let storage = LocalStorage::new(&config.storage.data_dir);
            let state = AppState::new(store, broker, storage);
            app::serve(state, &bind).await
        }
        Command::ImportCsv { file } => {
            ensure_csv(&file)?;
            let broker = require_broker(config)?;
            let reader = std::fs::File::open(&file)?;
            tracing::info!("📁 Importing GTT orders from {}", file.display());

            let outcomes = csv_sync::import_orders(broker.as_ref(), reader).await?;
            for outcome in &outcomes {
                match &outcome.error {
                    Some(error) => println!("❌ {}: {}", outcome.tradingsymbol, error),
                    None => println!(
                        "✅ {}: {:?} (trigger {})",
                        outcome.tradingsymbol,
                        outcome.action,
                        outcome.trigger_id.unwrap_or_default()
                    ),
                }
            }
            let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
            println!(
                "📊 {} rows: {} succeeded, {} failed",
                outcomes.len(),
                outcomes.len() - failed,
                failed
            );
            Ok(())
        }
        Command::ExportCsv { file } => {
            ensure_csv(&file)?;
            let broker = require_broker(config)?;
            let gtts = broker.gtts().await?;
            let writer = std::fs::File::create(&file)?;
            let rows = csv_sync::write_export(&gtts, writer)?;
            println!("✅ Exported {} GTT legs to {}", rows, file.display());
            Ok(())
        }
        Command::Sync => {
            let store = open_store(config).await?;
            let service = GttService::new(store, Some(require_broker(config)?));
            let report = service.sync_with_broker().await?;
            println!(
                "✅ Checked {} orders: reset {:?}, {} conflicts",
                report.checked,
                report.reset,
                report.conflicts.len()
            );
            for conflict in &report.conflicts {
                println!("⚠️ {}", conflict);
            }
            Ok(())
        }
        Command::LoadSymbols { file } => {
            ensure_csv(&file)?;
            let store = open_store(config).await?;
            let reader = std::fs::File::open(&file)?;
            let loaded = csv_sync::load_symbol_reference(&store, reader).await?;
            println!("✅ Loaded {} symbols from {}", loaded, file.display());
            Ok(())
        }
        Command::CheckKite => {
            let profile = require_broker(config)?.profile().await?;
            println!(
                "✅ Kite connected as {} ({})",
                profile.user_id,
                profile.user_name.as_deref().unwrap_or("unknown")
            );
            Ok(())
        }
    }
}
