//! Process entry point: load the ledger, then report or serve.

use crate::analysis::{build_report, SymbolSelection};
use crate::api::{self, AppState};
use crate::config::{Config, RunMode};
use crate::datasource::{load_ledger, CsvPriceSource, Ledger, PriceTable};
use crate::domain::Symbol;
use anyhow::Context;
use std::net::SocketAddr;
use tracing::info;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let ledger = load_ledger(
        &config.tradebook_dir,
        &config.holdings_file,
        config.aliases_file.as_deref(),
        config.valuation_date,
    )
    .with_context(|| format!("loading ledger from {}", config.tradebook_dir.display()))?;

    match config.run_mode.report_mode() {
        Some(mode) => {
            let selection = match (&config.run_mode, &config.target_symbol) {
                (RunMode::TradeHistory, Some(symbol)) => SymbolSelection::Only(Symbol::new(symbol)),
                _ => SymbolSelection::All,
            };
            let report = build_report(&ledger.with_holdings(), &ledger.warnings, mode, &selection);
            print!("{}", report);
            Ok(())
        }
        None => serve(config, ledger).await,
    }
}

async fn serve(config: Config, ledger: Ledger) -> anyhow::Result<()> {
    let prices = match &config.prices_file {
        Some(path) => {
            let source = CsvPriceSource::from_path(path)
                .with_context(|| format!("loading prices from {}", path.display()))?;
            PriceTable::load(&source, &ledger.symbols()).await
        }
        None => PriceTable::new(),
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let app = api::create_router(AppState::new(config, ledger, prices));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
