use std::{env, fs::File, io, path::Path, sync::Arc};

use purchase_engine::{
    AppConfig, Engine, InMemoryCatalog, InMemoryLedger, JournalLedger,
    dlq::StdErrDlq,
    domain::{Catalog, Error, Ledger},
    ingestion::CsvReader,
    logging,
    notifier::{DispatchAdapter, HttpNotifierClient, InMemoryNotifier, NotifierClient},
    report,
    runner::Runner,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);

    let commands_path = args
        .next()
        .ok_or("usage: purchase_engine <commands.csv> [config.yaml]")?;
    let config = match args.next() {
        Some(path) => AppConfig::load(Path::new(&path))?,
        None => AppConfig::default(),
    };
    logging::init_logging(&config);

    let timeout = config.notifier.timeout();
    let client: Arc<dyn NotifierClient> = match &config.notifier.base_url {
        Some(url) => Arc::new(HttpNotifierClient::new(url, timeout)?),
        None => Arc::new(InMemoryNotifier::new()),
    };
    let notifier = DispatchAdapter::new(client, timeout);
    let catalog = InMemoryCatalog::from_items(config.catalog.clone());
    let file = File::open(Path::new(&commands_path))?;

    match &config.ledger_journal {
        Some(path) => {
            let engine = Engine::restore(JournalLedger::open(path)?, catalog, notifier)?;
            run(&engine, &config, file).await?;
        }
        None => {
            let engine = Engine::new(InMemoryLedger::new(), catalog, notifier);
            run(&engine, &config, file).await?;
        }
    }

    Ok(())
}

async fn run<L, C>(engine: &Engine<L, C>, config: &AppConfig, file: File) -> Result<(), Error>
where
    L: Ledger,
    C: Catalog,
{
    let mut ingestion = CsvReader::new(file);
    let mut runner = Runner::new(engine, config.deposit_limits, StdErrDlq::new());
    let summary = runner.process(&mut ingestion).await;
    tracing::info!(?summary, reported = runner.dlq().reported(), "Batch finished");

    let stdout = io::stdout();
    let accounts = engine.registry().all_accounts().await;
    report::write_accounts(&accounts, stdout.lock())?;
    println!();
    report::write_ledger(&engine.ledger().list_all()?, engine.registry(), stdout.lock())?;
    Ok(())
}
