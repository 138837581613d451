use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use searchsync::{
    config, logging,
    settings::IndexId,
    sync::{SyncApi, SyncService},
};

#[derive(Parser)]
#[command(
    name = "reindex",
    about = "Drive full reindex jobs and index configuration from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild one index page by page until every matching item is submitted.
    Run {
        #[arg(long)]
        index: IndexId,
        #[arg(long)]
        batch_size: Option<usize>,
        /// Resume from this offset instead of clearing the index.
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Push provider settings for one index, or for every index when omitted.
    Configure {
        #[arg(long)]
        index: Option<IndexId>,
    },
    /// Print the loaded index definitions.
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing();

    let cli = Cli::parse();
    let service = SyncService::from_config(config::get_config())
        .context("Failed to initialize sync service")?;

    match cli.command {
        Command::Run {
            index,
            batch_size,
            offset,
        } => run_index(&service, index, batch_size, offset).await,
        Command::Configure { index } => configure(&service, index).await,
        Command::List => {
            for definition in service.indexes() {
                println!(
                    "{}\t{}\t{}",
                    definition.id,
                    definition.name,
                    definition.content_types.join(",")
                );
            }
            Ok(())
        }
    }
}

async fn run_index(
    service: &SyncService,
    index: IndexId,
    batch_size: Option<usize>,
    mut offset: usize,
) -> Result<()> {
    loop {
        let report = service
            .run_index_batch(index, batch_size, Some(offset))
            .await
            .with_context(|| format!("Reindex of index {index} stopped at offset {offset}"))?;
        println!(
            "offset {:>6}  indexed {:>4}  {:>6.2}% of {}",
            report.offset,
            report.indexed_ids.len(),
            report.completion_percent,
            report.total
        );
        if report.is_complete() {
            break;
        }
        if report.processed == 0 {
            bail!("Reindex made no progress at offset {offset}");
        }
        offset = report.next_offset();
    }
    let metrics = service.metrics_snapshot();
    tracing::info!(
        index,
        upserted = metrics.documents_upserted,
        skipped = metrics.items_skipped,
        pages = metrics.batch_pages,
        "Reindex complete"
    );
    Ok(())
}

async fn configure(service: &SyncService, index: Option<IndexId>) -> Result<()> {
    let targets: Vec<IndexId> = match index {
        Some(id) => vec![id],
        None => service.indexes().iter().map(|definition| definition.id).collect(),
    };
    for id in targets {
        let response = service
            .configure_index(id)
            .await
            .with_context(|| format!("Failed to configure index {id}"))?;
        println!("configured index {id} (tasks: {:?})", response.task_ids);
    }
    Ok(())
}
