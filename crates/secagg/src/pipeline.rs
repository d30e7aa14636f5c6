//! The enrichment pipeline: load, accumulate, reveal, enrich, write.
use tracing::{info, instrument};

use crate::aggregate::secure_interaction_count_and_sum;
use crate::config::EnrichArgs;
use crate::dataset::{enrich, EnrichedTable, Table};
use crate::errors::PipelineError;
use crate::runtime::{Session, SessionConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichSummary {
    pub rows: usize,
    pub pairs: usize,
}

/// Compute the aggregates of `table` in a fresh session and attach them to its rows.
///
/// The session is shut down before returning, also if the computation failed.
#[instrument(skip_all, fields(rows = table.len()), err)]
pub async fn enrich_table(
    table: &Table,
    config: SessionConfig,
) -> Result<(EnrichedTable, EnrichSummary), PipelineError> {
    let session = Session::start(config).await?;
    let revealed = secure_interaction_count_and_sum(&session, table.pair_amounts()).await;
    let shutdown = session.shutdown().await;
    // report the computation error first
    let revealed = revealed?;
    shutdown?;

    let enriched = enrich(table, &revealed);
    let summary = EnrichSummary {
        rows: table.len(),
        pairs: revealed.len(),
    };
    Ok((enriched, summary))
}

/// Run the whole pipeline as configured by `args`.
#[instrument(skip_all, fields(input = %args.input.display()), err)]
pub async fn enrich_file(args: &EnrichArgs) -> Result<EnrichSummary, PipelineError> {
    let table = Table::read_path(&args.input, &args.columns())?;
    info!(rows = table.len(), "Loaded dataset");
    let (enriched, summary) = enrich_table(&table, args.session_config()).await?;
    enriched.write_path(&args.output)?;
    info!(
        output = %args.output.display(),
        rows = summary.rows,
        pairs = summary.pairs,
        "Wrote enriched dataset"
    );
    Ok(summary)
}
