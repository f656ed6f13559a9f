//! Run the pipeline over a JSON record file

use ribbon_core::error::{Result, RibbonError};
use ribbon_core::suggestion::{
    AdaptiveSuggestionSelector, CooldownStore, InMemoryCooldownStore, SqliteCooldownStore,
};
use ribbon_core::{
    DomainRecord, PipelineProcessor, PipelineRequest, RibbonConfig, RibbonView, SystemClock,
    TracingTelemetry, TriggerReason, UserId,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::parse_domain;

/// Read records from a file, or stdin for `-`
fn read_records(path: &Path) -> Result<Vec<DomainRecord>> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&raw)?)
}

/// Handle the process command
pub async fn handle(
    config: RibbonConfig,
    user: String,
    domain: String,
    records: PathBuf,
    degrade: bool,
    suggest: bool,
) -> Result<()> {
    let domain = parse_domain(&domain)?;
    let user_id = UserId::new(user);
    if user_id.as_str().is_empty() {
        return Err(RibbonError::InvalidInput("user must not be empty".to_string()));
    }

    let payload = read_records(&records)?;
    debug!("Loaded {} records from {}", payload.len(), records.display());

    let processor = PipelineProcessor::from_config(config.clone()).await?;
    let request = PipelineRequest::new(user_id.clone(), domain, payload, TriggerReason::Manual);
    let result = if degrade {
        processor.process_or_degrade(request).await?
    } else {
        processor.process(request).await?
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    match RibbonView::from_metadata(result.quality_metadata.as_ref()) {
        Some(view) => eprintln!("ribbon: {}", view),
        None => eprintln!("ribbon: hidden (too few records to classify)"),
    }

    if suggest {
        let store: Arc<dyn CooldownStore> = match &config.database_path {
            Some(path) => Arc::new(SqliteCooldownStore::open(path).await?),
            None => Arc::new(InMemoryCooldownStore::new()),
        };
        let selector = AdaptiveSuggestionSelector::new(
            store,
            Arc::new(TracingTelemetry),
            Arc::new(SystemClock),
            config.suggestion_cooldown(),
        );
        match selector.select_suggestion(&user_id, &result, domain).await {
            Some(suggestion) => println!("{}", serde_json::to_string_pretty(&suggestion)?),
            None => eprintln!("suggestion: none"),
        }
    }

    Ok(())
}
