//! Invalidate cached results after a data change

use ribbon_core::error::Result;
use ribbon_core::{InvalidationEvent, PipelineProcessor, RibbonConfig, UserId};

/// Handle the invalidate command
pub async fn handle(config: RibbonConfig, user: String, event: String) -> Result<()> {
    let event: InvalidationEvent = event.parse()?;
    let processor = PipelineProcessor::from_config(config).await?;

    let report = processor
        .trigger_invalidation(event, &UserId::new(user))
        .await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
