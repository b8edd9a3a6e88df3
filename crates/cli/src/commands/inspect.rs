//! `inspect` command implementation.

use anyhow::{Context, Result};
use contracts::WorkUnitRecord;
use serde::Serialize;

use crate::cli::InspectArgs;

#[derive(Serialize)]
struct StageSummary<'a> {
    tag: &'a str,
    version: u32,
    cache: bool,
}

#[derive(Serialize)]
struct InspectOutput<'a> {
    query: serde_json::Value,
    stages: Vec<StageSummary<'a>>,
}

/// Execute the `inspect` command
pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let record = workunit::load_record(&args.artifact)
        .with_context(|| format!("Failed to read {}", args.artifact.display()))?;
    let mirror = record
        .query
        .to_mirror_json()
        .context("Failed to render query")?;

    if args.json {
        let output = InspectOutput {
            query: serde_json::from_str(&mirror).context("Failed to render query")?,
            stages: stage_summaries(&record),
        };
        let json = serde_json::to_string_pretty(&output).context("Failed to serialize output")?;
        println!("{}", json);
    } else {
        println!("Work unit: {}", args.artifact.display());
        println!("\nQuery:\n{}", mirror);
        println!("\nStages ({}):", record.pipeline.len());
        for stage in stage_summaries(&record) {
            let cache = if stage.cache { "cached" } else { "not cached" };
            println!("  - {} v{} ({})", stage.tag, stage.version, cache);
        }
    }
    Ok(())
}

fn stage_summaries(record: &WorkUnitRecord) -> Vec<StageSummary<'_>> {
    record
        .pipeline
        .stages
        .iter()
        .map(|s| StageSummary {
            tag: s.tag.as_str(),
            version: s.version,
            cache: s.cache,
        })
        .collect()
}
