mod cli;
mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use crawl_core::{DetailResult, ListSource};
use crawl_engine::{ArtifactStore, Pipeline, PipelineReport, ReqwestFetcher, SelectorExtractor};
use engine_logging::engine_info;

use crate::cli::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    engine_logging::initialize(args.log_destination(), args.log_level());

    let config = args.resolve_config().context("invalid configuration")?;
    engine_info!(
        "Crawling {} category {} pages {}-{} into {:?}",
        config.base_url,
        config.category_id,
        config.start_page,
        config.end_page,
        config.output_dir
    );

    let fetcher = ReqwestFetcher::new(config.fetch_settings()).context("building HTTP client")?;
    let extractor =
        SelectorExtractor::new(&config.selectors).context("compiling extraction selectors")?;
    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        Arc::new(extractor),
        ArtifactStore::new(config.output_dir.clone()),
        config.pipeline_settings(),
    );

    let report = pipeline.run().await.context("crawl failed")?;
    for line in summary_lines(&report) {
        println!("{line}");
    }
    Ok(())
}

fn summary_lines(report: &PipelineReport) -> Vec<String> {
    let summary = &report.summary;
    let source = match summary.list_source {
        Some(ListSource::Loaded) => "loaded from previous run",
        Some(ListSource::Crawled) | None => "crawled",
    };
    let mut lines = vec![format!(
        "List: {} items ({}, {} duplicates removed, {} raw)",
        summary.items, source, summary.duplicates_removed, summary.raw_items
    )];
    if report.pages_failed > 0 {
        lines.push(format!("Listing pages failed: {}", report.pages_failed));
    }
    lines.push(match summary.detail {
        Some(DetailResult::Crawled { succeeded, failed }) => {
            format!("Detail: {succeeded} succeeded, {failed} failed")
        }
        Some(DetailResult::Skipped) | None => "Detail: up to date, skipped".to_string(),
    });
    lines.push(format!("List artifact: {}", report.list_path.display()));
    lines.push(format!("Detail artifact: {}", report.detail_path.display()));
    lines
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crawl_core::{PipelineSummary, Stage};

    use super::*;

    #[test]
    fn summary_reports_counts_and_paths() {
        let report = PipelineReport {
            summary: PipelineSummary {
                stage: Stage::Done,
                list_source: Some(ListSource::Crawled),
                raw_items: 12,
                duplicates_removed: 2,
                items: 10,
                detail: Some(DetailResult::Crawled {
                    succeeded: 9,
                    failed: 1,
                }),
            },
            pages_failed: 1,
            list_path: PathBuf::from("out/result.json"),
            detail_path: PathBuf::from("out/detail_result.json"),
        };

        assert_eq!(
            summary_lines(&report),
            vec![
                "List: 10 items (crawled, 2 duplicates removed, 12 raw)".to_string(),
                "Listing pages failed: 1".to_string(),
                "Detail: 9 succeeded, 1 failed".to_string(),
                "List artifact: out/result.json".to_string(),
                "Detail artifact: out/detail_result.json".to_string(),
            ]
        );
    }
}
