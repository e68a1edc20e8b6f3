//! CLI command implementations

use depscan_analyzer::{Analyzer, DemoSize};
use depscan_core::{Settings, SnapshotCache};
use depscan_server::{DepscanServer, ServerConfig};
use std::path::PathBuf;

/// Run `work` against a fresh analyzer on the blocking pool, then shut the
/// analyzer down.
async fn with_analyzer<T, F>(settings: Settings, work: F) -> anyhow::Result<T>
where
    F: FnOnce(&Analyzer) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let analyzer = Analyzer::new(&settings)?;
        let result = work(&analyzer);
        analyzer.shutdown();
        result
    })
    .await?
}

pub async fn serve(settings: Settings, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let config = ServerConfig {
        host: host.unwrap_or_else(|| settings.host.clone()),
        port: port.unwrap_or(settings.port),
    };
    tracing::info!("Starting depscan server on {}:{}", config.host, config.port);
    tracing::info!("Repositories: {}", settings.repository_directory.display());

    let analyzer = tokio::task::spawn_blocking(move || Analyzer::new(&settings)).await??;
    DepscanServer::new(analyzer, config).start().await
}

pub async fn analyse(settings: Settings, path: PathBuf, version: Option<String>) -> anyhow::Result<()> {
    tracing::info!("Analysing repository: {}", path.display());

    let report = with_analyzer(settings, move |analyzer| {
        Ok(analyzer.analyse(&path, version.as_deref())?)
    })
    .await?;

    println!(
        "{} @ {}: {} files, {} vertices, {} edges in {} ms",
        report.repository,
        report.version,
        report.stats.files,
        report.vertices,
        report.edges,
        report.stats.elapsed_ms
    );
    println!("Snapshot: {}", report.snapshot.display());
    Ok(())
}

pub async fn analyse_all(settings: Settings) -> anyhow::Result<()> {
    let outcomes = with_analyzer(settings, |analyzer| Ok(analyzer.analyse_all()?)).await?;

    for outcome in &outcomes {
        match (&outcome.report, &outcome.error) {
            (Some(report), _) => println!(
                "ok      {} @ {}: {} edges",
                outcome.repository, report.version, report.edges
            ),
            (None, Some(error)) => println!("failed  {}: {}", outcome.repository, error),
            (None, None) => {}
        }
    }

    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} repositories failed", failed, outcomes.len());
    }
    Ok(())
}

pub async fn query(settings: Settings, repo: String, version: String) -> anyhow::Result<()> {
    let edges = with_analyzer(settings, move |analyzer| Ok(analyzer.query(&repo, &version)?)).await?;

    for edge in &edges {
        println!("{} -> {} ({})", edge.source, edge.target, edge.kind);
    }
    tracing::info!("{} edges", edges.len());
    Ok(())
}

pub async fn demo(settings: Settings, size: &str) -> anyhow::Result<()> {
    let size: DemoSize = size.parse()?;
    let dot = with_analyzer(settings, move |analyzer| Ok(analyzer.visualize_demo(size)?)).await?;
    print!("{}", dot);
    Ok(())
}

pub fn clear(settings: &Settings) -> anyhow::Result<()> {
    let cache = SnapshotCache::new(settings.analysis_directory.clone());
    tracing::info!("Clearing snapshots in: {}", cache.dir().display());

    cache.clear()?;

    tracing::info!("Cache cleared");
    Ok(())
}
