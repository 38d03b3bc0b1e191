use std::{env, fs};

use indicatif::{ProgressBar, ProgressStyle};

use ragdb_core::config::Config;
use ragdb_core::types::{BackendConfig, IndexingConfig, Project};
use ragdb_ingest::IngestionLoader;
use ragdb_store::AdapterRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(project_path) = args.first() else {
        eprintln!("Usage: ragdb-index <project.json>");
        std::process::exit(1);
    };

    let project: Project = serde_json::from_str(&fs::read_to_string(project_path)?)?;
    let indexing: IndexingConfig = config.get("indexing")?;
    let backend: BackendConfig = config.get("backend")?;
    if backend.id != indexing.vector_store_config_id {
        return Err(ragdb_core::Error::ConfigNotFound {
            kind: "backend",
            id: indexing.vector_store_config_id.clone(),
        }
        .into());
    }

    println!("RAG Indexer\n===========");
    println!("Project:  {} ({} documents)", project.id, project.documents().len());
    println!("Pipeline: {}", indexing.id);
    println!("Backend:  {} ({:?}, table '{}')", backend.id, backend.kind, backend.table);

    let registry = AdapterRegistry::default();
    let adapter = registry.get_or_create(&indexing, &backend).await?;

    let pb = ProgressBar::new(project.documents().len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} docs {msg}")?
            .progress_chars("#>-"),
    );

    let mut indexed_docs = 0usize;
    let mut indexed_chunks = 0usize;
    for item in IngestionLoader::new(&project, &indexing) {
        let item = item?;
        pb.set_message(item.doc_id.clone());
        let records = item.into_records();
        indexed_chunks += records.len();
        adapter.upsert_chunks(&records).await?;
        indexed_docs += 1;
        pb.inc(1);
    }
    pb.finish_and_clear();

    adapter.optimize().await?;
    let total = adapter.count_records().await?;
    println!("Indexed {indexed_chunks} chunks from {indexed_docs} documents");
    println!("Backend '{}' now holds {total} records", adapter.backend_id());

    registry.close_all().await?;
    Ok(())
}
