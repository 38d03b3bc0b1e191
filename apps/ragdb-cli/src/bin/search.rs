use std::env;

use ragdb_core::config::Config;
use ragdb_core::types::{BackendConfig, IndexingConfig, SearchMode, SearchRequest};
use ragdb_ingest::{default_provider, embed_all};
use ragdb_store::AdapterRegistry;

fn parse_mode(s: &str) -> anyhow::Result<SearchMode> {
    match s {
        "vector" => Ok(SearchMode::Vector),
        "fulltext" | "full-text" | "text" => Ok(SearchMode::FullText),
        "hybrid" => Ok(SearchMode::Hybrid),
        other => anyhow::bail!("unknown search mode '{other}' (vector, fulltext, hybrid)"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load()?;
    let args: Vec<String> = env::args().skip(1).collect();

    let mut query_parts: Vec<String> = Vec::new();
    let mut mode: Option<SearchMode> = None;
    let mut k: Option<usize> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--mode" | "-m" => {
                let Some(value) = args.get(i + 1) else {
                    anyhow::bail!("--mode requires a value");
                };
                mode = Some(parse_mode(value)?);
                i += 1;
            }
            "--limit" | "-k" => {
                let Some(value) = args.get(i + 1) else {
                    anyhow::bail!("--limit requires a number");
                };
                k = Some(value.parse()?);
                i += 1;
            }
            other => query_parts.push(other.to_string()),
        }
        i += 1;
    }

    if query_parts.is_empty() {
        eprintln!("Usage: ragdb-search <query> [--mode vector|fulltext|hybrid] [--limit N]");
        std::process::exit(1);
    }
    let query = query_parts.join(" ");

    let mode = match mode {
        Some(m) => m,
        None => parse_mode(&config.get::<String>("search.mode").unwrap_or_else(|_| "vector".to_string()))?,
    };
    let k = k.unwrap_or_else(|| config.get("search.limit").unwrap_or(10));

    let indexing: IndexingConfig = config.get("indexing")?;
    let backend: BackendConfig = config.get("backend")?;
    if backend.id != indexing.vector_store_config_id {
        return Err(ragdb_core::Error::ConfigNotFound {
            kind: "backend",
            id: indexing.vector_store_config_id.clone(),
        }
        .into());
    }

    let registry = AdapterRegistry::default();
    let adapter = registry.get_or_create(&indexing, &backend).await?;

    let vector = if matches!(mode, SearchMode::Vector | SearchMode::Hybrid) {
        let provider = default_provider(backend.dim);
        let mut vectors = embed_all(provider.as_ref(), &[query.clone()], 1, 1).await?;
        Some(vectors.remove(0))
    } else {
        None
    };

    let request = SearchRequest {
        text: query.clone(),
        vector,
        k,
        mode,
    };
    let hits = adapter.search(&request).await?;

    if hits.is_empty() {
        println!("No results for '{query}'");
    } else {
        println!("Top {} results for '{query}':", hits.len());
        for (rank, hit) in hits.iter().enumerate() {
            println!("{:2}. {hit}", rank + 1);
        }
    }

    registry.close_all().await?;
    Ok(())
}
