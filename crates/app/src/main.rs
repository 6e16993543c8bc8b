use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use lecture_search_core::{
    build_prompt, keywordize, make_chunks, rechunk_resource, ChunkingOptions, HashedNgramEmbedder,
    HybridRanker, MemoryIndex, OllamaClient, RetrievalOptions, TextEmbedder,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "lecture-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Target chunk length in characters.
    #[arg(long, default_value = "1400")]
    max_chars: usize,

    /// Characters of overlap between consecutive chunks.
    #[arg(long, default_value = "150")]
    overlap_chars: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk one extracted-text file and print the pieces.
    Chunk {
        /// Path to a plain-text file (extracted lecture material).
        #[arg(long)]
        file: String,
    },
    /// Load a folder of extracted-text files and answer a question with
    /// hybrid retrieval.
    Ask {
        /// Folder holding .txt/.md files of extracted lecture material.
        #[arg(long)]
        folder: String,
        /// The question to retrieve context for.
        #[arg(long)]
        question: String,
        /// Result cap for the merged hit list.
        #[arg(long, default_value = "6")]
        limit: usize,
        /// Weight on the lexical backend's ranks.
        #[arg(long, default_value = "0.45")]
        w_lexical: f64,
        /// Weight on the semantic backend's ranks.
        #[arg(long, default_value = "0.55")]
        w_semantic: f64,
        /// Generate a markdown answer through Ollama from the top hits.
        #[arg(long, default_value_t = false)]
        answer: bool,
        /// Ollama base URL, used only with --answer.
        #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
        ollama_url: String,
    },
}

fn discover_text_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_text = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("md"));

        if is_text {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let chunking = ChunkingOptions {
        max_chars: cli.max_chars,
        overlap_chars: cli.overlap_chars,
        ..ChunkingOptions::default()
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "lecture-search boot"
    );

    match cli.command {
        Command::Chunk { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {file}"))?;
            let chunks = make_chunks(&text, &chunking)?;

            if chunks.is_empty() {
                println!("no chunks (file is empty after normalization)");
                return Ok(());
            }

            for (index, (page_ref, chunk)) in chunks.iter().enumerate() {
                let reference = page_ref.as_deref().unwrap_or("-");
                println!(
                    "#{:<3} [{}] {} chars\n{}\n",
                    index + 1,
                    reference,
                    chunk.chars().count(),
                    chunk
                );
            }
            println!("{} chunks", chunks.len());
        }
        Command::Ask {
            folder,
            question,
            limit,
            w_lexical,
            w_semantic,
            answer,
            ollama_url,
        } => {
            let files = discover_text_files(Path::new(&folder));
            if files.is_empty() {
                anyhow::bail!("no .txt or .md files found in {folder}");
            }

            let index = Arc::new(MemoryIndex::new("unknown"));
            let embedder = HashedNgramEmbedder::default();
            let session_id = Uuid::new_v4();

            for path in &files {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let resource_id = Uuid::new_v4();
                let filename = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or("unknown")
                    .to_string();
                index.register_resource(resource_id, &filename);

                let report = rechunk_resource(
                    index.as_ref(),
                    Some(&embedder),
                    session_id,
                    resource_id,
                    &text,
                    &chunking,
                )
                .await?;
                info!(
                    file = %filename,
                    chunks = report.chunks_written,
                    "ingested resource"
                );
            }

            let options = RetrievalOptions {
                limit,
                w_lexical,
                w_semantic,
                ..RetrievalOptions::default()
            };
            let ranker = HybridRanker::with_options(index.clone(), index.clone(), options);

            let query = keywordize(&question);
            let query_vector = embedder.embed(&question).await?;
            let results = ranker.hybrid_search(&query, &query_vector).await?;

            if let Some(backend) = results.degraded {
                warn!(%backend, "results are partial, one backend was unavailable");
            }

            if results.hits.is_empty() {
                println!("no matching chunks");
                return Ok(());
            }

            for (position, hit) in results.hits.iter().enumerate() {
                let reference = hit.page_ref.as_deref().unwrap_or("-");
                let snippet: String = hit.text.chars().take(160).collect();
                println!(
                    "#{:<2} {:.4} {:9} {} [{}]\n    {}",
                    position + 1,
                    hit.rank,
                    format!("{:?}", hit.provenance).to_lowercase(),
                    hit.filename,
                    reference,
                    snippet
                );
            }

            if answer {
                let prompt = build_prompt(&question, &results.hits);
                let client = OllamaClient::new(&ollama_url)?;
                let markdown = client.generate(&prompt).await?;
                println!("\n{markdown}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::discover_text_files;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn discovery_is_recursive_and_filters_extensions() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.txt")).and_then(|mut file| file.write_all(b"alpha"))?;
        File::create(nested.join("b.md")).and_then(|mut file| file.write_all(b"beta"))?;
        File::create(base.join("c.pdf")).and_then(|mut file| file.write_all(b"%PDF"))?;

        let files = discover_text_files(base);
        assert_eq!(files.len(), 2);
        Ok(())
    }
}
