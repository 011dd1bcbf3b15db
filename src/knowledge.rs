//! Knowledge Corpus Loading
//!
//! Reads the knowledge directory into memory and prepares chunk texts for
//! embedding. Plain-text files may carry several independent entries
//! separated by `---`; PDFs are extracted to text first. A document that
//! fails to read is logged and skipped so one bad file never blocks the
//! rest of the corpus.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::chunker::{chunk, split_entries};
use crate::config::ChunkConfig;
use crate::error::{CoachError, CoachResult};

/// One loaded corpus document.
#[derive(Debug, Clone)]
pub struct KnowledgeDocument {
    /// File name the text came from, kept as chunk metadata.
    pub source: String,
    pub text: String,
}

/// One chunk ready for embedding, before its vector exists.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChunk {
    pub id: String,
    pub text: String,
    pub source: String,
}

/// Load every supported document under `dir`.
///
/// Supported extensions are `.txt`, `.md` and `.pdf`; anything else is
/// ignored.
/// A missing directory yields an empty corpus rather than an error, since
/// the engine must still answer (knowledge-free) coaching requests.
/// Results are ordered by file name so ingest runs are reproducible.
pub fn load_corpus(dir: &Path) -> CoachResult<Vec<KnowledgeDocument>> {
    if !dir.exists() {
        warn!(dir = %dir.display(), "knowledge directory does not exist, corpus is empty");
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| {
        CoachError::config(format!(
            "cannot read knowledge directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("txt") | Some("md") | Some("pdf")
            )
        })
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let source = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let text = match read_document(&path) {
            Ok(text) => text,
            Err(reason) => {
                warn!(source = %source, error = %reason, "skipping unreadable document");
                continue;
            }
        };

        if text.trim().is_empty() {
            debug!(source = %source, "skipping empty document");
            continue;
        }

        documents.push(KnowledgeDocument { source, text });
    }

    Ok(documents)
}

fn read_document(path: &Path) -> Result<String, String> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("pdf") => pdf_extract::extract_text(path).map_err(|e| e.to_string()),
        _ => std::fs::read_to_string(path).map_err(|e| e.to_string()),
    }
}

/// Split loaded documents into embeddable chunks with stable ids.
///
/// Each document is split into `---`-separated entries, each entry into
/// overlapping windows. The id is derived from the source name, the chunk's
/// position and a digest of its text, so re-ingesting an unchanged corpus
/// rewrites the same records.
pub fn prepare_chunks(
    documents: &[KnowledgeDocument],
    config: &ChunkConfig,
) -> Vec<PreparedChunk> {
    let mut prepared = Vec::new();
    for document in documents {
        let mut index = 0;
        for entry in split_entries(&document.text) {
            for text in chunk(&entry, config) {
                prepared.push(PreparedChunk {
                    id: chunk_id(&document.source, index, &text),
                    text,
                    source: document.source.clone(),
                });
                index += 1;
            }
        }
    }
    prepared
}

/// Longest stem prefix kept in a chunk id. The index and digest suffix are
/// never truncated, so ids stay unique however long the file name is.
const ID_STEM_CHARS: usize = 32;

fn chunk_id(source: &str, index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    let stem = source.rsplit_once('.').map(|(s, _)| s).unwrap_or(source);
    let stem: String = stem.chars().take(ID_STEM_CHARS).collect();
    format!("{}_chunk_{}_{}", stem, index, &digest[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(source: &str, text: &str) -> KnowledgeDocument {
        KnowledgeDocument {
            source: source.to_string(),
            text: text.to_string(),
        }
    }

    fn config() -> ChunkConfig {
        ChunkConfig {
            chunk_size: 20,
            chunk_overlap: 5,
        }
    }

    // =====================================================================
    // load_corpus tests
    // =====================================================================

    #[test]
    fn missing_directory_yields_empty_corpus() {
        let docs = load_corpus(Path::new("/nonexistent/knowledge")).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn loads_txt_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_second.txt"), "second doc").unwrap();
        std::fs::write(dir.path().join("a_first.txt"), "first doc").unwrap();
        let docs = load_corpus(dir.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source, "a_first.txt");
        assert_eq!(docs[0].text, "first doc");
        assert_eq!(docs[1].source, "b_second.txt");
    }

    #[test]
    fn unsupported_extensions_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.md"), "markdown notes").unwrap();
        std::fs::write(dir.path().join("guide.txt"), "keep me").unwrap();
        let docs = load_corpus(dir.path()).unwrap();
        let sources: Vec<&str> = docs.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["guide.txt", "notes.md"]);
    }

    #[test]
    fn blank_documents_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty.txt"), "   \n").unwrap();
        let docs = load_corpus(dir.path()).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn unreadable_pdf_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), "not really a pdf").unwrap();
        std::fs::write(dir.path().join("good.txt"), "survives").unwrap();
        let docs = load_corpus(dir.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "good.txt");
    }

    // =====================================================================
    // prepare_chunks tests
    // =====================================================================

    #[test]
    fn entries_chunk_independently() {
        let docs = vec![doc("guide.txt", "short entry one\n---\nshort entry two")];
        let chunks = prepare_chunks(&docs, &config());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "short entry one");
        assert_eq!(chunks[1].text, "short entry two");
        assert!(chunks.iter().all(|c| c.source == "guide.txt"));
    }

    #[test]
    fn long_entry_produces_multiple_chunks() {
        let text: String = std::iter::repeat('x').take(50).collect();
        let chunks = prepare_chunks(&[doc("long.txt", &text)], &config());
        assert!(chunks.len() > 1);
    }

    #[test]
    fn chunk_ids_are_stable_across_runs() {
        let docs = vec![doc("guide.txt", "stable entry")];
        let first = prepare_chunks(&docs, &config());
        let second = prepare_chunks(&docs, &config());
        assert_eq!(first, second);
    }

    #[test]
    fn chunk_ids_are_unique_within_a_corpus() {
        let docs = vec![
            doc("a.txt", "entry one\n---\nentry two"),
            doc("b.txt", "entry one"),
        ];
        let chunks = prepare_chunks(&docs, &config());
        let mut ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), chunks.len());
    }

    #[test]
    fn chunk_id_embeds_source_stem_and_index() {
        let chunks = prepare_chunks(&[doc("guide.txt", "entry")], &config());
        assert!(chunks[0].id.starts_with("guide_chunk_0_"));
        assert!(chunks[0].id.len() <= 64);
    }

    #[test]
    fn long_file_names_keep_chunk_ids_unique() {
        let name = format!("{}.txt", "x".repeat(80));
        let text: String = std::iter::repeat('y').take(60).collect();
        let chunks = prepare_chunks(&[doc(&name, &text)], &config());
        assert!(chunks.len() > 1);

        let mut ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), chunks.len());
        // The index and digest survive stem truncation.
        assert!(chunks[1].id.contains("_chunk_1_"));
    }
}
