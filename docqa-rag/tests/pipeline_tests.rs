//! End-to-end pipeline tests with in-process embedding and chat backends.

use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docqa_rag::{
    ChatMessage, ChatModel, EmbeddingProvider, FolderLoader, GENERATION_FALLBACK_ANSWER,
    RagConfig, RagError, RagPipeline, Role,
};

const TOPICS: [&str; 4] = ["warranty", "battery", "shipping", "refund"];

/// Embeds by counting topic words. Optionally fails on every call.
struct TopicEmbedder {
    fail: bool,
}

#[async_trait]
impl EmbeddingProvider for TopicEmbedder {
    fn name(&self) -> &str {
        "topic"
    }

    async fn embed(&self, text: &str) -> docqa_rag::Result<Vec<f32>> {
        if self.fail {
            return Err(RagError::Embedding {
                provider: "topic".into(),
                message: "connection refused".into(),
            });
        }
        let lower = text.to_lowercase();
        Ok(TOPICS.iter().map(|t| lower.matches(t).count() as f32).collect())
    }
}

/// Records the prompts it receives and echoes the first context line.
#[derive(Default)]
struct RecordingChat {
    fail: bool,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

#[async_trait]
impl ChatModel for RecordingChat {
    fn name(&self) -> &str {
        "recording"
    }

    async fn chat(&self, messages: &[ChatMessage]) -> docqa_rag::Result<String> {
        self.seen.lock().unwrap().push(messages.to_vec());
        if self.fail {
            return Err(RagError::Generation {
                model: "recording".into(),
                message: "model not loaded".into(),
            });
        }
        Ok("grounded answer".to_string())
    }
}

fn write_corpus(dir: &std::path::Path) {
    fs::write(
        dir.join("a_warranty.txt"),
        "The warranty lasts two years. The warranty covers defects.",
    )
    .unwrap();
    fs::write(dir.join("b_battery.md"), "Charge the battery fully. Battery life is ten hours.")
        .unwrap();
    fs::write(dir.join("c_shipping.txt"), "Shipping takes five days.").unwrap();
    fs::write(dir.join("d_image.png"), [0u8, 1, 2, 3]).unwrap();
    fs::create_dir(dir.join("nested")).unwrap();
    fs::write(dir.join("nested").join("refund.txt"), "Refund policy is hidden here.").unwrap();
}

fn pipeline(dir: &std::path::Path, embed_fail: bool, chat: Arc<RecordingChat>) -> RagPipeline {
    let config = RagConfig::builder().source_folder(dir).top_k(2).build().unwrap();
    RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(TopicEmbedder { fail: embed_fail }))
        .chat_model(chat)
        .build()
        .unwrap()
}

#[test]
fn loader_skips_unsupported_files_and_subfolders() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());

    let report = FolderLoader::new().load(dir.path()).unwrap();
    let ids: Vec<&str> = report.documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a_warranty.txt", "b_battery.md", "c_shipping.txt"]);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0].error, RagError::UnsupportedDocument { .. }));
}

#[test]
fn corrupt_pdf_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.pdf"), b"this is not a pdf").unwrap();
    fs::write(dir.path().join("notes.txt"), "still readable").unwrap();

    let report = FolderLoader::new().load(dir.path()).unwrap();
    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.documents[0].id, "notes.txt");
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0].error, RagError::DocumentParse { .. }));
}

/// Helvetica with a standard encoding, the font every fixture page uses as `/F1`.
const HELVETICA: &str =
    "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>";

/// Assemble a PDF with one page per content stream and a valid xref table.
fn pdf_document(font: &str, pages: &[&str]) -> Vec<u8> {
    let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", 4 + 2 * i)).collect();
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()),
        font.to_string(),
    ];
    for content in pages {
        let contents_id = objects.len() + 2;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {contents_id} 0 R >>"
        ));
        objects.push(format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()));
    }

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{object}\nendobj\n", i + 1).as_bytes());
    }
    let xref = pdf.len();
    let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        table.push_str(&format!("{offset:010} 00000 n \n"));
    }
    table.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.extend_from_slice(table.as_bytes());
    pdf
}

#[test]
fn pdf_pages_are_concatenated_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = pdf_document(
        HELVETICA,
        &["BT /F1 12 Tf 72 720 Td (ALPHA) Tj ET", "BT /F1 12 Tf 72 720 Td (OMEGA) Tj ET"],
    );
    fs::write(dir.path().join("manual.pdf"), pdf).unwrap();

    let report = FolderLoader::new().load(dir.path()).unwrap();
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.documents.len(), 1);

    let document = &report.documents[0];
    assert_eq!(document.id, "manual.pdf");
    let first = document.text.find("ALPHA").expect("first page text");
    let second = document.text.find("OMEGA").expect("second page text");
    assert!(first < second);
}

#[test]
fn pdf_with_broken_fonts_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    // Page refers to a font its resources never define.
    fs::write(
        dir.path().join("a_undefined_font.pdf"),
        pdf_document(HELVETICA, &["BT /F9 12 Tf 72 720 Td (LOST) Tj ET"]),
    )
    .unwrap();
    // Font dictionary without a /Subtype.
    fs::write(
        dir.path().join("b_untyped_font.pdf"),
        pdf_document(
            "<< /Type /Font /BaseFont /Helvetica >>",
            &["BT /F1 12 Tf 72 720 Td (LOST) Tj ET"],
        ),
    )
    .unwrap();
    fs::write(dir.path().join("ok.txt"), "still readable").unwrap();

    let report = FolderLoader::new().load(dir.path()).unwrap();
    let ids: Vec<&str> = report.documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["ok.txt"]);
    assert_eq!(report.failures.len(), 2);
    for failure in &report.failures {
        assert!(matches!(failure.error, RagError::DocumentParse { .. }), "{failure:?}");
    }
}

#[test]
fn loader_ignores_hidden_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".DS_Store"), [0u8, 0, 0, 1]).unwrap();
    fs::write(dir.path().join(".notes.txt.swp"), "swap").unwrap();
    fs::write(dir.path().join(".draft.txt"), "not ready").unwrap();
    fs::write(dir.path().join("notes.txt"), "visible").unwrap();

    let report = FolderLoader::new().load(dir.path()).unwrap();
    let ids: Vec<&str> = report.documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["notes.txt"]);
    assert!(report.failures.is_empty());
}

#[test]
fn missing_folder_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = FolderLoader::new().load(dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, RagError::Io(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn answers_from_most_similar_chunks() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let chat = Arc::new(RecordingChat::default());
    let pipeline = pipeline(dir.path(), false, chat.clone());

    let (kb, report) = pipeline.index_source_folder().await.unwrap();
    assert_eq!(report.chunks_indexed, 3);

    let answer = pipeline.answer(&kb, "How long is the warranty?").await.unwrap();
    assert_eq!(answer.text, "grounded answer");
    assert_eq!(answer.sources.len(), 2);
    assert_eq!(answer.sources[0].chunk.document_id, "a_warranty.txt");

    let seen = chat.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0][0].role, Role::System);
    assert!(seen[0][1].content.contains("The warranty lasts two years."));
    assert!(seen[0][1].content.contains("Question: How long is the warranty?"));
}

#[tokio::test]
async fn empty_folder_is_an_empty_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), false, Arc::new(RecordingChat::default()));

    let err = pipeline.index_source_folder().await.unwrap_err();
    assert!(matches!(err, RagError::EmptyCorpus { .. }));
}

#[tokio::test]
async fn all_embeddings_failing_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let pipeline = pipeline(dir.path(), true, Arc::new(RecordingChat::default()));

    let err = pipeline.index_source_folder().await.unwrap_err();
    assert!(matches!(err, RagError::EmptyEmbeddingSet { chunk_count: 3 }));
}

#[tokio::test]
async fn generation_failure_becomes_fallback_answer() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let chat = Arc::new(RecordingChat { fail: true, ..Default::default() });
    let pipeline = pipeline(dir.path(), false, chat.clone());

    let (kb, _) = pipeline.index_source_folder().await.unwrap();
    let first = pipeline.answer(&kb, "battery life?").await.unwrap();
    let second = pipeline.answer(&kb, "shipping time?").await.unwrap();

    assert_eq!(first.text, GENERATION_FALLBACK_ANSWER);
    assert_eq!(second.text, GENERATION_FALLBACK_ANSWER);
    assert_eq!(chat.seen.lock().unwrap().len(), 2);
}

#[test]
fn config_validation() {
    assert!(RagConfig::builder().build().is_ok());
    assert!(matches!(
        RagConfig::builder().chunk_size(100).chunk_overlap(100).build(),
        Err(RagError::Config(_))
    ));
    assert!(RagConfig::builder().top_k(0).build().is_err());
    assert!(RagConfig::builder().chunk_size(0).chunk_overlap(0).build().is_err());
    assert!(RagConfig::builder().generation_model("  ").build().is_err());

    let defaults = RagConfig::default();
    assert_eq!(defaults.chunk_size, 800);
    assert_eq!(defaults.chunk_overlap, 150);
    assert_eq!(defaults.top_k, 5);
    assert_eq!(defaults.embedding_model, "nomic-embed-text");
}

#[test]
fn pipeline_builder_rejects_invalid_config() {
    let build = |config: RagConfig| {
        RagPipeline::builder()
            .config(config)
            .embedding_provider(Arc::new(TopicEmbedder { fail: false }))
            .chat_model(Arc::new(RecordingChat::default()))
            .build()
    };

    let no_results = RagConfig { top_k: 0, ..RagConfig::default() };
    assert!(matches!(build(no_results), Err(RagError::Config(_))));

    let overlap = RagConfig { chunk_size: 100, chunk_overlap: 100, ..RagConfig::default() };
    assert!(matches!(build(overlap), Err(RagError::Config(_))));

    assert!(build(RagConfig::default()).is_ok());
}

#[test]
fn builder_requires_backends() {
    let err = RagPipeline::builder().build().err().unwrap();
    assert!(matches!(err, RagError::Config(_)));
}
