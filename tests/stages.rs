//! Integration tests for the post-download stages on real directories.

use std::path::PathBuf;

use pdfetch_core::{Deduplicator, Renamer, Validator};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn pdf(marker: &str) -> Vec<u8> {
    let mut body = format!("%PDF-1.4\n% {marker}\n").into_bytes();
    body.resize(256, b' ');
    body
}

fn pdf_with_title(title: &str) -> Vec<u8> {
    let mut body = format!("%PDF-1.4\n1 0 obj\n<< /Title ({title}) >>\nendobj\n").into_bytes();
    body.resize(256, b' ');
    body
}

fn pdf_with_title_and_marker(title: &str, marker: &str) -> Vec<u8> {
    let mut body =
        format!("%PDF-1.4\n% {marker}\n1 0 obj\n<< /Title ({title}) >>\nendobj\n").into_bytes();
    body.resize(256, b' ');
    body
}

fn dir_names(temp: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_suffix_prepass_then_content_pass() {
    let temp = TempDir::new().unwrap();
    // Suffix duplicates of an existing base name
    write(&temp, "handbook.pdf", &pdf("handbook"));
    write(&temp, "handbook_1.pdf", &pdf("handbook"));
    write(&temp, "handbook_2.pdf", &pdf("handbook"));
    // Same content under two unrelated names
    write(&temp, "mirror-a.pdf", &pdf("shared"));
    write(&temp, "mirror-b.pdf", &pdf("shared"));

    let dedup = Deduplicator::new(temp.path().to_path_buf(), 4);
    let suffix_removed = dedup.remove_suffix_duplicates().await.unwrap();
    let content_removed = dedup.remove_content_duplicates().await.unwrap();

    assert_eq!(suffix_removed, 2);
    assert_eq!(content_removed, 1);
    assert_eq!(dir_names(&temp), vec!["handbook.pdf", "mirror-a.pdf"]);
}

#[tokio::test]
async fn test_dedup_passes_are_idempotent() {
    let temp = TempDir::new().unwrap();
    write(&temp, "paper.pdf", &pdf("paper"));
    write(&temp, "paper_3.pdf", &pdf("paper"));
    write(&temp, "copy-one.pdf", &pdf("dupe"));
    write(&temp, "copy-two.pdf", &pdf("dupe"));

    let dedup = Deduplicator::new(temp.path().to_path_buf(), 4);
    dedup.remove_suffix_duplicates().await.unwrap();
    dedup.remove_content_duplicates().await.unwrap();
    let after_first = dir_names(&temp);

    assert_eq!(dedup.remove_suffix_duplicates().await.unwrap(), 0);
    assert_eq!(dedup.remove_content_duplicates().await.unwrap(), 0);
    assert_eq!(dir_names(&temp), after_first);
}

#[tokio::test]
async fn test_validation_prunes_only_invalid_files() {
    let temp = TempDir::new().unwrap();
    write(&temp, "real-document.pdf", &pdf("real"));
    write(&temp, "stub.pdf", b"%PDF"); // under the size floor
    let mut html = b"<html><body>404</body></html>".to_vec();
    html.resize(400, b' ');
    write(&temp, "error-page.pdf", &html);

    let dedup = Deduplicator::new(temp.path().to_path_buf(), 4);
    let report = Validator::default()
        .prune_invalid(dedup.list_files().await.unwrap(), 4)
        .await
        .unwrap();

    assert_eq!(report.valid, 1);
    assert_eq!(report.removed_too_small, 1);
    assert_eq!(report.removed_bad_signature, 1);
    assert_eq!(dir_names(&temp), vec!["real-document.pdf"]);
}

#[tokio::test]
async fn test_rename_pass_over_mixed_directory() {
    let temp = TempDir::new().unwrap();
    write(&temp, "000001.pdf", &pdf_with_title("Graph Algorithms In Practice"));
    write(&temp, "well-named-survey.pdf", &pdf_with_title("Ignored Title Here"));
    write(&temp, "000002.pdf", &pdf("no title inside"));

    let dedup = Deduplicator::new(temp.path().to_path_buf(), 4);
    let report = Renamer::default()
        .rename_all(dedup.list_files().await.unwrap(), 4)
        .await
        .unwrap();

    assert_eq!(report.renamed, 1);
    assert_eq!(report.kept, 1);
    assert_eq!(report.no_title, 1);
    assert_eq!(
        dir_names(&temp),
        vec![
            "000002.pdf",
            "Graph_Algorithms_In_Practice.pdf",
            "well-named-survey.pdf"
        ]
    );
}

#[tokio::test]
async fn test_rename_collisions_never_overwrite() {
    let temp = TempDir::new().unwrap();
    write(&temp, "Shared_Title_Name.pdf", &pdf("already here"));
    write(&temp, "000003.pdf", &pdf_with_title("Shared Title Name"));
    write(&temp, "000004.pdf", &pdf_with_title("Shared Title Name"));

    let dedup = Deduplicator::new(temp.path().to_path_buf(), 4);
    let report = Renamer::default()
        .rename_all(dedup.list_files().await.unwrap(), 1)
        .await
        .unwrap();

    assert_eq!(report.renamed, 2);
    assert_eq!(
        dir_names(&temp),
        vec![
            "Shared_Title_Name.pdf",
            "Shared_Title_Name_2.pdf",
            "Shared_Title_Name_3.pdf"
        ]
    );
}

#[tokio::test]
async fn test_concurrent_renames_to_same_title_lose_no_files() {
    let temp = TempDir::new().unwrap();
    for i in 0..16 {
        // Distinct content, identical embedded title, low-information names
        write(
            &temp,
            &format!("{:06}.pdf", 100 + i),
            &pdf_with_title_and_marker("Shared Race Title Here", &format!("variant {i}")),
        );
    }

    let dedup = Deduplicator::new(temp.path().to_path_buf(), 8);
    let report = Renamer::default()
        .rename_all(dedup.list_files().await.unwrap(), 8)
        .await
        .unwrap();

    assert_eq!(report.renamed, 16);
    let names = dir_names(&temp);
    assert_eq!(names.len(), 16, "every file must survive the rename pass");
    for name in &names {
        assert!(
            name.starts_with("Shared_Race_Title_Here"),
            "unexpected name {name}"
        );
    }
}

#[tokio::test]
async fn test_filename_pass_seeds_first_seen_survivors() {
    let temp = TempDir::new().unwrap();
    write(&temp, "alpha.pdf", &pdf("alpha"));
    write(&temp, "beta.pdf", &pdf("beta"));

    let dedup = Deduplicator::new(temp.path().to_path_buf(), 4);
    let files = dedup.list_files().await.unwrap();
    let survivors = Deduplicator::surviving_filenames(&files);

    assert_eq!(survivors, vec!["alpha.pdf".to_string(), "beta.pdf".to_string()]);
}
