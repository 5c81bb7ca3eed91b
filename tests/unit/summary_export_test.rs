//! Unit tests for summary generation and export.

use research_assistant::services::export::{
    layout_document, lines_per_page, slugify, ExportFormat, Exporter,
};
use research_assistant::services::summary::{generate_summary, render_html};
use research_assistant::types::article::{fallback_articles, Article};
use rstest::rstest;
use tempfile::TempDir;

fn article() -> Article {
    fallback_articles().remove(0)
}

#[test]
fn summary_fills_template_from_article_fields() {
    let a = article();
    let summary = generate_summary(&a);
    assert!(summary.starts_with(&format!("Research Summary: {}", a.title)));
    assert!(summary.contains(&format!("Abstract: {}", a.abstract_text.as_deref().unwrap())));
    assert!(summary.contains("• Published in Nature Machine Intelligence"));
    assert!(summary.contains("• Published in 2024"));
    assert!(summary.contains("• Cited by 1,247 researchers"));
    assert!(summary.contains(&format!("• This research explores {}", a.title.to_lowercase())));
    assert!(summary.ends_with(
        "Recommendations: Further research in this area could explore additional aspects and applications."
    ));
}

#[test]
fn html_document_carries_all_sections() {
    let a = article();
    let html = render_html(&a, &generate_summary(&a));
    for heading in ["Research Article Summary", "Abstract", "Publication Details", "Summary"] {
        assert!(html.contains(heading), "missing {}", heading);
    }
    assert!(html.contains("Cited by 1,247"));
}

#[rstest]
#[case("Deep Learning: A Review", "deep_learning__a_review")]
#[case("RNNs (2019)", "rnns__2019_")]
#[case("Café au lait", "caf__au_lait")]
#[case("", "")]
fn slug_matches_file_naming(#[case] title: &str, #[case] slug: &str) {
    assert_eq!(slugify(title), slug);
}

#[test]
fn layout_keeps_lines_within_width() {
    let a = article();
    let lines = layout_document(&a, &generate_summary(&a), 60).unwrap();
    assert!(lines.iter().all(|l| l.chars().count() <= 60));
    assert!(lines.iter().any(|l| l == "Publication Details"));
}

#[test]
fn long_publication_details_are_wrapped() {
    let mut a = article();
    a.source = Some("Proceedings of the International Conference on Very Long Venue Names in Machine Learning".to_string());
    a.citations = Some("123456789012345678901234567890".to_string());
    let lines = layout_document(&a, &generate_summary(&a), 30).unwrap();
    assert!(lines.iter().all(|l| l.chars().count() <= 30));
    assert!(lines.iter().any(|l| l.starts_with("Source: Proceedings")));
    assert!(lines.iter().any(|l| l.contains("Venue Names")));
}

#[test]
fn export_writes_pdf_named_after_title() {
    let dir = TempDir::new().unwrap();
    let exporter = Exporter::new(dir.path(), 90);
    let a = article();
    let file = exporter.export(&a, &generate_summary(&a)).unwrap();

    assert_eq!(file.format, ExportFormat::Pdf);
    assert_eq!(
        file.path,
        dir.path().join(format!("{}_summary.pdf", slugify(&a.title)))
    );
    let bytes = std::fs::read(&file.path).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(file.pages >= 1);
}

#[test]
fn long_summaries_span_several_pages() {
    let dir = TempDir::new().unwrap();
    let exporter = Exporter::new(dir.path(), 90);
    let a = article();
    let long_summary = vec!["A line of findings."; lines_per_page() * 2].join("\n");
    let file = exporter.export(&a, &long_summary).unwrap();
    assert_eq!(file.format, ExportFormat::Pdf);
    assert!(file.pages >= 3);

    let text = String::from_utf8_lossy(&std::fs::read(&file.path).unwrap()).to_string();
    assert!(text.contains(&format!("/Count {}", file.pages)));
}

#[test]
fn layout_failure_falls_back_to_text() {
    let dir = TempDir::new().unwrap();
    let exporter = Exporter::new(dir.path(), 5);
    let a = article();
    let summary = generate_summary(&a);
    let file = exporter.export(&a, &summary).unwrap();

    assert_eq!(file.format, ExportFormat::Text);
    assert_eq!(
        file.path,
        dir.path().join(format!("{}_summary.txt", slugify(&a.title)))
    );
    assert_eq!(std::fs::read_to_string(&file.path).unwrap(), summary);
}

#[test]
fn export_creates_missing_output_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("exports").join("today");
    let exporter = Exporter::new(&nested, 90);
    let a = Article::error("x");
    let file = exporter.export(&a, "summary").unwrap();
    assert!(file.path.starts_with(&nested));
    assert!(file.path.exists());
}
