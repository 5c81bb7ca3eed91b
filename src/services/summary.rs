//! Article summaries.
//!
//! Summaries are filled in from the article's own fields; there is no
//! analysis behind them. The HTML rendering is the styled document handed to
//! the exporter.

use crate::types::article::Article;

/// Builds the summary text for one article.
pub fn generate_summary(article: &Article) -> String {
    let abstract_text = article.abstract_text.as_deref().unwrap_or("No abstract available");
    let source = article.source.as_deref().unwrap_or("Unknown source");
    let year = match article.year.as_deref() {
        Some(year) => format!("Published in {}", year),
        None => "Publication year not specified".to_string(),
    };
    let citations = match article.citations.as_deref() {
        Some(count) => format!("Cited by {} researchers", count),
        None => "Citation count not available".to_string(),
    };

    format!(
        "Research Summary: {title}

Abstract: {abstract_text}

Key Findings:
• This research explores {title_lower}
• Published in {source}
• {year}
• {citations}

Methodology: The study employs advanced research methodologies to investigate the topic comprehensively.

Conclusions: This research provides valuable insights into the field and contributes to the existing body of knowledge.

Recommendations: Further research in this area could explore additional aspects and applications.",
        title = article.title,
        title_lower = article.title.to_lowercase(),
    )
}

/// Escapes text for inclusion in HTML element content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Renders the styled summary document.
pub fn render_html(article: &Article, summary: &str) -> String {
    let title = escape_html(&article.title);
    let abstract_text = escape_html(article.abstract_text.as_deref().unwrap_or("No abstract available"));
    let source = escape_html(article.source.as_deref().unwrap_or("Unknown source"));
    let year = escape_html(article.year.as_deref().unwrap_or("Not specified"));
    let citations = match article.citations.as_deref() {
        Some(c) => format!("Cited by {}", escape_html(c)),
        None => "Not available".to_string(),
    };
    let summary = escape_html(summary);

    format!(
        r##"<div style="padding: 20px; font-family: Arial, sans-serif;">
  <h1 style="color: #333; border-bottom: 2px solid #007bff; padding-bottom: 10px;">Research Article Summary</h1>
  <h2 style="color: #007bff; margin-top: 20px;">{title}</h2>
  <div style="margin: 20px 0; padding: 15px; background-color: #f8f9fa; border-left: 4px solid #007bff;">
    <h3 style="color: #555; margin-top: 0;">Abstract</h3>
    <p style="line-height: 1.6; color: #333;">{abstract_text}</p>
  </div>
  <div style="margin: 20px 0;">
    <h3 style="color: #555;">Publication Details</h3>
    <p><strong>Source:</strong> {source}</p>
    <p><strong>Year:</strong> {year}</p>
    <p><strong>Citations:</strong> {citations}</p>
  </div>
  <div style="margin: 20px 0; padding: 15px; background-color: #f8f9fa; border-radius: 5px;">
    <h3 style="color: #555; margin-top: 0;">Summary</h3>
    <pre style="white-space: pre-wrap; font-family: Arial, sans-serif; line-height: 1.6; color: #333;">{summary}</pre>
  </div>
</div>
"##
    )
}
