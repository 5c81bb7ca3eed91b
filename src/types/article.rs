use serde::{Deserialize, Deserializer, Serialize};

/// A research article as returned by the query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(
        default,
        alias = "citation_count",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub citations: Option<String>,
    #[serde(
        rename = "abstract",
        alias = "snippet",
        alias = "description",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub abstract_text: Option<String>,
}

impl Article {
    /// Synthetic article shown in place of results when the request failed.
    pub fn error(message: &str) -> Self {
        Self {
            title: "Error".to_string(),
            url: "#".to_string(),
            source: None,
            year: None,
            citations: None,
            abstract_text: Some(message.to_string()),
        }
    }
}

/// The structured line emitted by the query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub query: String,
    pub articles: Vec<Article>,
    #[serde(default)]
    pub total_results: u64,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts a string, an integer or a float and keeps it as text.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn sample(title: &str, url: &str, source: &str, year: &str, citations: &str, abstract_text: &str) -> Article {
    Article {
        title: title.to_string(),
        url: url.to_string(),
        source: Some(source.to_string()),
        year: Some(year.to_string()),
        citations: Some(citations.to_string()),
        abstract_text: Some(abstract_text.to_string()),
    }
}

/// Demo result set substituted when the response stream carries no parseable
/// JSON line.
pub fn fallback_articles() -> Vec<Article> {
    vec![
        sample(
            "Deep Learning: A Comprehensive Review of Modern Neural Network Architectures",
            "https://example.com/deep-learning-review",
            "Nature Machine Intelligence",
            "2024",
            "1,247",
            "This comprehensive review examines the evolution of neural network architectures from traditional multilayer perceptrons to modern transformer-based models, analyzing their applications in computer vision, natural language processing, and reinforcement learning. The study provides insights into architectural innovations, training methodologies, and future research directions in the field of deep learning.",
        ),
        sample(
            "Ensemble Methods in Machine Learning: Boosting, Bagging, and Beyond",
            "https://example.com/ensemble-methods",
            "Journal of Machine Learning Research",
            "2023",
            "892",
            "An in-depth analysis of ensemble learning techniques including boosting, bagging, and stacking methods. This research explores how combining multiple models can improve prediction accuracy and robustness, with practical applications across various domains such as healthcare, finance, and autonomous systems.",
        ),
        sample(
            "Reinforcement Learning for Autonomous Decision Making",
            "https://example.com/reinforcement-learning",
            "Science Robotics",
            "2023",
            "567",
            "This study investigates reinforcement learning algorithms for autonomous decision-making systems. The research demonstrates how RL agents can learn complex behaviors through trial and error, with applications in robotics, game playing, and autonomous vehicles.",
        ),
        sample(
            "Natural Language Processing: Advances in Transformer Architecture",
            "https://example.com/nlp-transformers",
            "Computational Linguistics",
            "2024",
            "743",
            "Recent advances in transformer-based architectures for natural language processing tasks. The research examines attention mechanisms, pre-training strategies, and fine-tuning approaches that have revolutionized the field of NLP.",
        ),
        sample(
            "Computer Vision: Deep Learning Approaches to Image Recognition",
            "https://example.com/computer-vision",
            "IEEE Transactions on Pattern Analysis",
            "2023",
            "1,089",
            "A comprehensive survey of deep learning approaches in computer vision, covering convolutional neural networks, attention mechanisms, and vision transformers. The study analyzes performance improvements and challenges in image classification, object detection, and semantic segmentation.",
        ),
    ]
}
