//! Keyword-based evaluation of grounded answers.
//!
//! Each reference question carries the keywords a good answer should
//! mention. Scores are descriptive only: model output varies between runs.

use crate::rag::{ChatResponse, RagChain};
use serde::Serialize;
use tracing::{error, info};

/// Characters of each answer kept in the report.
const ANSWER_EXCERPT_CHARS: usize = 300;

/// A reference question.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EvaluationCase {
    pub question: &'static str,
    pub expected_keywords: &'static [&'static str],
    pub category: &'static str,
}

/// The fixed reference set.
pub const EVALUATION_DATASET: &[EvaluationCase] = &[
    EvaluationCase {
        question: "What major regulation changes are coming in 2026?",
        expected_keywords: &["power unit", "active aerodynamics", "2026"],
        category: "regulations",
    },
    EvaluationCase {
        question: "Is DRS being removed from Formula 1?",
        expected_keywords: &["drs", "2026", "active aero"],
        category: "technical",
    },
    EvaluationCase {
        question: "Which new teams are joining the F1 grid?",
        expected_keywords: &["cadillac", "audi"],
        category: "teams",
    },
    EvaluationCase {
        question: "What is Audi's involvement in F1 from 2026?",
        expected_keywords: &["audi", "sauber", "2026"],
        category: "teams",
    },
];

/// Fraction of `keywords` found in `answer`, ignoring case. An empty keyword
/// list scores 1.0.
pub fn keyword_score<S: AsRef<str>>(answer: &str, keywords: &[S]) -> f64 {
    if keywords.is_empty() {
        return 1.0;
    }
    let answer = answer.to_lowercase();
    let hits = keywords
        .iter()
        .filter(|kw| answer.contains(&kw.as_ref().to_lowercase()))
        .count();
    hits as f64 / keywords.len() as f64
}

/// Outcome for one reference question.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionResult {
    pub question: String,
    pub category: String,
    pub answer_excerpt: String,
    pub keyword_score: f64,
    pub sources_found: usize,
    pub avg_similarity: f32,
    pub retrieval_ms: f64,
    pub generation_ms: f64,
    pub total_ms: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuestionResult {
    fn from_response(case: &EvaluationCase, response: &ChatResponse) -> Self {
        let score = if response.success {
            keyword_score(&response.answer, case.expected_keywords)
        } else {
            0.0
        };

        Self {
            question: case.question.to_string(),
            category: case.category.to_string(),
            answer_excerpt: response.answer.chars().take(ANSWER_EXCERPT_CHARS).collect(),
            keyword_score: round(score, 3),
            sources_found: response.sources.len(),
            avg_similarity: response.metrics.avg_similarity_score,
            retrieval_ms: response.metrics.retrieval_latency_ms.unwrap_or(0.0),
            generation_ms: response.metrics.generation_latency_ms.unwrap_or(0.0),
            total_ms: response.metrics.total_latency_ms,
            success: response.success,
            error: response.error.as_ref().map(|e| e.message.clone()),
        }
    }
}

/// Aggregate evaluation figures. Averages are taken over every question,
/// failed ones included.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub total_questions: usize,
    pub successful: usize,
    pub failed: usize,
    pub avg_keyword_score: f64,
    pub avg_retrieval_ms: f64,
    pub avg_generation_ms: f64,
    pub avg_sources_per_query: f64,
    pub results: Vec<QuestionResult>,
}

impl EvaluationReport {
    pub fn from_results(results: Vec<QuestionResult>) -> Self {
        let n = results.len().max(1) as f64;
        let successful = results.iter().filter(|r| r.success).count();
        let sum = |f: fn(&QuestionResult) -> f64| results.iter().map(f).sum::<f64>() / n;

        Self {
            total_questions: results.len(),
            successful,
            failed: results.len() - successful,
            avg_keyword_score: round(sum(|r| r.keyword_score), 3),
            avg_retrieval_ms: round(sum(|r| r.retrieval_ms), 2),
            avg_generation_ms: round(sum(|r| r.generation_ms), 2),
            avg_sources_per_query: round(sum(|r| r.sources_found as f64), 2),
            results,
        }
    }
}

fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Run reference questions through the chain in rag mode, one at a time.
pub async fn run_evaluation(chain: &RagChain, cases: &[EvaluationCase]) -> EvaluationReport {
    let mut results = Vec::with_capacity(cases.len());

    for (i, case) in cases.iter().enumerate() {
        info!("Evaluating {}/{}: {}", i + 1, cases.len(), case.question);
        let response = chain.rag(case.question, chain.default_top_k(), None).await;
        if let Some(err) = &response.error {
            error!(category = case.category, "Evaluation failed for {}: {}", case.question, err.message);
        }
        results.push(QuestionResult::from_response(case, &response));
    }

    let report = EvaluationReport::from_results(results);
    info!(
        "Evaluation complete: {}/{} successful, avg keyword score {:.3}",
        report.successful, report.total_questions, report.avg_keyword_score
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalSettings;
    use crate::embedding::Embedder;
    use crate::error::{PitwallError, Result, Stage};
    use crate::llm::{Generation, LlmProvider};
    use crate::vector_store::{MemoryVectorStore, VectorRecord, VectorStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_keyword_score() {
        let answer = "From 2026 the Power Unit rules change and Active Aerodynamics arrive.";
        assert_eq!(keyword_score(answer, &["power unit", "active aerodynamics", "2026"]), 1.0);
        assert!((keyword_score("Cadillac joins.", &["cadillac", "audi"]) - 0.5).abs() < 1e-9);
        assert_eq!(keyword_score("Nothing relevant.", &["sauber"]), 0.0);
    }

    #[test]
    fn test_keyword_score_empty_list() {
        let none: &[&str] = &[];
        assert_eq!(keyword_score("anything", none), 1.0);
        assert_eq!(keyword_score("", none), 1.0);
    }

    #[test]
    fn test_dataset_is_well_formed() {
        assert_eq!(EVALUATION_DATASET.len(), 4);
        for case in EVALUATION_DATASET {
            assert!(!case.expected_keywords.is_empty());
            assert!(case.expected_keywords.iter().all(|k| *k == k.to_lowercase()));
        }
    }

    #[test]
    fn test_report_averages_over_all_questions() {
        let result = |score: f64, sources: usize, success: bool| QuestionResult {
            question: "q".to_string(),
            category: "teams".to_string(),
            answer_excerpt: String::new(),
            keyword_score: score,
            sources_found: sources,
            avg_similarity: 0.8,
            retrieval_ms: 10.0,
            generation_ms: 100.0,
            total_ms: 110.0,
            success,
            error: None,
        };

        let report = EvaluationReport::from_results(vec![
            result(1.0, 3, true),
            result(0.5, 1, true),
            result(0.0, 0, false),
        ]);
        assert_eq!(report.total_questions, 3);
        assert_eq!(report.successful, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.avg_keyword_score, 0.5);
        assert_eq!(report.avg_sources_per_query, 1.33);
        assert_eq!(report.avg_retrieval_ms, 10.0);
    }

    #[test]
    fn test_empty_report() {
        let report = EvaluationReport::from_results(Vec::new());
        assert_eq!(report.total_questions, 0);
        assert_eq!(report.avg_keyword_score, 0.0);
    }

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model(&self) -> &str {
            "unit"
        }
    }

    /// Answers every prompt with its own retrieved context titles.
    struct EchoLlm {
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for EchoLlm {
        async fn generate(&self, prompt: &str) -> Result<Generation> {
            if self.fail {
                return Err(PitwallError::unavailable(Stage::Generation, "down"));
            }
            Ok(Generation {
                text: prompt.to_string(),
                tokens_used: 1,
                latency: Duration::ZERO,
            })
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    async fn store() -> Arc<MemoryVectorStore> {
        let store = Arc::new(MemoryVectorStore::new());
        let metadata = json!({"title": "Audi F1", "text": "Audi takes over Sauber for 2026."});
        store
            .upsert(
                "wikipedia",
                &[VectorRecord {
                    id: "audi".to_string(),
                    values: vec![1.0, 0.0],
                    metadata: metadata.as_object().unwrap().clone(),
                }],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_run_evaluation_scores_answers() {
        let chain = RagChain::new(
            Arc::new(UnitEmbedder),
            store().await,
            Arc::new(EchoLlm { fail: false }),
            RetrievalSettings::default(),
        );
        let cases = &EVALUATION_DATASET[3..];

        let report = run_evaluation(&chain, cases).await;

        assert_eq!(report.total_questions, 1);
        assert_eq!(report.successful, 1);
        let result = &report.results[0];
        assert_eq!(result.keyword_score, 1.0);
        assert_eq!(result.sources_found, 1);
        assert!(result.answer_excerpt.chars().count() <= ANSWER_EXCERPT_CHARS);
    }

    #[tokio::test]
    async fn test_run_evaluation_records_failures() {
        let chain = RagChain::new(
            Arc::new(UnitEmbedder),
            store().await,
            Arc::new(EchoLlm { fail: true }),
            RetrievalSettings::default(),
        );

        let report = run_evaluation(&chain, EVALUATION_DATASET).await;

        assert_eq!(report.failed, EVALUATION_DATASET.len());
        assert_eq!(report.avg_keyword_score, 0.0);
        assert!(report.results.iter().all(|r| r.error.is_some()));
    }
}
