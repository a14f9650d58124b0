//! The research → write → grade answer chain.
//!
//! Each stage is a pure function of the question and upstream artifacts.
//! Empty retrieval short-circuits the whole chain to a fixed refusal
//! without touching the model, so "no data" never turns into a fabricated
//! answer.

use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use ragpipe_shared::{RagpipeError, Result};

use crate::llm::CompletionClient;
use crate::retrieval::{Retriever, Snippet};
use crate::stage::{Artifacts, Stage, StageConfig, StageSpec, keys, required_input, run_stages};

// ---------------------------------------------------------------------------
// Fixed chain vocabulary
// ---------------------------------------------------------------------------

/// Research artifact when retrieval finds nothing relevant.
pub const NOT_RELATED_MARKER: &str =
    "The answer can be incorrect or not related to the question";

/// Writing artifact when research signaled "not related".
pub const NOT_FOUND_MESSAGE: &str =
    "Unfortunately, I could not find any relevant information on this topic.";

/// Final answer for ungrounded or unanswerable questions.
pub const REFUSAL_MESSAGE: &str =
    "Sorry, I cannot find relevant information from the database.";

/// Final answer when a stage's underlying call failed.
pub const FAILURE_MESSAGE: &str =
    "Sorry, something went wrong while answering your question. Please try again.";

/// Upper bound on sentences in the written answer.
const MAX_SENTENCES: usize = 4;

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// Wire shape of a chain response: `{ "result": { "output": ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    /// Result wrapper.
    pub result: ChainOutput,
}

/// Inner result payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainOutput {
    /// The final answer text.
    pub output: String,
}

impl ChainResponse {
    fn new(output: String) -> Self {
        Self {
            result: ChainOutput { output },
        }
    }
}

// ---------------------------------------------------------------------------
// Research stage
// ---------------------------------------------------------------------------

struct ResearchStage {
    spec: StageSpec,
    config: StageConfig,
    retriever: Arc<dyn Retriever>,
    client: Arc<dyn CompletionClient>,
    k: usize,
}

#[async_trait]
impl Stage for ResearchStage {
    fn spec(&self) -> &StageSpec {
        &self.spec
    }

    async fn run(&self, artifacts: &Artifacts) -> Result<String> {
        let question = required_input(artifacts, &self.spec, keys::QUESTION)?;

        let snippets = self
            .retriever
            .search(question, self.k)
            .await
            .map_err(|e| RagpipeError::stage(&self.spec.name, format!("retrieval failed: {e}")))?;

        if snippets.is_empty() {
            return Ok(NOT_RELATED_MARKER.to_string());
        }

        let user_prompt = format!(
            "Answer the question using only the retrieved context below. \
             Provide a clear, concise, factually accurate answer. \
             Do not make up an answer; if the context does not cover the \
             question, say '{NOT_RELATED_MARKER}'.\n\n\
             ## Retrieved context\n{}\n\n## Question\n{question}",
            format_snippets(&snippets),
        );

        self.client
            .complete(&self.config.system_prompt(), &user_prompt)
            .await
    }
}

fn format_snippets(snippets: &[Snippet]) -> String {
    snippets
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. [{}] {}", i + 1, s.source, s.text))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Writing stage
// ---------------------------------------------------------------------------

struct WriteStage {
    spec: StageSpec,
    config: StageConfig,
    client: Arc<dyn CompletionClient>,
}

#[async_trait]
impl Stage for WriteStage {
    fn spec(&self) -> &StageSpec {
        &self.spec
    }

    async fn run(&self, artifacts: &Artifacts) -> Result<String> {
        let question = required_input(artifacts, &self.spec, keys::QUESTION)?;
        let research = required_input(artifacts, &self.spec, keys::RESEARCH_ANSWER)?;

        if research == NOT_RELATED_MARKER {
            return Ok(NOT_FOUND_MESSAGE.to_string());
        }

        let user_prompt = format!(
            "Rewrite the verified research answer below as engaging, \
             well-structured content of at most {MAX_SENTENCES} sentences, \
             in a friendly tone, describing each step of the method or \
             solution. Use only the information provided.\n\n\
             ## Research answer\n{research}\n\n## Question\n{question}",
        );

        let written = self
            .client
            .complete(&self.config.system_prompt(), &user_prompt)
            .await?;

        Ok(limit_sentences(&written, MAX_SENTENCES))
    }
}

/// Truncate text to its first `max` sentences.
///
/// The sentence bound is a contract of the writing stage, so it is enforced
/// here rather than trusted to the model.
fn limit_sentences(text: &str, max: usize) -> String {
    static SENTENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^.!?]*[.!?]+\s*").expect("valid regex"));

    let mut out = String::new();
    let mut consumed = 0;
    let mut count = 0;

    for m in SENTENCE_RE.find_iter(text) {
        if count == max {
            break;
        }
        out.push_str(m.as_str());
        consumed = m.end();
        count += 1;
    }

    // Keep a trailing fragment with no terminator if the bound allows it.
    if count < max && consumed < text.len() {
        out.push_str(&text[consumed..]);
    }

    out.trim().to_string()
}

// ---------------------------------------------------------------------------
// Grading stage
// ---------------------------------------------------------------------------

struct GradeStage {
    spec: StageSpec,
    config: StageConfig,
    client: Arc<dyn CompletionClient>,
}

#[async_trait]
impl Stage for GradeStage {
    fn spec(&self) -> &StageSpec {
        &self.spec
    }

    async fn run(&self, artifacts: &Artifacts) -> Result<String> {
        let research = required_input(artifacts, &self.spec, keys::RESEARCH_ANSWER)?;
        let written = required_input(artifacts, &self.spec, keys::WRITTEN_CONTENT)?;

        if written == NOT_FOUND_MESSAGE {
            return Ok(REFUSAL_MESSAGE.to_string());
        }

        let user_prompt = format!(
            "Decide whether the answer below is grounded in the retrieved \
             facts.\n\n## Facts\n{research}\n\n## Answer\n{written}\n\n\
             Respond with 'yes' if the answer is supported by the facts, \
             otherwise 'no'. Do not provide any preamble or explanation.",
        );

        let verdict = self
            .client
            .complete(&self.config.system_prompt(), &user_prompt)
            .await?;

        if is_grounded_verdict(&verdict) {
            Ok(written.to_string())
        } else {
            Ok(REFUSAL_MESSAGE.to_string())
        }
    }
}

fn is_grounded_verdict(verdict: &str) -> bool {
    verdict.trim().to_lowercase().starts_with("yes")
}

// ---------------------------------------------------------------------------
// AnswerChain
// ---------------------------------------------------------------------------

/// The fixed research → write → grade chain.
pub struct AnswerChain {
    stages: Vec<Box<dyn Stage>>,
}

impl AnswerChain {
    /// Build the chain over a completion client and a retriever.
    ///
    /// `k` is how many snippets the research stage retrieves per question.
    pub fn new(
        client: Arc<dyn CompletionClient>,
        retriever: Arc<dyn Retriever>,
        k: usize,
    ) -> Result<Self> {
        let research_config = StageConfig::new(
            "research",
            "Research Agent",
            "Search the knowledge base and answer strictly from the retrieved context.",
        )?;
        let write_config = StageConfig::new(
            "write",
            "Content Writer",
            "Turn verified research into clear, engaging answers for the reader.",
        )?;
        let grade_config = StageConfig::new(
            "grade",
            "Grounding Grader",
            "Judge whether an answer is supported by the retrieved facts.",
        )?;

        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(ResearchStage {
                spec: StageSpec::new("research", &[keys::QUESTION], keys::RESEARCH_ANSWER),
                config: research_config,
                retriever,
                client: Arc::clone(&client),
                k,
            }),
            Box::new(WriteStage {
                spec: StageSpec::new(
                    "write",
                    &[keys::QUESTION, keys::RESEARCH_ANSWER],
                    keys::WRITTEN_CONTENT,
                ),
                config: write_config,
                client: Arc::clone(&client),
            }),
            Box::new(GradeStage {
                spec: StageSpec::new(
                    "grade",
                    &[keys::RESEARCH_ANSWER, keys::WRITTEN_CONTENT],
                    keys::GRADED_OUTPUT,
                ),
                config: grade_config,
                client,
            }),
        ];

        Ok(Self { stages })
    }

    /// Run the chain, propagating stage failures to the caller.
    #[instrument(skip_all)]
    pub async fn run(&self, question: &str) -> Result<String> {
        let mut artifacts = Artifacts::new();
        artifacts.insert(keys::QUESTION.to_string(), question.to_string());

        run_stages(&self.stages, &mut artifacts).await?;

        artifacts
            .remove(keys::GRADED_OUTPUT)
            .ok_or_else(|| RagpipeError::stage("grade", "no graded output produced"))
    }

    /// Run the chain, converting any stage failure into the generic failure
    /// answer. This is the boundary external callers go through; provider
    /// errors never reach them.
    pub async fn answer(&self, question: &str) -> ChainResponse {
        match self.run(question).await {
            Ok(output) => ChainResponse::new(output),
            Err(e) => {
                warn!(error = %e, "answer chain failed");
                ChainResponse::new(FAILURE_MESSAGE.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
