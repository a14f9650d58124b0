//! Three-stage answer chain: research, write, grade.
//!
//! A user question flows through strictly sequential stages, each producing
//! a text artifact consumed read-only by the next. Research grounds the
//! answer in retrieved snippets, writing rewrites it for the reader, and
//! grading replaces unsupported answers with a fixed refusal. The final
//! answer goes through a deterministic post-processor.

pub mod chain;
pub mod llm;
pub mod postprocess;
pub mod retrieval;
pub mod stage;

pub use chain::{
    AnswerChain, ChainOutput, ChainResponse, FAILURE_MESSAGE, NOT_FOUND_MESSAGE,
    NOT_RELATED_MARKER, REFUSAL_MESSAGE,
};
pub use llm::{CompletionClient, OpenAiCompatClient};
pub use postprocess::clean;
pub use retrieval::{DatasetRetriever, Retriever, Snippet};
pub use stage::{Artifacts, Stage, StageConfig, StageSpec, run_stages};
