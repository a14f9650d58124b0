//! Stage descriptors and the sequential runner.
//!
//! The chain is an explicit ordered list of stage descriptors, each naming
//! the artifacts it consumes and the one it produces. The runner walks the
//! list in order, verifying inputs before a stage starts, so the data
//! dependency between stages is structural rather than implied.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use ragpipe_shared::{RagpipeError, Result};

/// Artifact keys shared by the built-in stages.
pub mod keys {
    /// The incoming user question.
    pub const QUESTION: &str = "question";
    /// Output of the research stage.
    pub const RESEARCH_ANSWER: &str = "research_answer";
    /// Output of the writing stage.
    pub const WRITTEN_CONTENT: &str = "written_content";
    /// Output of the grading stage; the chain's final answer.
    pub const GRADED_OUTPUT: &str = "graded_output";
}

/// Text artifacts produced so far, keyed by artifact name.
pub type Artifacts = HashMap<String, String>;

// ---------------------------------------------------------------------------
// StageSpec
// ---------------------------------------------------------------------------

/// Descriptor for one stage: name, consumed artifacts, produced artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// Stage name, used in errors and tracing.
    pub name: String,
    /// Artifact keys that must exist before this stage runs.
    pub inputs: Vec<String>,
    /// Artifact key this stage produces.
    pub output: String,
}

impl StageSpec {
    /// Build a descriptor.
    pub fn new(
        name: impl Into<String>,
        inputs: &[&str],
        output: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            inputs: inputs.iter().map(|s| (*s).to_string()).collect(),
            output: output.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// StageConfig
// ---------------------------------------------------------------------------

/// Typed persona configuration for a model-backed stage.
///
/// Replaces loose role/goal strings: every field is validated at
/// construction so a misconfigured stage fails before any question runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageConfig {
    /// Stage name (matches the descriptor name).
    pub name: String,
    /// Persona the model adopts.
    pub role: String,
    /// What the stage is trying to achieve.
    pub goal: String,
}

impl StageConfig {
    /// Build a validated stage configuration.
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            name: name.into(),
            role: role.into(),
            goal: goal.into(),
        };

        for (field, value) in [
            ("name", &config.name),
            ("role", &config.role),
            ("goal", &config.goal),
        ] {
            if value.trim().is_empty() {
                return Err(RagpipeError::validation(format!(
                    "stage config field '{field}' must not be empty"
                )));
            }
        }

        Ok(config)
    }

    /// System prompt shared by all model-backed stages.
    pub fn system_prompt(&self) -> String {
        format!("You are the {}. {}", self.role, self.goal)
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// One executable stage of the chain.
#[async_trait]
pub trait Stage: Send + Sync {
    /// The stage's descriptor.
    fn spec(&self) -> &StageSpec;

    /// Produce this stage's artifact from the ones already available.
    async fn run(&self, artifacts: &Artifacts) -> Result<String>;
}

/// Execute stages strictly in order, threading artifacts through the map.
///
/// A stage only starts once every input it declares exists; a missing input
/// is a stage error, as is any stage failure, and the runner stops there.
pub async fn run_stages(stages: &[Box<dyn Stage>], artifacts: &mut Artifacts) -> Result<()> {
    for stage in stages {
        let spec = stage.spec();

        for input in &spec.inputs {
            if !artifacts.contains_key(input) {
                return Err(RagpipeError::stage(
                    &spec.name,
                    format!("missing input artifact '{input}'"),
                ));
            }
        }

        debug!(stage = %spec.name, "running stage");
        let output = stage.run(artifacts).await?;
        artifacts.insert(spec.output.clone(), output);
    }

    Ok(())
}

/// Fetch a declared input artifact.
///
/// The runner has already verified presence; this guards against a stage
/// reading a key it never declared.
pub(crate) fn required_input<'a>(
    artifacts: &'a Artifacts,
    spec: &StageSpec,
    key: &str,
) -> Result<&'a str> {
    artifacts.get(key).map(String::as_str).ok_or_else(|| {
        RagpipeError::stage(&spec.name, format!("undeclared input artifact '{key}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper {
        spec: StageSpec,
    }

    #[async_trait]
    impl Stage for Upper {
        fn spec(&self) -> &StageSpec {
            &self.spec
        }

        async fn run(&self, artifacts: &Artifacts) -> Result<String> {
            let input = required_input(artifacts, &self.spec, "in")?;
            Ok(input.to_uppercase())
        }
    }

    #[tokio::test]
    async fn runner_threads_artifacts_in_order() {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(Upper {
                spec: StageSpec::new("first", &["in"], "mid"),
            }),
            Box::new(Upper {
                spec: StageSpec::new("second", &["mid"], "out"),
            }),
        ];

        let mut artifacts = Artifacts::new();
        artifacts.insert("in".into(), "hello".into());
        run_stages(&stages, &mut artifacts).await.unwrap();

        assert_eq!(artifacts.get("mid").map(String::as_str), Some("HELLO"));
        assert_eq!(artifacts.get("out").map(String::as_str), Some("HELLO"));
    }

    #[tokio::test]
    async fn missing_input_fails_before_the_stage_runs() {
        let stages: Vec<Box<dyn Stage>> = vec![Box::new(Upper {
            spec: StageSpec::new("only", &["absent"], "out"),
        })];

        let mut artifacts = Artifacts::new();
        let err = run_stages(&stages, &mut artifacts).await.unwrap_err();
        assert!(err.to_string().contains("missing input artifact 'absent'"));
    }

    #[test]
    fn stage_config_rejects_empty_fields() {
        assert!(StageConfig::new("research", "Research Agent", "find data").is_ok());
        assert!(StageConfig::new("", "Research Agent", "find data").is_err());
        assert!(StageConfig::new("research", "  ", "find data").is_err());
        assert!(StageConfig::new("research", "Research Agent", "").is_err());
    }

    #[test]
    fn system_prompt_names_the_role() {
        let config = StageConfig::new("write", "Content Writer", "rewrite clearly").unwrap();
        assert_eq!(
            config.system_prompt(),
            "You are the Content Writer. rewrite clearly"
        );
    }
}
