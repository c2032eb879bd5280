//! Log Interpreter
//!
//! Filters a raw engine log down to what a natural-language question asks
//! about, by handing both to an LLM collaborator. Without a question the log
//! is returned untouched.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agent::LLMProvider;
use crate::error::InterpretationError;

const SYSTEM_PROMPT: &str = "You read finite-element post-processor logs and extract exactly the information a user asks for.";

pub struct LogInterpreter {
    provider: Option<Arc<dyn LLMProvider>>,
    model: String,
}

impl LogInterpreter {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider: Some(provider),
            model: model.into(),
        }
    }

    /// An interpreter with no collaborator; questions get the full log back with a note
    pub fn passthrough() -> Self {
        Self {
            provider: None,
            model: String::new(),
        }
    }

    pub fn has_collaborator(&self) -> bool {
        self.provider.is_some()
    }

    /// The extraction prompt for one question over one log
    pub fn prompt(log: &str, query: &str) -> String {
        format!(
            r#"Extract the information relevant to the user's question from the post-processor log below.

Question: {query}

Rules:
1. A line such as "CLOAD id N" lists loads that belong to load case N.
2. "part" in the question means a property; "ansapart" means an ANSA part.
3. When the question names a specific load case, report only the loads and results of that case.
4. Be complete and concise. Quote IDs, names and values exactly as they appear in the log.
5. If nothing in the log answers the question, reply exactly: no relevant information found
6. If a node is defined in a local coordinate system, give its displacement in both the global and the local system.
7. Lines starting with "Reading" name the result states being loaded and tell how many load cases the file holds. Number the states from 0, starting at the first "Reading ... TIME" line. The end time of one step and the start time of the next step (the same TIME value) are one equivalent point; count it once, under the earlier step, and do not report it twice. The valid load cases are the states that are not duplicated. For example, this ODB log:
   Reading "STEP 1        (AnonymousSTEP1),TIME 0.00000000E+00"
   Reading "STEP 1        (AnonymousSTEP1),TIME 1.00000000E+00"
   Reading "STEP 2        (AnonymousSTEP2),TIME 1.00000000E+00"
   Reading "STEP 2        (AnonymousSTEP2),TIME 1.10302734E+00"
   Reading "STEP 2        (AnonymousSTEP2),TIME 1.36381531E+00"
   Reading "STEP 2        (AnonymousSTEP2),TIME 2.00000000E+00"
   Reading "STEP 3        (AnonymousSTEP3),TIME 2.00000000E+00"
   Reading "STEP 3        (AnonymousSTEP3),TIME 3.00000000E+00"
   has three steps: STEP 1 at TIME 0 and 1, STEP 2 at TIME 1, 1.103, 1.364 and 2, STEP 3 at TIME 2 and 3. TIME 1 of STEP 1 equals the start of STEP 2, and TIME 2 of STEP 2 equals the start of STEP 3. Counting from 0, the last line is state 7, and the valid load cases are:
   STEP 1 TIME 1.00000000E+00 (case_id: 1)
   STEP 2 TIME 1.10302734E+00 (case_id: 3)
   STEP 2 TIME 1.36381531E+00 (case_id: 4)
   STEP 2 TIME 2.00000000E+00 (case_id: 5)
   STEP 3 TIME 3.00000000E+00 (case_id: 7)

Log:
{log}
"#
        )
    }

    /// Answer `query` from `log`, or return the log when there is nothing to ask
    pub async fn interpret(&self, log: &str, query: Option<&str>) -> Result<String, InterpretationError> {
        let query = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => q,
            None => return Ok(log.to_string()),
        };

        let provider = match &self.provider {
            Some(p) => p,
            None => {
                warn!("No log interpreter configured; returning the full log for query: {}", query);
                return Ok(format!(
                    "{}\n\n[No log interpreter is configured; the full log is shown for: {}]",
                    log, query
                ));
            }
        };

        info!("Interpreting {} bytes of engine log with {}", log.len(), self.model);
        debug!("Interpreter query: {}", query);
        provider
            .generate(&self.model, Self::prompt(log, query), Some(SYSTEM_PROMPT.to_string()))
            .await
            .map_err(|e| InterpretationError::Collaborator(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct ScriptedProvider {
        reply: anyhow::Result<String>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn generate(&self, _model: &str, prompt: String, _system: Option<String>) -> anyhow::Result<String> {
            self.prompts.lock().await.push(prompt);
            match &self.reply {
                Ok(r) => Ok(r.clone()),
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            }
        }
    }

    fn provider(reply: anyhow::Result<String>) -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_no_query_returns_log_verbatim() {
        let p = provider(Ok("unused".into()));
        let interpreter = LogInterpreter::new(p.clone(), "test-model");
        let out = interpreter.interpret("raw log\nline 2", None).await.unwrap();
        assert_eq!(out, "raw log\nline 2");

        let out = interpreter.interpret("raw", Some("   ")).await.unwrap();
        assert_eq!(out, "raw");
        assert!(p.prompts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_query_goes_through_collaborator() {
        let p = provider(Ok("  node 100: 1.5 mm \n".into()));
        let interpreter = LogInterpreter::new(p.clone(), "test-model");
        let out = interpreter.interpret("LOG BODY", Some("node 100 displacement")).await.unwrap();
        assert_eq!(out, "  node 100: 1.5 mm \n");

        let prompts = p.prompts.lock().await;
        assert!(prompts[0].contains("node 100 displacement"));
        assert!(prompts[0].contains("LOG BODY"));
    }

    #[tokio::test]
    async fn test_collaborator_failure_is_typed() {
        let interpreter = LogInterpreter::new(provider(Err(anyhow::anyhow!("rate limited"))), "m");
        let err = interpreter.interpret("log", Some("q")).await.unwrap_err();
        assert_eq!(err, InterpretationError::Collaborator("rate limited".into()));
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_prompt_states_case_numbering_rule() {
        let prompt = LogInterpreter::prompt("LOG", "which cases?");
        let rule = &prompt[prompt.find("7. Lines starting with \"Reading\"").unwrap()..prompt.find("\nLog:\n").unwrap()];

        assert!(rule.contains("Number the states from 0"));
        assert!(rule.contains("first \"Reading ... TIME\" line"));
        assert!(rule.contains("end time of one step and the start time of the next step"));
        assert!(rule.contains("states that are not duplicated"));
        assert_eq!(rule.matches("   Reading \"STEP").count(), 8);
        for case in ["(case_id: 1)", "(case_id: 3)", "(case_id: 4)", "(case_id: 5)", "(case_id: 7)"] {
            assert!(rule.contains(case), "missing {}", case);
        }
        assert!(!rule.contains("(case_id: 2)"));
        assert!(!rule.contains("(case_id: 6)"));
    }

    #[tokio::test]
    async fn test_passthrough_returns_log_with_note() {
        let out = LogInterpreter::passthrough().interpret("log", Some("q")).await.unwrap();
        assert!(out.starts_with("log\n\n"));
        assert!(out.contains("full log is shown for: q"));
    }
}
