use std::collections::HashMap;

use super::plans::AnalysisRequest;

/// State threaded through one pipeline run.
pub struct PipelineContext {
    // Input
    pub request: AnalysisRequest,

    // Template variables (addresses, serialized wallet summaries)
    variables: HashMap<String, String>,

    // Stage name -> recorded output
    outputs: HashMap<String, String>,

    // Completed stage names, in execution order
    completed: Vec<String>,

    // Everything every stage saw and produced, in execution order
    transcript: String,
}

impl PipelineContext {
    pub fn new(request: AnalysisRequest) -> Self {
        Self {
            request,
            variables: HashMap::new(),
            outputs: HashMap::new(),
            completed: Vec::new(),
            transcript: String::new(),
        }
    }

    pub fn set_variable(&mut self, name: &str, value: impl Into<String>) {
        self.variables.insert(name.to_string(), value.into());
    }

    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    pub fn record_output(&mut self, stage: &str, output: String) {
        self.completed.push(stage.to_string());
        self.outputs.insert(stage.to_string(), output);
    }

    pub fn output(&self, stage: &str) -> Option<&str> {
        self.outputs.get(stage).map(String::as_str)
    }

    pub fn completed_stages(&self) -> &[String] {
        &self.completed
    }

    /// Output of the most recently completed stage.
    pub fn last_output(&self) -> Option<&str> {
        self.completed.last().and_then(|name| self.output(name))
    }

    pub fn append_transcript(&mut self, text: &str) {
        self.transcript.push_str(text);
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn into_transcript(self) -> String {
        self.transcript
    }
}
