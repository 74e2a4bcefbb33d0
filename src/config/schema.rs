use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SpliceConfig {
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PromptConfig {
    /// Messages sent ahead of the user's prompt.
    pub system_instructions: Vec<String>,
    /// Largest enclosing-item text sent as context; longer items are cut to
    /// their first line.
    pub max_context_bytes: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_instructions: vec![
                "You are a programming assistant. Rewrite the given code as the user asks."
                    .to_string(),
                "Reply with the revised code only, ready to paste into the editor. \
                 Put any remarks in short code comments."
                    .to_string(),
                "Do not use markdown fences, greetings or explanations outside the code."
                    .to_string(),
            ],
            max_context_bytes: 2048,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Program and arguments; the request JSON is written to its stdin.
    pub command: Vec<String>,
    pub strip_fences: bool,
    pub timeout_secs: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            strip_fences: true,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Keep unparsable responses as comments above the selection.
    pub annotate_failures: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            annotate_failures: true,
        }
    }
}

impl SpliceConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.prompt.max_context_bytes == 0 {
            issues.push(ValidationIssue::ZeroValue {
                field: "prompt.max_context_bytes",
            });
        }

        for (index, instruction) in self.prompt.system_instructions.iter().enumerate() {
            if instruction.trim().is_empty() {
                issues.push(ValidationIssue::BlankInstruction { index });
            }
        }

        if let Some(program) = self.generator.command.first() {
            if program.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    field: "generator.command[0]",
                });
            }
        }

        if self.generator.timeout_secs == Some(0) {
            issues.push(ValidationIssue::ZeroValue {
                field: "generator.timeout_secs",
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField { field: &'static str },
    ZeroValue { field: &'static str },
    BlankInstruction { index: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.issues.iter().map(|issue| issue.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "missing or empty field '{field}'")
            }
            ValidationIssue::ZeroValue { field } => {
                write!(f, "'{field}' must be greater than zero")
            }
            ValidationIssue::BlankInstruction { index } => {
                write!(f, "prompt.system_instructions[{index}] is blank")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
