use crate::schema::ExtractionSchema;

const DEFAULT_SYSTEM_PREAMBLE: &str = "You are a data extraction assistant. \
Extract the requested information from the provided web page content. \
Respond ONLY with a single valid JSON object. Do not include explanations, \
markdown fences, or any text outside the JSON object.";

/// A composed model request: system framing plus a single user message.
///
/// Immutable and single-use; built fresh for every `scrape` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPrompt {
    pub system: String,
    pub user: String,
}

impl ModelPrompt {
    /// Total character length, useful for logging and budget checks.
    pub fn len_chars(&self) -> usize {
        self.system.chars().count() + self.user.chars().count()
    }
}

/// Assembles extraction prompts from instruction, page text, and an
/// optional schema.
///
/// The output format contract lives entirely here: the system framing
/// demands a single JSON object, and a supplied schema is rendered as a
/// field list with the explicit-null directive (a field the model cannot
/// find must be `null`, never omitted and never fabricated).
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_preamble: String,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            system_preamble: DEFAULT_SYSTEM_PREAMBLE.to_string(),
        }
    }

    /// Replace the system framing, e.g. to localize it or tighten it for a
    /// particular model family.
    pub fn with_system_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.system_preamble = preamble.into();
        self
    }

    /// Build the prompt for one extraction. Infallible: all inputs are
    /// already-validated strings.
    pub fn build(
        &self,
        instruction: &str,
        content: &str,
        schema: Option<&ExtractionSchema>,
    ) -> ModelPrompt {
        let mut user = String::with_capacity(content.len() + instruction.len() + 512);

        user.push_str("Instruction: ");
        user.push_str(instruction);
        user.push_str("\n\n");

        if let Some(schema) = schema.filter(|s| !s.is_empty()) {
            user.push_str("Return a JSON object with exactly these fields:\n");
            user.push_str(&schema.describe());
            user.push_str(
                "If a field cannot be found in the content, set its value to null. \
                 Never omit a declared field, never invent a value, and do not add \
                 fields that were not requested.\n\n",
            );
        }

        user.push_str("Web page content:\n---\n");
        user.push_str(content);
        user.push_str("\n---");

        ModelPrompt {
            system: self.system_preamble.clone(),
            user,
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    #[test]
    fn prompt_carries_instruction_and_content() {
        let prompt = PromptBuilder::new().build("Extract the main heading", "# Hello", None);
        assert!(prompt.user.contains("Instruction: Extract the main heading"));
        assert!(prompt.user.contains("# Hello"));
        assert!(prompt.system.contains("single valid JSON object"));
    }

    #[test]
    fn schema_fields_and_null_directive_are_included() {
        let schema = ExtractionSchema::new()
            .field("title", FieldKind::String)
            .field("price", FieldKind::Number);
        let prompt = PromptBuilder::new().build("Extract the product", "content", Some(&schema));

        assert!(prompt.user.contains("- title (string)"));
        assert!(prompt.user.contains("- price (number)"));
        assert!(prompt.user.contains("set its value to null"));
        assert!(prompt.user.contains("Never omit a declared field"));
    }

    #[test]
    fn empty_schema_adds_no_field_section() {
        let schema = ExtractionSchema::new();
        let prompt = PromptBuilder::new().build("Extract", "content", Some(&schema));
        assert!(!prompt.user.contains("exactly these fields"));
    }

    #[test]
    fn content_is_delimited() {
        let prompt = PromptBuilder::new().build("x", "the page body", None);
        assert!(prompt.user.contains("Web page content:\n---\nthe page body\n---"));
    }

    #[test]
    fn custom_system_preamble_replaces_default() {
        let prompt = PromptBuilder::new()
            .with_system_preamble("Be terse.")
            .build("x", "y", None);
        assert_eq!(prompt.system, "Be terse.");
    }

    #[test]
    fn len_chars_counts_both_messages() {
        let prompt = ModelPrompt {
            system: "ab".into(),
            user: "cde".into(),
        };
        assert_eq!(prompt.len_chars(), 5);
    }
}
