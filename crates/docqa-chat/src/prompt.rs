use docqa_core::config::GenerationSettings;
use docqa_core::types::RetrievalResult;

/// Substitute `{context}` and `{question}` in one pass, so placeholder-like
/// text inside the values is left alone. Other braces are copied verbatim.
pub fn render(template: &str, context: &str, question: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + question.len());
    let mut rest = template;
    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(t) = tail.strip_prefix("{context}") {
            out.push_str(context);
            rest = t;
        } else if let Some(t) = tail.strip_prefix("{question}") {
            out.push_str(question);
            rest = t;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
    separator: String,
}

impl PromptBuilder {
    pub fn new(settings: &GenerationSettings) -> Self {
        Self { template: settings.template.clone(), separator: settings.context_separator.clone() }
    }

    /// Prompt for `question` grounded in `passages`, best passage first.
    pub fn build(&self, question: &str, passages: &RetrievalResult) -> String {
        render(&self.template, &passages.context(&self.separator), question)
    }
}
