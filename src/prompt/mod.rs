use std::collections::HashMap;

use crate::errors::MentorError;

pub const DESCRIPTION_VAR: &str = "description";

/// A prompt with `{name}` placeholders for each declared input variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub input_variables: &'static [&'static str],
    pub template: &'static str,
}

impl PromptTemplate {
    /// Substitutes every declared variable. Fails if any is absent from `vars`;
    /// extra entries in `vars` are ignored.
    pub fn render(&self, vars: &HashMap<&str, &str>) -> Result<String, MentorError> {
        for var in self.input_variables {
            if !vars.contains_key(*var) {
                return Err(MentorError::Template {
                    template: self.name.to_string(),
                    variable: (*var).to_string(),
                });
            }
        }

        // Single pass, so braces inside substituted values are left alone.
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) if self.input_variables.iter().any(|v| *v == &after[..close]) => {
                    out.push_str(vars[&after[..close]]);
                    rest = &after[close + 1..];
                }
                _ => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

pub const VALIDATION: PromptTemplate = PromptTemplate {
    name: "validation",
    input_variables: &["description"],
    template: r#"If this description has no context, is inappropriate, sensitive, or offensive just say "FLAG"
DESCRIPTION: {description}"#,
};

pub const CONTEXT: PromptTemplate = PromptTemplate {
    name: "context",
    input_variables: &["description"],
    template: "Give me a very brief summary of what you understand from the following description of a mobile application
DESCRIPTION: {description}",
};

pub const NAMES: PromptTemplate = PromptTemplate {
    name: "names",
    input_variables: &["context"],
    template: "Give me a list of name ideas for a mobile app based on the following context
CONTEXT: {context}",
};

pub const STACK: PromptTemplate = PromptTemplate {
    name: "stack",
    input_variables: &["context"],
    template: "Give me a full and ordered tech stack for a mobile app based on the following context
CONTEXT: {context}",
};

pub const INTEGRATION: PromptTemplate = PromptTemplate {
    name: "integration",
    input_variables: &["context", "stack"],
    template: "Give me details on how to integrate this tech stack
STACK: {stack}
given the following context
CONTEXT: {context}",
};

pub const RESOURCES: PromptTemplate = PromptTemplate {
    name: "resources",
    input_variables: &["stack"],
    template: "Give me a list of documentation URLs for all the tools mentioned in this tech stack
STACK: {stack}",
};

pub const FEATURES: PromptTemplate = PromptTemplate {
    name: "features",
    input_variables: &["context"],
    template: "Give me a list of features and functionalities that should be considered and integrated into a mobile app based on the following context
CONTEXT: {context}",
};

pub const ADVICE: PromptTemplate = PromptTemplate {
    name: "advice",
    input_variables: &["context"],
    template: "Give me some advice to successfully develop a mobile app based on the following context
CONTEXT: {context}",
};
