//! Prompt construction and response parsing for entity extraction.

use blake_core::{
  extraction::{CategoryHint, ExtractionResult},
  relation::RelationType,
};

use crate::{Error, Result};

/// Instructions sent as the system message.
pub fn system_prompt(categories: &[CategoryHint]) -> String {
  let mut prompt = String::from(
    "You extract worldbuilding entities from narrative text.\n\
     Answer with a single JSON object of the form\n\
     {\"entities\": [{\"name\": string, \"category\": string, \"summary\": string, \
     \"content\": string, \"tags\": [string]}],\n \
     \"relations\": [{\"source\": string, \"target\": string, \
     \"relation_type\": string, \"description\": string}]}.\n\
     Relation sources and targets are entity names. Use only these categories:\n",
  );

  for category in categories {
    prompt.push_str("- ");
    prompt.push_str(&category.slug);
    prompt.push_str(" (");
    prompt.push_str(&category.label);
    prompt.push(')');
    if let Some(description) = category.description.as_deref().filter(|d| !d.is_empty()) {
      prompt.push_str(": ");
      prompt.push_str(description);
    }
    prompt.push('\n');
  }

  prompt.push_str("Use only these relation types: ");
  let types: Vec<&str> = RelationType::all().into_iter().map(RelationType::as_str).collect();
  prompt.push_str(&types.join(", "));
  prompt.push('.');
  prompt
}

/// Parse the model's JSON answer. Markdown code fences around the object
/// are tolerated; anything else that is not the expected shape is an error.
pub fn parse_extraction(raw: &str) -> Result<ExtractionResult> {
  let body = strip_fences(raw.trim());
  serde_json::from_str(body).map_err(|e| Error::MalformedResponse(e.to_string()))
}

fn strip_fences(s: &str) -> &str {
  let Some(rest) = s.strip_prefix("```") else {
    return s;
  };
  let rest = rest.strip_prefix("json").unwrap_or(rest);
  rest.strip_suffix("```").unwrap_or(rest).trim()
}
