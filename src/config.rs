//! Loading quiz configuration (prompt templates + provider/store settings)
//! from TOML. See `QuizConfig` and `Prompts` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuizConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub store: StoreCfg,
}

/// Score-store settings accepted in TOML. Environment variables override
/// these (see `crate::store::StoreConfig::resolve`).
#[derive(Clone, Debug, Deserialize, Default)]
pub struct StoreCfg {
  #[serde(default)] pub base_url: Option<String>,
  #[serde(default)] pub app_id: Option<String>,
}

/// Prompt templates used by the Gemini client. Defaults reproduce the
/// wording the quiz was tuned with. Override in TOML to adjust tone.
///
/// Placeholders: {difficulty} {context} {topic_clause} {history_clause}
/// {question} {options} {answer}.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  // Question generation
  pub question_template: String,
  pub topic_clause: String,
  pub similar_clause: String,
  pub history_clause: String,
  // Hint
  pub hint_template: String,
  // Explanation
  pub explanation_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      question_template: "Generate a {difficulty} difficulty multiple-choice question about {context}. {topic_clause} The question should be short and concise. If the question or any answer options include a code snippet, strictly follow one of these formats:\n1. [Question Text] followed by a newline and then a code block. Example: \"What is the output of this code?\n```\n[code]\n```\"\n2. A code block followed by a newline and then the [Question Text]. Example: \"```\n[code]\n```\nWhat does this code do?\"\n3. Only [Question Text] if no code is needed.\nProvide the response as a valid JSON object. The JSON object must have keys: \"question\" (string), \"options\" (array of 4 unique strings, also using markdown for code), and \"answer\" (a string that is an exact match to one of the values in the \"options\" array). Do not include any text outside of the JSON object.{history_clause}".into(),
      topic_clause: "The user wants to be quizzed specifically on the topic of \"{topic}\". The question, options, and answer must relate to this topic.".into(),
      similar_clause: "The user incorrectly answered the question \"{question}\". Generate a new, conceptually similar question to test the same topic, but word it differently and use different code examples if applicable.".into(),
      history_clause: "\nPlease ensure the new question is conceptually different from the following recently asked questions:\n{history}".into(),
      hint_template: "You are a programming tutor. For the following multiple-choice question, provide a concise, one-sentence hint that guides the user toward the correct answer without explicitly revealing it. Question: \"{question}\". Options: {options}.".into(),
      explanation_template: "You are a programming tutor.\nA user was asked the question:\n---\n{question}\n---\nThe correct answer is: \"{answer}\". The user answered incorrectly.\n\nPlease provide a JSON object with two keys:\n1. \"originalContext\": A string containing the original question verbatim, including its markdown.\n2. \"explanationText\": A string containing a clear, concise explanation of why the correct answer is correct. If the explanation is longer than 120 words, break it into smaller paragraphs separated by a newline for readability.\n\nDo not add any text outside of this JSON object.".into(),
    }
  }
}

/// Attempt to load `QuizConfig` from QUIZ_CONFIG_PATH. On any parsing/IO
/// error, returns None and the defaults apply.
pub fn load_quiz_config_from_env() -> Option<QuizConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<QuizConfig>(&s) {
      Ok(cfg) => {
        info!(target: "codequiz_backend", %path, "Loaded quiz config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "codequiz_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "codequiz_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
