//! Prompt Builder: pure mapping from quiz context to a prompt string plus a
//! structured output schema. Nothing here touches the network or the clock.
//!
//! Precedence in the question prompt: a "similar-to" seed beats a free-text
//! topic; the history-avoidance clause is appended whenever history is
//! non-empty.

use serde_json::{json, Value};

use crate::config::Prompts;
use crate::domain::{Category, Difficulty, Question};
use crate::util::fill_template;

/// What the next question generation should be anchored to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationSeed {
  /// Free-text topic the user asked to be quizzed on.
  pub topic: String,
  /// Question the user got wrong, when regenerating "something similar".
  pub similar_to: Option<String>,
}

pub fn question_prompt(
  prompts: &Prompts,
  category: Category,
  difficulty: Difficulty,
  seed: &GenerationSeed,
  history: &[String],
) -> String {
  let context = category.prompt_context();

  let topic_clause = if let Some(prior) = &seed.similar_to {
    fill_template(&prompts.similar_clause, &[("question", prior)])
  } else if !seed.topic.trim().is_empty() {
    fill_template(&prompts.topic_clause, &[("topic", seed.topic.trim())])
  } else {
    String::new()
  };

  let history_clause = if history.is_empty() {
    String::new()
  } else {
    let recent = history
      .iter()
      .enumerate()
      .map(|(i, q)| format!("{}. {}", i + 1, q))
      .collect::<Vec<_>>()
      .join("\n");
    fill_template(&prompts.history_clause, &[("history", &recent)])
  };

  fill_template(
    &prompts.question_template,
    &[
      ("difficulty", difficulty.label()),
      ("context", &context),
      ("topic_clause", &topic_clause),
      ("history_clause", &history_clause),
    ],
  )
}

/// Gemini response schema constraining question generation output.
pub fn question_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "question": { "type": "STRING" },
      "options": { "type": "ARRAY", "items": { "type": "STRING" } },
      "answer": { "type": "STRING" },
    },
    "required": ["question", "options", "answer"],
  })
}

pub fn hint_prompt(prompts: &Prompts, question: &Question) -> String {
  let options = question.options.join(", ");
  fill_template(
    &prompts.hint_template,
    &[("question", question.question.as_str()), ("options", &options)],
  )
}

pub fn explanation_prompt(prompts: &Prompts, question: &Question) -> String {
  fill_template(
    &prompts.explanation_template,
    &[
      ("question", question.question.as_str()),
      ("answer", question.answer.as_str()),
    ],
  )
}

/// Gemini response schema constraining explanation output.
pub fn explanation_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "originalContext": { "type": "STRING" },
      "explanationText": { "type": "STRING" },
    },
    "required": ["originalContext", "explanationText"],
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_question() -> Question {
    Question {
      question: "What is UB?".into(),
      options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
      answer: "a".into(),
    }
  }

  #[test]
  fn topic_clause_included_when_topic_set() {
    let p = Prompts::default();
    let seed = GenerationSeed { topic: "pointers".into(), similar_to: None };
    let out = question_prompt(&p, Category::Cpp, Difficulty::Easy, &seed, &[]);
    assert!(out.contains("quizzed specifically on the topic of \"pointers\""));
    assert!(out.contains("C++ programming"));
    assert!(out.contains("Easy difficulty"));
  }

  #[test]
  fn similar_to_takes_precedence_over_topic() {
    let p = Prompts::default();
    let seed = GenerationSeed {
      topic: "pointers".into(),
      similar_to: Some("What is a dangling pointer?".into()),
    };
    let out = question_prompt(&p, Category::Cpp, Difficulty::Medium, &seed, &[]);
    assert!(out.contains("incorrectly answered the question \"What is a dangling pointer?\""));
    assert!(!out.contains("quizzed specifically on the topic"));
  }

  #[test]
  fn history_clause_lists_recent_questions_in_order() {
    let p = Prompts::default();
    let seed = GenerationSeed::default();
    let history = vec!["newest".to_string(), "older".to_string()];
    let out = question_prompt(&p, Category::Misc, Difficulty::Hard, &seed, &history);
    assert!(out.contains("conceptually different from the following"));
    assert!(out.contains("1. newest\n2. older"));
  }

  #[test]
  fn no_history_clause_when_history_empty() {
    let p = Prompts::default();
    let out =
      question_prompt(&p, Category::Java, Difficulty::Extreme, &GenerationSeed::default(), &[]);
    assert!(!out.contains("conceptually different"));
  }

  #[test]
  fn misc_uses_general_context() {
    let p = Prompts::default();
    let out =
      question_prompt(&p, Category::Misc, Difficulty::Easy, &GenerationSeed::default(), &[]);
    assert!(out.contains("general programming or computer science"));
  }

  #[test]
  fn question_schema_requires_all_keys() {
    let s = question_schema();
    let required: Vec<&str> = s["required"]
      .as_array()
      .unwrap()
      .iter()
      .map(|v| v.as_str().unwrap())
      .collect();
    assert_eq!(required, vec!["question", "options", "answer"]);
  }

  #[test]
  fn hint_prompt_embeds_question_and_options() {
    let p = Prompts::default();
    let out = hint_prompt(&p, &sample_question());
    assert!(out.contains("What is UB?"));
    assert!(out.contains("a, b, c, d"));
    assert!(out.contains("without explicitly revealing it"));
  }

  #[test]
  fn explanation_prompt_names_correct_answer() {
    let p = Prompts::default();
    let out = explanation_prompt(&p, &sample_question());
    assert!(out.contains("The correct answer is: \"a\""));
    assert!(out.contains("originalContext"));
    assert!(out.contains("120 words"));
  }
}
