//! Domain models: categories, difficulty tiers, questions, explanations.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GenError;

/// Fixed quiz subject areas. `Misc` covers general programming / CS.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
  Cpp,
  Python,
  JavaScript,
  Java,
  Misc,
}

impl Category {
  pub const ALL: [Category; 5] = [
    Category::Cpp,
    Category::Python,
    Category::JavaScript,
    Category::Java,
    Category::Misc,
  ];

  /// Stable identifier, also used in score-store document names.
  pub fn id(&self) -> &'static str {
    match self {
      Category::Cpp => "cpp",
      Category::Python => "python",
      Category::JavaScript => "javascript",
      Category::Java => "java",
      Category::Misc => "misc",
    }
  }

  pub fn display_name(&self) -> &'static str {
    match self {
      Category::Cpp => "C++",
      Category::Python => "Python",
      Category::JavaScript => "JavaScript",
      Category::Java => "Java",
      Category::Misc => "Misc",
    }
  }

  /// Accent color for the client theme.
  pub fn accent_color(&self) -> &'static str {
    match self {
      Category::Cpp => "#93c5fd",
      Category::Python => "#fde047",
      Category::JavaScript => "#facc15",
      Category::Java => "#fca5a5",
      Category::Misc => "#a5b4fc",
    }
  }

  /// Subject clause interpolated into the question prompt.
  pub fn prompt_context(&self) -> String {
    match self {
      Category::Misc => "general programming or computer science".to_string(),
      other => format!("{} programming", other.display_name()),
    }
  }
}

/// Per-question difficulty tier, sampled uniformly per question.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
  Extreme,
}

impl Difficulty {
  /// Map a roll in [0,1) onto a tier over half-open intervals:
  /// [0,.3) Easy, [.3,.65) Medium, [.65,.9) Hard, [.9,1) Extreme.
  pub fn from_roll(r: f64) -> Difficulty {
    if r < 0.3 {
      Difficulty::Easy
    } else if r < 0.65 {
      Difficulty::Medium
    } else if r < 0.9 {
      Difficulty::Hard
    } else {
      Difficulty::Extreme
    }
  }

  pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Difficulty {
    Difficulty::from_roll(rng.gen::<f64>())
  }

  pub fn label(&self) -> &'static str {
    match self {
      Difficulty::Easy => "Easy",
      Difficulty::Medium => "Medium",
      Difficulty::Hard => "Hard",
      Difficulty::Extreme => "Extreme",
    }
  }
}

/// A multiple-choice question as accepted from the model.
/// Invariants (enforced by `from_model_json`): exactly 4 unique options,
/// `answer` verbatim-equal to one of them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
  pub question: String,
  pub options: Vec<String>,
  pub answer: String,
}

impl Question {
  /// Parse the model's JSON text and validate the structural invariants.
  /// Invalid shapes are rejected as a generation failure, never coerced.
  pub fn from_model_json(text: &str) -> Result<Question, GenError> {
    let q: Question = serde_json::from_str(text)
      .map_err(|e| GenError::InvalidQuestionShape(format!("not a question object: {e}")))?;
    q.validate()?;
    Ok(q)
  }

  fn validate(&self) -> Result<(), GenError> {
    if self.question.trim().is_empty() {
      return Err(GenError::InvalidQuestionShape("empty question text".into()));
    }
    if self.options.len() != 4 {
      return Err(GenError::InvalidQuestionShape(format!(
        "expected 4 options, got {}",
        self.options.len()
      )));
    }
    for (i, a) in self.options.iter().enumerate() {
      if self.options[..i].contains(a) {
        return Err(GenError::InvalidQuestionShape("duplicate option".into()));
      }
    }
    if !self.options.contains(&self.answer) {
      return Err(GenError::InvalidQuestionShape(
        "answer is not one of the options".into(),
      ));
    }
    Ok(())
  }

  /// Shuffle the option order in place. Done once, after acceptance.
  pub fn shuffle_options<R: Rng + ?Sized>(&mut self, rng: &mut R) {
    self.options.shuffle(rng);
  }
}

/// "Explain why" result: the original question verbatim plus the explanation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Explanation {
  #[serde(rename = "originalContext")]
  pub original_context: String,
  #[serde(rename = "explanationText")]
  pub explanation_text: String,
}

impl Explanation {
  pub fn from_model_json(text: &str) -> Result<Explanation, GenError> {
    let e: Explanation = serde_json::from_str(text)
      .map_err(|e| GenError::InvalidExplanationShape(format!("not an explanation object: {e}")))?;
    if e.explanation_text.trim().is_empty() {
      return Err(GenError::InvalidExplanationShape("empty explanation text".into()));
    }
    Ok(e)
  }
}
