//! The quiz session state machine.
//!
//! One `Session` aggregate plus a pure reducer: `reduce` applies an `Action`
//! and returns the `Effect`s the caller must carry out (generation requests,
//! the reveal timer, high-score reads/writes). The reducer itself performs
//! no I/O, reads no clock, and draws no randomness, so every transition is
//! testable without a runtime.
//!
//! Phases: Start → Quiz (begin), Quiz → Quiz (correct answer), Quiz → End
//! (wrong answer), End → Quiz (retry / try-similar), End|Quiz → Start (back).

use std::collections::VecDeque;

use serde::Serialize;

use crate::domain::{Category, Question};
use crate::prompt::GenerationSeed;

/// Pause between locking an answer and committing the transition, so the
/// client can display correctness styling before the state advances.
pub const REVEAL_DELAY_MS: u64 = 2000;

/// Rolling history of recent question texts, newest first.
pub const HISTORY_LIMIT: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Start,
  Quiz,
  End,
}

#[derive(Clone, Debug)]
pub struct Session {
  pub category: Category,
  pub topic: String,
  pub phase: Phase,
  /// Accumulated score. Resets to 0 on every entry into Quiz.
  pub score: u32,
  /// Last-known high score for the active category.
  pub high_score: u32,
  pub current: Option<Question>,
  /// Retained across the transition into End for "explain" / "try similar".
  pub last: Option<Question>,
  /// The locked option while the reveal delay runs.
  pub selected: Option<String>,
  pub hint: Option<String>,
  pub error: Option<String>,
  /// A generation request is outstanding.
  pub fetching: bool,
  pub history: VecDeque<String>,
}

impl Session {
  pub fn new(category: Category) -> Self {
    Self {
      category,
      topic: String::new(),
      phase: Phase::Start,
      score: 0,
      high_score: 0,
      current: None,
      last: None,
      selected: None,
      hint: None,
      error: None,
      fetching: false,
      history: VecDeque::new(),
    }
  }

  /// Clear everything a fresh quiz must not inherit. Keeps category, topic,
  /// high score, and the last-answered question.
  fn reset_for_quiz(&mut self) {
    self.score = 0;
    self.current = None;
    self.selected = None;
    self.hint = None;
    self.error = None;
    self.history.clear();
    self.fetching = false;
  }

  fn push_history(&mut self, question_text: String) {
    self.history.push_front(question_text);
    self.history.truncate(HISTORY_LIMIT);
  }

  fn topic_seed(&self) -> GenerationSeed {
    GenerationSeed { topic: self.topic.clone(), similar_to: None }
  }
}

#[derive(Clone, Debug)]
pub enum Action {
  /// Switch the highlighted category on the start screen.
  SelectCategory(Category),
  /// Start a quiz for a category with a non-empty topic.
  Begin { category: Category, topic: String },
  /// A generation request completed with an accepted question.
  QuestionReady(Question),
  /// A generation request failed (user-visible message).
  QuestionFailed(String),
  /// The user locked in an option; starts the reveal delay.
  AnswerLocked(String),
  /// The reveal delay elapsed; commit the transition.
  RevealElapsed { correct: bool },
  /// A hint request completed (or degraded to its fallback text).
  HintReady(String),
  Retry,
  TrySimilar,
  Back,
  HighScoreLoaded(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
  /// Cancel the in-flight generation request and any scheduled reveal.
  CancelPending,
  /// Start a question-generation request (supersedes any prior one).
  Generate(GenerationSeed),
  /// Schedule `RevealElapsed { correct }` after `REVEAL_DELAY_MS`.
  ScheduleReveal { correct: bool },
  /// Persist a beaten high score (best-effort).
  PersistHighScore { category: Category, value: u32 },
  /// Fetch the stored high score for a category.
  LoadHighScore(Category),
}

/// Apply one action. Stale actions (e.g. a `QuestionReady` that raced a
/// phase change) are dropped without mutating the session.
pub fn reduce(s: &mut Session, action: Action) -> Vec<Effect> {
  match action {
    Action::SelectCategory(category) => {
      if s.phase != Phase::Start {
        return vec![];
      }
      s.category = category;
      vec![Effect::LoadHighScore(category)]
    }

    Action::Begin { category, topic } => {
      if s.phase != Phase::Start {
        return vec![];
      }
      let topic = topic.trim().to_string();
      if topic.is_empty() {
        s.error = Some("Enter a topic to start the quiz.".into());
        return vec![];
      }
      let switched = s.category != category;
      s.category = category;
      s.topic = topic;
      s.reset_for_quiz();
      s.phase = Phase::Quiz;
      s.fetching = true;
      let mut effects = vec![Effect::CancelPending];
      if switched {
        effects.push(Effect::LoadHighScore(category));
      }
      effects.push(Effect::Generate(s.topic_seed()));
      effects
    }

    Action::QuestionReady(q) => {
      if s.phase != Phase::Quiz || s.selected.is_some() {
        return vec![];
      }
      s.push_history(q.question.clone());
      s.current = Some(q);
      s.fetching = false;
      s.error = None;
      vec![]
    }

    Action::QuestionFailed(message) => {
      if s.phase != Phase::Quiz {
        return vec![];
      }
      s.fetching = false;
      s.error = Some(message);
      vec![]
    }

    Action::AnswerLocked(option) => {
      if s.phase != Phase::Quiz || s.selected.is_some() {
        return vec![];
      }
      let Some(current) = &s.current else {
        return vec![];
      };
      let correct = option == current.answer;
      s.last = Some(current.clone());
      s.selected = Some(option);
      vec![Effect::ScheduleReveal { correct }]
    }

    Action::RevealElapsed { correct } => {
      if s.phase != Phase::Quiz || s.selected.is_none() {
        return vec![];
      }
      s.selected = None;
      s.current = None;
      s.hint = None;
      if correct {
        s.score += 1;
        s.fetching = true;
        vec![Effect::Generate(s.topic_seed())]
      } else {
        s.phase = Phase::End;
        flush_high_score(s)
      }
    }

    Action::HintReady(text) => {
      if s.phase == Phase::Quiz && s.current.is_some() && s.selected.is_none() {
        s.hint = Some(text);
      }
      vec![]
    }

    Action::Retry => {
      if s.phase != Phase::End {
        return vec![];
      }
      s.reset_for_quiz();
      s.phase = Phase::Quiz;
      s.fetching = true;
      vec![Effect::CancelPending, Effect::Generate(s.topic_seed())]
    }

    Action::TrySimilar => {
      if s.phase != Phase::End {
        return vec![];
      }
      let Some(last) = &s.last else {
        return vec![];
      };
      let seed = GenerationSeed {
        topic: String::new(),
        similar_to: Some(last.question.clone()),
      };
      s.reset_for_quiz();
      s.phase = Phase::Quiz;
      s.fetching = true;
      vec![Effect::CancelPending, Effect::Generate(seed)]
    }

    Action::Back => {
      if s.phase == Phase::Start {
        return vec![];
      }
      let mut effects = vec![Effect::CancelPending];
      effects.extend(flush_high_score(s));
      s.phase = Phase::Start;
      s.reset_for_quiz();
      effects
    }

    Action::HighScoreLoaded(value) => {
      s.high_score = value;
      vec![]
    }
  }
}

/// Emit a persistence effect iff the score strictly beats the known high
/// score, updating the local value so the write happens at most once.
fn flush_high_score(s: &mut Session) -> Vec<Effect> {
  if s.score > s.high_score {
    s.high_score = s.score;
    vec![Effect::PersistHighScore { category: s.category, value: s.score }]
  } else {
    vec![]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn question(text: &str, answer: &str) -> Question {
    Question {
      question: text.into(),
      options: vec![answer.into(), "b".into(), "c".into(), "d".into()],
      answer: answer.into(),
    }
  }

  fn begin(s: &mut Session, topic: &str) -> Vec<Effect> {
    let category = s.category;
    reduce(s, Action::Begin { category, topic: topic.into() })
  }

  #[test]
  fn begin_requires_non_empty_topic() {
    let mut s = Session::new(Category::Cpp);
    let effects = begin(&mut s, "   ");
    assert!(effects.is_empty());
    assert_eq!(s.phase, Phase::Start);
    assert!(s.error.is_some());
  }

  #[test]
  fn begin_resets_score_and_history_and_schedules_generation() {
    let mut s = Session::new(Category::Cpp);
    s.score = 9;
    s.history.push_front("stale".into());
    let effects = begin(&mut s, "pointers");
    assert_eq!(s.phase, Phase::Quiz);
    assert_eq!(s.score, 0);
    assert!(s.history.is_empty());
    assert!(s.fetching);
    assert_eq!(effects[0], Effect::CancelPending);
    assert_eq!(
      effects[1],
      Effect::Generate(GenerationSeed { topic: "pointers".into(), similar_to: None })
    );
  }

  #[test]
  fn question_ready_fills_history_newest_first_capped_at_three() {
    let mut s = Session::new(Category::Python);
    begin(&mut s, "lists");
    for i in 1..=4 {
      reduce(&mut s, Action::QuestionReady(question(&format!("q{i}"), "a")));
      s.current = None; // pretend it advanced
    }
    let history: Vec<&str> = s.history.iter().map(String::as_str).collect();
    assert_eq!(history, vec!["q4", "q3", "q2"]);
  }

  #[test]
  fn question_ready_outside_quiz_is_dropped() {
    let mut s = Session::new(Category::Java);
    let effects = reduce(&mut s, Action::QuestionReady(question("q", "a")));
    assert!(effects.is_empty());
    assert!(s.current.is_none());
    assert!(s.history.is_empty());
  }

  #[test]
  fn correct_answer_self_loop_increments_and_regenerates() {
    let mut s = Session::new(Category::Cpp);
    begin(&mut s, "pointers");
    reduce(&mut s, Action::QuestionReady(question("q1", "right")));

    let effects = reduce(&mut s, Action::AnswerLocked("right".into()));
    assert_eq!(effects, vec![Effect::ScheduleReveal { correct: true }]);
    assert_eq!(s.last.as_ref().unwrap().question, "q1");

    let effects = reduce(&mut s, Action::RevealElapsed { correct: true });
    assert_eq!(s.phase, Phase::Quiz);
    assert_eq!(s.score, 1);
    assert!(s.current.is_none());
    assert!(s.hint.is_none());
    assert!(matches!(effects.as_slice(), [Effect::Generate(seed)] if seed.similar_to.is_none()));
  }

  #[test]
  fn wrong_answer_ends_game_and_flushes_beaten_high_score() {
    let mut s = Session::new(Category::Cpp);
    begin(&mut s, "pointers");
    s.high_score = 0;
    reduce(&mut s, Action::QuestionReady(question("q1", "right")));
    reduce(&mut s, Action::AnswerLocked("right".into()));
    reduce(&mut s, Action::RevealElapsed { correct: true });
    reduce(&mut s, Action::QuestionReady(question("q2", "right")));

    let effects = reduce(&mut s, Action::AnswerLocked("wrong".into()));
    assert_eq!(effects, vec![Effect::ScheduleReveal { correct: false }]);

    let effects = reduce(&mut s, Action::RevealElapsed { correct: false });
    assert_eq!(s.phase, Phase::End);
    assert_eq!(s.score, 1);
    assert_eq!(s.last.as_ref().unwrap().question, "q2");
    assert_eq!(
      effects,
      vec![Effect::PersistHighScore { category: Category::Cpp, value: 1 }]
    );
    assert_eq!(s.high_score, 1);
  }

  #[test]
  fn no_high_score_write_when_not_beaten() {
    let mut s = Session::new(Category::Misc);
    begin(&mut s, "bits");
    s.high_score = 5;
    reduce(&mut s, Action::QuestionReady(question("q1", "right")));
    reduce(&mut s, Action::AnswerLocked("wrong".into()));
    let effects = reduce(&mut s, Action::RevealElapsed { correct: false });
    assert!(effects.is_empty());
    assert_eq!(s.high_score, 5);
  }

  #[test]
  fn answer_ignored_while_locked_or_without_question() {
    let mut s = Session::new(Category::Cpp);
    begin(&mut s, "pointers");
    assert!(reduce(&mut s, Action::AnswerLocked("x".into())).is_empty());

    reduce(&mut s, Action::QuestionReady(question("q1", "right")));
    reduce(&mut s, Action::AnswerLocked("right".into()));
    // Second lock during the reveal delay does nothing.
    assert!(reduce(&mut s, Action::AnswerLocked("b".into())).is_empty());
  }

  #[test]
  fn retry_resets_score_without_similarity_anchor() {
    let mut s = Session::new(Category::Cpp);
    begin(&mut s, "pointers");
    reduce(&mut s, Action::QuestionReady(question("q1", "right")));
    reduce(&mut s, Action::AnswerLocked("wrong".into()));
    reduce(&mut s, Action::RevealElapsed { correct: false });

    let effects = reduce(&mut s, Action::Retry);
    assert_eq!(s.phase, Phase::Quiz);
    assert_eq!(s.score, 0);
    assert!(s.history.is_empty());
    assert_eq!(effects[0], Effect::CancelPending);
    assert_eq!(
      effects[1],
      Effect::Generate(GenerationSeed { topic: "pointers".into(), similar_to: None })
    );
  }

  #[test]
  fn try_similar_resets_score_and_seeds_with_last_question() {
    let mut s = Session::new(Category::Cpp);
    begin(&mut s, "pointers");
    reduce(&mut s, Action::QuestionReady(question("q1", "right")));
    reduce(&mut s, Action::AnswerLocked("right".into()));
    reduce(&mut s, Action::RevealElapsed { correct: true });
    reduce(&mut s, Action::QuestionReady(question("q2", "right")));
    reduce(&mut s, Action::AnswerLocked("wrong".into()));
    reduce(&mut s, Action::RevealElapsed { correct: false });

    let effects = reduce(&mut s, Action::TrySimilar);
    assert_eq!(s.phase, Phase::Quiz);
    assert_eq!(s.score, 0);
    assert!(s.history.is_empty());
    assert_eq!(effects[0], Effect::CancelPending);
    assert_eq!(
      effects[1],
      Effect::Generate(GenerationSeed {
        topic: String::new(),
        similar_to: Some("q2".into())
      })
    );
  }

  #[test]
  fn try_similar_without_last_question_is_dropped() {
    let mut s = Session::new(Category::Cpp);
    s.phase = Phase::End;
    assert!(reduce(&mut s, Action::TrySimilar).is_empty());
    assert_eq!(s.phase, Phase::End);
  }

  #[test]
  fn back_from_quiz_cancels_and_flushes() {
    let mut s = Session::new(Category::Cpp);
    begin(&mut s, "pointers");
    reduce(&mut s, Action::QuestionReady(question("q1", "right")));
    reduce(&mut s, Action::AnswerLocked("right".into()));
    reduce(&mut s, Action::RevealElapsed { correct: true });
    assert_eq!(s.score, 1);

    let effects = reduce(&mut s, Action::Back);
    assert_eq!(s.phase, Phase::Start);
    assert_eq!(effects[0], Effect::CancelPending);
    assert_eq!(
      effects[1],
      Effect::PersistHighScore { category: Category::Cpp, value: 1 }
    );
  }

  #[test]
  fn back_without_beaten_score_only_cancels() {
    let mut s = Session::new(Category::Cpp);
    s.high_score = 3;
    begin(&mut s, "pointers");
    let effects = reduce(&mut s, Action::Back);
    assert_eq!(effects, vec![Effect::CancelPending]);
    assert_eq!(s.phase, Phase::Start);
  }

  #[test]
  fn select_category_only_on_start_screen() {
    let mut s = Session::new(Category::Cpp);
    let effects = reduce(&mut s, Action::SelectCategory(Category::Java));
    assert_eq!(effects, vec![Effect::LoadHighScore(Category::Java)]);
    assert_eq!(s.category, Category::Java);

    begin(&mut s, "generics");
    assert!(reduce(&mut s, Action::SelectCategory(Category::Misc)).is_empty());
    assert_eq!(s.category, Category::Java);
  }

  #[test]
  fn hint_only_applies_to_an_unanswered_current_question() {
    let mut s = Session::new(Category::Cpp);
    begin(&mut s, "pointers");
    reduce(&mut s, Action::HintReady("too early".into()));
    assert!(s.hint.is_none());

    reduce(&mut s, Action::QuestionReady(question("q1", "right")));
    reduce(&mut s, Action::HintReady("think small".into()));
    assert_eq!(s.hint.as_deref(), Some("think small"));

    reduce(&mut s, Action::AnswerLocked("right".into()));
    reduce(&mut s, Action::HintReady("late".into()));
    assert_eq!(s.hint.as_deref(), Some("think small"));
  }

  #[test]
  fn full_scenario_cpp_pointers() {
    // Spec walkthrough: correct then incorrect, score retained at 1.
    let mut s = Session::new(Category::Cpp);
    let effects = begin(&mut s, "pointers");
    assert!(matches!(effects.last(), Some(Effect::Generate(_))));
    assert_eq!(s.score, 0);

    reduce(&mut s, Action::QuestionReady(question("q1", "right")));
    reduce(&mut s, Action::AnswerLocked("right".into()));
    let effects = reduce(&mut s, Action::RevealElapsed { correct: true });
    assert_eq!(s.score, 1);
    assert_eq!(s.phase, Phase::Quiz);
    assert_eq!(effects.len(), 1);

    reduce(&mut s, Action::QuestionReady(question("q2", "right")));
    reduce(&mut s, Action::AnswerLocked("wrong".into()));
    let effects = reduce(&mut s, Action::RevealElapsed { correct: false });
    assert_eq!(s.phase, Phase::End);
    assert_eq!(s.score, 1);
    assert_eq!(
      effects,
      vec![Effect::PersistHighScore { category: Category::Cpp, value: 1 }]
    );
  }
}
