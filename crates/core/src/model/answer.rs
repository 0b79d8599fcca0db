use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ids::{OptionId, QuestionId};
use crate::model::quiz::QuestionKind;

/// What the user gave for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Response {
    /// Selected option of a multiple-choice or image-based question.
    Choice(OptionId),
    /// Free text for an open-ended question.
    Text(String),
}

impl Response {
    /// Whether this payload shape fits the given question kind.
    #[must_use]
    pub fn fits(&self, kind: QuestionKind) -> bool {
        match self {
            Self::Choice(_) => kind.has_options(),
            Self::Text(_) => !kind.has_options(),
        }
    }
}

/// At most one answer per question; recording again replaces it.
pub type AnswerSheet = BTreeMap<QuestionId, Answer>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: QuestionId,
    pub response: Response,
}

impl Answer {
    #[must_use]
    pub fn new(question_id: QuestionId, response: Response) -> Self {
        Self {
            question_id,
            response,
        }
    }

    #[must_use]
    pub fn selected_option_id(&self) -> Option<OptionId> {
        match self.response {
            Response::Choice(id) => Some(id),
            Response::Text(_) => None,
        }
    }

    #[must_use]
    pub fn open_text(&self) -> Option<&str> {
        match &self.response {
            Response::Text(text) => Some(text),
            Response::Choice(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_fits_only_option_kinds() {
        let choice = Response::Choice(OptionId::new(1));
        assert!(choice.fits(QuestionKind::MultipleChoice));
        assert!(choice.fits(QuestionKind::ImageBased));
        assert!(!choice.fits(QuestionKind::OpenEnded));

        let text = Response::Text("relativity".into());
        assert!(text.fits(QuestionKind::OpenEnded));
        assert!(!text.fits(QuestionKind::MultipleChoice));
    }

    #[test]
    fn accessors_follow_response_shape() {
        let answer = Answer::new(QuestionId::new(2), Response::Text("relativity".into()));
        assert_eq!(answer.open_text(), Some("relativity"));
        assert_eq!(answer.selected_option_id(), None);
    }

    #[test]
    fn response_serializes_tagged() {
        let json = serde_json::to_string(&Response::Choice(OptionId::new(3))).unwrap();
        assert_eq!(json, r#"{"type":"choice","value":3}"#);
    }
}
