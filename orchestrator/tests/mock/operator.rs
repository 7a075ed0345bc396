use sandbox_orchestrator::operator::{Error, Input, Operator, Result};
use std::collections::VecDeque;

/// One scripted answer. The kind must match the question that is asked next.
#[derive(Clone, Debug)]
pub(crate) enum Answer {
    Text(String),
    Confirm(bool),
    Select(String),
    MultiSelect(Vec<String>),
    /// Pick the options at these indexes, whatever their labels are.
    SelectIndexes(Vec<usize>),
}

/// An [`Operator`] that replays a script and remembers every question it was asked.
#[derive(Default)]
pub(crate) struct ScriptedOperator {
    answers: VecDeque<Answer>,
    pub(crate) asked: Vec<String>,
}

impl ScriptedOperator {
    pub(crate) fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: answers.into(),
            asked: Vec::new(),
        }
    }

    fn next(&mut self, message: &str) -> Result<Answer> {
        self.asked.push(message.to_string());
        self.answers.pop_front().ok_or_else(|| Error::Closed {
            message: message.to_string(),
        })
    }
}

fn unexpected(message: &str, answer: Answer) -> Error {
    Error::InvalidSelection {
        input: format!("{:?} does not answer '{}'", answer, message),
    }
}

fn pick(options: &[String], indexes: &[usize]) -> Vec<String> {
    indexes
        .iter()
        .filter_map(|index| options.get(*index).cloned())
        .collect()
}

impl Operator for ScriptedOperator {
    fn input(&mut self, input: &Input) -> Result<String> {
        match self.next(&input.message)? {
            Answer::Text(text) if text.is_empty() => Ok(input.default.clone().unwrap_or_default()),
            Answer::Text(text) => Ok(text),
            other => Err(unexpected(&input.message, other)),
        }
    }

    fn confirm(&mut self, message: &str, _default: Option<bool>) -> Result<bool> {
        match self.next(message)? {
            Answer::Confirm(yes) => Ok(yes),
            other => Err(unexpected(message, other)),
        }
    }

    fn select(&mut self, message: &str, options: &[String]) -> Result<String> {
        match self.next(message)? {
            Answer::Select(choice) => Ok(choice),
            Answer::SelectIndexes(indexes) => pick(options, &indexes)
                .into_iter()
                .next()
                .ok_or_else(|| Error::InvalidSelection {
                    input: format!("{:?}", indexes),
                }),
            other => Err(unexpected(message, other)),
        }
    }

    fn multi_select(&mut self, message: &str, options: &[String]) -> Result<Vec<String>> {
        match self.next(message)? {
            Answer::MultiSelect(choices) => Ok(choices),
            Answer::SelectIndexes(indexes) => Ok(pick(options, &indexes)),
            other => Err(unexpected(message, other)),
        }
    }
}
