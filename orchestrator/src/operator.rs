/*!

The orchestrator never talks to a person directly. Whatever drives it (a terminal, a test, a script)
implements [`Operator`] and answers typed questions. Validation of how many items were chosen in a
[`Operator::multi_select`] belongs to the caller, not to the implementation.

!*/

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Input was closed before '{}' was answered", message))]
    Closed { message: String },

    #[snafu(display("'{}' is not one of the offered options", input))]
    InvalidSelection { input: String },

    #[snafu(display("Unable to talk to the operator: {}", source))]
    Io { source: std::io::Error },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A free text question.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Input {
    pub message: String,
    /// Returned when the operator gives an empty answer.
    pub default: Option<String>,
    /// Reject empty answers (after the default is applied).
    pub required: bool,
}

impl Input {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_default<S: Into<String>>(mut self, default: S) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

pub trait Operator {
    fn input(&mut self, input: &Input) -> Result<String>;

    fn confirm(&mut self, message: &str, default: Option<bool>) -> Result<bool>;

    /// Returns one of `options`.
    fn select(&mut self, message: &str, options: &[String]) -> Result<String>;

    /// Returns a subset of `options`, possibly empty.
    fn multi_select(&mut self, message: &str, options: &[String]) -> Result<Vec<String>>;
}

/// Map the labels chosen by the operator back to the items they were built from.
pub(crate) fn chosen<'a, T>(
    items: &'a [T],
    labels: &[String],
    selection: &[String],
) -> Result<Vec<&'a T>> {
    selection
        .iter()
        .map(|choice| {
            labels
                .iter()
                .position(|label| label == choice)
                .and_then(|index| items.get(index))
                .ok_or_else(|| Error::InvalidSelection {
                    input: choice.to_string(),
                })
        })
        .collect()
}

#[test]
fn chosen_maps_labels_back_to_items() {
    let items = vec![10, 20, 30];
    let labels = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let picked = chosen(&items, &labels, &["c".to_string(), "a".to_string()]).unwrap();
    assert_eq!(picked, vec![&30, &10]);
    assert!(matches!(
        chosen(&items, &labels, &["z".to_string()]),
        Err(Error::InvalidSelection { .. })
    ));
}
