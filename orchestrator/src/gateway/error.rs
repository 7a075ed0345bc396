use aws_smithy_types::error::display::DisplayErrorContext;
use snafu::Snafu;

/// Errors returned by a [`CloudGateway`](super::CloudGateway).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{} already exists", what))]
    AlreadyExists { what: String },

    #[snafu(display("{}", what))]
    Missing { what: String },

    #[snafu(display("Unable to {}: {}", action, message))]
    Request { action: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }
}

/// A trait that makes it possible to convert SDK errors to gateway [`Error`]s using a familiar
/// `context` function. `action` describes the call and the resource it targeted, e.g.
/// `delete subnet 'subnet-123'`.
pub trait IntoGatewayError<T> {
    fn context<S>(self, action: S) -> Result<T>
    where
        S: Into<String>;
}

// The SDK's own `Display` is terse ("service error"), so the full error chain is rendered here.
impl<T, E> IntoGatewayError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<S>(self, action: S) -> Result<T>
    where
        S: Into<String>,
    {
        self.map_err(|e| Error::Request {
            action: action.into(),
            message: DisplayErrorContext(&e).to_string(),
        })
    }
}

// Implement `IntoGatewayError` for options where `None` is converted into an error.
impl<T> IntoGatewayError<T> for std::option::Option<T> {
    fn context<S>(self, what: S) -> Result<T>
    where
        S: Into<String>,
    {
        self.ok_or_else(|| Error::Missing { what: what.into() })
    }
}
