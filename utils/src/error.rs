use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("An AWS region is required but an empty one was given"))]
    EmptyRegion,
}

pub type Result<T> = std::result::Result<T, Error>;
