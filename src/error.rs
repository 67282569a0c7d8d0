use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Allocation(String),
    InvalidConfig(String),
    InvalidData(String),
    InvalidShape(String),
    OptimizerAttached,
    MissingOptimizer,
    EmptyNetwork,
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Allocation(msg) => write!(f, "allocation failed: {msg}"),
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::InvalidShape(msg) => write!(f, "invalid shape: {msg}"),
            Error::OptimizerAttached => write!(f, "network already has an optimizer attached"),
            Error::MissingOptimizer => write!(f, "network has no optimizer attached"),
            Error::EmptyNetwork => write!(f, "network has no layers"),
        }
    }
}

impl std::error::Error for Error {}
