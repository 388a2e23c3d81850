use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("Malformed indel '{text}': {reason}")]
    MalformedIndel { text: String, reason: String },
    #[error(
        "Stored feature names associated with model thetas are not contained in those computed ({missing} missing, e.g. '{example}')"
    )]
    FeatureMismatch { missing: usize, example: String },
    #[error("Oligo {0} is part of the stored training set and cannot be used for testing")]
    TrainTestLeakage(String),
    #[error("Invalid target: {0}")]
    InvalidTarget(String),
    #[error("{0}")]
    Msg(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Msg(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Msg(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn handle_error_and_exit(err: Error) -> ! {
    log::error!("{}", err);
    std::process::exit(1);
}
