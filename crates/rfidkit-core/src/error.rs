use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Tag errors
    #[error("Tag EPC cannot be empty")]
    EmptyEpc,

    // Bank errors
    #[error("Unknown memory bank: {0}")]
    UnknownBank(String),
}

pub type Result<T> = std::result::Result<T, Error>;
