#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid length prefix: {0:?}")]
    InvalidLength(String),
    #[error("unrecognized data type: {0:?}")]
    InvalidType(char),
    #[error("unterminated {0}")]
    UnterminatedContainer(&'static str),
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),
    #[error("dictionary key is not a byte string")]
    InvalidKey,
    #[error("{0} trailing bytes after value")]
    TrailingData(usize),
    #[error("integer {0} does not fit in i64")]
    IntegerOverflow(String),
    #[error("nesting deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
