use std::fmt::{self, Display};

/// Errors that may occur while decoding or encoding a TLG image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// The input is shorter than required at the point it was read.
    UnexpectedEof,

    /// The first 11 bytes do not match the expected TLG5 or TLG6 magic.
    InvalidMagic,

    /// The header declares a channel count other than 3 or 4.
    UnsupportedChannelCount,

    /// A TLG6 band header declares an encoding method other than 0.
    UnsupportedMethod,

    /// The stream is internally inconsistent (size mismatches, block
    /// bookkeeping that doesn't add up, arithmetic that would overflow a
    /// buffer size) in a way that isn't a plain truncation.
    Corrupt,

    /// Caller-provided arguments don't match what the operation requires,
    /// e.g. an encoder pixel buffer whose length isn't `width * height * 4`.
    InvalidArgument,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedEof => f.write_str("unexpected end of input"),
            Error::InvalidMagic => f.write_str("input does not start with a TLG5 or TLG6 magic"),
            Error::UnsupportedChannelCount => {
                f.write_str("channel count must be 3 or 4")
            }
            Error::UnsupportedMethod => {
                f.write_str("unsupported TLG6 band encoding method")
            }
            Error::Corrupt => f.write_str("corrupt TLG data"),
            Error::InvalidArgument => f.write_str("invalid argument"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
