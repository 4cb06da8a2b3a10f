//! implements a parser for the dispatch TCP protocol.
use thiserror::Error;

use crate::types::job::{JobId, JobType};
use crate::types::protocol::Command;
use crate::types::serialisable::WireSerialisable;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum ParsingError {
    #[error("bad format")]
    BadFormat,
    #[error("unknown command")]
    UnknownCommand,
    /// The command was well-formed but named an unknown job type.
    #[error("invalid input")]
    InvalidInput,
}

impl WireSerialisable for ParsingError {
    fn serialise_wire(&self) -> Vec<u8> {
        match self {
            ParsingError::BadFormat => b"BAD_FORMAT\r\n".to_vec(),
            ParsingError::UnknownCommand => b"UNKNOWN_COMMAND\r\n".to_vec(),
            ParsingError::InvalidInput => b"INVALID_INPUT\r\n".to_vec(),
        }
    }
}

/// Longest consumer identity accepted, in bytes.
pub const MAX_CONSUMER_LEN: usize = 200;

/// Provides a custom, minimal, zero-copy parser of byte slices.
struct ParseState<'a> {
    from: &'a [u8],
}

impl ParseState<'_> {
    /// Asserts there's no more input to take, returning `result` if so, and a
    /// `BadFormat` error otherwise.
    fn expect_done_and<R>(&self, result: R) -> Result<R, ParsingError> {
        if self.from.is_empty() {
            Ok(result)
        } else {
            Err(ParsingError::BadFormat)
        }
    }

    /// Consumes from the input, expecting a token of non-zero length.
    fn expect_next_token(&mut self) -> Result<&[u8], ParsingError> {
        let token = self.next_token().ok_or(ParsingError::BadFormat)?;

        if token.is_empty() {
            Err(ParsingError::BadFormat)
        } else {
            Ok(token)
        }
    }

    /// Consumes from the input, expecting a space then a job ID.
    fn expect_next_id(&mut self) -> Result<JobId, ParsingError> {
        self.expect_space()?;

        let token = self.expect_next_token()?;

        let mut r: JobId = 0;
        for v in token {
            match v {
                b'0'..=b'9' => {
                    r = r
                        .checked_mul(10)
                        .ok_or(ParsingError::BadFormat)?
                        .checked_add((*v - b'0') as JobId)
                        .ok_or(ParsingError::BadFormat)?
                },
                _ => return Err(ParsingError::BadFormat),
            };
        }

        Ok(r)
    }

    /// Consumes from the input, expecting a space then a job type name.
    fn expect_next_job_type(&mut self) -> Result<JobType, ParsingError> {
        self.expect_space()?;

        let token = self.expect_next_token()?;

        JobType::try_from(token).map_err(|_| ParsingError::InvalidInput)
    }

    /// Consumes from the input, expecting a space then a consumer identity.
    fn expect_next_consumer(&mut self) -> Result<String, ParsingError> {
        self.expect_space()?;

        let token = self.expect_next_token()?;

        fn char_is_name_safe(c: u8, is_first: bool) -> bool {
            match c {
                b'a'..=b'z' => true,
                b'A'..=b'Z' => true,
                b'0'..=b'9' => true,
                b'+' | b'/' | b';' | b'.' | b'$' | b'_' | b'(' | b')' => true,
                b'-' => !is_first, // - is only name safe outside first position
                _ => false,
            }
        }

        if token.len() <= MAX_CONSUMER_LEN
            && token
                .iter()
                .enumerate()
                .all(|(i, c)| char_is_name_safe(*c, i == 0))
        {
            // Every name-safe byte is ASCII.
            String::from_utf8(token.to_vec())
                .map_err(|_| ParsingError::BadFormat)
        } else {
            Err(ParsingError::BadFormat)
        }
    }

    /// Consumes a space.
    fn expect_space(&mut self) -> Result<(), ParsingError> {
        match self.from.first() {
            Some(b' ') => {
                self.from = &self.from[1..];
                Ok(())
            },
            _ => Err(ParsingError::BadFormat),
        }
    }

    /// Consumes from this ParseState until reaching a space byte or the end of
    /// the input. It returns None at the end of the input. On consecutive space
    /// bytes, it returns a zero-length slice.
    fn next_token(&mut self) -> Option<&[u8]> {
        if self.from.is_empty() {
            return None;
        }

        let idx = self
            .from
            .iter()
            .position(|c| *c == b' ')
            .unwrap_or(self.from.len());

        let token = &self.from[..idx];
        self.from = &self.from[idx..];

        Some(token)
    }
}

impl<'a> From<&'a [u8]> for ParseState<'a> {
    fn from(from: &'a [u8]) -> Self {
        ParseState { from }
    }
}

// Parsing is implemented to fulfil the TryFrom trait.
impl TryFrom<&[u8]> for Command {
    type Error = ParsingError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        use Command::*;

        let mut ps: ParseState = value.into();

        let cmd = match ps.expect_next_token()? {
            // <cmd>
            b"quit" => Quit,

            // <cmd> <id>
            b"cancel" => Cancel {
                id: ps.expect_next_id()?,
            },
            b"status" => Status {
                id: ps.expect_next_id()?,
            },

            // <cmd> <type>
            b"enqueue" => Enqueue {
                job_type: ps.expect_next_job_type()?,
            },

            // <cmd> <consumer>
            b"dequeue" => Dequeue {
                consumer: ps.expect_next_consumer()?,
            },

            // <cmd> <id> <consumer>
            b"conclude" => Conclude {
                id: ps.expect_next_id()?,
                consumer: ps.expect_next_consumer()?,
            },

            _ => return Err(ParsingError::UnknownCommand),
        };

        ps.expect_done_and(cmd)
    }
}
