//! Crate-wide error type, built the way `garage_util::error` builds its own:
//! a flat enum derived with `err_derive`, plus a couple of small extension
//! traits that turn `Option`/pattern mismatches into `Error` without
//! boilerplate at call sites.

use err_derive::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error(display = "{}", _0)]
	Message(String),

	#[error(display = "IO error: {}", _0)]
	Io(#[error(source)] std::io::Error),

	#[error(display = "Connection checkout timed out after {:?}", _0)]
	CheckoutTimeout(std::time::Duration),

	#[error(display = "Protocol error: {}", _0)]
	Protocol(String),

	#[error(display = "Config error: {}", _0)]
	Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<toml::de::Error> for Error {
	fn from(e: toml::de::Error) -> Error {
		Error::Config(e.to_string())
	}
}

/// Turns a missing value into a [`Error::Message`], mirroring
/// `garage_util::error::OkOrMessage`.
pub trait OkOrMessage<T> {
	fn ok_or_message<M: Into<String>>(self, msg: M) -> Result<T>;
}

impl<T> OkOrMessage<T> for Option<T> {
	fn ok_or_message<M: Into<String>>(self, msg: M) -> Result<T> {
		self.ok_or_else(|| Error::Message(msg.into()))
	}
}

impl Error {
	/// Build a `Message` error reporting that a response did not match what
	/// the protocol expected (wrong variant, wrong count, wrong partition...).
	pub fn unexpected(what: impl std::fmt::Display) -> Error {
		Error::Protocol(format!("unexpected response: {}", what))
	}
}
