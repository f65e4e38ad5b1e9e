use crate::Error;
use reqwest::{Response, StatusCode};

/// Trait for converting a 404 error into an `Option<Response>`.
///
/// A 404 from the standard API means the resource does not exist *yet* on
/// this node; callers polling a syncing node treat it as retryable rather
/// than terminal.
pub trait ResponseOptional {
    fn optional(self) -> Result<Option<Response>, Error>;
}

impl ResponseOptional for Result<Response, Error> {
    fn optional(self) -> Result<Option<Response>, Error> {
        match self {
            Ok(x) => Ok(Some(x)),
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
