//! In-band error detection.
//!
//! Alpha Vantage reports bad keys, throttling, and plan limits as a small JSON
//! object with a 200 status. The detector peeks at the start of a body and
//! either surfaces that envelope or hands back an equivalent, unread body.

use bytes::BytesMut;
use futures::StreamExt;
use serde_json::{Map, Value};
use tracing::debug;

use crate::body::ResponseBody;
use crate::error::{Error, ServiceError};

/// Maximum number of bytes inspected before a body is passed through.
pub const PEEK_LIMIT: usize = 4096;

/// Envelope keys that carry an error message, in priority order.
pub const ERROR_KEYS: [&str; 3] = ["Error Message", "Note", "Information"];

/// Inspects the first [`PEEK_LIMIT`] bytes of `body`.
///
/// Returns the service error when the prefix is a complete JSON object with
/// one of the [`ERROR_KEYS`]; otherwise a body yielding the same bytes as the
/// original.
pub async fn detect(mut body: ResponseBody) -> Result<ResponseBody, Error> {
    let mut prefix = BytesMut::new();
    while prefix.len() < PEEK_LIMIT {
        match body.next().await {
            Some(chunk) => prefix.extend_from_slice(&chunk?),
            None => break,
        }
    }
    let prefix = prefix.freeze();

    if let Some(error) = inspect_prefix(&prefix) {
        debug!(key = %error.key, "service returned an error envelope");
        return Err(Error::Service(error));
    }
    Ok(ResponseBody::prepend(prefix, body))
}

/// Parses `prefix` as an error envelope.
///
/// Anything that is not a complete JSON object, including a body larger than
/// the peek window, is treated as data.
pub fn inspect_prefix(prefix: &[u8]) -> Option<ServiceError> {
    let trimmed = prefix.trim_ascii_start();
    if trimmed.first() != Some(&b'{') {
        return None;
    }
    let object = serde_json::from_slice::<Map<String, Value>>(trimmed).ok()?;

    ERROR_KEYS.iter().find_map(|key| {
        object.get(*key).map(|value| ServiceError {
            key: (*key).to_owned(),
            message: match value {
                Value::String(message) => message.clone(),
                other => other.to_string(),
            },
        })
    })
}
