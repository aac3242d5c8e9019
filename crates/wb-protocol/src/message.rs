use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request envelope as it travels on the wire.
///
/// `method` stays textual here so an unknown name can be reported as a
/// validation failure rather than a decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Method name.
    pub method: String,
    /// Method parameters; `null` when omitted.
    #[serde(default)]
    pub params: Value,
}

/// Response envelope: exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// The request succeeded.
    Success {
        /// Method result, `null` for methods without one.
        result: Value,
    },
    /// The request failed.
    Failure {
        /// Human-readable failure description.
        error: String,
    },
}

impl Response {
    /// Builds a success response.
    #[must_use]
    pub const fn success(result: Value) -> Self {
        Self::Success { result }
    }

    /// Builds a failure response from anything displayable.
    #[must_use]
    pub fn failure(error: impl std::fmt::Display) -> Self {
        Self::Failure {
            error: error.to_string(),
        }
    }

    /// Converts the envelope into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the daemon's error text for failure responses.
    pub fn into_result(self) -> Result<Value, String> {
        match self {
            Self::Success { result } => Ok(result),
            Self::Failure { error } => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn responses_use_result_or_error_keys() {
        let success = serde_json::to_value(Response::success(json!(["a"]))).expect("serialise");
        assert_eq!(success, json!({"result": ["a"]}));
        let failure = serde_json::to_value(Response::failure("no current tab set"))
            .expect("serialise");
        assert_eq!(failure, json!({"error": "no current tab set"}));
    }

    #[test]
    fn null_result_decodes_as_success() {
        let response: Response = serde_json::from_value(json!({"result": null})).expect("decode");
        assert_eq!(response.into_result(), Ok(Value::Null));
    }

    #[test]
    fn error_decodes_as_failure() {
        let response: Response =
            serde_json::from_value(json!({"error": "tab 'a' does not exist"})).expect("decode");
        assert_eq!(
            response.into_result(),
            Err("tab 'a' does not exist".to_owned())
        );
    }

    #[test]
    fn request_params_default_to_null() {
        let request: Request = serde_json::from_value(json!({"method": "listTabs"})).expect("decode");
        assert_eq!(request.params, Value::Null);
    }
}
