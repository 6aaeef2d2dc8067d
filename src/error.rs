use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by WAPI client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Grid host and WAPI version do not form a valid base URL.
    #[error("invalid WAPI host '{0}'")]
    InvalidHost(String),

    /// Object type or reference could not be appended to the base URL.
    #[error("invalid WAPI resource '{0}'")]
    InvalidPath(String),

    /// A call argument was rejected before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// HTTP transport-layer request failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body could not be parsed as JSON.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success HTTP status, decoded from the WAPI error payload.
    #[error("{}: {}", .status.as_u16(), .message)]
    Wapi {
        status: StatusCode,
        /// The `Error` member of the payload.
        message: String,
        /// The `code` member of the payload, e.g. `Client.Ibap.Data.NotFound`.
        code: Option<String>,
        /// The `text` member of the payload, or the raw body when it is not JSON.
        text: Option<String>,
    },

    /// A result set with a negative `max_results` came back larger than allowed.
    #[error("result set of {actual} exceeds the max_results limit of {max_results}")]
    LimitExceeded { max_results: u64, actual: usize },

    /// A successful response did not have the expected shape.
    #[error("unexpected WAPI response: {0}")]
    UnexpectedResponse(String),
}

impl ClientError {
    /// Returns the HTTP status carried by API errors and status-bearing transport errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Wapi { status, .. } => Some(*status),
            Self::Request(error) => error.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::ClientError;

    #[test]
    fn wapi_error_displays_status_and_message() {
        let error = ClientError::Wapi {
            status: StatusCode::BAD_REQUEST,
            message: "AdmConProtoError: Unknown argument/field: 'nme'".to_owned(),
            code: Some("Client.Ibap.Proto".to_owned()),
            text: None,
        };
        assert_eq!(
            error.to_string(),
            "400: AdmConProtoError: Unknown argument/field: 'nme'"
        );
        assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn local_errors_carry_no_status() {
        let error = ClientError::InvalidArgument("max_results cannot be zero".to_owned());
        assert_eq!(error.status(), None);
    }
}
