use reqwest::StatusCode;
use serde_json::Value;

use crate::ClientError;

/// Decodes a success body. An empty body becomes [`Value::Null`].
pub(crate) fn decode_body(payload: &str) -> Result<Value, ClientError> {
    if payload.trim().is_empty() {
        Ok(Value::Null)
    } else {
        Ok(serde_json::from_str(payload)?)
    }
}

/// Builds [`ClientError::Wapi`] from a failed response body.
///
/// Members of a JSON body are read leniently; only an unparsable body falls
/// back to the raw text.
pub(crate) fn api_error(status: StatusCode, payload: &str) -> ClientError {
    let Ok(body) = serde_json::from_str::<Value>(payload) else {
        return ClientError::Wapi {
            status,
            message: "Unknown error (non-JSON response)".to_owned(),
            code: None,
            text: Some(payload.to_owned()),
        };
    };

    ClientError::Wapi {
        status,
        message: member(&body, "Error").unwrap_or_else(|| "Unknown error".to_owned()),
        code: member(&body, "code"),
        text: member(&body, "text"),
    }
}

/// Renders a scalar member as text; WAPI sometimes sends numeric codes.
fn member(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::Null => None,
        Value::String(value) => Some(value.clone()),
        other => Some(other.to_string()),
    }
}

/// Extracts the `_ref` string that create/update/delete calls return.
pub(crate) fn into_reference(value: Value) -> Result<String, ClientError> {
    match value {
        Value::String(reference) => Ok(reference),
        other => Err(ClientError::UnexpectedResponse(format!(
            "expected an object reference, got {other}"
        ))),
    }
}

/// Normalizes an unpaged read to a list of objects.
pub(crate) fn into_object_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(objects) => objects,
        Value::Null => Vec::new(),
        object => vec![object],
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    use super::{api_error, decode_body, into_object_list, into_reference};
    use crate::ClientError;

    #[test]
    fn empty_body_decodes_to_null() {
        assert_eq!(decode_body("  \n").expect("empty is fine"), Value::Null);
    }

    #[test]
    fn json_error_payload_is_unpacked() {
        let payload = r#"{"Error": "AdmConDataNotFoundError: Reference record:host/abc not found",
                          "code": "Client.Ibap.Data.NotFound",
                          "text": "Reference record:host/abc not found"}"#;
        match api_error(StatusCode::NOT_FOUND, payload) {
            ClientError::Wapi {
                status,
                message,
                code,
                text,
            } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert!(message.starts_with("AdmConDataNotFoundError"));
                assert_eq!(code.as_deref(), Some("Client.Ibap.Data.NotFound"));
                assert_eq!(text.as_deref(), Some("Reference record:host/abc not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_json_error_keeps_raw_body() {
        match api_error(StatusCode::BAD_GATEWAY, "<html>proxy error</html>") {
            ClientError::Wapi {
                message, code, text, ..
            } => {
                assert_eq!(message, "Unknown error (non-JSON response)");
                assert_eq!(code, None);
                assert_eq!(text.as_deref(), Some("<html>proxy error</html>"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn numeric_code_keeps_server_message() {
        let payload = r#"{"Error": "AdmConProtoError: bad", "code": 400, "text": "bad"}"#;
        match api_error(StatusCode::BAD_REQUEST, payload) {
            ClientError::Wapi {
                message, code, text, ..
            } => {
                assert_eq!(message, "AdmConProtoError: bad");
                assert_eq!(code.as_deref(), Some("400"));
                assert_eq!(text.as_deref(), Some("bad"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn json_body_without_members_is_not_treated_as_text() {
        match api_error(StatusCode::INTERNAL_SERVER_ERROR, r#"["unexpected"]"#) {
            ClientError::Wapi {
                message, code, text, ..
            } => {
                assert_eq!(message, "Unknown error");
                assert_eq!(code, None);
                assert_eq!(text, None);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reference_must_be_a_string() {
        assert_eq!(
            into_reference(json!("network/ZG5zLm5ldHdvcms:10.0.0.0/24/default"))
                .expect("string ref"),
            "network/ZG5zLm5ldHdvcms:10.0.0.0/24/default"
        );
        assert!(matches!(
            into_reference(json!({"_ref": "x"})),
            Err(ClientError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn single_object_becomes_one_element_list() {
        assert_eq!(into_object_list(json!({"_ref": "a"})).len(), 1);
        assert_eq!(into_object_list(json!([{"_ref": "a"}, {"_ref": "b"}])).len(), 2);
    }
}
