use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("{0}")]
    Reported(String),
}

pub fn http_client(timeout_secs: u64) -> Result<Client, BackendError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("jaklis/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|source| BackendError::Transport {
            url: String::new(),
            source,
        })
}

/// Sends `req` and parses the body as JSON, whatever the status code.
/// Elasticsearch and GraphQL both put their error details in the body.
pub fn send_json(req: RequestBuilder, url: &str) -> Result<(u16, Value), BackendError> {
    let resp = req.send().map_err(|source| BackendError::Transport {
        url: url.to_string(),
        source,
    })?;
    let status = resp.status().as_u16();
    let text = resp.text().map_err(|source| BackendError::Transport {
        url: url.to_string(),
        source,
    })?;
    match serde_json::from_str(&text) {
        Ok(v) => Ok((status, v)),
        Err(_) if !(200..300).contains(&status) => Err(BackendError::Status {
            url: url.to_string(),
            status,
        }),
        Err(e) => Err(BackendError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        }),
    }
}

pub fn decode<T: DeserializeOwned>(value: Value, url: &str) -> Result<T, BackendError> {
    serde_json::from_value(value).map_err(|e| BackendError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Text of an Elasticsearch-style `error` member, if the body carries one.
pub fn reported_error(body: &Value) -> Option<String> {
    let err = body.get("error")?;
    if err.is_null() {
        return None;
    }
    let text = match err {
        Value::String(s) => s.clone(),
        _ => err
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string()),
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::reported_error;
    use serde_json::json;

    #[test]
    fn reported_error_prefers_the_reason_text() {
        let body = json!({"error": {
            "type": "search_context_missing_exception",
            "reason": "No search context found"
        }});
        assert_eq!(reported_error(&body).as_deref(), Some("No search context found"));
        assert_eq!(
            reported_error(&json!({"error": "boom"})).as_deref(),
            Some("boom")
        );
        assert_eq!(reported_error(&json!({"error": null})), None);
        assert_eq!(reported_error(&json!({"hits": {"hits": []}})), None);
    }
}
