// HTTP plumbing for the generative-AI service.
//
// All higher-level calls (grading, rubric generation, insights, chat) go
// through `send_generate_request`, which owns status-code classification, and
// `extract_text`, which pulls the model's text out of the response envelope.

use serde_json::Value;

use crate::credentials::GeminiCredentials;
use crate::error::GradingError;

/// The maximum number of simultaneous generate calls allowed per client.
///
/// The upstream service enforces per-key rate limits; bounding in-flight
/// requests keeps a parallelized caller from tripping them immediately. The
/// limit is held as instance state on the client (a `tokio::sync::Semaphore`),
/// not as a process-wide global.
pub(crate) const SIMULTANEOUS_REQUESTS_LIMIT: usize = 20;

/// Sends one `generateContent` request and classifies the outcome.
///
/// Arguments:
/// - `http`: Shared HTTP client for executing requests.
/// - `credentials`: API endpoint and key.
/// - `model`: Model identifier, e.g. `gemini-3-pro-preview`.
/// - `body`: Full JSON request body (contents, system instruction, config).
///
/// Returns:
/// - `Ok(Value)`: The raw JSON response envelope.
/// - `Err(GradingError)`: Classified per status code; transport failures are
///   `Unknown`, a non-JSON body is `Malformed`.
///
/// There is deliberately no retry loop here: a 429 is returned to the caller
/// as `RateLimited` so the orchestrator can decide what to do with that
/// student, and a 403 is fatal until the credential is reconfigured.
pub(crate) async fn send_generate_request(
    http: &reqwest::Client,
    credentials: &GeminiCredentials,
    model: &str,
    body: &Value,
) -> Result<Value, GradingError> {
    let url = format!("{}/models/{}:generateContent", credentials.api_url, model);

    let response = http
        .post(&url)
        .query(&[("key", credentials.api_key.as_str())])
        .json(body)
        .send()
        .await
        .map_err(|e| GradingError::Unknown(format!("transport error: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GradingError::from_status(status.as_u16(), &body));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| GradingError::Malformed(format!("response body is not JSON: {}", e)))
}

/// Extracts the first candidate's text from a `generateContent` response.
///
/// The envelope nests the payload under `candidates[0].content.parts[*].text`;
/// parts are concatenated in order. A response with no candidate text is a
/// `Malformed` failure, never an empty success.
pub(crate) fn extract_text(response: &Value) -> Result<String, GradingError> {
    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| GradingError::Malformed("no candidates in response".to_string()))?;

    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();

    if text.is_empty() {
        Err(GradingError::Malformed(
            "candidate contained no text".to_string(),
        ))
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_text_concatenates_parts() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [{ "text": "first " }, { "text": "second" }]
                }
            }]
        });

        assert_eq!(extract_text(&response).unwrap(), "first second");
    }

    #[test]
    fn extract_text_rejects_missing_candidates() {
        let response = json!({ "promptFeedback": {} });

        assert!(matches!(
            extract_text(&response),
            Err(GradingError::Malformed(_))
        ));
    }

    #[test]
    fn extract_text_rejects_textless_candidate() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "inlineData": {} }] } }]
        });

        assert!(matches!(
            extract_text(&response),
            Err(GradingError::Malformed(_))
        ));
    }
}
