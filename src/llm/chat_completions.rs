//! OpenAI Chat Completions API driver.
//!
//! This module implements the [`LlmDriver`] trait for the OpenAI-compatible
//! Chat Completions API (`/v1/chat/completions`) with streaming enabled.
//! `OpenRouter` speaks the same protocol, so one driver reaches every council
//! model.

use futures::StreamExt;

use super::{LlmDriver, LlmEvent, LlmEventStream, LlmRequest, LlmSettings};

/// Driver for the OpenAI Chat Completions API.
///
/// Connects to `/v1/chat/completions` and streams responses as
/// [`LlmEvent`]s.
#[derive(Clone)]
pub struct ChatCompletionsDriver {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsDriver")
            .field("base_url", &self.settings.base_url)
            .field("provider", &self.settings.provider)
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsDriver {
    /// Create a new Chat Completions driver with the given settings.
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }
}

#[async_trait::async_trait]
impl LlmDriver for ChatCompletionsDriver {
    async fn stream(&self, req: LlmRequest) -> anyhow::Result<LlmEventStream> {
        let url = self
            .settings
            .provider
            .build_chat_url(&self.settings.base_url);

        let mut body = serde_json::json!({
            "model": req.model,
            "stream": true,
            "messages": req.messages,
        });
        if let Some(t) = req.temperature {
            body["temperature"] = serde_json::json!(t);
        }

        let mut rb = self.http.post(&url).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = rb.bearer_auth(k);
        }
        for (name, value) in self.settings.provider.extra_headers() {
            rb = rb.header(*name, *value);
        }

        tracing::debug!(url = %url, model = %req.model, "Sending chat completions request");

        let resp = rb.send().await?.error_for_status()?;
        let byte_stream = resp.bytes_stream();

        let out = async_stream::try_stream! {
            let mut buf = Vec::<u8>::new();

            futures::pin_mut!(byte_stream);
            while let Some(chunk) = byte_stream.next().await {
                let chunk = chunk?;
                buf.extend_from_slice(&chunk);

                while let Some(frame) = next_frame(&mut buf) {
                    for event in parse_frame(&frame)? {
                        yield event;
                    }
                }
            }

            // Some upstreams close without a trailing blank line.
            for event in parse_frame(&buf)? {
                yield event;
            }
        };

        Ok(Box::pin(out))
    }
}

/// Parse a single SSE `data:` payload into driver events.
///
/// # Errors
///
/// Returns an error for malformed JSON or an upstream `error` object.
pub fn parse_data_line(data: &str) -> anyhow::Result<Vec<LlmEvent>> {
    if data == "[DONE]" {
        return Ok(vec![LlmEvent::Done]);
    }

    let v: serde_json::Value = serde_json::from_str(data)?;
    if let Some(err) = v.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("upstream error");
        anyhow::bail!("provider error: {message}");
    }

    let mut events = Vec::new();
    let delta = &v["choices"][0]["delta"];

    if let Some(s) = delta.get("content").and_then(|x| x.as_str())
        && !s.is_empty()
    {
        events.push(LlmEvent::ContentDelta(s.to_string()));
    }

    if let Some(details) = delta.get("reasoning_details").and_then(|x| x.as_array()) {
        events.extend(details.iter().cloned().map(LlmEvent::ReasoningDetail));
    }

    Ok(events)
}

/// Drain the first complete SSE frame from `buf`.
///
/// Frames end at a blank line, written as either `\n\n` or `\r\n\r\n`.
fn next_frame(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|p| p + 2);
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4);
    let end = match (lf, crlf) {
        (Some(a), Some(b)) => a.min(b),
        (a, b) => a.or(b)?,
    };
    Some(buf.drain(..end).collect())
}

/// Parse every `data:` line of one SSE frame.
fn parse_frame(frame: &[u8]) -> anyhow::Result<Vec<LlmEvent>> {
    let text = String::from_utf8_lossy(frame);
    let mut events = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        // Comments such as ": OPENROUTER PROCESSING" keep the connection alive.
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        events.extend(parse_data_line(data.trim())?);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_delta() {
        let events =
            parse_data_line(r#"{"choices":[{"delta":{"content":"Hello"}}]}"#).unwrap();
        assert_eq!(events, vec![LlmEvent::ContentDelta("Hello".to_string())]);
    }

    #[test]
    fn test_parse_empty_content_is_skipped() {
        let events = parse_data_line(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_parse_done_marker() {
        assert_eq!(parse_data_line("[DONE]").unwrap(), vec![LlmEvent::Done]);
    }

    #[test]
    fn test_parse_reasoning_details() {
        let events = parse_data_line(
            r#"{"choices":[{"delta":{"reasoning_details":[{"type":"reasoning.text","text":"hmm"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], LlmEvent::ReasoningDetail(v) if v["text"] == "hmm"));
    }

    #[test]
    fn test_parse_upstream_error() {
        let err = parse_data_line(r#"{"error":{"message":"rate limited"}}"#).unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_next_frame_lf() {
        let mut buf = b"data: x\n\nrest".to_vec();
        assert_eq!(next_frame(&mut buf).unwrap(), b"data: x\n\n");
        assert_eq!(buf, b"rest");
        assert!(next_frame(&mut buf).is_none());
    }

    #[test]
    fn test_next_frame_crlf() {
        let mut buf =
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\r\n\r\ndata: [DONE]\r\n\r\n"
                .to_vec();
        let first = next_frame(&mut buf).unwrap();
        assert_eq!(
            parse_frame(&first).unwrap(),
            vec![LlmEvent::ContentDelta("Hi".to_string())]
        );
        let second = next_frame(&mut buf).unwrap();
        assert_eq!(parse_frame(&second).unwrap(), vec![LlmEvent::Done]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame_waits_for_blank_line() {
        let mut buf = b"data: x\r\n".to_vec();
        assert!(next_frame(&mut buf).is_none());
        assert_eq!(buf, b"data: x\r\n");
    }

    #[test]
    fn test_trailing_frame_without_blank_line() {
        let mut buf = b": OPENROUTER PROCESSING\n\ndata: [DONE]".to_vec();
        let comment = next_frame(&mut buf).unwrap();
        assert!(parse_frame(&comment).unwrap().is_empty());
        assert!(next_frame(&mut buf).is_none());
        assert_eq!(parse_frame(&buf).unwrap(), vec![LlmEvent::Done]);
    }

    #[test]
    fn test_empty_remainder_yields_nothing() {
        assert!(parse_frame(b"").unwrap().is_empty());
        assert!(parse_frame(b"\r\n").unwrap().is_empty());
    }
}
