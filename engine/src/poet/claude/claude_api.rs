use std::time::Duration;

use color_eyre::{
    Result,
    eyre::{ensure, eyre},
};
use log::debug;
use reqwest::header::{self, HeaderValue};
use serde::{Deserialize, Serialize};

mod error;
pub use error::ClaudeApiError;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const TIMEOUT: Duration = Duration::from_secs(60 * 3);

#[derive(Debug)]
pub struct Request {
    pub api_key: String,
    pub data: RequestBody,
}

#[derive(Debug, Serialize)]
pub struct RequestBody {
    pub model: String,
    pub max_tokens: usize,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub role: &'static str,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user(content: Vec<ContentBlock>) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

impl ContentBlock {
    pub fn image(media_type: String, data: String) -> Self {
        Self::Image {
            source: ImageSource {
                source_type: "base64",
                media_type,
                data,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: &'static str,
    pub media_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct ResponseBody {
    pub role: String,
    pub content: Vec<ResponseBlock>,
    pub usage: Usage,
}

impl ResponseBody {
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct ResponseBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: InnerError,
}

#[derive(Debug, Deserialize)]
struct InnerError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

pub async fn send_request(req: Request, client: &reqwest::Client) -> Result<ResponseBody> {
    let request = client
        .post(MESSAGES_URL)
        .timeout(TIMEOUT)
        .json(&req.data)
        .header("x-api-key", &req.api_key)
        .header("anthropic-version", HeaderValue::from_static("2023-06-01"))
        .header(header::ACCEPT, HeaderValue::from_static("application/json"));

    debug!("request: {request:#?}");
    let res = request.send().await?;

    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(error_from_body(status, &body));
    }

    let response: ResponseBody = serde_json::from_str(&body)?;
    ensure!(
        response.role == "assistant",
        "Unexpected role in received message: {}",
        response.role
    );
    Ok(response)
}

fn error_from_body(status: reqwest::StatusCode, body: &str) -> color_eyre::Report {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => {
            ClaudeApiError::from_type(&error.error_type, error.message).into()
        }
        Err(_) => eyre!("Anthropic error {}: {}", status, body),
    }
}

#[cfg(test)]
mod test {
    use expect_test::expect;

    use super::*;

    #[test]
    fn request_serialization() {
        let body = RequestBody {
            model: "model".into(),
            max_tokens: 200,
            messages: vec![Message::user(vec![
                ContentBlock::image("image/png".into(), "iVBORw==".into()),
                ContentBlock::Text {
                    text: "Write a poem".into(),
                },
            ])],
        };

        let expect = expect![[r#"{"model":"model","max_tokens":200,"messages":[{"role":"user","content":[{"type":"image","source":{"type":"base64","media_type":"image/png","data":"iVBORw=="}},{"type":"text","text":"Write a poem"}]}]}"#]];
        expect.assert_eq(&serde_json::to_string(&body).unwrap());
    }

    #[test]
    fn response_text_joins_text_blocks() {
        let body: ResponseBody = serde_json::from_str(
            r#"{
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "Golden light,\n"},
                    {"type": "text", "text": "quiet sea."}
                ],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 1200, "output_tokens": 20}
            }"#,
        )
        .unwrap();

        assert_eq!(body.text(), "Golden light,\nquiet sea.");
        assert_eq!(body.usage.input_tokens, 1200);
    }

    #[test]
    fn error_envelope_keeps_the_api_message() {
        let err = error_from_body(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"type":"error","error":{"type":"rate_limit_error","message":"Slow down"}}"#,
        );
        assert!(matches!(
            err.downcast_ref::<ClaudeApiError>(),
            Some(ClaudeApiError::RateLimit { .. })
        ));
        assert_eq!(err.to_string(), "Rate limit exceeded (429): Slow down");

        let err = error_from_body(reqwest::StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(
            err.to_string(),
            "Anthropic error 502 Bad Gateway: <html>bad gateway</html>"
        );
    }
}
