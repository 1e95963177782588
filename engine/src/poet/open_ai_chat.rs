use std::pin::Pin;

use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{MAX_POEM_TOKENS, POET_INSTRUCTIONS, Poem, PoemGenerator, Provider};
use crate::PoetBox;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct OpenAIChat {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAIChat {
    pub fn new(api_key: String, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    fn build_request(&self, encoded_image: &str) -> OpenAIChatRequest {
        OpenAIChatRequest {
            model: self.model.clone(),
            max_tokens: MAX_POEM_TOKENS,
            messages: vec![OpenAIMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: POET_INSTRUCTIONS.into(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: encoded_image.into(),
                        },
                    },
                ],
            }],
        }
    }
}

impl PoemGenerator for OpenAIChat {
    fn generate_poem<'a>(
        &'a self,
        encoded_image: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Poem>> + Send + 'a>> {
        Box::pin(async move {
            let body = self.build_request(encoded_image);

            let res = self
                .client
                .post(&self.base_url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .context("initial response")?;

            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(match serde_json::from_str::<OpenAIErrorEnvelope>(&text) {
                    Ok(envelope) => eyre!("{}", envelope.error.message),
                    Err(_) => eyre!("OpenAI error {}: {}", status, text),
                });
            }

            let response: OpenAIChatResponse =
                serde_json::from_str(&text).context("parsing chat response")?;
            if let Some(usage) = &response.usage {
                debug!(
                    "OpenAI usage: {} in, {} out",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            let content = response
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| eyre!("Response contained no message content"))?;

            Ok(Poem {
                text: content.trim().to_string(),
            })
        })
    }

    fn clone(&self) -> PoetBox {
        Box::new(Clone::clone(self))
    }

    fn provider(&self) -> Provider {
        Provider::OpenAI
    }
}

//
// ===== OpenAI wire types =====
//

#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    max_tokens: usize,
    messages: Vec<OpenAIMessage>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

#[derive(Deserialize)]
struct OpenAIErrorEnvelope {
    error: OpenAIError,
}

#[derive(Deserialize)]
struct OpenAIError {
    message: String,
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;

    #[test]
    fn image_goes_out_as_data_uri_part() {
        let chat = OpenAIChat::new("key".into(), DEFAULT_BASE_URL, "vision-model");
        let mut body = chat.build_request("data:image/gif;base64,R0lG");
        if let ContentPart::Text { text } = &mut body.messages[0].content[0] {
            *text = "Write a poem".into();
        }

        let expect = expect![[r#"{"model":"vision-model","max_tokens":1024,"messages":[{"role":"user","content":[{"type":"text","text":"Write a poem"},{"type":"image_url","image_url":{"url":"data:image/gif;base64,R0lG"}}]}]}"#]];
        expect.assert_eq(&serde_json::to_string(&body).unwrap());
    }

    #[test]
    fn response_content_is_read_from_first_choice() {
        let response: OpenAIChatResponse = serde_json::from_str(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Rain on glass"}}]}"#,
        )
        .unwrap();
        assert!(response.usage.is_none());
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("Rain on glass")
        );
    }
}
