use std::pin::Pin;

use color_eyre::Result;
use log::debug;

use super::{MAX_POEM_TOKENS, POET_INSTRUCTIONS, Poem, PoemGenerator, Provider};
use crate::{PoetBox, data_uri::DataUri};

mod claude_api;

#[derive(Clone)]
pub struct Claude {
    pub api_key: String,
    pub model: String,
    pub client: reqwest::Client,
}

impl Claude {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

impl PoemGenerator for Claude {
    fn generate_poem<'a>(
        &'a self,
        encoded_image: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Poem>> + Send + 'a>> {
        Box::pin(async move {
            let DataUri {
                media_type,
                payload,
            } = DataUri::parse(encoded_image)?;

            let req = claude_api::Request {
                api_key: self.api_key.clone(),
                data: claude_api::RequestBody {
                    model: self.model.clone(),
                    max_tokens: MAX_POEM_TOKENS,
                    messages: vec![claude_api::Message::user(vec![
                        claude_api::ContentBlock::image(media_type, payload),
                        claude_api::ContentBlock::Text {
                            text: POET_INSTRUCTIONS.into(),
                        },
                    ])],
                },
            };

            let response = claude_api::send_request(req, &self.client).await?;
            debug!(
                "Claude usage: {} in, {} out",
                response.usage.input_tokens, response.usage.output_tokens
            );
            Ok(Poem {
                text: response.text().trim().to_string(),
            })
        })
    }

    fn clone(&self) -> PoetBox {
        Box::new(Clone::clone(self))
    }

    fn provider(&self) -> Provider {
        Provider::Claude
    }
}
