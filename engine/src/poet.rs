use std::pin::Pin;

use color_eyre::Result;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

mod claude;
pub use claude::Claude;

pub mod open_ai_chat;
pub use open_ai_chat::OpenAIChat;

use crate::PoetBox;

pub const MAX_POEM_TOKENS: usize = 1024;

pub const POET_INSTRUCTIONS: &str = indoc::indoc! {"
    You are a poet. Generate a poem inspired by the image provided. Consider the image's
    content, mood, and dominant colors when crafting the poem. The poem should be creative
    and evoke emotion.

    Answer with the poem only: no title line, no preface, no commentary.
"};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poem {
    pub text: String,
}

/// The generation collaborator: one encoded image in, one poem out
pub trait PoemGenerator {
    /// `encoded_image` is a `data:<mime>;base64,<payload>` string
    fn generate_poem<'a>(
        &'a self,
        encoded_image: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Poem>> + Send + 'a>>;

    fn clone(&self) -> PoetBox;
    fn provider(&self) -> Provider;
}

#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    clap::ValueEnum,
    Serialize,
    Deserialize,
    Hash,
    PartialEq,
    Eq,
    EnumIter,
    Default,
)]
pub enum Provider {
    #[default]
    #[strum(to_string = "Anthropic (Claude)")]
    Claude,
    #[strum(to_string = "OpenAI compatible")]
    OpenAI,
}

/// Everything a provider needs to build its client
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl Provider {
    pub fn make(&self, settings: ProviderSettings) -> PoetBox {
        let ProviderSettings {
            api_key,
            base_url,
            model,
        } = settings;
        match self {
            Provider::Claude => Box::new(Claude::new(
                api_key,
                model.unwrap_or_else(|| crate::CLAUDE_MODEL.into()),
            )),
            Provider::OpenAI => Box::new(OpenAIChat::new(
                api_key,
                base_url.unwrap_or_else(|| open_ai_chat::DEFAULT_BASE_URL.into()),
                model.unwrap_or_else(|| open_ai_chat::DEFAULT_MODEL.into()),
            )),
        }
    }
}
