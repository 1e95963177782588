use color_eyre::Result;
use engine::{
    CLAUDE_MODEL,
    poet::{
        Provider,
        open_ai_chat::{DEFAULT_BASE_URL, DEFAULT_MODEL},
    },
};
use iced::{
    Length,
    widget::{button, column, radio, row, space, text, text_input},
};
use strum::IntoEnumIterator;

use crate::{
    TryIntoExt, bold_text,
    context::Context,
    elem_list, italic_text,
    message::{UiMessage, ui_messages::OptionsMenu as MyMessage},
    save_config,
    state::{PoetScreen, State, StateCommand, cmd},
    top_level_container,
};

#[derive(Debug, Clone)]
pub struct OptionsMenu;

impl State for OptionsMenu {
    fn update(&mut self, event: UiMessage, ctx: &mut Context) -> Result<StateCommand> {
        let msg: MyMessage = event.try_into_ex()?;

        use MyMessage::*;
        match msg {
            SelectProvider(provider) => {
                ctx.config.provider = provider;
                cmd::none()
            }

            ClaudeTokenChanged(val) => {
                ctx.config.claude_token = val;
                cmd::none()
            }

            OpenAITokenChanged(val) => {
                ctx.config.openai_token = val;
                cmd::none()
            }

            OpenAIBaseUrlChanged(val) => {
                ctx.config.openai_base_url = val;
                cmd::none()
            }

            OpenAIModelChanged(val) => {
                ctx.config.openai_model = val;
                cmd::none()
            }

            ExportDirChanged(val) => {
                ctx.config.export_dir = val;
                cmd::none()
            }

            Ok => {
                save_config(&ctx.config)?;
                cmd::transition(PoetScreen)
            }
        }
    }

    fn view<'a>(&'a self, ctx: &'a Context) -> iced::Element<'a, UiMessage> {
        let items = Vec::from(elem_list![
            bold_text("Options").width(Length::Fill).center(),
            space().height(20),
            text("Poem Provider"),
            column(Provider::iter().map(|p| {
                radio(p.to_string(), p, Some(ctx.config.provider), |p| {
                    MyMessage::SelectProvider(p).into()
                })
                .into()
            }))
            .spacing(10),
            space().height(20),
            bold_text("Anthropic (Claude)"),
            text("API Key"),
            text_input("sk-ant-...", &ctx.config.claude_token)
                .on_input(|s| MyMessage::ClaudeTokenChanged(s).into())
                .secure(true)
                .width(Length::Fill),
            italic_text(CLAUDE_MODEL).size(12),
            space().height(20),
            bold_text("OpenAI compatible"),
            text("API Key"),
            text_input("sk-...", &ctx.config.openai_token)
                .on_input(|s| MyMessage::OpenAITokenChanged(s).into())
                .secure(true)
                .width(Length::Fill),
            text("Endpoint"),
            text_input(DEFAULT_BASE_URL, &ctx.config.openai_base_url)
                .on_input(|s| MyMessage::OpenAIBaseUrlChanged(s).into())
                .width(Length::Fill),
            text("Model"),
            text_input(DEFAULT_MODEL, &ctx.config.openai_model)
                .on_input(|s| MyMessage::OpenAIModelChanged(s).into())
                .width(Length::Fill),
            space().height(20),
            bold_text("Export Folder"),
            text_input("Downloads folder", &ctx.config.export_dir)
                .on_input(|s| MyMessage::ExportDirChanged(s).into())
                .width(Length::Fill),
            space().height(30),
            row![button("Ok").on_press(MyMessage::Ok.into())],
        ]);

        top_level_container(
            column(items)
                .spacing(12)
                .width(Length::Fill)
                .height(Length::Fill),
            700.,
        )
        .into()
    }

    fn clone(&self) -> Box<dyn State> {
        Box::new(Clone::clone(self))
    }
}
