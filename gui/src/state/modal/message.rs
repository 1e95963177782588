use crate::{
    bold_text,
    context::Context,
    message::{UiMessage, ui_messages::MessageDialog as MyMessage},
    TryIntoExt,
};

use color_eyre::Result;
use iced::{
    Color, Element, Length, Task,
    widget::{button, column, container, text_editor, text_editor::Action},
};

use super::{DialogResult, modal_outer_container};

/// Read-only text with an Ok button, used for errors and first-start hints
#[derive(Debug, Clone)]
pub struct MessageDialog {
    pub title: String,
    editor_content: text_editor::Content,
}

impl MessageDialog {
    pub fn new(title: String, message: &str) -> Self {
        Self {
            title,
            editor_content: text_editor::Content::with_text(message),
        }
    }
}

impl super::Dialog for MessageDialog {
    fn update(&mut self, event: UiMessage, _ctx: &mut Context) -> Result<DialogResult> {
        use MyMessage::*;

        match event.try_into_ex()? {
            Confirm => Ok(DialogResult::Close(Task::none())),
            EditAction(a) => {
                // selection and scrolling only, the text stays as it is
                if !matches!(a, Action::Edit(_)) {
                    self.editor_content.perform(a);
                }
                Ok(DialogResult::Stay)
            }
        }
    }

    fn view<'a>(&'a self, _ctx: &'a Context) -> Element<'a, UiMessage> {
        modal_outer_container(
            column![
                bold_text(&self.title).size(20),
                container(
                    text_editor(&self.editor_content)
                        .on_action(|a| MyMessage::EditAction(a).into())
                )
                .style(|_theme| container::background(Color::from_rgb(0.95, 0.95, 0.95)))
                .padding(20),
                container(button("Ok").on_press(MyMessage::Confirm.into()))
                    .align_right(Length::Fill)
            ]
            .spacing(10),
        )
        .into()
    }
}
