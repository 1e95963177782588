use color_eyre::Result;
use engine::session::{GenerationState, Notice};
use iced::{
    Border, Color, Element, Length,
    alignment::Horizontal,
    widget::{self, button, column, container, row, scrollable, text},
};

use crate::{
    TryIntoExt, bold_text,
    context::Context,
    elem_list, italic_text,
    message::{UiMessage, ui_messages::PoetScreen as MyMessage},
    state::{State, StateCommand, cmd, options_menu::OptionsMenu},
    top_level_container,
};

const ACCENT: Color = Color::from_rgb(0.85, 0.45, 0.2);
const DESTRUCTIVE: Color = Color::from_rgb(0.75, 0.15, 0.15);

/// Upload panel on the left, poem panel on the right
#[derive(Debug, Clone)]
pub struct PoetScreen;

impl State for PoetScreen {
    fn update(&mut self, event: UiMessage, ctx: &mut Context) -> Result<StateCommand> {
        use MyMessage::*;
        match event.try_into_ex()? {
            PickFile => cmd::task(ctx.pick_file()),
            Generate => cmd::task(ctx.generate()),
            Save => {
                ctx.export()?;
                cmd::none()
            }
            DismissNotice(idx) => {
                ctx.dismiss_notice(idx);
                cmd::none()
            }
            OpenOptions => cmd::transition(OptionsMenu),
        }
    }

    fn view<'a>(&'a self, ctx: &'a Context) -> Element<'a, UiMessage> {
        let header = row![
            column![
                bold_text("Picture Poet").size(36),
                text("Transform your photos into beautiful poems."),
            ]
            .spacing(4)
            .width(Length::Fill),
            button("Options").on_press(MyMessage::OpenOptions.into()),
        ];

        let panels = row![
            panel("Upload Your Image", upload_panel(ctx)),
            panel("Generated Poem", poem_panel(ctx)),
        ]
        .spacing(20);

        let mut items = Vec::from(elem_list![header, panels]);
        if !ctx.notices.is_empty() {
            items.push(notice_list(&ctx.notices));
        }

        top_level_container(column(items).spacing(20).width(Length::Fill), 1100.).into()
    }

    fn clone(&self) -> Box<dyn State> {
        Box::new(Clone::clone(self))
    }
}

fn panel<'a>(title: &'a str, content: Element<'a, UiMessage>) -> Element<'a, UiMessage> {
    container(column![bold_text(title).size(22), content].spacing(15))
        .padding(20)
        .width(Length::FillPortion(1))
        .style(|_theme| container::background(Color::WHITE).border(Border::default().rounded(10)))
        .into()
}

fn upload_panel(ctx: &Context) -> Element<'_, UiMessage> {
    let in_flight = ctx.session.is_generating();

    let drop_zone_content: Element<'_, UiMessage> = match &ctx.preview {
        Some(handle) => widget::image(handle.clone()).width(Length::Fill).height(300.).into(),
        None => column![
            text("Drag & drop your image here").size(20),
            text("or click below to select a file"),
            italic_text("(PNG, JPG, GIF, WebP, etc.)").size(12),
        ]
        .spacing(8)
        .align_x(Horizontal::Center)
        .into(),
    };

    let drag_active = ctx.drag_active;
    let drop_zone = container(drop_zone_content)
        .padding(20)
        .width(Length::Fill)
        .center_x(Length::Fill)
        .style(move |_theme| {
            let border_color = if drag_active {
                ACCENT
            } else {
                Color::from_rgb(0.8, 0.8, 0.8)
            };
            let background = if drag_active {
                Color::from_rgba(0.85, 0.45, 0.2, 0.1)
            } else {
                Color::TRANSPARENT
            };
            container::background(background)
                .border(Border::default().rounded(8).width(2.).color(border_color))
        });

    let mut items = Vec::from(elem_list![drop_zone]);

    let generate_label = if in_flight {
        "Generating..."
    } else {
        "Generate Poem"
    };
    items.push(
        button(text(generate_label).width(Length::Fill).center())
            .width(Length::Fill)
            .on_press_maybe((!in_flight).then_some(MyMessage::Generate.into()))
            .into(),
    );

    let pick_label = if ctx.session.asset().is_some() {
        "Change Image"
    } else {
        "Select Image"
    };
    items.push(
        button(text(pick_label).width(Length::Fill).center())
            .width(Length::Fill)
            .style(button::secondary)
            .on_press(MyMessage::PickFile.into())
            .into(),
    );

    if let Some(err) = ctx.session.upload_error() {
        items.push(
            container(text(err.to_string()).color(Color::WHITE))
                .padding(10)
                .width(Length::Fill)
                .style(|_theme| {
                    container::background(DESTRUCTIVE).border(Border::default().rounded(6))
                })
                .into(),
        );
    }

    column(items).spacing(12).into()
}

fn poem_panel(ctx: &Context) -> Element<'_, UiMessage> {
    match ctx.session.generation() {
        GenerationState::InFlight(_) => placeholder(
            "Generating your masterpiece...",
            "This might take a moment.",
            None,
        ),
        GenerationState::Failed(message) => placeholder(
            "Oops! Something went wrong.",
            message,
            Some(DESTRUCTIVE),
        ),
        GenerationState::Succeeded(poem) => column![
            container(scrollable(text(poem).size(16)).height(320.))
                .padding(15)
                .width(Length::Fill)
                .style(|_theme| container::background(Color::from_rgb(0.95, 0.95, 0.95))),
            button(text("Save Poem").width(Length::Fill).center())
                .width(Length::Fill)
                .on_press(MyMessage::Save.into()),
        ]
        .spacing(12)
        .into(),
        GenerationState::Idle if ctx.session.asset().is_some() => placeholder(
            "Image Ready!",
            "Click \"Generate Poem\" in the panel to the left.",
            None,
        ),
        GenerationState::Idle => placeholder(
            "Your Poem Awaits",
            "Upload an image and let Picture Poet weave its magic.",
            None,
        ),
    }
}

fn placeholder<'a>(
    headline: &'a str,
    detail: &'a str,
    color: Option<Color>,
) -> Element<'a, UiMessage> {
    container(
        column![
            bold_text(headline).size(18).color_maybe(color),
            text(detail).color_maybe(color),
        ]
        .spacing(6)
        .align_x(Horizontal::Center),
    )
    .padding(20)
    .center_x(Length::Fill)
    .height(200.)
    .into()
}

fn notice_list(notices: &[Notice]) -> Element<'_, UiMessage> {
    column(notices.iter().enumerate().map(|(idx, notice)| {
        let background = if notice.is_error() {
            DESTRUCTIVE
        } else {
            Color::from_rgb(0.2, 0.5, 0.3)
        };
        container(
            row![
                column![
                    bold_text(notice.title()).color(Color::WHITE),
                    text(notice.description()).color(Color::WHITE),
                ]
                .width(Length::Fill),
                button("x")
                    .style(button::text)
                    .on_press(MyMessage::DismissNotice(idx).into()),
            ]
            .spacing(10),
        )
        .padding(10)
        .width(Length::Fill)
        .style(move |_theme| container::background(background).border(Border::default().rounded(6)))
        .into()
    }))
    .spacing(8)
    .into()
}
