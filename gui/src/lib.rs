use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use color_eyre::{
    Result,
    eyre::{WrapErr as _, eyre},
};
use iced::{
    Element, Event, Font, Length, Subscription, Task, Theme, event,
    font::{self},
    padding,
    widget::{container, scrollable, text},
    window,
};
use log::error;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    cli::Cli,
    context::Config,
    message::{ContextMessage, Message},
    state::{Modal, PoetScreen, State, StateExt, options_menu::OptionsMenu},
};

pub mod cli;
pub mod context;
pub mod message;
pub mod state;

const APP_NAME: &str = "Picture Poet";

pub struct Gui {
    state: Box<dyn State>,
    ctx: context::Context,
}

impl Gui {
    pub fn new(mb_config: Option<Config>, cli: Cli) -> (Self, Task<Message>) {
        let Cli { image, provider } = cli;
        let mut gui = if let Some(mut cfg) = mb_config {
            if let Some(provider) = provider {
                cfg.provider = provider;
            }
            Gui {
                state: PoetScreen.boxed(),
                ctx: context::Context::from_config(cfg),
            }
        } else {
            let mut cfg = Config::default();
            if let Some(provider) = provider {
                cfg.provider = provider;
            }
            Gui {
                state: Modal::message(
                    OptionsMenu.boxed(),
                    "Welcome",
                    indoc::indoc! {"
                    Hi, since this is your first time starting Picture Poet, please configure an
                    API key. You only need a key for the provider you actually use: either
                    Anthropic (Claude) or an OpenAI compatible endpoint that accepts images.
                    "
                    },
                )
                .boxed(),
                ctx: context::Context::from_config(cfg),
            }
        };

        let task = match image {
            Some(path) => gui.ctx.upload(path),
            None => Task::none(),
        };
        (gui, task)
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        let task = match self.try_update(message) {
            Ok(task) => task,
            Err(e) => {
                error!("{e:?}");
                self.state = Modal::message(self.state.clone(), "Error", format!("{e:?}")).boxed();
                Task::none()
            }
        };
        self.ctx.collect_notices();
        task
    }

    fn try_update(&mut self, message: Message) -> Result<Task<Message>> {
        match message {
            Message::Ui(ui_message) => {
                let cmd = self.state.update(ui_message, &mut self.ctx)?;
                if let Some(new_state) = cmd.transition {
                    self.state = new_state;
                }
                Ok(cmd.task.unwrap_or(Task::none()))
            }
            Message::Context(context_message) => self.ctx.update(context_message),
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        self.state.view(&self.ctx).map(Message::from)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        event::listen_with(|event, _status, _window| match event {
            Event::Window(window::Event::FileHovered(_)) => {
                Some(ContextMessage::DragHovered.into())
            }
            Event::Window(window::Event::FilesHoveredLeft) => {
                Some(ContextMessage::DragLeft.into())
            }
            Event::Window(window::Event::FileDropped(path)) => {
                Some(ContextMessage::FileDropped(path).into())
            }
            _ => None,
        })
    }

    pub fn title(&self) -> String {
        APP_NAME.into()
    }

    pub fn theme(&self) -> Theme {
        Theme::SolarizedLight
    }
}

pub fn load_ron_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let src = fs::read_to_string(path)?;
    Ok(ron::from_str(&src)?)
}

pub fn save_ron_file<T: Serialize>(path: &Path, x: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(fs::write(path, ron::to_string(x)?)?)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(dirs::config_local_dir()
        .ok_or(eyre!("Couldn't get config dir"))?
        .join("picture_poet.ron"))
}

pub fn load_config() -> Result<Option<Config>> {
    let path = config_path()?;
    if !path.exists() {
        Ok(None)
    } else {
        load_ron_file(&path).map(Some)
    }
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let path = config_path()?;
    save_ron_file(&path, cfg)?;
    Ok(())
}

macro_rules! elem_list {
    ($($elems:expr),+ $(,)?) => {
        [$(iced::Element::from($elems)),*]
    };
}
pub(crate) use elem_list;

fn italic_text(t: &str) -> iced::widget::Text<'_> {
    iced::widget::text(t).font(italic_default_font())
}

fn italic_default_font() -> Font {
    Font {
        style: font::Style::Italic,
        ..Font::DEFAULT
    }
}

fn bold_text<'a>(t: impl text::IntoFragment<'a>) -> iced::widget::Text<'a> {
    iced::widget::text(t).font(bold_default_font())
}

fn bold_default_font() -> Font {
    Font {
        weight: font::Weight::Bold,
        ..Font::DEFAULT
    }
}

fn top_level_container<'a, T: Send + 'static>(
    elem: impl Into<Element<'a, T>>,
    max_width: f32,
) -> container::Container<'a, T> {
    container(
        container(scrollable(
            container(elem).padding(padding::all(10).right(20)),
        ))
        .padding(20)
        .max_width(max_width),
    )
    .center(Length::Fill)
}

pub trait TryIntoExt<T> {
    fn try_into_ex(self) -> color_eyre::Result<T>;
}

impl<T, Target, E> TryIntoExt<Target> for T
where
    T: TryInto<Target, Error = E>,
    T: fmt::Debug,
    T: Clone,
    E: std::error::Error + Send + Sync + 'static,
{
    fn try_into_ex(self) -> color_eyre::Result<Target> {
        self.clone()
            .try_into()
            .with_context(|| format!("{self:#?}"))
    }
}
