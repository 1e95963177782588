use std::path::PathBuf;

use derive_more::{From, TryInto};
use engine::{
    acquisition::{ImageAsset, UploadError},
    poet::Poem,
    session::{CollaboratorFailure, RequestId},
};

#[derive(Debug, Clone, From)]
pub enum Message {
    Ui(UiMessage),
    Context(ContextMessage),
}

#[derive(Debug, Clone, From, TryInto)]
pub enum UiMessage {
    PoetScreen(ui_messages::PoetScreen),
    OptionsMenu(ui_messages::OptionsMenu),
    MessageDialog(ui_messages::MessageDialog),
}

#[derive(Debug, Clone)]
pub enum ContextMessage {
    DragHovered,
    DragLeft,
    FileDropped(PathBuf),
    FilePicked(Option<PathBuf>),
    UploadFinished(Result<ImageAsset, UploadError>),
    PoemFinished(RequestId, Result<Poem, CollaboratorFailure>),
}

pub mod ui_messages {
    use engine::poet::Provider;
    use iced::widget::text_editor;

    #[derive(Debug, Clone)]
    pub enum PoetScreen {
        PickFile,
        Generate,
        Save,
        DismissNotice(usize),
        OpenOptions,
    }

    #[derive(Debug, Clone)]
    pub enum OptionsMenu {
        SelectProvider(Provider),
        ClaudeTokenChanged(String),
        OpenAITokenChanged(String),
        OpenAIBaseUrlChanged(String),
        OpenAIModelChanged(String),
        ExportDirChanged(String),
        Ok,
    }

    #[derive(Debug, Clone)]
    pub enum MessageDialog {
        Confirm,
        EditAction(text_editor::Action),
    }
}
