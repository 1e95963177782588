use std::path::PathBuf;

use color_eyre::{
    Result,
    eyre::{ensure, eyre},
};
use engine::{
    PoetBox,
    acquisition::{CandidateFile, load_candidate},
    poet::{Provider, ProviderSettings},
    session::{CollaboratorFailure, GenerationTicket, Notice, Session},
};
use iced::{Task, widget::image::Handle as ImgHandle};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::message::{ContextMessage, Message};

const MAX_VISIBLE_NOTICES: usize = 4;

const PICKER_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff", "svg", "avif", "heic", "heif",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub provider: Provider,
    pub claude_token: String,
    pub openai_token: String,
    /// empty means the provider default
    pub openai_base_url: String,
    /// empty means the provider default
    pub openai_model: String,
    /// empty means the download dir
    pub export_dir: String,
}

impl Config {
    pub fn make_poet(&self) -> Result<PoetBox> {
        let settings = match self.provider {
            Provider::Claude => ProviderSettings {
                api_key: self.claude_token.clone(),
                base_url: None,
                model: None,
            },
            Provider::OpenAI => ProviderSettings {
                api_key: self.openai_token.clone(),
                base_url: non_empty(&self.openai_base_url),
                model: non_empty(&self.openai_model),
            },
        };
        ensure!(
            !settings.api_key.trim().is_empty(),
            "No API key configured for {}. Add one in the options.",
            self.provider
        );
        Ok(self.provider.make(settings))
    }

    pub fn export_dir(&self) -> Result<PathBuf> {
        non_empty(&self.export_dir)
            .map(PathBuf::from)
            .or_else(dirs::download_dir)
            .or_else(|| std::env::current_dir().ok())
            .ok_or(eyre!("Couldn't find a directory to save poems to"))
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

pub struct Context {
    pub session: Session,
    pub config: Config,
    pub drag_active: bool,
    pub preview: Option<ImgHandle>,
    pub notices: Vec<Notice>,
    /// file currently being read, further drops are ignored until it lands
    pub pending_upload: Option<PathBuf>,
}

impl Context {
    pub fn from_config(config: Config) -> Self {
        Self {
            session: Session::new(),
            config,
            drag_active: false,
            preview: None,
            notices: vec![],
            pending_upload: None,
        }
    }

    pub fn update(&mut self, message: ContextMessage) -> Result<Task<Message>> {
        use ContextMessage::*;
        match message {
            DragHovered => {
                self.drag_active = true;
                Ok(Task::none())
            }
            DragLeft => {
                self.drag_active = false;
                Ok(Task::none())
            }
            FileDropped(path) => {
                self.drag_active = false;
                Ok(self.upload(path))
            }
            FilePicked(Some(path)) => Ok(self.upload(path)),
            FilePicked(None) => Ok(Task::none()),
            UploadFinished(result) => {
                self.pending_upload = None;
                self.session.accept_upload(result);
                self.preview = self
                    .session
                    .asset()
                    .and_then(|a| a.data_uri.decode_payload().ok())
                    .map(ImgHandle::from_bytes);
                Ok(Task::none())
            }
            PoemFinished(id, outcome) => {
                let completion = self.session.finish_generation(id, outcome);
                debug!("Generation {id:?} completed: {completion:?}");
                Ok(Task::none())
            }
        }
    }

    pub fn upload(&mut self, path: PathBuf) -> Task<Message> {
        if let Some(pending) = &self.pending_upload {
            warn!("Ignoring {path:?}, still reading {pending:?}");
            return Task::none();
        }
        self.pending_upload = Some(path.clone());
        Task::perform(
            load_candidate(Some(CandidateFile::from_path(path))),
            |res| ContextMessage::UploadFinished(res).into(),
        )
    }

    pub fn pick_file(&self) -> Task<Message> {
        Task::perform(
            async {
                rfd::AsyncFileDialog::new()
                    .set_title("Select an image")
                    .add_filter("Images", PICKER_EXTENSIONS)
                    .add_filter("All files", &["*"])
                    .pick_file()
                    .await
                    .map(|handle| handle.path().to_path_buf())
            },
            |path| ContextMessage::FilePicked(path).into(),
        )
    }

    pub fn generate(&mut self) -> Task<Message> {
        let poet = self.config.make_poet();
        let Ok(GenerationTicket { id, encoded_image }) = self.session.begin_generation() else {
            return Task::none();
        };

        match poet {
            Ok(poet) => Task::perform(
                async move {
                    poet.generate_poem(&encoded_image)
                        .await
                        .map_err(CollaboratorFailure::from)
                },
                move |res| ContextMessage::PoemFinished(id, res).into(),
            ),
            Err(e) => Task::done(
                ContextMessage::PoemFinished(id, Err(CollaboratorFailure::new(e.to_string())))
                    .into(),
            ),
        }
    }

    pub fn export(&mut self) -> Result<()> {
        let dir = self.config.export_dir()?;
        // refusals end up as notices
        _ = self.session.export_artifact(&dir);
        Ok(())
    }

    /// Moves fresh notices from the session into the visible list
    pub fn collect_notices(&mut self) {
        self.notices.extend(self.session.take_notices());
        let overflow = self.notices.len().saturating_sub(MAX_VISIBLE_NOTICES);
        self.notices.drain(..overflow);
    }

    pub fn dismiss_notice(&mut self, idx: usize) {
        if idx < self.notices.len() {
            self.notices.remove(idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use engine::{
        acquisition::{ImageAsset, UploadError},
        data_uri::DataUri,
        session::GenerationState,
    };

    use super::*;

    #[test]
    fn poet_needs_a_key_for_the_selected_provider() {
        let mut config = Config {
            claude_token: "sk-ant-test".into(),
            ..Config::default()
        };
        assert_eq!(config.make_poet().unwrap().provider(), Provider::Claude);

        config.provider = Provider::OpenAI;
        let err = config.make_poet().err().unwrap();
        assert_eq!(
            err.to_string(),
            "No API key configured for OpenAI compatible. Add one in the options."
        );

        config.openai_token = "sk-test".into();
        config.openai_model = "  ".into();
        assert_eq!(config.make_poet().unwrap().provider(), Provider::OpenAI);
    }

    #[test]
    fn configured_export_dir_wins() {
        let mut config = Config {
            export_dir: " /tmp/poems ".into(),
            ..Config::default()
        };
        assert_eq!(config.export_dir().unwrap(), PathBuf::from("/tmp/poems"));

        config.export_dir = "  ".into();
        assert_ne!(config.export_dir().unwrap(), PathBuf::from("  "));
    }

    fn png_asset(name: &str) -> ImageAsset {
        ImageAsset {
            data_uri: DataUri::encode("image/png", b"\x89PNG"),
            original_name: name.into(),
        }
    }

    fn asset_name(ctx: &Context) -> Option<&str> {
        ctx.session.asset().map(|a| a.original_name.as_str())
    }

    #[test]
    fn drag_hover_only_toggles_the_flag() {
        let mut ctx = Context::from_config(Config::default());
        ctx.update(ContextMessage::UploadFinished(Ok(png_asset("sea.png"))))
            .unwrap();
        assert!(ctx.preview.is_some());

        ctx.update(ContextMessage::DragHovered).unwrap();
        assert!(ctx.drag_active);
        assert_eq!(asset_name(&ctx), Some("sea.png"));
        assert_eq!(ctx.session.generation(), &GenerationState::Idle);

        ctx.update(ContextMessage::DragLeft).unwrap();
        assert!(!ctx.drag_active);
        assert_eq!(asset_name(&ctx), Some("sea.png"));
        assert_eq!(ctx.session.generation(), &GenerationState::Idle);
    }

    #[test]
    fn failed_upload_clears_the_preview() {
        let mut ctx = Context::from_config(Config::default());
        ctx.update(ContextMessage::UploadFinished(Ok(png_asset("sea.png"))))
            .unwrap();

        ctx.update(ContextMessage::UploadFinished(Err(UploadError::InvalidType)))
            .unwrap();

        assert!(ctx.preview.is_none());
        assert_eq!(asset_name(&ctx), None);
        assert_eq!(ctx.session.upload_error(), Some(&UploadError::InvalidType));
    }

    #[test]
    fn drops_while_reading_are_ignored() {
        let mut ctx = Context::from_config(Config::default());
        _ = ctx.upload("first.png".into());

        ctx.update(ContextMessage::FileDropped("second.png".into()))
            .unwrap();
        ctx.update(ContextMessage::FilePicked(Some("third.png".into())))
            .unwrap();
        assert_eq!(ctx.pending_upload, Some(PathBuf::from("first.png")));
        assert!(!ctx.drag_active);

        ctx.update(ContextMessage::UploadFinished(Ok(png_asset("first.png"))))
            .unwrap();
        assert_eq!(ctx.pending_upload, None);
        assert_eq!(asset_name(&ctx), Some("first.png"));
    }

    #[test]
    fn only_the_latest_notices_stay_visible() {
        let mut ctx = Context::from_config(Config::default());
        for _ in 0..MAX_VISIBLE_NOTICES + 2 {
            ctx.session.begin_generation().unwrap_err();
        }
        ctx.session.export_artifact(std::path::Path::new(".")).unwrap_err();

        ctx.collect_notices();

        assert_eq!(ctx.notices.len(), MAX_VISIBLE_NOTICES);
        assert!(matches!(ctx.notices.last(), Some(Notice::ExportRefused(_))));
        assert!(ctx.session.notices().is_empty());

        ctx.dismiss_notice(MAX_VISIBLE_NOTICES - 1);
        ctx.dismiss_notice(99);
        assert_eq!(ctx.notices, vec![Notice::NoImageSelected; MAX_VISIBLE_NOTICES - 1]);
    }
}
