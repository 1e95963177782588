//! The session-scoped state shared by acquisition, orchestration and the display layer.
//!
//! Only the operations on [`Session`] mutate it. Generation is split into
//! [`Session::begin_generation`] and [`Session::finish_generation`] so an event
//! loop can await the collaborator elsewhere and apply the result in one step
//! when it resumes. [`Session::request_generation`] chains both around a single
//! collaborator call.
//!
//! Every request is tagged with the asset epoch it was started for. Accepting or
//! clearing an asset while a request is in flight bumps the epoch and defers the
//! reset to `Idle`: the late response is dropped instead of being shown next to
//! an image it wasn't written for.

use std::{
    mem,
    path::{Path, PathBuf},
};

use color_eyre::Report;
use log::{error, info, warn};
use thiserror::Error;

use crate::{
    acquisition::{CandidateFile, ImageAsset, UploadError, load_candidate},
    export::{self, ExportError},
    poet::{Poem, PoemGenerator},
};

pub const GENERIC_FAILURE_MESSAGE: &str =
    "An unknown error occurred while generating the poem. Please try again.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GenerationState {
    #[default]
    Idle,
    InFlight(RequestId),
    Succeeded(String),
    Failed(String),
}

impl GenerationState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight(_))
    }

    pub fn poem(&self) -> Option<&str> {
        match self {
            Self::Succeeded(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId {
    seq: u64,
    asset_epoch: u64,
}

/// What the caller has to hand to the collaborator for an accepted request
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub id: RequestId,
    pub encoded_image: String,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SubmissionRefused {
    #[error("Please upload an image first to generate a poem.")]
    NoImage,

    #[error("A poem is already being generated.")]
    AlreadyInFlight,
}

/// The collaborator's failure, reduced to the text shown to the user
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", self.message())]
pub struct CollaboratorFailure {
    message: Option<String>,
}

impl CollaboratorFailure {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            message: (!message.trim().is_empty()).then_some(message),
        }
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or(GENERIC_FAILURE_MESSAGE)
    }
}

impl From<Report> for CollaboratorFailure {
    /// Keeps the whole cause chain, `context: cause`
    fn from(report: Report) -> Self {
        Self::new(format!("{report:#}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The asset changed while the request was in flight
    Discarded,
    /// Not the request that is currently in flight
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NoImageSelected,
    GenerationSucceeded,
    GenerationFailed(String),
    ExportSucceeded(String),
    ExportRefused(String),
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::NoImageSelected => "No Image Selected",
            Notice::GenerationSucceeded => "Poem Generated!",
            Notice::GenerationFailed(_) => "Generation Failed",
            Notice::ExportSucceeded(_) => "Poem Saved!",
            Notice::ExportRefused(_) => "Nothing to Save",
        }
    }

    pub fn description(&self) -> String {
        match self {
            Notice::NoImageSelected => "Please upload an image first to generate a poem.".into(),
            Notice::GenerationSucceeded => "Your beautiful poem is ready to be admired.".into(),
            Notice::GenerationFailed(msg) => format!("Could not generate poem. {msg}"),
            Notice::ExportSucceeded(name) => format!("Your poem has been saved as {name}"),
            Notice::ExportRefused(reason) => reason.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notice::NoImageSelected | Notice::GenerationFailed(_) | Notice::ExportRefused(_)
        )
    }
}

#[derive(Debug, Default)]
pub struct Session {
    asset: Option<ImageAsset>,
    upload_error: Option<UploadError>,
    generation: GenerationState,
    asset_epoch: u64,
    next_seq: u64,
    notices: Vec<Notice>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset(&self) -> Option<&ImageAsset> {
        self.asset.as_ref()
    }

    pub fn upload_error(&self) -> Option<&UploadError> {
        self.upload_error.as_ref()
    }

    pub fn generation(&self) -> &GenerationState {
        &self.generation
    }

    pub fn is_generating(&self) -> bool {
        self.generation.is_in_flight()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        mem::take(&mut self.notices)
    }

    pub async fn submit_candidate_file(
        &mut self,
        file: Option<CandidateFile>,
    ) -> Result<ImageAsset, UploadError> {
        let result = load_candidate(file).await;
        self.accept_upload(result.clone());
        result
    }

    /// Applies the outcome of an upload attempt.
    ///
    /// A new asset replaces the old one, a failure clears it so no stale preview
    /// sits next to the error. Either way any previous poem is invalidated.
    pub fn accept_upload(&mut self, result: Result<ImageAsset, UploadError>) {
        self.asset_epoch += 1;
        match result {
            Ok(asset) => {
                info!("Accepted image {:?}", asset.original_name);
                self.asset = Some(asset);
                self.upload_error = None;
            }
            Err(err) => {
                warn!("Upload rejected: {err}");
                self.asset = None;
                self.upload_error = Some(err);
            }
        }

        if self.is_generating() {
            info!("Generation in flight, reset deferred until it resolves");
        } else {
            self.generation = GenerationState::Idle;
        }
    }

    pub fn begin_generation(&mut self) -> Result<GenerationTicket, SubmissionRefused> {
        let Some(asset) = &self.asset else {
            warn!("Generation requested without an image");
            self.notices.push(Notice::NoImageSelected);
            return Err(SubmissionRefused::NoImage);
        };
        if self.is_generating() {
            warn!("Generation requested while one is in flight, ignoring");
            return Err(SubmissionRefused::AlreadyInFlight);
        }

        let id = RequestId {
            seq: self.next_seq,
            asset_epoch: self.asset_epoch,
        };
        self.next_seq += 1;
        let encoded_image = asset.encoded_data();
        info!("Requesting poem for {:?} ({id:?})", asset.original_name);
        self.generation = GenerationState::InFlight(id);

        Ok(GenerationTicket { id, encoded_image })
    }

    pub fn finish_generation(
        &mut self,
        id: RequestId,
        outcome: Result<Poem, CollaboratorFailure>,
    ) -> Completion {
        if self.generation != GenerationState::InFlight(id) {
            warn!("Ignoring response for {id:?}, current state is {:?}", self.generation);
            return Completion::Ignored;
        }

        if id.asset_epoch != self.asset_epoch {
            info!("Discarding response for {id:?}, the image was replaced meanwhile");
            self.generation = GenerationState::Idle;
            return Completion::Discarded;
        }

        match outcome {
            Ok(Poem { text }) if !text.trim().is_empty() => {
                info!("Poem generated ({} chars)", text.len());
                self.generation = GenerationState::Succeeded(text);
                self.notices.push(Notice::GenerationSucceeded);
            }
            Ok(_) => self.fail_generation(CollaboratorFailure::new(
                "The poem generator returned an empty poem.",
            )),
            Err(failure) => self.fail_generation(failure),
        }
        Completion::Applied
    }

    fn fail_generation(&mut self, failure: CollaboratorFailure) {
        let message = failure.message().to_string();
        error!("Poem generation error: {message}");
        self.generation = GenerationState::Failed(message.clone());
        self.notices.push(Notice::GenerationFailed(message));
    }

    /// Begins a request, awaits the collaborator once and applies the outcome
    pub async fn request_generation(
        &mut self,
        generator: &dyn PoemGenerator,
    ) -> Result<Completion, SubmissionRefused> {
        let GenerationTicket { id, encoded_image } = self.begin_generation()?;
        let outcome = generator
            .generate_poem(&encoded_image)
            .await
            .map_err(CollaboratorFailure::from);
        Ok(self.finish_generation(id, outcome))
    }

    /// Writes the current poem to `dir`, leaving the generation state untouched
    pub fn export_artifact(&mut self, dir: &Path) -> Result<PathBuf, ExportError> {
        let result = match (self.generation.poem(), &self.asset) {
            (None, _) => Err(ExportError::NothingToSave),
            (Some(_), None) => Err(ExportError::MissingFileName),
            (Some(_), Some(asset)) if asset.original_name.is_empty() => {
                Err(ExportError::MissingFileName)
            }
            (Some(poem), Some(asset)) => export::write_poem(dir, &asset.original_name, poem),
        };

        match &result {
            Ok(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.notices.push(Notice::ExportSucceeded(name));
            }
            Err(err) => {
                warn!("Export refused: {err}");
                self.notices.push(Notice::ExportRefused(err.to_string()));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::{
        pin::Pin,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use color_eyre::{Result, eyre::eyre};

    use super::*;
    use crate::{PoetBox, data_uri::DataUri, poet::Provider};

    #[derive(Clone)]
    struct CannedPoet {
        calls: Arc<AtomicUsize>,
        answer: std::result::Result<&'static str, &'static str>,
    }

    impl CannedPoet {
        fn ok(text: &'static str) -> Self {
            Self {
                calls: Arc::default(),
                answer: Ok(text),
            }
        }

        fn err(message: &'static str) -> Self {
            Self {
                calls: Arc::default(),
                answer: Err(message),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PoemGenerator for CannedPoet {
        fn generate_poem<'a>(
            &'a self,
            encoded_image: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Poem>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                DataUri::parse(encoded_image)?;
                match self.answer {
                    Ok(text) => Ok(Poem { text: text.into() }),
                    Err(message) => Err(eyre!("{message}")),
                }
            })
        }

        fn clone(&self) -> PoetBox {
            Box::new(Clone::clone(self))
        }

        fn provider(&self) -> Provider {
            Provider::Claude
        }
    }

    fn asset(name: &str) -> ImageAsset {
        ImageAsset {
            data_uri: DataUri::encode("image/png", b"png bytes"),
            original_name: name.into(),
        }
    }

    fn session_with(name: &str) -> Session {
        let mut session = Session::new();
        session.accept_upload(Ok(asset(name)));
        session
    }

    #[tokio::test]
    async fn successful_generation_stores_poem_and_notifies() {
        let mut session = session_with("sea.png");
        let poet = CannedPoet::ok("Waves fold\ninto light");

        let completion = session.request_generation(&poet).await.unwrap();

        assert_eq!(completion, Completion::Applied);
        assert_eq!(session.generation().poem(), Some("Waves fold\ninto light"));
        assert_eq!(session.take_notices(), vec![Notice::GenerationSucceeded]);
        assert_eq!(poet.calls(), 1);
    }

    #[tokio::test]
    async fn refused_without_image() {
        let mut session = Session::new();
        let poet = CannedPoet::ok("never");

        let refused = session.request_generation(&poet).await.unwrap_err();

        assert_eq!(refused, SubmissionRefused::NoImage);
        assert_eq!(session.generation(), &GenerationState::Idle);
        assert_eq!(session.notices(), &[Notice::NoImageSelected]);
        assert_eq!(poet.calls(), 0);
    }

    #[tokio::test]
    async fn second_request_while_in_flight_is_a_no_op() {
        let mut session = session_with("sea.png");
        let poet = CannedPoet::ok("unused");

        let ticket = session.begin_generation().unwrap();
        let before = session.generation().clone();

        let refused = session.request_generation(&poet).await.unwrap_err();

        assert_eq!(refused, SubmissionRefused::AlreadyInFlight);
        assert_eq!(session.generation(), &before);
        assert_eq!(poet.calls(), 0);
        assert!(session.notices().is_empty());

        session.finish_generation(ticket.id, Ok(Poem { text: "late".into() }));
        assert_eq!(session.generation().poem(), Some("late"));
    }

    #[tokio::test]
    async fn collaborator_error_message_is_kept() {
        let mut session = session_with("sea.png");
        let poet = CannedPoet::err("Rate limit exceeded (429): Slow down");

        session.request_generation(&poet).await.unwrap();

        assert_eq!(
            session.generation(),
            &GenerationState::Failed("Rate limit exceeded (429): Slow down".into())
        );
        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(
            notices[0].description(),
            "Could not generate poem. Rate limit exceeded (429): Slow down"
        );
    }

    #[test]
    fn wrapped_collaborator_error_keeps_its_root_cause() {
        use color_eyre::eyre::WrapErr as _;

        let report = Err::<(), _>(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ))
        .wrap_err("initial response")
        .unwrap_err();

        let mut session = session_with("sea.png");
        let ticket = session.begin_generation().unwrap();
        session.finish_generation(ticket.id, Err(CollaboratorFailure::from(report)));

        assert_eq!(
            session.generation(),
            &GenerationState::Failed("initial response: connection refused".into())
        );
    }

    #[tokio::test]
    async fn failure_without_message_uses_fallback() {
        let mut session = session_with("sea.png");

        session.request_generation(&CannedPoet::err("")).await.unwrap();

        assert_eq!(
            session.generation(),
            &GenerationState::Failed(GENERIC_FAILURE_MESSAGE.into())
        );
    }

    #[tokio::test]
    async fn empty_poem_counts_as_failure() {
        let mut session = session_with("sea.png");

        session.request_generation(&CannedPoet::ok(" \n ")).await.unwrap();

        assert!(matches!(session.generation(), GenerationState::Failed(_)));
        assert!(matches!(
            session.take_notices().as_slice(),
            [Notice::GenerationFailed(_)]
        ));
    }

    #[tokio::test]
    async fn failure_is_terminal_until_resubmitted() {
        let mut session = session_with("sea.png");
        let failing = CannedPoet::err("network down");
        session.request_generation(&failing).await.unwrap();
        assert_eq!(failing.calls(), 1);

        let working = CannedPoet::ok("second try");
        session.request_generation(&working).await.unwrap();
        assert_eq!(session.generation().poem(), Some("second try"));
        assert_eq!(failing.calls(), 1);
    }

    #[test]
    fn new_image_resets_previous_result() {
        for terminal in [
            GenerationState::Succeeded("old poem".into()),
            GenerationState::Failed("old error".into()),
        ] {
            let mut session = session_with("first.png");
            session.generation = terminal;

            session.accept_upload(Ok(asset("second.png")));

            assert_eq!(session.generation(), &GenerationState::Idle);
            assert_eq!(session.asset().unwrap().original_name, "second.png");
        }
    }

    #[test]
    fn upload_error_clears_asset_and_poem() {
        let mut session = session_with("first.png");
        session.generation = GenerationState::Succeeded("old poem".into());

        session.accept_upload(Err(UploadError::InvalidType));

        assert!(session.asset().is_none());
        assert_eq!(session.upload_error(), Some(&UploadError::InvalidType));
        assert_eq!(session.generation(), &GenerationState::Idle);

        session.accept_upload(Ok(asset("ok.png")));
        assert!(session.upload_error().is_none());
    }

    #[test]
    fn response_for_replaced_image_is_discarded() {
        let mut session = session_with("first.png");
        let ticket = session.begin_generation().unwrap();

        session.accept_upload(Ok(asset("second.png")));
        assert!(session.is_generating(), "reset is deferred while in flight");

        let completion =
            session.finish_generation(ticket.id, Ok(Poem { text: "for first".into() }));

        assert_eq!(completion, Completion::Discarded);
        assert_eq!(session.generation(), &GenerationState::Idle);
        assert!(session.notices().is_empty());

        let next = session.begin_generation().unwrap();
        assert_ne!(next.id, ticket.id);
    }

    #[test]
    fn unknown_response_is_ignored() {
        let mut session = session_with("first.png");
        let ticket = session.begin_generation().unwrap();
        session.finish_generation(ticket.id, Err(CollaboratorFailure::new("boom")));

        let completion = session.finish_generation(ticket.id, Ok(Poem { text: "dup".into() }));

        assert_eq!(completion, Completion::Ignored);
        assert_eq!(session.generation(), &GenerationState::Failed("boom".into()));
    }

    #[tokio::test]
    async fn submitting_a_file_feeds_the_session() {
        let mut session = Session::new();
        let err = session
            .submit_candidate_file(Some(CandidateFile::from_bytes(
                "notes.txt",
                "text/plain",
                b"hi".to_vec(),
            )))
            .await
            .unwrap_err();
        assert_eq!(err, UploadError::InvalidType);
        assert!(session.asset().is_none());

        session
            .submit_candidate_file(Some(CandidateFile::from_bytes(
                "cat.gif",
                "image/gif",
                b"GIF89a".to_vec(),
            )))
            .await
            .unwrap();
        let asset = session.asset().unwrap();
        assert_eq!(asset.encoded_data(), "data:image/gif;base64,R0lGODlh");
        assert!(session.upload_error().is_none());
    }

    #[test]
    fn export_refused_unless_succeeded() {
        let dir = tempfile::tempdir().unwrap();
        for state in [
            GenerationState::Idle,
            GenerationState::Failed("no".into()),
        ] {
            let mut session = session_with("sea.png");
            session.generation = state.clone();

            let err = session.export_artifact(dir.path()).unwrap_err();

            assert!(matches!(err, ExportError::NothingToSave));
            assert_eq!(session.generation(), &state);
            assert!(matches!(
                session.take_notices().as_slice(),
                [Notice::ExportRefused(_)]
            ));
        }

        let mut session = session_with("sea.png");
        let ticket = session.begin_generation().unwrap();
        assert!(session.export_artifact(dir.path()).is_err());
        session.finish_generation(ticket.id, Ok(Poem { text: "x".into() }));

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn export_needs_the_original_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with("");
        session.generation = GenerationState::Succeeded("poem".into());

        let err = session.export_artifact(dir.path()).unwrap_err();
        assert!(matches!(err, ExportError::MissingFileName));
    }

    #[test]
    fn export_writes_file_and_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with("My Photo.JPG");
        session.generation = GenerationState::Succeeded("line one\nline two".into());

        let path = session.export_artifact(dir.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), "My_Photo_poem.txt");
        assert_eq!(std::fs::read(&path).unwrap(), b"line one\r\nline two");
        assert_eq!(
            session.generation(),
            &GenerationState::Succeeded("line one\nline two".into())
        );
        assert_eq!(
            session.take_notices(),
            vec![Notice::ExportSucceeded("My_Photo_poem.txt".into())]
        );
    }
}
