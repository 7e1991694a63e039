//! The editor state machine: the only component that talks to the others.
//!
//! ```text
//!                  ┌──────────────── cancel ─────────────────┐
//!                  ▼                                          │
//! Idle ──openSelector──▶ SourceSelection ──chooseUpload──▶ Uploading ──fileChosen──┐
//!  ▲  └─remove─┘               │   └──chooseGenerated──▶ GeneratedPicker ─pick─▶ Idle
//!  │                     chooseCamera                                             │
//!  │                           ▼                                                  ▼
//!  └──────confirm────── ReviewCrop ◀──────capture────── CameraCapture      ReviewCrop
//! ```
//!
//! Every intent goes through [`Editor::handle`]. Intents that make no sense
//! in the current state are rejected with [`EditorError::InvalidTransition`]
//! and leave everything untouched. Failures of the pipeline itself (bad
//! file, no camera, full storage…) are recovered on the spot: the editor
//! moves to the nearest stable state, queues a translated [`Notice`], and
//! then returns the error so the shell can inspect it.
//!
//! The capture session lives only while the editor sits in
//! [`EditorState::CameraCapture`]; every transition out of it closes the
//! session, whichever way it leaves.

use crate::avatars::{self, GeneratedAvatar, GeneratorConfig, Style};
use crate::capture::{CaptureAdapter, CaptureDevice, CaptureError, CaptureSession};
use crate::config::{CropConfig, EditorConfig};
use crate::crop::CropStage;
use crate::imaging::{CodecError, CropRegion, Dimensions, ImageCodec};
use crate::locale::{Language, LocaleProvider, Translator};
use crate::store::{KeyValueStore, PersistenceStore, StoreError};
use crate::types::{AvatarImage, Source, UploadedFile};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("'{0}' is not an image file")]
    InvalidFileType(String),
    #[error("Could not decode image: {0}")]
    Decode(#[source] CodecError),
    #[error("Crop region {region} is outside the {source_dims} image")]
    CropOutOfBounds {
        region: CropRegion,
        source_dims: Dimensions,
    },
    #[error("Could not encode image: {0}")]
    Encode(#[source] CodecError),
    #[error("{0}")]
    DeviceUnavailable(#[source] CaptureError),
    #[error("Camera is not ready yet")]
    CameraNotReady,
    #[error("Storage quota exceeded: {would_use} bytes needed, {quota} allowed")]
    StorageQuota { would_use: u64, quota: u64 },
    #[error("Storage error: {0}")]
    Storage(#[source] StoreError),
    #[error("'{event}' is not possible while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
    #[error("No generated avatar at position {0}")]
    NoSuchAvatar(usize),
}

impl From<CodecError> for EditorError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::InvalidFileType(name) => Self::InvalidFileType(name),
            CodecError::CropOutOfBounds {
                region,
                source_dims,
            } => Self::CropOutOfBounds {
                region,
                source_dims,
            },
            e if e.is_decode() => Self::Decode(e),
            e => Self::Encode(e),
        }
    }
}

impl From<CaptureError> for EditorError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::NotReady => Self::CameraNotReady,
            other => Self::DeviceUnavailable(other),
        }
    }
}

impl From<StoreError> for EditorError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::QuotaExceeded { would_use, quota } => {
                Self::StorageQuota { would_use, quota }
            }
            other => Self::Storage(other),
        }
    }
}

impl EditorError {
    /// Translation key describing the failure to the user.
    pub fn message_key(&self) -> Option<&'static str> {
        match self {
            Self::InvalidFileType(_) => Some("invalidImage"),
            Self::Decode(_) => Some("decodeError"),
            Self::CropOutOfBounds { .. } | Self::Encode(_) => Some("cropError"),
            Self::DeviceUnavailable(_) => Some("cameraError"),
            Self::CameraNotReady => Some("cameraNotReady"),
            Self::StorageQuota { .. } => Some("storageFull"),
            Self::Storage(_) => Some("storageError"),
            Self::InvalidTransition { .. } | Self::NoSuchAvatar(_) => None,
        }
    }

    /// Intent refused without any effect (no state change, no notice).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::CameraNotReady | Self::InvalidTransition { .. } | Self::NoSuchAvatar(_)
        )
    }
}

/// How the image under review was obtained. Decides where cancel goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOrigin {
    Upload,
    Camera,
}

#[derive(Debug, Clone)]
pub enum EditorState {
    Idle,
    SourceSelection,
    Uploading,
    CameraCapture,
    GeneratedPicker {
        style: Style,
        options: Vec<GeneratedAvatar>,
    },
    ReviewCrop {
        image: AvatarImage,
        origin: CaptureOrigin,
        stage: CropStage,
    },
}

impl EditorState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SourceSelection => "selecting a source",
            Self::Uploading => "uploading",
            Self::CameraCapture => "capturing",
            Self::GeneratedPicker { .. } => "picking an avatar",
            Self::ReviewCrop { .. } => "reviewing the crop",
        }
    }
}

impl fmt::Display for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// User intents.
#[derive(Debug, Clone)]
pub enum EditorEvent {
    OpenSelector,
    ChooseUpload,
    ChooseCamera,
    ChooseGenerated,
    SelectStyle(Style),
    Regenerate,
    FileChosen(UploadedFile),
    Capture,
    Pick(usize),
    SetZoom(f64),
    ZoomIn,
    ZoomOut,
    SetOffset { dx: f64, dy: f64 },
    PanBy { dx: f64, dy: f64 },
    Confirm,
    Cancel,
    Remove,
}

impl EditorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenSelector => "open selector",
            Self::ChooseUpload => "choose upload",
            Self::ChooseCamera => "choose camera",
            Self::ChooseGenerated => "choose generated",
            Self::SelectStyle(_) => "select style",
            Self::Regenerate => "regenerate",
            Self::FileChosen(_) => "file chosen",
            Self::Capture => "capture",
            Self::Pick(_) => "pick",
            Self::SetZoom(_) => "set zoom",
            Self::ZoomIn => "zoom in",
            Self::ZoomOut => "zoom out",
            Self::SetOffset { .. } => "set offset",
            Self::PanBy { .. } => "pan",
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub key: &'static str,
    pub message: String,
}

pub struct Editor<K, D> {
    codec: Box<dyn ImageCodec>,
    store: PersistenceStore<K>,
    camera: CaptureAdapter<D>,
    session: Option<CaptureSession>,
    translator: Translator,
    crop: CropConfig,
    generator: GeneratorConfig,
    generator_seed: Option<String>,
    state: EditorState,
    current: Option<AvatarImage>,
    notices: Vec<Notice>,
}

impl<K: KeyValueStore, D: CaptureDevice> Editor<K, D> {
    /// Start the editor, reading the stored avatar once.
    ///
    /// An unreadable store starts the editor without an avatar.
    pub fn open(
        codec: Box<dyn ImageCodec>,
        kv: K,
        device: D,
        translator: Translator,
        config: &EditorConfig,
    ) -> Self {
        let store = PersistenceStore::with_key(kv, config.storage.key.clone());
        let initial = match store.load(codec.as_ref()) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Could not read stored avatar: {}", e);
                None
            }
        };
        Self::new(initial, codec, store, device, translator, config)
    }

    /// Start the editor with `initial_image` as the current avatar.
    pub fn new(
        initial_image: Option<AvatarImage>,
        codec: Box<dyn ImageCodec>,
        store: PersistenceStore<K>,
        device: D,
        translator: Translator,
        config: &EditorConfig,
    ) -> Self {
        Self {
            codec,
            store,
            camera: CaptureAdapter::new(device),
            session: None,
            translator,
            crop: config.crop.clone(),
            generator: config.generator.clone(),
            generator_seed: None,
            state: EditorState::Idle,
            current: initial_image,
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// The avatar shown in the placeholder: last committed, or the initial one.
    pub fn current(&self) -> Option<&AvatarImage> {
        self.current.as_ref()
    }

    pub fn store(&self) -> &PersistenceStore<K> {
        &self.store
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn session_open(&self) -> bool {
        self.session.is_some()
    }

    /// Sessions holding the camera right now (0 or 1).
    pub fn open_sessions(&self) -> usize {
        self.camera.open_sessions()
    }

    /// Seed for batches opened with `ChooseGenerated` or `SelectStyle`.
    /// `Regenerate` always draws fresh seeds.
    pub fn set_generator_seed(&mut self, seed: Option<String>) {
        self.generator_seed = seed;
    }

    /// Poll the open camera. False outside `CameraCapture`.
    pub fn camera_ready(&mut self) -> bool {
        self.session.as_mut().is_some_and(|s| s.is_ready())
    }

    /// Take the notices queued since the last call.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Switch the UI language and persist it.
    pub fn set_language(
        &mut self,
        language: Language,
        provider: &dyn LocaleProvider,
    ) -> Result<(), EditorError> {
        self.translator
            .set_language(language, provider, self.store.kv())?;
        log::info!("Language set to {}", language);
        Ok(())
    }

    /// Close the editor: release the camera, drop anything uncommitted, and
    /// return the current avatar.
    pub fn finish(mut self) -> Option<AvatarImage> {
        self.close_camera();
        self.current.take()
    }

    pub fn handle(&mut self, event: EditorEvent) -> Result<(), EditorError> {
        let from = self.state.name();
        let event_name = event.name();
        let result = self.dispatch(event);
        match &result {
            Ok(()) => log::debug!("{} --{}--> {}", from, event_name, self.state.name()),
            Err(e) if e.is_rejection() => {
                log::debug!("Ignored '{}' while {}: {}", event_name, from, e)
            }
            Err(e) => log::warn!(
                "'{}' failed while {}, now {}: {}",
                event_name,
                from,
                self.state.name(),
                e
            ),
        }
        result
    }

    fn dispatch(&mut self, event: EditorEvent) -> Result<(), EditorError> {
        use EditorEvent as Ev;
        use EditorState as St;

        let state = std::mem::replace(&mut self.state, St::Idle);
        match (state, event) {
            (St::Idle, Ev::OpenSelector) => {
                self.enter(St::SourceSelection);
                Ok(())
            }
            (St::Idle, Ev::Remove) => self.remove(),

            (St::SourceSelection, Ev::ChooseUpload) => {
                self.enter(St::Uploading);
                Ok(())
            }
            (St::SourceSelection, Ev::ChooseCamera) => self.open_camera(),
            (St::SourceSelection, Ev::ChooseGenerated) => {
                let seed = self.generator_seed.clone();
                self.show_generated(self.generator.style, seed)
            }

            (St::Uploading, Ev::FileChosen(file)) => self.review_upload(file),

            (St::CameraCapture, Ev::Capture) => self.capture(),

            (St::GeneratedPicker { .. }, Ev::SelectStyle(style)) => {
                let seed = self.generator_seed.clone();
                self.show_generated(style, seed)
            }
            (St::GeneratedPicker { style, .. }, Ev::Regenerate) => {
                self.show_generated(style, None)
            }
            (St::GeneratedPicker { style, options }, Ev::Pick(index)) => {
                match options.get(index) {
                    Some(choice) => {
                        let image = choice.image.clone();
                        self.commit(image, "avatarSelected")
                    }
                    None => {
                        self.state = St::GeneratedPicker { style, options };
                        Err(EditorError::NoSuchAvatar(index))
                    }
                }
            }

            (
                St::ReviewCrop {
                    image,
                    origin,
                    mut stage,
                },
                event @ (Ev::SetZoom(_)
                | Ev::ZoomIn
                | Ev::ZoomOut
                | Ev::SetOffset { .. }
                | Ev::PanBy { .. }),
            ) => {
                let step = self.crop.zoom_step;
                let region = match event {
                    Ev::SetZoom(level) => stage.set_zoom(level),
                    Ev::ZoomIn => stage.set_zoom(stage.zoom() + step),
                    Ev::ZoomOut => stage.set_zoom(stage.zoom() - step),
                    Ev::SetOffset { dx, dy } => stage.set_offset(dx, dy),
                    Ev::PanBy { dx, dy } => stage.pan_by(dx, dy),
                    _ => stage.current_region(),
                };
                log::debug!("Crop region {} at zoom {:.2}", region, stage.zoom());
                self.state = St::ReviewCrop {
                    image,
                    origin,
                    stage,
                };
                Ok(())
            }
            (St::ReviewCrop { image, stage, .. }, Ev::Confirm) => {
                self.confirm(&image, stage.current_region())
            }
            (
                St::ReviewCrop {
                    origin: CaptureOrigin::Camera,
                    ..
                },
                Ev::Cancel,
            ) => self.open_camera(),
            (St::ReviewCrop { .. }, Ev::Cancel) => {
                self.enter(St::SourceSelection);
                Ok(())
            }

            (state, Ev::Cancel) if !matches!(state, St::Idle) => {
                self.enter(St::Idle);
                Ok(())
            }

            (state, event) => {
                let err = EditorError::InvalidTransition {
                    state: state.name(),
                    event: event.name(),
                };
                self.state = state;
                Err(err)
            }
        }
    }

    /// Move to `next`, closing the camera unless `next` is the capture mode.
    fn enter(&mut self, next: EditorState) {
        if !matches!(next, EditorState::CameraCapture) {
            self.close_camera();
        }
        self.state = next;
    }

    fn close_camera(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }

    /// Go to `fallback`, tell the user, and hand the error back.
    fn recover(&mut self, fallback: EditorState, err: EditorError) -> Result<(), EditorError> {
        self.enter(fallback);
        self.notify(NoticeLevel::Error, err.message_key().unwrap_or("error"));
        Err(err)
    }

    fn notify(&mut self, level: NoticeLevel, key: &'static str) {
        let message = self.translator.t(key).to_string();
        self.notices.push(Notice {
            level,
            key,
            message,
        });
    }

    fn open_camera(&mut self) -> Result<(), EditorError> {
        self.close_camera();
        match self.camera.open() {
            Ok(session) => {
                self.session = Some(session);
                self.enter(EditorState::CameraCapture);
                Ok(())
            }
            Err(e) => self.recover(EditorState::SourceSelection, e.into()),
        }
    }

    fn capture(&mut self) -> Result<(), EditorError> {
        let Some(session) = self.session.as_mut() else {
            let err = CaptureError::Closed.into();
            return self.recover(EditorState::SourceSelection, err);
        };
        let frame = match session.capture_frame() {
            Ok(frame) => frame,
            Err(CaptureError::NotReady) => {
                self.state = EditorState::CameraCapture;
                return Err(EditorError::CameraNotReady);
            }
            Err(e) => return self.recover(EditorState::SourceSelection, e.into()),
        };
        log::info!("Captured {} frame", frame.dimensions());
        match self.codec.decode_source(&Source::Frame(frame)) {
            Ok(image) => {
                self.review(image, CaptureOrigin::Camera);
                Ok(())
            }
            Err(e) => self.recover(EditorState::SourceSelection, e.into()),
        }
    }

    fn review_upload(&mut self, file: UploadedFile) -> Result<(), EditorError> {
        log::info!("Reading upload '{}' ({} bytes)", file.name, file.bytes.len());
        match self.codec.decode_source(&Source::File(file)) {
            Ok(image) => {
                self.review(image, CaptureOrigin::Upload);
                Ok(())
            }
            Err(e) => self.recover(EditorState::SourceSelection, e.into()),
        }
    }

    fn review(&mut self, image: AvatarImage, origin: CaptureOrigin) {
        let stage = CropStage::new(image.dimensions(), self.crop.max_zoom);
        self.enter(EditorState::ReviewCrop {
            image,
            origin,
            stage,
        });
    }

    fn show_generated(&mut self, style: Style, seed: Option<String>) -> Result<(), EditorError> {
        match avatars::generate(style, self.generator.count, seed.as_deref(), self.generator.size)
        {
            Ok(options) => {
                self.enter(EditorState::GeneratedPicker { style, options });
                Ok(())
            }
            Err(e) => self.recover(EditorState::SourceSelection, e.into()),
        }
    }

    fn confirm(&mut self, image: &AvatarImage, region: CropRegion) -> Result<(), EditorError> {
        match self.codec.encode_crop(image, region) {
            Ok(cropped) => self.commit(cropped, "avatarSaved"),
            Err(e) => self.recover(EditorState::SourceSelection, e.into()),
        }
    }

    /// Make `image` the current avatar and persist it.
    ///
    /// The in-memory avatar is updated even when the write fails.
    fn commit(&mut self, image: AvatarImage, success_key: &'static str) -> Result<(), EditorError> {
        let saved = self.store.save(&image);
        self.current = Some(image);
        match saved {
            Ok(()) => {
                self.enter(EditorState::Idle);
                self.notify(NoticeLevel::Success, success_key);
                Ok(())
            }
            Err(e) => self.recover(EditorState::Idle, e.into()),
        }
    }

    fn remove(&mut self) -> Result<(), EditorError> {
        self.current = None;
        match self.store.clear() {
            Ok(()) => {
                self.enter(EditorState::Idle);
                self.notify(NoticeLevel::Success, "avatarRemoved");
                Ok(())
            }
            Err(e) => self.recover(EditorState::Idle, e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{NoDevice, TestPatternDevice};
    use crate::imaging::backend::tests::{MockCodec, RecordedOp};
    use crate::imaging::RustCodec;
    use crate::imaging::data_uri::DataUriError;
    use crate::locale::EmbeddedLocales;
    use crate::store::{MemoryStore, PROFILE_IMAGE_KEY};
    use crate::test_helpers::*;
    use std::sync::Arc;

    fn go_to_camera(editor: &mut Editor<MemoryStore, TestPatternDevice>) {
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseCamera).unwrap();
        assert!(editor.camera_ready());
    }

    fn mock_editor(
        dims: Dimensions,
    ) -> (
        Editor<MemoryStore, TestPatternDevice>,
        Arc<MockCodec>,
        MemoryStore,
    ) {
        let codec = Arc::new(MockCodec::with_dimensions(dims));
        let kv = MemoryStore::new();
        let editor = Editor::open(
            Box::new(Arc::clone(&codec)),
            kv.clone(),
            TestPatternDevice::new(Dimensions::new(32, 32), 0),
            Translator::with_language(&EmbeddedLocales, Language::En),
            &EditorConfig::default(),
        );
        (editor, codec, kv)
    }

    /// Codec whose crops always land outside the source.
    struct BrokenCrop(MockCodec);

    impl ImageCodec for BrokenCrop {
        fn decode_source(&self, source: &Source) -> Result<AvatarImage, CodecError> {
            self.0.decode_source(source)
        }
        fn encode_crop(
            &self,
            image: &AvatarImage,
            _region: CropRegion,
        ) -> Result<AvatarImage, CodecError> {
            let d = image.dimensions();
            self.0
                .encode_crop(image, CropRegion::new(1, 1, d.width, d.height))
        }
    }

    #[test]
    fn starts_idle_without_avatar() {
        let (editor, kv, _) = memory_editor(Dimensions::new(64, 64));
        assert!(matches!(editor.state(), EditorState::Idle));
        assert!(editor.current().is_none());
        assert_eq!(kv.write_count(), 0);
    }

    #[test]
    fn camera_capture_commits_full_square_frame() {
        let (mut editor, kv, device) = memory_editor(Dimensions::new(96, 96));
        go_to_camera(&mut editor);
        assert_eq!(device.live_streams(), 1);

        editor.handle(EditorEvent::Capture).unwrap();
        assert!(!editor.session_open());
        assert_eq!(device.live_streams(), 0);
        match editor.state() {
            EditorState::ReviewCrop { stage, origin, .. } => {
                assert_eq!(*origin, CaptureOrigin::Camera);
                assert_eq!(stage.current_region(), CropRegion::new(0, 0, 96, 96));
            }
            other => panic!("expected review, got {other:?}"),
        }

        editor.handle(EditorEvent::Confirm).unwrap();
        assert!(matches!(editor.state(), EditorState::Idle));
        let stored = editor.store().load(&RustCodec::new()).unwrap().unwrap();
        assert_eq!(stored.dimensions(), Dimensions::new(96, 96));
        assert_eq!(kv.write_count(), 1);

        let notices = editor.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Success);
        assert_eq!(notices[0].key, "avatarSaved");
    }

    #[test]
    fn capture_before_ready_is_rejected_without_change() {
        let kv = MemoryStore::new();
        let device = TestPatternDevice::new(Dimensions::new(16, 16), 3);
        let mut editor = Editor::open(
            Box::new(RustCodec::new()),
            kv,
            device,
            Translator::default(),
            &EditorConfig::default(),
        );
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseCamera).unwrap();

        let err = editor.handle(EditorEvent::Capture).unwrap_err();
        assert!(matches!(err, EditorError::CameraNotReady));
        assert!(matches!(editor.state(), EditorState::CameraCapture));
        assert!(editor.session_open());
        assert!(editor.drain_notices().is_empty());

        // Two more warm-up frames, then a real one.
        while !editor.camera_ready() {}
        editor.handle(EditorEvent::Capture).unwrap();
        assert!(matches!(editor.state(), EditorState::ReviewCrop { .. }));
    }

    #[test]
    fn non_image_upload_returns_to_source_selection() {
        let (mut editor, kv, _) = memory_editor(Dimensions::new(64, 64));
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseUpload).unwrap();

        let file = UploadedFile::new("notes.txt", Some("text/plain".into()), b"hello".to_vec());
        let err = editor.handle(EditorEvent::FileChosen(file)).unwrap_err();
        assert!(matches!(err, EditorError::InvalidFileType(name) if name == "notes.txt"));
        assert!(matches!(editor.state(), EditorState::SourceSelection));
        assert_eq!(kv.write_count(), 0);

        let notices = editor.drain_notices();
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].key, "invalidImage");
        assert_eq!(notices[0].message, editor.translator().t("invalidImage"));
    }

    #[test]
    fn upload_without_decoder_is_an_invalid_file_type() {
        let (mut editor, kv, _) = memory_editor(Dimensions::new(64, 64));
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseUpload).unwrap();

        let file = UploadedFile::new("scan.avif", None, b"\0\0\0\x1cftypavif".to_vec());
        let err = editor.handle(EditorEvent::FileChosen(file)).unwrap_err();
        assert!(matches!(err, EditorError::InvalidFileType(name) if name == "scan.avif"));
        assert!(matches!(editor.state(), EditorState::SourceSelection));
        assert_eq!(editor.drain_notices()[0].key, "invalidImage");
        assert_eq!(kv.write_count(), 0);
    }

    #[test]
    fn codec_errors_map_to_editor_kinds() {
        let decode = EditorError::from(CodecError::decode("file", "bad"));
        assert!(matches!(decode, EditorError::Decode(_)));
        let data_uri = EditorError::from(CodecError::DataUri(DataUriError::NotBase64));
        assert!(matches!(data_uri, EditorError::Decode(_)));
        let encode = EditorError::from(CodecError::Encode("full".into()));
        assert!(matches!(encode, EditorError::Encode(_)));
    }

    #[test]
    fn corrupt_upload_is_a_decode_error() {
        let (mut editor, _, _) = memory_editor(Dimensions::new(64, 64));
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseUpload).unwrap();
        let file = UploadedFile::new("broken.png", Some("image/png".into()), vec![0x89, 1, 2]);
        let err = editor.handle(EditorEvent::FileChosen(file)).unwrap_err();
        assert!(matches!(err, EditorError::Decode(_)));
        assert!(matches!(editor.state(), EditorState::SourceSelection));
    }

    #[test]
    fn upload_zoom_and_confirm_crops_centre() {
        let (mut editor, kv, _) = memory_editor(Dimensions::new(64, 64));
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseUpload).unwrap();
        editor
            .handle(EditorEvent::FileChosen(png_upload("me.png", 300, 200)))
            .unwrap();
        editor.handle(EditorEvent::SetZoom(2.0)).unwrap();
        editor
            .handle(EditorEvent::SetOffset { dx: 500.0, dy: 0.0 })
            .unwrap();
        match editor.state() {
            EditorState::ReviewCrop { stage, .. } => {
                assert_eq!(stage.current_region(), CropRegion::new(200, 50, 100, 100));
            }
            other => panic!("expected review, got {other:?}"),
        }
        editor.handle(EditorEvent::Confirm).unwrap();

        let current = editor.current().unwrap();
        assert_eq!(current.dimensions(), Dimensions::new(100, 100));
        let reloaded = PersistenceStore::new(kv).load(&RustCodec::new()).unwrap();
        assert_eq!(reloaded.unwrap().bytes(), current.bytes());
    }

    #[test]
    fn zoom_steps_use_configured_step() {
        let (mut editor, _, _) = mock_editor(Dimensions::new(200, 200));
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseUpload).unwrap();
        editor
            .handle(EditorEvent::FileChosen(png_upload("a.png", 1, 1)))
            .unwrap();
        for _ in 0..5 {
            editor.handle(EditorEvent::ZoomIn).unwrap();
        }
        editor.handle(EditorEvent::ZoomOut).unwrap();
        match editor.state() {
            EditorState::ReviewCrop { stage, .. } => {
                assert!((stage.zoom() - 1.4).abs() < 1e-9);
            }
            other => panic!("expected review, got {other:?}"),
        }
    }

    #[test]
    fn confirm_sends_stage_region_to_codec() {
        let (mut editor, codec, _) = mock_editor(Dimensions::new(120, 80));
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseUpload).unwrap();
        editor
            .handle(EditorEvent::FileChosen(png_upload("a.png", 1, 1)))
            .unwrap();
        editor.handle(EditorEvent::Confirm).unwrap();
        assert_eq!(
            codec.get_operations(),
            vec![
                RecordedOp::Decode("file"),
                RecordedOp::Crop(CropRegion::new(20, 0, 80, 80)),
            ]
        );
    }

    #[test]
    fn out_of_bounds_crop_leaves_store_untouched() {
        let kv = MemoryStore::new();
        let previous = sample_avatar(10, 10);
        PersistenceStore::new(kv.clone()).save(&previous).unwrap();

        let mut editor = Editor::open(
            Box::new(BrokenCrop(MockCodec::with_dimensions(Dimensions::new(50, 50)))),
            kv.clone(),
            TestPatternDevice::new(Dimensions::new(8, 8), 0),
            Translator::default(),
            &EditorConfig::default(),
        );
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseUpload).unwrap();
        editor
            .handle(EditorEvent::FileChosen(png_upload("a.png", 1, 1)))
            .unwrap();
        let err = editor.handle(EditorEvent::Confirm).unwrap_err();
        assert!(matches!(err, EditorError::CropOutOfBounds { .. }));
        assert!(matches!(editor.state(), EditorState::SourceSelection));
        assert_eq!(
            kv.get(PROFILE_IMAGE_KEY).unwrap(),
            Some(previous.to_data_uri())
        );
        assert_eq!(editor.drain_notices()[0].key, "cropError");
    }

    #[test]
    fn cancel_review_after_camera_reopens_camera() {
        let (mut editor, _, device) = memory_editor(Dimensions::new(40, 40));
        go_to_camera(&mut editor);
        editor.handle(EditorEvent::Capture).unwrap();
        assert_eq!(device.live_streams(), 0);

        editor.handle(EditorEvent::Cancel).unwrap();
        assert!(matches!(editor.state(), EditorState::CameraCapture));
        assert!(editor.session_open());
        assert_eq!(device.live_streams(), 1);

        editor.handle(EditorEvent::Cancel).unwrap();
        assert!(matches!(editor.state(), EditorState::Idle));
        assert_eq!(device.live_streams(), 0);
        assert_eq!(editor.open_sessions(), 0);
    }

    #[test]
    fn cancel_review_after_upload_returns_to_selection() {
        let (mut editor, kv, _) = memory_editor(Dimensions::new(40, 40));
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseUpload).unwrap();
        editor
            .handle(EditorEvent::FileChosen(png_upload("a.png", 20, 20)))
            .unwrap();
        editor.handle(EditorEvent::Cancel).unwrap();
        assert!(matches!(editor.state(), EditorState::SourceSelection));
        assert_eq!(kv.write_count(), 0);
    }

    #[test]
    fn cancel_from_intermediate_states_goes_idle() {
        let (mut editor, _, _) = memory_editor(Dimensions::new(40, 40));
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::Cancel).unwrap();
        assert!(matches!(editor.state(), EditorState::Idle));

        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseUpload).unwrap();
        editor.handle(EditorEvent::Cancel).unwrap();
        assert!(matches!(editor.state(), EditorState::Idle));
    }

    #[test]
    fn cancel_while_idle_is_invalid() {
        let (mut editor, _, _) = memory_editor(Dimensions::new(40, 40));
        let err = editor.handle(EditorEvent::Cancel).unwrap_err();
        assert!(matches!(
            err,
            EditorError::InvalidTransition {
                state: "idle",
                event: "cancel"
            }
        ));
    }

    #[test]
    fn invalid_transition_keeps_state_and_session() {
        let (mut editor, _, device) = memory_editor(Dimensions::new(40, 40));
        go_to_camera(&mut editor);
        let err = editor.handle(EditorEvent::Confirm).unwrap_err();
        assert!(err.is_rejection());
        assert!(matches!(editor.state(), EditorState::CameraCapture));
        assert_eq!(device.live_streams(), 1);
        assert!(editor.drain_notices().is_empty());
    }

    #[test]
    fn missing_camera_is_reported_and_recovered() {
        let kv = MemoryStore::new();
        let mut editor = Editor::open(
            Box::new(RustCodec::new()),
            kv,
            NoDevice::new("permission denied"),
            Translator::with_language(&EmbeddedLocales, Language::Es),
            &EditorConfig::default(),
        );
        editor.handle(EditorEvent::OpenSelector).unwrap();
        let err = editor.handle(EditorEvent::ChooseCamera).unwrap_err();
        assert!(matches!(err, EditorError::DeviceUnavailable(_)));
        assert!(matches!(editor.state(), EditorState::SourceSelection));
        assert!(!editor.session_open());

        let notice = &editor.drain_notices()[0];
        assert_eq!(notice.key, "cameraError");
        assert_ne!(notice.message, "cameraError");
    }

    #[test]
    fn only_one_session_is_ever_open() {
        let (mut editor, _, device) = memory_editor(Dimensions::new(24, 24));
        for _ in 0..3 {
            go_to_camera(&mut editor);
            assert_eq!(editor.open_sessions(), 1);
            assert_eq!(device.live_streams(), 1);
            editor.handle(EditorEvent::Capture).unwrap();
            editor.handle(EditorEvent::Cancel).unwrap();
            assert_eq!(device.live_streams(), 1);
            editor.handle(EditorEvent::Cancel).unwrap();
            assert_eq!(device.live_streams(), 0);
        }
    }

    #[test]
    fn generated_pick_commits_without_crop() {
        let (mut editor, codec, kv) = mock_editor(Dimensions::new(10, 10));
        editor.set_generator_seed(Some("seed".into()));
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseGenerated).unwrap();
        let picked = match editor.state() {
            EditorState::GeneratedPicker { style, options } => {
                assert_eq!(*style, Style::Caricature);
                assert_eq!(options.len(), 12);
                options[3].image.clone()
            }
            other => panic!("expected picker, got {other:?}"),
        };

        editor.handle(EditorEvent::Pick(3)).unwrap();
        assert!(matches!(editor.state(), EditorState::Idle));
        assert_eq!(editor.current().unwrap().bytes(), picked.bytes());
        assert_eq!(kv.get(PROFILE_IMAGE_KEY).unwrap(), Some(picked.to_data_uri()));
        assert!(codec.get_operations().is_empty());
        assert_eq!(editor.drain_notices()[0].key, "avatarSelected");
    }

    #[test]
    fn select_style_and_regenerate() {
        let (mut editor, _, _) = memory_editor(Dimensions::new(8, 8));
        editor.set_generator_seed(Some("fixed".into()));
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseGenerated).unwrap();
        editor.handle(EditorEvent::SelectStyle(Style::Robots)).unwrap();
        let seeds = |editor: &Editor<MemoryStore, TestPatternDevice>| match editor.state() {
            EditorState::GeneratedPicker { style, options } => {
                assert_eq!(*style, Style::Robots);
                options.iter().map(|o| o.seed.clone()).collect::<Vec<_>>()
            }
            other => panic!("expected picker, got {other:?}"),
        };
        let first = seeds(&editor);
        assert_eq!(first[0], "fixed-0");

        editor.handle(EditorEvent::Regenerate).unwrap();
        assert_ne!(seeds(&editor), first);
    }

    #[test]
    fn pick_out_of_range_is_rejected() {
        let (mut editor, _, _) = memory_editor(Dimensions::new(8, 8));
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseGenerated).unwrap();
        let err = editor.handle(EditorEvent::Pick(99)).unwrap_err();
        assert!(matches!(err, EditorError::NoSuchAvatar(99)));
        assert!(matches!(editor.state(), EditorState::GeneratedPicker { .. }));
    }

    #[test]
    fn quota_error_keeps_in_memory_avatar() {
        let kv = MemoryStore::with_quota(64);
        let (mut editor, _, _) = memory_editor_with(kv.clone(), Dimensions::new(8, 8));
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseUpload).unwrap();
        editor
            .handle(EditorEvent::FileChosen(png_upload("big.png", 50, 50)))
            .unwrap();
        let err = editor.handle(EditorEvent::Confirm).unwrap_err();

        assert!(matches!(err, EditorError::StorageQuota { quota: 64, .. }));
        assert!(matches!(editor.state(), EditorState::Idle));
        assert_eq!(
            editor.current().unwrap().dimensions(),
            Dimensions::new(50, 50)
        );
        assert_eq!(kv.get(PROFILE_IMAGE_KEY).unwrap(), None);
        assert_eq!(editor.drain_notices()[0].key, "storageFull");
    }

    #[test]
    fn remove_clears_store_and_current() {
        let kv = MemoryStore::new();
        PersistenceStore::new(kv.clone())
            .save(&sample_avatar(12, 12))
            .unwrap();
        let (mut editor, kv, _) = memory_editor_with(kv, Dimensions::new(8, 8));
        assert!(editor.current().is_some());

        editor.handle(EditorEvent::Remove).unwrap();
        assert!(editor.current().is_none());
        assert_eq!(kv.get(PROFILE_IMAGE_KEY).unwrap(), None);
        assert_eq!(editor.drain_notices()[0].key, "avatarRemoved");
    }

    #[test]
    fn open_treats_corrupt_stored_value_as_absent() {
        let kv = MemoryStore::new();
        kv.set(PROFILE_IMAGE_KEY, "data:image/png;base64,AAAA").unwrap();
        let (editor, kv, _) = memory_editor_with(kv, Dimensions::new(8, 8));
        assert!(editor.current().is_none());
        assert!(kv.get(PROFILE_IMAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn finish_releases_camera_and_returns_current() {
        let kv = MemoryStore::new();
        let saved = sample_avatar(16, 16);
        PersistenceStore::new(kv.clone()).save(&saved).unwrap();
        let (mut editor, _, device) = memory_editor_with(kv, Dimensions::new(8, 8));
        go_to_camera(&mut editor);
        assert_eq!(device.live_streams(), 1);

        let result = editor.finish();
        assert_eq!(device.live_streams(), 0);
        assert_eq!(result.unwrap().bytes(), saved.bytes());
    }

    #[test]
    fn language_switch_persists_and_retranslates() {
        let (mut editor, kv, _) = memory_editor(Dimensions::new(8, 8));
        editor.set_language(Language::De, &EmbeddedLocales).unwrap();
        assert_eq!(kv.get(crate::store::LANGUAGE_KEY).unwrap().as_deref(), Some("de"));

        editor.handle(EditorEvent::Remove).unwrap();
        let notice = &editor.drain_notices()[0];
        assert_eq!(notice.message, editor.translator().t("avatarRemoved"));
        assert_eq!(editor.translator().language(), Language::De);
    }
}
