//! End-to-end editor flows through the public API, over a real directory
//! store.

use avatar_studio::avatars::{self, Style};
use avatar_studio::capture::TestPatternDevice;
use avatar_studio::config::EditorConfig;
use avatar_studio::editor::{Editor, EditorError, EditorEvent, EditorState};
use avatar_studio::imaging::{CropRegion, Dimensions, RustCodec};
use avatar_studio::locale::{EmbeddedLocales, Language, Translator};
use avatar_studio::store::{FileStore, KeyValueStore, PROFILE_IMAGE_KEY, PersistenceStore};
use avatar_studio::types::UploadedFile;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use tempfile::TempDir;

fn open(
    dir: &TempDir,
    camera: Dimensions,
) -> (Editor<FileStore, TestPatternDevice>, TestPatternDevice) {
    let kv = FileStore::open(dir.path(), None).unwrap();
    let device = TestPatternDevice::new(camera, 1);
    let translator = Translator::load(&EmbeddedLocales, &kv, Language::En);
    let editor = Editor::open(
        Box::new(RustCodec::new()),
        kv,
        device.clone(),
        translator,
        &EditorConfig::default(),
    );
    (editor, device)
}

fn png_file(name: &str, width: u32, height: u32) -> UploadedFile {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 3) as u8, (y * 5) as u8, 128])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    UploadedFile::new(name, None, buf.into_inner())
}

fn stored(dir: &TempDir) -> Option<avatar_studio::types::AvatarImage> {
    let kv = FileStore::open(dir.path(), None).unwrap();
    PersistenceStore::new(kv).load(&RustCodec::new()).unwrap()
}

#[test]
fn camera_capture_to_stored_avatar() {
    let dir = TempDir::new().unwrap();
    let (mut editor, device) = open(&dir, Dimensions::new(160, 160));
    assert!(editor.current().is_none());
    assert!(matches!(editor.state(), EditorState::Idle));

    editor.handle(EditorEvent::OpenSelector).unwrap();
    editor.handle(EditorEvent::ChooseCamera).unwrap();
    while !editor.camera_ready() {}
    editor.handle(EditorEvent::Capture).unwrap();
    assert_eq!(device.live_streams(), 0);

    match editor.state() {
        EditorState::ReviewCrop { stage, .. } => {
            assert_eq!(stage.zoom(), 1.0);
            assert_eq!(stage.current_region(), CropRegion::new(0, 0, 160, 160));
        }
        other => panic!("expected review, got {other:?}"),
    }
    editor.handle(EditorEvent::Confirm).unwrap();

    let avatar = stored(&dir).expect("avatar stored");
    assert_eq!(avatar.dimensions(), Dimensions::new(160, 160));
    assert_eq!(avatar.mime_type(), "image/png");
}

#[test]
fn non_image_upload_is_rejected_without_writing() {
    let dir = TempDir::new().unwrap();
    let (mut editor, _) = open(&dir, Dimensions::new(32, 32));
    editor.handle(EditorEvent::OpenSelector).unwrap();
    editor.handle(EditorEvent::ChooseUpload).unwrap();

    let file = UploadedFile::new("resume.pdf", None, b"%PDF-1.7".to_vec());
    let err = editor.handle(EditorEvent::FileChosen(file)).unwrap_err();
    assert!(matches!(err, EditorError::InvalidFileType(_)));
    assert!(matches!(editor.state(), EditorState::SourceSelection));
    assert!(stored(&dir).is_none());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn committed_upload_survives_restart() {
    let dir = TempDir::new().unwrap();
    let (mut editor, _) = open(&dir, Dimensions::new(32, 32));
    editor.handle(EditorEvent::OpenSelector).unwrap();
    editor.handle(EditorEvent::ChooseUpload).unwrap();
    editor
        .handle(EditorEvent::FileChosen(png_file("portrait.png", 90, 120)))
        .unwrap();
    editor.handle(EditorEvent::SetZoom(1.5)).unwrap();
    editor.handle(EditorEvent::Confirm).unwrap();
    let committed = editor.finish().unwrap();
    assert_eq!(committed.dimensions(), Dimensions::new(60, 60));

    let (reopened, _) = open(&dir, Dimensions::new(32, 32));
    let loaded = reopened.current().expect("loaded at startup");
    assert_eq!(loaded.bytes(), committed.bytes());
}

#[test]
fn every_commit_is_what_the_next_load_returns() {
    let dir = TempDir::new().unwrap();
    let (mut editor, _) = open(&dir, Dimensions::new(48, 48));
    for round in 1..=3u32 {
        editor.handle(EditorEvent::OpenSelector).unwrap();
        editor.handle(EditorEvent::ChooseUpload).unwrap();
        editor
            .handle(EditorEvent::FileChosen(png_file("p.png", 20 * round, 30)))
            .unwrap();
        editor.handle(EditorEvent::Confirm).unwrap();
        let current = editor.current().unwrap().clone();
        assert_eq!(stored(&dir).unwrap().bytes(), current.bytes());
    }
}

#[test]
fn remove_leaves_nothing_stored() {
    let dir = TempDir::new().unwrap();
    let (mut editor, _) = open(&dir, Dimensions::new(32, 32));
    editor.handle(EditorEvent::OpenSelector).unwrap();
    editor.handle(EditorEvent::ChooseGenerated).unwrap();
    editor.handle(EditorEvent::Pick(0)).unwrap();
    assert!(stored(&dir).is_some());

    editor.handle(EditorEvent::Remove).unwrap();
    assert!(stored(&dir).is_none());
    assert!(editor.current().is_none());

    // Removing again is harmless.
    editor.handle(EditorEvent::Remove).unwrap();
}

#[test]
fn seeded_picker_matches_generator() {
    let dir = TempDir::new().unwrap();
    let (mut editor, _) = open(&dir, Dimensions::new(32, 32));
    editor.set_generator_seed(Some("team".into()));
    editor.handle(EditorEvent::OpenSelector).unwrap();
    editor.handle(EditorEvent::ChooseGenerated).unwrap();
    editor.handle(EditorEvent::SelectStyle(Style::PixelArt)).unwrap();
    editor.handle(EditorEvent::Pick(5)).unwrap();

    let expected = avatars::render(Style::PixelArt, "team-5", 128).unwrap();
    assert_eq!(stored(&dir).unwrap().bytes(), expected.bytes());
}

#[test]
fn camera_session_is_exclusive_and_always_released() {
    let dir = TempDir::new().unwrap();
    let (mut editor, device) = open(&dir, Dimensions::new(20, 20));

    editor.handle(EditorEvent::OpenSelector).unwrap();
    editor.handle(EditorEvent::ChooseCamera).unwrap();
    assert_eq!(editor.open_sessions(), 1);

    // Not valid while capturing: no second session, nothing changes.
    assert!(editor.handle(EditorEvent::ChooseCamera).is_err());
    assert_eq!(device.live_streams(), 1);

    editor.handle(EditorEvent::Cancel).unwrap();
    assert_eq!(device.live_streams(), 0);
    assert_eq!(editor.open_sessions(), 0);

    editor.handle(EditorEvent::OpenSelector).unwrap();
    editor.handle(EditorEvent::ChooseCamera).unwrap();
    drop(editor);
    assert_eq!(device.live_streams(), 0);
}

#[test]
fn language_choice_is_remembered() {
    let dir = TempDir::new().unwrap();
    let (mut editor, _) = open(&dir, Dimensions::new(8, 8));
    editor.set_language(Language::Es, &EmbeddedLocales).unwrap();
    drop(editor);

    let kv = FileStore::open(dir.path(), None).unwrap();
    assert_eq!(kv.get("language").unwrap().as_deref(), Some("es"));
    let (reopened, _) = open(&dir, Dimensions::new(8, 8));
    assert_eq!(reopened.translator().language(), Language::Es);
    assert!(kv.get(PROFILE_IMAGE_KEY).unwrap().is_none());
}
