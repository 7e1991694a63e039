use avatar_studio::avatars::Style;
use avatar_studio::capture::CaptureDevice;
use avatar_studio::config::{self, EditorConfig};
use avatar_studio::editor::{Editor, EditorError, EditorEvent, EditorState};
use avatar_studio::imaging::RustCodec;
use avatar_studio::locale::{Language, LocaleProvider, Translator};
use avatar_studio::output;
use avatar_studio::store::FileStore;
use avatar_studio::types::UploadedFile;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

type StudioEditor = Editor<FileStore, Box<dyn CaptureDevice>>;

/// Crop and zoom applied before confirming.
#[derive(clap::Args, Clone)]
struct CropArgs {
    /// Zoom level (1.0 frames the whole short edge)
    #[arg(long, default_value_t = 1.0)]
    zoom: f64,

    /// Horizontal offset of the crop centre, in source pixels
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset_x: f64,

    /// Vertical offset of the crop centre, in source pixels
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset_y: f64,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "avatar-studio")]
#[command(about = "Profile picture editor: upload, capture or generate, crop, save")]
#[command(long_about = "\
Profile picture editor: upload, capture or generate, crop, save

One avatar is kept in a local store and survives between runs. Every
command drives the same editor a button press would:

  upload FILE     open selector → upload → crop → confirm
  capture         open selector → camera → capture → crop → confirm
  generate        open selector → generated avatars → pick
  remove          delete the stored avatar

Set RUST_LOG=debug to trace editor transitions.

Run 'avatar-studio gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Store directory (overrides storage.dir from the config)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the stored avatar
    Show,
    /// Upload an image file, crop it, and save it
    Upload {
        file: PathBuf,
        #[command(flatten)]
        crop: CropArgs,
    },
    /// Take a photo with the configured camera, crop it, and save it
    Capture {
        /// Give up if the camera is not ready after this many polls
        #[arg(long, default_value_t = 30)]
        wait_frames: u32,
        #[command(flatten)]
        crop: CropArgs,
    },
    /// Generate avatars, optionally picking one as the new avatar
    Generate {
        /// caricature, pixel-art or robots (default from config)
        #[arg(long)]
        style: Option<Style>,
        /// Reproducible batch seed
        #[arg(long)]
        seed: Option<String>,
        /// Avatars to generate (default from config)
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..=256))]
        count: Option<u16>,
        /// Save this avatar (1-based, as listed)
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        pick: Option<u16>,
        /// Write every generated avatar as PNG into this directory
        #[arg(long)]
        preview_dir: Option<PathBuf>,
    },
    /// Delete the stored avatar
    Remove,
    /// Write the stored avatar to a PNG file
    Export { path: PathBuf },
    /// Show or set the interface language
    Language {
        /// es, en or de
        code: Option<Language>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut config = config::load_config(&cli.config_dir)?;
    if let Command::Generate {
        count: Some(count), ..
    } = &cli.command
    {
        config.generator.count = usize::from(*count);
    }
    let provider = config.locale.provider(&cli.config_dir);
    let mut editor = open_editor(&cli, &config, provider.as_ref())?;

    match cli.command {
        Command::Show => {
            output::print_avatar(editor.current(), editor.translator());
        }
        Command::Upload { file, crop } => {
            let upload = UploadedFile::from_path(&file)?;
            step(&mut editor, EditorEvent::OpenSelector)?;
            step(&mut editor, EditorEvent::ChooseUpload)?;
            step(&mut editor, EditorEvent::FileChosen(upload))?;
            crop_and_confirm(&mut editor, &crop)?;
            output::print_avatar(editor.current(), editor.translator());
        }
        Command::Capture { wait_frames, crop } => {
            step(&mut editor, EditorEvent::OpenSelector)?;
            step(&mut editor, EditorEvent::ChooseCamera)?;
            let mut polls = 0;
            while !editor.camera_ready() {
                polls += 1;
                if polls >= wait_frames {
                    step(&mut editor, EditorEvent::Cancel)?;
                    return Err(EditorError::CameraNotReady.into());
                }
            }
            step(&mut editor, EditorEvent::Capture)?;
            crop_and_confirm(&mut editor, &crop)?;
            output::print_avatar(editor.current(), editor.translator());
        }
        Command::Generate {
            style,
            seed,
            pick,
            preview_dir,
            ..
        } => {
            editor.set_generator_seed(seed);
            step(&mut editor, EditorEvent::OpenSelector)?;
            step(&mut editor, EditorEvent::ChooseGenerated)?;
            if let Some(style) = style {
                step(&mut editor, EditorEvent::SelectStyle(style))?;
            }
            if let EditorState::GeneratedPicker { style, options } = editor.state() {
                output::print_generated(*style, options, editor.translator());
                if let Some(dir) = &preview_dir {
                    std::fs::create_dir_all(dir)?;
                    for (i, option) in options.iter().enumerate() {
                        let path = dir.join(format!("{:03}-{}.png", i + 1, option.seed));
                        std::fs::write(&path, option.image.bytes())?;
                    }
                    println!("Wrote {} previews to {}", options.len(), dir.display());
                }
            }
            match pick {
                Some(n) => {
                    step(&mut editor, EditorEvent::Pick(usize::from(n) - 1))?;
                    output::print_avatar(editor.current(), editor.translator());
                }
                None => step(&mut editor, EditorEvent::Cancel)?,
            }
        }
        Command::Remove => {
            step(&mut editor, EditorEvent::Remove)?;
        }
        Command::Export { path } => match editor.current() {
            Some(image) => {
                export_png(image.bytes(), &path)?;
                println!("{}", path.display());
            }
            None => {
                output::print_avatar(None, editor.translator());
                return Err("nothing to export".into());
            }
        },
        Command::Language { code } => {
            if let Some(language) = code {
                editor.set_language(language, provider.as_ref())?;
            }
            output::print_languages(editor.translator().language());
        }
        // Printed before the editor was opened.
        Command::GenConfig => {}
    }

    editor.finish();
    Ok(())
}

/// Wire the editor to the configured store, camera and language.
fn open_editor(
    cli: &Cli,
    config: &EditorConfig,
    provider: &dyn LocaleProvider,
) -> Result<StudioEditor, Box<dyn std::error::Error>> {
    let store_dir = cli
        .store
        .clone()
        .unwrap_or_else(|| cli.config_dir.join(&config.storage.dir));
    let kv = FileStore::open(store_dir, config.storage.quota())?;
    let translator = Translator::load(provider, &kv, config.locale.default_language);
    let device = config.camera.device(&cli.config_dir);
    Ok(Editor::open(
        Box::new(RustCodec::new()),
        kv,
        device,
        translator,
        config,
    ))
}

/// Send one event and print whatever the editor wants to tell the user.
fn step(editor: &mut StudioEditor, event: EditorEvent) -> Result<(), EditorError> {
    let result = editor.handle(event);
    output::print_notices(&editor.drain_notices());
    if let Err(e) = &result
        && e.is_rejection()
    {
        eprintln!("{}", output::format_error(e, editor.translator()));
    }
    result
}

fn crop_and_confirm(editor: &mut StudioEditor, crop: &CropArgs) -> Result<(), EditorError> {
    step(editor, EditorEvent::SetZoom(crop.zoom))?;
    step(
        editor,
        EditorEvent::SetOffset {
            dx: crop.offset_x,
            dy: crop.offset_y,
        },
    )?;
    for line in output::format_state(editor.state(), editor.translator()) {
        println!("{}", line);
    }
    step(editor, EditorEvent::Confirm)
}

/// Re-encode whatever is stored as PNG.
fn export_png(bytes: &[u8], path: &Path) -> Result<(), image::ImageError> {
    image::load_from_memory(bytes)?.save_with_format(path, image::ImageFormat::Png)
}
