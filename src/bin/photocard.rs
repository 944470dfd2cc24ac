use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "photocard", version, about = "Composite a photo under a card template")]
struct Cli {
    /// Log editor state transitions (debug level). `RUST_LOG` overrides this.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose one card and export it.
    Compose(ComposeArgs),
    /// List the PNG templates in a directory.
    Templates(TemplatesArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// User photo (PNG or JPEG).
    #[arg(long)]
    photo: PathBuf,

    /// Template overlay (PNG).
    #[arg(long)]
    template: PathBuf,

    /// Saved edit state JSON, applied before the script.
    #[arg(long)]
    state: Option<PathBuf>,

    /// JSON array of editor commands, e.g. `[{"type":"zoom_in"},{"type":"rotate_right"}]`.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Editor config JSON (canvas size, steps, limits).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output resolution multiplier: 1, 2 or 4.
    #[arg(long, default_value = "1", value_parser = parse_scale)]
    scale: photocard::ExportScale,

    #[arg(long, value_enum, default_value_t = FormatChoice::Png)]
    format: FormatChoice,

    /// Output file stem; defaults to `photo-card`.
    #[arg(long)]
    name: Option<String>,

    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Show the alignment guides in the preview. Exports never contain them.
    #[arg(long)]
    guides: bool,

    /// Also write the interactive canvas (guides included) as a PNG.
    #[arg(long)]
    preview: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct TemplatesArgs {
    #[arg(long)]
    dir: PathBuf,

    /// Print the catalog as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Png,
    #[value(alias = "jpg")]
    Jpeg,
}

impl From<FormatChoice> for photocard::ExportFormat {
    fn from(c: FormatChoice) -> Self {
        match c {
            FormatChoice::Png => photocard::ExportFormat::Png,
            FormatChoice::Jpeg => photocard::ExportFormat::Jpeg,
        }
    }
}

fn parse_scale(s: &str) -> Result<photocard::ExportScale, String> {
    s.parse().map_err(|e: photocard::PhotocardError| e.to_string())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if let Ok(env) = std::env::var("RUST_LOG") {
        EnvFilter::new(env)
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Templates(args) => cmd_templates(args),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    let value = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse {what} JSON '{}'", path.display()))?;
    Ok(value)
}

fn read_upload(path: &Path) -> anyhow::Result<(Vec<u8>, Option<&'static str>)> {
    let bytes = std::fs::read(path).with_context(|| format!("read '{}'", path.display()))?;
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        _ => None,
    };
    Ok((bytes, mime))
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => {
            let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
            photocard::EditorConfig::from_json_reader(BufReader::new(f))?
        }
        None => photocard::EditorConfig::default(),
    };
    let jpeg_quality = config.jpeg_quality;
    let mut editor = photocard::Editor::new(config)?;

    let (photo, photo_mime) = read_upload(&args.photo)?;
    editor
        .load_photo(photo, photo_mime)
        .with_context(|| format!("load photo '{}'", args.photo.display()))?;
    let (template, template_mime) = read_upload(&args.template)?;
    editor
        .load_template(template, template_mime)
        .with_context(|| format!("load template '{}'", args.template.display()))?;

    if let Some(path) = &args.state {
        let state: photocard::EditState = read_json(path, "state")?;
        editor.set_state(state)?;
    }
    if let Some(path) = &args.script {
        let script: Vec<photocard::Command> = read_json(path, "script")?;
        for cmd in script {
            editor.dispatch(cmd)?;
        }
    }
    editor.set_guides(args.guides)?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    if let Some(path) = &args.preview
        && let Some(frame) = editor.frame()
    {
        let png = photocard::export::encode_png(frame)?;
        std::fs::write(path, &png.bytes)
            .with_context(|| format!("write preview '{}'", path.display()))?;
    }

    let confirmation = editor.confirm()?;
    let exporter = photocard::Exporter::new();
    let request = photocard::ExportRequest {
        scale: args.scale,
        format: args.format.into(),
        file_stem: args.name,
        jpeg_quality,
    };
    let artifact = exporter.begin(&confirmation.image, &request)?.run()?;

    let out = args.out_dir.join(&artifact.file_name);
    std::fs::write(&out, &artifact.image.bytes)
        .with_context(|| format!("write '{}'", out.display()))?;

    eprintln!(
        "wrote {} ({}x{})",
        out.display(),
        artifact.image.width,
        artifact.image.height
    );
    Ok(())
}

fn cmd_templates(args: TemplatesArgs) -> anyhow::Result<()> {
    let entries = photocard::scan_template_dir(&args.dir)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for e in &entries {
            println!("{}\t{}\t{}", e.id, e.display_name, e.path);
        }
    }
    Ok(())
}
