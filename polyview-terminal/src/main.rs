/// Polyview - software renderer for polyhedral scenes
///
/// `view` opens the interactive terminal viewer, `render` writes a single
/// frame to a PNG (or an ASCII `.txt`), `export` writes a transformed model
/// back to OBJ.
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use polyview_core::{
    load_obj, save_obj, Axis, ObjOptions, Polyhedron, ProjectionMode, SceneConfig, ShadingMode,
    Texture, Transform,
};
use polyview_terminal::{ascii_lines, PresentMode, TerminalApp};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polyview", version, about = "Software renderer for polyhedral scenes")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive viewer in the terminal
    View {
        /// OBJ model to show instead of the cube
        #[arg(long)]
        obj: Option<PathBuf>,
        /// Scene configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Luminance characters instead of truecolor blocks
        #[arg(long)]
        ascii: bool,
        /// Mirror the model's Y axis on import
        #[arg(long)]
        flip_y: bool,
    },
    /// Render one frame to an image file
    Render {
        /// Output path; `.txt` writes ASCII art, anything else PNG
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long)]
        obj: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        width: Option<usize>,
        #[arg(long)]
        height: Option<usize>,
        #[arg(long, value_enum)]
        shading: Option<ShadingArg>,
        /// Painter's algorithm instead of the depth buffer
        #[arg(long)]
        no_z_buffer: bool,
        /// Orthographic projection
        #[arg(long)]
        axonometric: bool,
        /// PNG texture for faces with UVs
        #[arg(long)]
        texture: Option<PathBuf>,
        #[arg(long)]
        flip_y: bool,
        /// Rotation about the model's center line, in degrees
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        rotate: f64,
        /// Axis the center line is parallel to (x, y or z)
        #[arg(long, default_value = "y")]
        axis: Axis,
    },
    /// Transform a model and write it back as OBJ
    Export {
        #[arg(long)]
        obj: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        /// Uniform scale about the model center
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
        /// Rotation about the model's center line, in degrees
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        rotate: f64,
        #[arg(long, default_value = "y")]
        axis: Axis,
        #[arg(long)]
        flip_y: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShadingArg {
    Flat,
    Gouraud,
    Phong,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::View {
            obj,
            config,
            ascii,
            flip_y,
        } => {
            let config = load_config(config.as_deref())?;
            let model = load_model(obj.as_deref(), flip_y)?;
            let mode = if ascii {
                PresentMode::Ascii
            } else {
                PresentMode::TrueColor
            };
            let mut app = TerminalApp::new(model, &config, mode).context("terminal unavailable")?;
            app.run()?;
        }
        Commands::Render {
            out,
            obj,
            config,
            width,
            height,
            shading,
            no_z_buffer,
            axonometric,
            texture,
            flip_y,
            rotate,
            axis,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(width) = width {
                config.viewport.width = width;
            }
            if let Some(height) = height {
                config.viewport.height = height;
            }
            match shading {
                Some(ShadingArg::Flat) => config.render.use_lighting = false,
                Some(ShadingArg::Gouraud) => {
                    config.render.use_lighting = true;
                    config.render.shading_mode = ShadingMode::Gouraud;
                }
                Some(ShadingArg::Phong) => {
                    config.render.use_lighting = true;
                    config.render.shading_mode = ShadingMode::Phong;
                }
                None => {}
            }
            if no_z_buffer {
                config.render.use_z_buffer = false;
            }
            if axonometric {
                config.camera.projection = ProjectionMode::Orthographic;
            }
            config.validate()?;

            let mut model = load_model(obj.as_deref(), flip_y)?;
            rotate_about_center(&mut model, axis, rotate);

            let mut renderer = config.renderer();
            if let Some(path) = texture.as_deref() {
                renderer.set_texture(Some(load_texture(path)?));
                renderer.settings.use_texture = true;
            } else if renderer.settings.use_texture {
                renderer.set_texture(Some(Texture::default()));
            }

            let stats = renderer.render(&[&model], &config.camera());
            info!(
                faces = stats.faces_drawn,
                culled = stats.faces_culled,
                pixels = stats.pixels_written,
                "rendered frame"
            );
            write_frame(&out, renderer.buffer())?;
            info!(path = %out.display(), "frame written");
        }
        Commands::Export {
            obj,
            out,
            scale,
            rotate,
            axis,
            flip_y,
        } => {
            if !(scale.is_finite() && scale > 0.0) {
                bail!("scale must be a positive number, got {scale}");
            }
            let mut model = load_model(Some(&obj), flip_y)?;
            model.scale_about_center(scale);
            rotate_about_center(&mut model, axis, rotate);
            save_obj(&out, &model).with_context(|| format!("writing {}", out.display()))?;
            info!(path = %out.display(), faces = model.faces.len(), "model exported");
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SceneConfig> {
    match path {
        Some(path) => SceneConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(SceneConfig::default()),
    }
}

fn load_model(path: Option<&Path>, flip_y: bool) -> anyhow::Result<Polyhedron> {
    match path {
        Some(path) => {
            let model = load_obj(path, ObjOptions { flip_y })
                .with_context(|| format!("loading {}", path.display()))?;
            info!(path = %path.display(), faces = model.faces.len(), "model loaded");
            Ok(model)
        }
        None => Ok(Polyhedron::cube(2.0)),
    }
}

fn rotate_about_center(model: &mut Polyhedron, axis: Axis, degrees: f64) {
    if degrees != 0.0 {
        let m = Transform::rotation_around_line_through_center(model, axis, degrees.to_radians());
        model.apply_transform(&m);
    }
}

fn load_texture(path: &Path) -> anyhow::Result<Texture> {
    let image = image::open(path)
        .with_context(|| format!("loading texture {}", path.display()))?
        .to_rgb8();
    let (w, h) = image.dimensions();
    Ok(Texture::from_rgb_bytes(w as usize, h as usize, image.as_raw())?)
}

fn write_frame(path: &Path, buffer: &polyview_core::FrameBuffer) -> anyhow::Result<()> {
    let is_text = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
    if is_text {
        let mut text = ascii_lines(buffer).join("\n");
        text.push('\n');
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
        return Ok(());
    }
    let image = image::RgbImage::from_raw(
        buffer.width() as u32,
        buffer.height() as u32,
        buffer.to_rgb_bytes(),
    )
    .context("frame buffer size does not match its pixel data")?;
    image
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
