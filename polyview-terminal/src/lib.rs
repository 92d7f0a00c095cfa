/// Interactive terminal viewer for the polyview software renderer
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use polyview_core::{
    Axis, Camera, FrameStats, Polyhedron, ProjectionMode, Renderer, SceneConfig, ShadingMode,
    Texture, Transform,
};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub mod renderer;

pub use renderer::{ascii_lines, PresentMode, TerminalPresenter};

/// Radians per key press for model and orbit rotation.
const ROTATE_STEP: f64 = 0.1;
/// Radians per frame while auto-rotation is on.
const SPIN_STEP: f64 = 0.015;
const MOVE_STEP: f64 = 0.25;
const SCALE_STEP: f64 = 1.1;
/// Rows reserved above the frame for the status line.
const STATUS_ROWS: u16 = 1;

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    model: Polyhedron,
    camera: Camera,
    renderer: Renderer,
    presenter: TerminalPresenter,
    size: (u16, u16),
    auto_rotate: bool,
    running: bool,
    last_stats: FrameStats,
    last_frame: Instant,
    frame_count: u32,
    frames_rendered: u64,
    fps: f32,
}

impl TerminalApp {
    pub fn new(model: Polyhedron, config: &SceneConfig, mode: PresentMode) -> io::Result<Self> {
        let (cols, rows) = terminal::size()?;
        Ok(Self::with_size(model, config, mode, cols, rows))
    }

    /// Build the app for a known terminal size without touching the terminal.
    pub fn with_size(
        model: Polyhedron,
        config: &SceneConfig,
        mode: PresentMode,
        cols: u16,
        rows: u16,
    ) -> Self {
        let mut renderer = config.renderer();
        renderer.set_texture(Some(Texture::default()));
        let mut app = Self {
            model,
            camera: config.camera(),
            renderer,
            presenter: TerminalPresenter::new(mode, STATUS_ROWS),
            size: (0, 0),
            auto_rotate: true,
            running: true,
            last_stats: FrameStats::default(),
            last_frame: Instant::now(),
            frame_count: 0,
            frames_rendered: 0,
            fps: 0.0,
        };
        app.fit_to(cols, rows);
        app
    }

    pub fn model(&self) -> &Polyhedron {
        &self.model
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn set_texture(&mut self, texture: Texture) {
        self.renderer.set_texture(Some(texture));
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Resize the frame buffer and camera aspect for a terminal size.
    pub fn fit_to(&mut self, cols: u16, rows: u16) {
        if self.size == (cols, rows) {
            return;
        }
        self.size = (cols, rows);
        let rows = rows.saturating_sub(STATUS_ROWS);
        let mode = self.presenter.mode;
        let (width, height) = mode.buffer_size(cols, rows);
        self.renderer.resize(width, height);
        self.camera.set_aspect_ratio(mode.aspect_ratio(cols, rows));
        debug!(cols, rows, width, height, "viewport resized");
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;
        info!(frames = self.frames_rendered, "viewer closed");

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                match event::read()? {
                    Event::Key(KeyEvent {
                        code,
                        kind: KeyEventKind::Press,
                        ..
                    }) => self.handle_key(code),
                    Event::Resize(cols, rows) => self.fit_to(cols, rows),
                    _ => {}
                }
            }

            self.update();
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn rotate_model(&mut self, axis: Axis, angle: f64) {
        let m = Transform::rotation_around_line_through_center(&self.model, axis, angle);
        self.model.apply_transform(&m);
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,

            // Model
            KeyCode::Char('w') => self.rotate_model(Axis::X, ROTATE_STEP),
            KeyCode::Char('s') => self.rotate_model(Axis::X, -ROTATE_STEP),
            KeyCode::Char('a') => self.rotate_model(Axis::Y, -ROTATE_STEP),
            KeyCode::Char('d') => self.rotate_model(Axis::Y, ROTATE_STEP),
            KeyCode::Char('e') => self.rotate_model(Axis::Z, ROTATE_STEP),
            KeyCode::Char('r') => self.rotate_model(Axis::Z, -ROTATE_STEP),
            KeyCode::Char('+') | KeyCode::Char('=') => self.model.scale_about_center(SCALE_STEP),
            KeyCode::Char('-') => self.model.scale_about_center(1.0 / SCALE_STEP),
            KeyCode::Char('0') => self.model.reset_transform(),
            KeyCode::Char(' ') => self.auto_rotate = !self.auto_rotate,

            // Camera
            KeyCode::Up => self.camera.rotate_around_target(-ROTATE_STEP, 0.0),
            KeyCode::Down => self.camera.rotate_around_target(ROTATE_STEP, 0.0),
            KeyCode::Left => self.camera.rotate_around_target(0.0, ROTATE_STEP),
            KeyCode::Right => self.camera.rotate_around_target(0.0, -ROTATE_STEP),
            KeyCode::Char('i') => self.camera.move_forward(MOVE_STEP),
            KeyCode::Char('k') => self.camera.move_forward(-MOVE_STEP),
            KeyCode::Char('j') => self.camera.strafe(-MOVE_STEP),
            KeyCode::Char('l') => self.camera.strafe(MOVE_STEP),
            KeyCode::Char('u') => self.camera.move_vertical(MOVE_STEP),
            KeyCode::Char('o') => self.camera.move_vertical(-MOVE_STEP),
            KeyCode::Char('c') => self.camera.reset(),
            KeyCode::Char('p') => {
                let mode = match self.camera.mode() {
                    ProjectionMode::Perspective => ProjectionMode::Orthographic,
                    ProjectionMode::Orthographic => ProjectionMode::Perspective,
                };
                self.camera.set_projection_mode(mode);
            }

            // Light
            KeyCode::Char('[') => self.renderer.light.orbit_around(&self.model.center(), -ROTATE_STEP),
            KeyCode::Char(']') => self.renderer.light.orbit_around(&self.model.center(), ROTATE_STEP),

            KeyCode::Char(c @ ('1' | '2' | '3' | '4' | 't')) => self.toggle(c),
            KeyCode::Char('m') => {
                self.presenter.mode = self.presenter.mode.toggled();
                let (cols, rows) = self.size;
                self.size = (0, 0);
                self.fit_to(cols, rows);
            }
            _ => {}
        }
    }

    /// Pipeline toggles
    fn toggle(&mut self, key: char) {
        let settings = &mut self.renderer.settings;
        match key {
            '1' => settings.use_lighting = !settings.use_lighting,
            '2' => {
                settings.shading_mode = match settings.shading_mode {
                    ShadingMode::Gouraud => ShadingMode::Phong,
                    ShadingMode::Phong => ShadingMode::Gouraud,
                }
            }
            '3' => settings.use_z_buffer = !settings.use_z_buffer,
            '4' => settings.cull_back_faces = !settings.cull_back_faces,
            't' => settings.use_texture = !settings.use_texture,
            _ => {}
        }
    }

    fn update(&mut self) {
        // Continuous slow rotation for demo effect
        if self.auto_rotate {
            self.rotate_model(Axis::Y, SPIN_STEP);
        }
    }

    /// Render one frame into the renderer's buffer.
    pub fn render_frame(&mut self) -> FrameStats {
        self.last_stats = self.renderer.render(&[&self.model], &self.camera);
        self.frames_rendered += 1;
        self.last_stats
    }

    fn status_line(&self) -> String {
        let s = &self.renderer.settings;
        let shading = if !s.use_lighting {
            "flat"
        } else {
            match s.shading_mode {
                ShadingMode::Gouraud => "gouraud",
                ShadingMode::Phong => "phong",
            }
        };
        let projection = match self.camera.mode() {
            ProjectionMode::Perspective => "persp",
            ProjectionMode::Orthographic => "ortho",
        };
        format!(
            "Polyview | FPS: {:.1} | {shading} {projection} z:{} cull:{} tex:{} | faces {} px {} | Q=Quit",
            self.fps,
            on_off(s.use_z_buffer),
            on_off(s.cull_back_faces),
            on_off(s.use_texture),
            self.last_stats.faces_drawn,
            self.last_stats.pixels_written,
        )
    }

    fn render(&mut self) -> io::Result<()> {
        self.render_frame();

        let mut stdout = stdout();
        self.presenter.draw(self.renderer.buffer(), &mut stdout)?;

        // Draw UI overlay
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(self.status_line()),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
