/// Terminal presentation of a rendered frame buffer
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use polyview_core::{FrameBuffer, Rgb};
use std::io::Write;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Upper half block: foreground paints the top pixel, background the bottom.
const HALF_BLOCK: char = '\u{2580}';

/// How frame buffer pixels map onto terminal cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentMode {
    /// 24-bit color, two pixels per cell stacked vertically.
    #[default]
    TrueColor,
    /// One pixel per cell as a luminance character.
    Ascii,
}

impl PresentMode {
    /// Frame buffer size for a terminal area of `cols` x `rows` cells.
    pub fn buffer_size(self, cols: u16, rows: u16) -> (usize, usize) {
        match self {
            PresentMode::TrueColor => (cols as usize, rows as usize * 2),
            PresentMode::Ascii => (cols as usize, rows as usize),
        }
    }

    /// Width / height of the area as seen on screen; terminal cells are
    /// about twice as tall as they are wide.
    pub fn aspect_ratio(self, cols: u16, rows: u16) -> f64 {
        if rows == 0 {
            return 1.0;
        }
        cols as f64 / (rows as f64 * 2.0)
    }

    pub fn toggled(self) -> Self {
        match self {
            PresentMode::TrueColor => PresentMode::Ascii,
            PresentMode::Ascii => PresentMode::TrueColor,
        }
    }
}

/// Ramp character for a color's luminance.
pub fn ramp_char(color: Rgb) -> char {
    let last = LUMINOSITY_RAMP.len() - 1;
    let index = (color.luminance() * last as f64).round() as usize;
    LUMINOSITY_RAMP[index.min(last)]
}

/// The frame as plain ASCII lines, one per pixel row.
pub fn ascii_lines(buffer: &FrameBuffer) -> Vec<String> {
    buffer
        .rows()
        .map(|row| row.iter().map(|c| ramp_char(*c)).collect())
        .collect()
}

fn to_color(c: Rgb) -> Color {
    Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

/// Writes frame buffers to a terminal starting at a given row
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPresenter {
    pub mode: PresentMode,
    /// First terminal row used for the frame.
    pub top: u16,
}

impl TerminalPresenter {
    pub fn new(mode: PresentMode, top: u16) -> Self {
        Self { mode, top }
    }

    pub fn draw<W: Write>(&self, buffer: &FrameBuffer, writer: &mut W) -> std::io::Result<()> {
        match self.mode {
            PresentMode::TrueColor => self.draw_half_blocks(buffer, writer)?,
            PresentMode::Ascii => self.draw_ascii(buffer, writer)?,
        }
        writer.queue(ResetColor)?;
        Ok(())
    }

    fn draw_half_blocks<W: Write>(&self, buffer: &FrameBuffer, writer: &mut W) -> std::io::Result<()> {
        let (width, height) = (buffer.width(), buffer.height());
        for (row, y) in (0..height).step_by(2).enumerate() {
            writer.queue(cursor::MoveTo(0, self.top + row as u16))?;
            for x in 0..width {
                let upper = buffer.color_at(x, y);
                let lower = if y + 1 < height {
                    buffer.color_at(x, y + 1)
                } else {
                    buffer.background()
                };
                writer.queue(SetForegroundColor(to_color(upper)))?;
                writer.queue(SetBackgroundColor(to_color(lower)))?;
                writer.queue(Print(HALF_BLOCK))?;
            }
        }
        Ok(())
    }

    fn draw_ascii<W: Write>(&self, buffer: &FrameBuffer, writer: &mut W) -> std::io::Result<()> {
        for (row, line) in buffer.rows().enumerate() {
            writer.queue(cursor::MoveTo(0, self.top + row as u16))?;
            for color in line {
                let c = ramp_char(*color);

                // Color based on character intensity
                let fg = match c {
                    ' ' | '.' | ':' => Color::DarkGrey,
                    '-' | '=' => Color::Grey,
                    '+' | '*' => Color::White,
                    _ => Color::Cyan,
                };

                writer.queue(SetForegroundColor(fg))?;
                writer.queue(Print(c))?;
            }
        }
        Ok(())
    }
}
