//! # Panel Abstraction
//!
//! The chart never talks to hardware directly. A [`Panel`] accepts finished
//! images and reports button presses; the e-paper build provides one backed by
//! SPI and GPIO, development builds print to the terminal.

use crate::image::RenderedImage;
use std::io::{self, Write};
use thiserror::Error;

/// A day navigation button press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonEvent {
    None,
    Next,
    Previous,
}

/// Failure to put an image on a panel.
#[derive(Error, Debug)]
pub enum PanelError {
    /// Image size differs from the panel
    #[error("image is {actual:?}, panel expects {expected:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Bus, GPIO or controller failure
    #[error("hardware error: {0}")]
    Hardware(String),

    #[error("output error: {0}")]
    Io(#[from] io::Error),
}

/// Output device plus its buttons.
pub trait Panel {
    /// Show `image`. On error the panel keeps whatever it showed before.
    fn render(&mut self, image: RenderedImage) -> Result<(), PanelError>;

    /// Read the buttons once, without blocking.
    fn poll_buttons(&mut self) -> ButtonEvent;
}

/// Terminal output for development (`--stdout`).
///
/// Two pixel rows per text line using half-block characters. There are no
/// buttons, so [`Panel::poll_buttons`] always reports [`ButtonEvent::None`].
pub struct AsciiPanel<W: Write> {
    out: W,
}

impl AsciiPanel<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> AsciiPanel<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Panel for AsciiPanel<W> {
    fn render(&mut self, image: RenderedImage) -> Result<(), PanelError> {
        let rows: Vec<Vec<bool>> = image.rows().collect();
        for pair in rows.chunks(2) {
            let upper = &pair[0];
            let line: String = upper
                .iter()
                .enumerate()
                .map(|(x, &top)| {
                    let bottom = pair.get(1).is_some_and(|row| row[x]);
                    match (top, bottom) {
                        (true, true) => '█',
                        (true, false) => '▀',
                        (false, true) => '▄',
                        (false, false) => ' ',
                    }
                })
                .collect();
            writeln!(self.out, "{}", line.trim_end())?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn poll_buttons(&mut self) -> ButtonEvent {
        ButtonEvent::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::BinaryColor;

    #[test]
    fn test_ascii_panel_packs_two_rows_per_line() {
        let mut image = RenderedImage::new(4, 3);
        image.set_pixel(0, 0, BinaryColor::On);
        image.set_pixel(1, 1, BinaryColor::On);
        image.set_pixel(2, 0, BinaryColor::On);
        image.set_pixel(2, 1, BinaryColor::On);
        image.set_pixel(3, 2, BinaryColor::On);

        let mut panel = AsciiPanel::new(Vec::new());
        panel.render(image).unwrap();
        let text = String::from_utf8(panel.into_inner()).unwrap();

        assert_eq!(text, "▀▄█\n   ▀\n");
    }

    #[test]
    fn test_ascii_panel_has_no_buttons() {
        let mut panel = AsciiPanel::new(Vec::new());
        assert_eq!(panel.poll_buttons(), ButtonEvent::None);
    }
}
