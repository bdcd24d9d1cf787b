//! # Screen Rendering
//!
//! This module renders the app's screens both as plain text for the terminal and
//! onto a monochrome frame buffer with the watch's 144×168 resolution. Both
//! renderers work from a [`ScreenView`] snapshot, so they never touch the
//! controller's host adapters.

use crate::app::{AppController, MenuRow, Screen};
use crate::store::PersistentStore;
use crate::wakeup::WakeupRegistry;
use core::convert::Infallible;
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle, MonoTextStyleBuilder},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Alignment, Text},
};

/// Watch screen width in pixels.
pub const SCREEN_WIDTH: u32 = 144;
/// Watch screen height in pixels.
pub const SCREEN_HEIGHT: u32 = 168;

/// Width reserved for a prayer name before its time, for edge alignment.
const NAME_COLUMN: usize = 14;
const ROW_HEIGHT: i32 = 20;
const STATUS_HEIGHT: i32 = 20;

/// Everything the renderers need to draw one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScreenView {
    pub screen: Screen,
    pub status_time: String,
    pub rows: Vec<MenuRow>,
    pub selected: usize,
    pub error_visible: bool,
    pub remaining: Option<i64>,
    pub ready_tea: Option<String>,
}

impl ScreenView {
    pub fn capture<S, W>(app: &AppController<S, W>) -> Self
    where
        S: PersistentStore,
        W: WakeupRegistry,
    {
        let state = app.state();
        ScreenView {
            screen: state.screen,
            status_time: app.status_time(),
            rows: app.menu_rows(),
            selected: app.selected_row(),
            error_visible: state.error_visible,
            remaining: state.remaining,
            ready_tea: app.ready_tea().map(|tea| tea.name.clone()),
        }
    }
}

fn row_text(row: &MenuRow) -> String {
    match &row.value {
        Some(value) => format!("{:<width$}{}", row.title, value, width = NAME_COLUMN),
        None => row.title.clone(),
    }
}

fn countdown_text(remaining: Option<i64>) -> String {
    match remaining {
        Some(seconds) => format!("{} seconds", seconds),
        None => "-- seconds".to_string(),
    }
}

fn ready_text(view: &ScreenView) -> String {
    match &view.ready_tea {
        Some(name) => format!("{} is ready!", name),
        None => "Tea is ready!".to_string(),
    }
}

/// Text lines of the current screen.
pub fn screen_lines(view: &ScreenView) -> Vec<String> {
    match view.screen {
        Screen::Menu => {
            let mut lines = vec![format!("  {:^20}", view.status_time)];
            for (index, row) in view.rows.iter().enumerate() {
                let marker = if index == view.selected { '>' } else { ' ' };
                lines.push(format!("{} {}", marker, row_text(row)));
            }
            if view.error_visible {
                lines.push(String::new());
                lines.push("  [ Cannot schedule ]".to_string());
            }
            lines
        }
        Screen::Countdown => vec![
            "Steeping time left".to_string(),
            countdown_text(view.remaining),
            format!("{:>22}", "X"),
        ],
        Screen::Ready(_) => vec![ready_text(view)],
        Screen::Exited => Vec::new(),
    }
}

/// Render the current screen to the terminal.
pub fn draw_ascii(view: &ScreenView) {
    for line in screen_lines(view) {
        println!("{}", line);
    }
}

/// Render the current screen onto a monochrome draw target.
///
/// `BinaryColor::On` is ink, `Off` is background.
pub fn draw_screen<D>(view: &ScreenView, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;
    let Size { width, height } = target.bounding_box().size;
    let center = width as i32 / 2;
    let ink = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    let inverted = MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::Off)
        .background_color(BinaryColor::On)
        .build();

    match view.screen {
        Screen::Menu => {
            Text::with_alignment(&view.status_time, Point::new(center, 12), ink, Alignment::Center)
                .draw(target)?;

            for (index, row) in view.rows.iter().enumerate() {
                let top = STATUS_HEIGHT + index as i32 * ROW_HEIGHT;
                let baseline = Point::new(4, top + 14);
                if index == view.selected {
                    Rectangle::new(Point::new(0, top), Size::new(width, ROW_HEIGHT as u32))
                        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                        .draw(target)?;
                    Text::new(&row_text(row), baseline, inverted).draw(target)?;
                } else {
                    Text::new(&row_text(row), baseline, ink).draw(target)?;
                }
            }

            if view.error_visible {
                Rectangle::new(Point::new(0, 44), Size::new(width, 60))
                    .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                    .draw(target)?;
                Text::with_alignment(
                    "Cannot\nschedule",
                    Point::new(center, 68),
                    inverted,
                    Alignment::Center,
                )
                .draw(target)?;
            }
        }
        Screen::Countdown => {
            Text::with_alignment("Steeping time left", Point::new(center, 44), ink, Alignment::Center)
                .draw(target)?;
            Text::with_alignment(
                &countdown_text(view.remaining),
                Point::new(center, 84),
                ink,
                Alignment::Center,
            )
            .draw(target)?;
            // Cancel marker next to the down button
            Text::new("X", Point::new(width as i32 - 16, 134), ink).draw(target)?;
        }
        Screen::Ready(_) => {
            Rectangle::new(Point::new(2, 2), Size::new(width.saturating_sub(4), height.saturating_sub(4)))
                .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 2))
                .draw(target)?;
            Text::with_alignment(&ready_text(view), Point::new(center, 84), ink, Alignment::Center)
                .draw(target)?;
        }
        Screen::Exited => {}
    }
    Ok(())
}

/// 1 bit per pixel frame buffer, rows of bytes, most significant bit leftmost.
pub struct FrameBuffer {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let bytes_per_row = width.div_ceil(8);
        FrameBuffer {
            width,
            height,
            bits: vec![0; (bytes_per_row * height) as usize],
        }
    }

    /// Frame buffer with the watch's dimensions.
    pub fn watch() -> Self {
        Self::new(SCREEN_WIDTH, SCREEN_HEIGHT)
    }

    fn locate(&self, x: u32, y: u32) -> Option<(usize, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bytes_per_row = self.width.div_ceil(8);
        Some(((y * bytes_per_row + x / 8) as usize, 0x80 >> (x % 8)))
    }

    pub fn is_on(&self, x: u32, y: u32) -> bool {
        self.locate(x, y)
            .map(|(index, mask)| self.bits[index] & mask != 0)
            .unwrap_or(false)
    }

    /// Number of inked pixels.
    pub fn count_on(&self) -> u32 {
        self.bits.iter().map(|byte| byte.count_ones()).sum()
    }

    /// Encode as a binary PBM (P4) image; inked pixels come out black.
    pub fn to_pbm(&self) -> Vec<u8> {
        let mut out = format!("P4\n{} {}\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.bits);
        out
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if let Some((index, mask)) = self.locate(x, y) {
                match color {
                    BinaryColor::On => self.bits[index] |= mask,
                    BinaryColor::Off => self.bits[index] &= !mask,
                }
            }
        }
        Ok(())
    }
}
