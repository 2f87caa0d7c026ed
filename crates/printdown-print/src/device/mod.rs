// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The output device capability.
//
// The executor talks to the printer only through `DeviceDriver`.  A driver is
// owned by exactly one executor thread, so implementations need not be
// reentrant.

pub mod escpos;
pub mod transport;

#[cfg(test)]
pub(crate) mod recording;

pub use escpos::EscPosDriver;
pub use transport::{DeviceFile, MemoryTransport, Transport};

use printdown_core::directive::{Alignment, StyleKind};
use printdown_core::error::DeviceError;

/// Character attributes applied to subsequent text.
///
/// `width` and `height` are character magnifications; 1 is normal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub bold: bool,
    pub underline: bool,
    pub invert: bool,
    pub width: u8,
    pub height: u8,
}

impl TextStyle {
    pub const NORMAL: Self = Self {
        bold: false,
        underline: false,
        invert: false,
        width: 1,
        height: 1,
    };

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    pub fn invert(mut self) -> Self {
        self.invert = true;
        self
    }

    pub fn size(mut self, width: u8, height: u8) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn is_normal(&self) -> bool {
        *self == Self::NORMAL
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl From<StyleKind> for TextStyle {
    fn from(kind: StyleKind) -> Self {
        match kind {
            StyleKind::Bold => Self::NORMAL.bold(),
            StyleKind::Underline => Self::NORMAL.underline(),
            StyleKind::Invert => Self::NORMAL.invert(),
            StyleKind::DoubleHeight => Self::NORMAL.size(1, 2),
            StyleKind::DoubleWidth => Self::NORMAL.size(2, 1),
        }
    }
}

/// A printer that can render text and images.
///
/// Calls for one job are bracketed by `begin_job` and `end_job`.  Every
/// method reports failure as a [`DeviceError`]; the executor fails the job
/// and keeps going.
pub trait DeviceDriver: Send {
    /// Prepare the device for a new job (open, initialise).
    fn begin_job(&mut self) -> Result<(), DeviceError>;

    /// Print text with the current style and alignment.
    fn apply_text(&mut self, text: &str) -> Result<(), DeviceError>;

    fn set_style(&mut self, style: TextStyle) -> Result<(), DeviceError>;

    /// Back to [`TextStyle::NORMAL`].
    fn reset_style(&mut self) -> Result<(), DeviceError>;

    fn set_alignment(&mut self, alignment: Alignment) -> Result<(), DeviceError>;

    fn cut_paper(&mut self) -> Result<(), DeviceError>;

    /// Decode and print an encoded image (JPEG, PNG, ...).
    fn render_image(&mut self, image: &[u8]) -> Result<(), DeviceError>;

    /// Flush and release the device.
    fn end_job(&mut self) -> Result<(), DeviceError>;
}

impl<D: DeviceDriver + ?Sized> DeviceDriver for Box<D> {
    fn begin_job(&mut self) -> Result<(), DeviceError> {
        (**self).begin_job()
    }

    fn apply_text(&mut self, text: &str) -> Result<(), DeviceError> {
        (**self).apply_text(text)
    }

    fn set_style(&mut self, style: TextStyle) -> Result<(), DeviceError> {
        (**self).set_style(style)
    }

    fn reset_style(&mut self) -> Result<(), DeviceError> {
        (**self).reset_style()
    }

    fn set_alignment(&mut self, alignment: Alignment) -> Result<(), DeviceError> {
        (**self).set_alignment(alignment)
    }

    fn cut_paper(&mut self) -> Result<(), DeviceError> {
        (**self).cut_paper()
    }

    fn render_image(&mut self, image: &[u8]) -> Result<(), DeviceError> {
        (**self).render_image(image)
    }

    fn end_job(&mut self) -> Result<(), DeviceError> {
        (**self).end_job()
    }
}
