// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ESC/POS driver for 58/80 mm thermal receipt printers.
//
// Text is encoded as CP437 (selected with `ESC t 0` at job start).  Images
// are rasterised to one bit per dot and sent as `GS v 0` raster bands.
//
// ESC/POS only honours `ESC a` (justification) at the start of a line, so
// alignment changes requested mid-line are held back and emitted right
// after the next line feed.

use std::io::Write;

use tracing::{debug, info, instrument};

use printdown_core::directive::Alignment;
use printdown_core::error::DeviceError;
use printdown_document::{cp437, raster};

use super::transport::Transport;
use super::{DeviceDriver, TextStyle};

/// Largest character magnification ESC/POS supports (`GS !`).
pub const MAX_MAGNIFICATION: u8 = 8;

/// Raster rows sent per `GS v 0` command.
const RASTER_BAND_ROWS: u32 = 256;

/// Raw command builders.
pub mod commands {
    use printdown_core::directive::Alignment;

    pub const ESC: u8 = 0x1B;
    pub const GS: u8 = 0x1D;
    pub const LF: u8 = 0x0A;

    /// `ESC @` -- reset to power-on defaults.
    pub const INIT: [u8; 2] = [ESC, b'@'];

    /// `ESC t 0` -- character table PC437.
    pub const CODEPAGE_PC437: [u8; 3] = [ESC, b't', 0];

    /// `GS V 65 0` -- feed to the cutter and cut.
    pub const CUT: [u8; 4] = [GS, b'V', 65, 0];

    pub fn bold(on: bool) -> [u8; 3] {
        [ESC, b'E', u8::from(on)]
    }

    pub fn underline(on: bool) -> [u8; 3] {
        [ESC, b'-', u8::from(on)]
    }

    /// `GS B n` -- white-on-black.
    pub fn invert(on: bool) -> [u8; 3] {
        [GS, b'B', u8::from(on)]
    }

    /// `GS ! n` -- width in the high nibble, height in the low nibble,
    /// both as magnification minus one.
    pub fn size(width: u8, height: u8) -> [u8; 3] {
        let w = width.clamp(1, super::MAX_MAGNIFICATION) - 1;
        let h = height.clamp(1, super::MAX_MAGNIFICATION) - 1;
        [GS, b'!', (w << 4) | h]
    }

    pub fn align(alignment: Alignment) -> [u8; 3] {
        let n = match alignment {
            Alignment::Left => 0,
            Alignment::Center => 1,
            Alignment::Right => 2,
        };
        [ESC, b'a', n]
    }

    /// `GS v 0 m xL xH yL yH` header for a raster band.
    pub fn raster_header(width_bytes: u16, rows: u16) -> [u8; 8] {
        let [xl, xh] = width_bytes.to_le_bytes();
        let [yl, yh] = rows.to_le_bytes();
        [GS, b'v', b'0', 0, xl, xh, yl, yh]
    }
}

/// ESC/POS printer behind a [`Transport`].
pub struct EscPosDriver<T: Transport> {
    transport: T,
    writer: Option<Box<dyn Write + Send>>,
    print_width: u32,
    /// Justification currently in effect on the printer.
    applied_alignment: Alignment,
    /// Justification requested for the next line.
    wanted_alignment: Alignment,
    at_line_start: bool,
}

impl<T: Transport> EscPosDriver<T> {
    /// `print_width` is the printable width in dots (384 for 58 mm paper,
    /// 512 or 576 for 80 mm).
    pub fn new(transport: T, print_width: u32) -> Self {
        Self {
            transport,
            writer: None,
            print_width,
            applied_alignment: Alignment::Left,
            wanted_alignment: Alignment::Left,
            at_line_start: true,
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        let writer = self.writer.as_mut().ok_or(DeviceError::NotReady)?;
        writer.write_all(bytes)?;
        Ok(())
    }

    fn sync_alignment(&mut self) -> Result<(), DeviceError> {
        if self.at_line_start && self.applied_alignment != self.wanted_alignment {
            self.write(&commands::align(self.wanted_alignment))?;
            self.applied_alignment = self.wanted_alignment;
        }
        Ok(())
    }
}

impl<T: Transport> DeviceDriver for EscPosDriver<T> {
    fn begin_job(&mut self) -> Result<(), DeviceError> {
        self.writer = Some(self.transport.open()?);
        self.applied_alignment = Alignment::Left;
        self.wanted_alignment = Alignment::Left;
        self.at_line_start = true;
        self.write(&commands::INIT)?;
        self.write(&commands::CODEPAGE_PC437)?;
        debug!(device = %self.transport.describe(), "job started");
        Ok(())
    }

    fn apply_text(&mut self, text: &str) -> Result<(), DeviceError> {
        for line in text.split_inclusive('\n') {
            self.sync_alignment()?;
            self.write(&cp437::encode(line))?;
            self.at_line_start = line.ends_with('\n');
        }
        Ok(())
    }

    fn set_style(&mut self, style: TextStyle) -> Result<(), DeviceError> {
        let mut bytes = Vec::with_capacity(12);
        bytes.extend_from_slice(&commands::bold(style.bold));
        bytes.extend_from_slice(&commands::underline(style.underline));
        bytes.extend_from_slice(&commands::invert(style.invert));
        bytes.extend_from_slice(&commands::size(style.width, style.height));
        self.write(&bytes)
    }

    fn reset_style(&mut self) -> Result<(), DeviceError> {
        self.set_style(TextStyle::NORMAL)
    }

    fn set_alignment(&mut self, alignment: Alignment) -> Result<(), DeviceError> {
        self.wanted_alignment = alignment;
        self.sync_alignment()
    }

    fn cut_paper(&mut self) -> Result<(), DeviceError> {
        if !self.at_line_start {
            self.write(&[commands::LF])?;
            self.at_line_start = true;
        }
        self.write(&commands::CUT)
    }

    #[instrument(skip(self, image), fields(bytes = image.len()))]
    fn render_image(&mut self, image: &[u8]) -> Result<(), DeviceError> {
        let raster = raster::rasterize(image, self.print_width)?;
        let width_bytes = u16::try_from(raster.width_bytes())
            .map_err(|_| DeviceError::Image("raster too wide".into()))?;

        if !self.at_line_start {
            self.write(&[commands::LF])?;
        }
        for (rows, band) in raster.bands(RASTER_BAND_ROWS) {
            let rows = u16::try_from(rows)
                .map_err(|_| DeviceError::Image("raster band too tall".into()))?;
            self.write(&commands::raster_header(width_bytes, rows))?;
            self.write(band)?;
        }
        self.write(&[commands::LF])?;
        self.at_line_start = true;

        info!(
            width = raster.width(),
            height = raster.height(),
            "image sent to printer"
        );
        Ok(())
    }

    fn end_job(&mut self) -> Result<(), DeviceError> {
        // Dropping the writer closes the device even if the flush fails.
        let mut writer = self.writer.take().ok_or(DeviceError::NotReady)?;
        writer.flush()?;
        debug!(device = %self.transport.describe(), "job finished");
        Ok(())
    }
}
