//! QR symbol rendering.
//!
//! The dispatcher only sees the [`Renderer`] trait. Rendering happens in two
//! steps: [`Renderer::render`] encodes the symbol (and is where bad payloads
//! fail), then [`Rendition::write_to`] serializes the image into any writer so
//! the output can be streamed.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use qrcode::types::QrError;
use qrcode::{EcLevel, QrCode};
use std::io::{self, BufWriter, Write};
use thiserror::Error;

use crate::color::Color;
use crate::format::OutputFormat;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode QR symbol: {0}")]
    Encode(#[from] QrError),
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to write image: {0}")]
    Io(#[from] io::Error),
}

/// Parameters handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub format: OutputFormat,
    /// Edge length of the output in pixels (PNG) or user units (vector formats)
    pub size: u32,
    /// Quiet zone width in modules
    pub margin: u32,
    pub foreground: Color,
    pub background: Color,
}

/// Turns text into an encoded symbol ready to be written out
pub trait Renderer: Send + Sync {
    fn render(&self, payload: &str, options: &RenderOptions)
        -> Result<Box<dyn Rendition>, RenderError>;
}

/// An encoded symbol bound to its output options
pub trait Rendition: Send {
    fn write_to(&self, out: &mut dyn Write) -> Result<(), RenderError>;
}

/// Renderer backed by the `qrcode` encoder, error correction level M
#[derive(Debug, Clone, Copy, Default)]
pub struct QrRenderer;

impl Renderer for QrRenderer {
    fn render(
        &self,
        payload: &str,
        options: &RenderOptions,
    ) -> Result<Box<dyn Rendition>, RenderError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)?;
        Ok(Box::new(Symbol::new(&code, *options)))
    }
}

/// Module grid with the quiet zone already applied
struct Symbol {
    dark: Vec<bool>,
    /// Modules per side including the margin on both edges
    total: usize,
    options: RenderOptions,
}

impl Symbol {
    fn new(code: &QrCode, options: RenderOptions) -> Self {
        let width = code.width();
        let margin = options.margin as usize;
        let total = width + 2 * margin;

        let mut dark = vec![false; total * total];
        for (index, color) in code.to_colors().into_iter().enumerate() {
            if color == qrcode::Color::Dark {
                let (x, y) = (index % width, index / width);
                dark[(y + margin) * total + x + margin] = true;
            }
        }

        Self {
            dark,
            total,
            options,
        }
    }

    fn is_dark(&self, x: usize, y: usize) -> bool {
        self.dark[y * self.total + x]
    }

    /// Horizontal runs of dark modules as `(row, first column, length)`
    fn dark_runs(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        (0..self.total).flat_map(move |y| {
            let mut runs = Vec::new();
            let mut x = 0;
            while x < self.total {
                if self.is_dark(x, y) {
                    let start = x;
                    while x < self.total && self.is_dark(x, y) {
                        x += 1;
                    }
                    runs.push((y, start, x - start));
                } else {
                    x += 1;
                }
            }
            runs
        })
    }

    /// PNG edge in pixels. Grows past the requested size when the symbol has
    /// more modules than that, so every module keeps at least one pixel.
    fn png_edge(&self) -> usize {
        (self.options.size as usize).max(self.total)
    }

    fn write_png(&self, out: &mut dyn Write) -> Result<(), RenderError> {
        let size = self.png_edge();
        let fg = self.options.foreground.to_rgba();
        let bg = self.options.background.to_rgba();

        let mut pixels = Vec::with_capacity(size * size * 4);
        for py in 0..size {
            let my = py * self.total / size;
            for px in 0..size {
                let mx = px * self.total / size;
                pixels.extend_from_slice(if self.is_dark(mx, my) { &fg } else { &bg });
            }
        }

        PngEncoder::new(out).write_image(
            &pixels,
            size as u32,
            size as u32,
            ExtendedColorType::Rgba8,
        )?;
        Ok(())
    }

    fn write_svg(&self, out: &mut dyn Write) -> Result<(), RenderError> {
        let mut out = BufWriter::new(out);
        let RenderOptions {
            size,
            foreground,
            background,
            ..
        } = self.options;

        writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(
            out,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{size}\" height=\"{size}\" viewBox=\"0 0 {0} {0}\" shape-rendering=\"crispEdges\">",
            self.total
        )?;
        writeln!(
            out,
            "\t<rect width=\"100%\" height=\"100%\" fill=\"{}\"{}/>",
            rgb_hex(background),
            svg_opacity(background)
        )?;

        write!(out, "\t<path d=\"")?;
        for (y, x, len) in self.dark_runs() {
            write!(out, "M{x},{y}h{len}v1h-{len}z")?;
        }
        writeln!(
            out,
            "\" fill=\"{}\"{}/>",
            rgb_hex(foreground),
            svg_opacity(foreground)
        )?;
        writeln!(out, "</svg>")?;

        out.flush()?;
        Ok(())
    }

    fn write_eps(&self, out: &mut dyn Write) -> Result<(), RenderError> {
        let mut out = BufWriter::new(out);
        let size = self.options.size;
        let unit = size as f32 / self.total as f32;

        writeln!(out, "%!PS-Adobe-3.0 EPSF-3.0")?;
        writeln!(out, "%%BoundingBox: 0 0 {size} {size}")?;
        writeln!(out, "%%Creator: qrgate")?;
        writeln!(out, "%%EndComments")?;

        let (r, g, b) = self.options.background.unit_rgb();
        writeln!(out, "{r:.3} {g:.3} {b:.3} setrgbcolor")?;
        writeln!(out, "0 0 {size} {size} rectfill")?;

        let (r, g, b) = self.options.foreground.unit_rgb();
        writeln!(out, "{r:.3} {g:.3} {b:.3} setrgbcolor")?;
        for (y, x, len) in self.dark_runs() {
            let bottom = (self.total - y - 1) as f32 * unit;
            writeln!(
                out,
                "{:.3} {:.3} {:.3} {:.3} rectfill",
                x as f32 * unit,
                bottom,
                len as f32 * unit,
                unit
            )?;
        }

        writeln!(out, "showpage")?;
        writeln!(out, "%%EOF")?;
        out.flush()?;
        Ok(())
    }

    fn write_pdf(&self, out: &mut dyn Write) -> Result<(), RenderError> {
        let size = self.options.size;
        let unit = size as f32 / self.total as f32;

        let mut content = String::new();
        let (r, g, b) = self.options.background.unit_rgb();
        content.push_str(&format!("{r:.3} {g:.3} {b:.3} rg\n0 0 {size} {size} re f\n"));
        let (r, g, b) = self.options.foreground.unit_rgb();
        content.push_str(&format!("{r:.3} {g:.3} {b:.3} rg\n"));
        for (y, x, len) in self.dark_runs() {
            let bottom = (self.total - y - 1) as f32 * unit;
            content.push_str(&format!(
                "{:.3} {:.3} {:.3} {:.3} re\n",
                x as f32 * unit,
                bottom,
                len as f32 * unit,
                unit
            ));
        }
        content.push_str("f\n");

        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {size} {size}] /Contents 4 0 R /Resources << >> >>"
            ),
            format!(
                "<< /Length {} >>\nstream\n{content}endstream",
                content.len()
            ),
        ];

        let mut out = CountingWriter::new(BufWriter::new(out));
        out.write_all(b"%PDF-1.4\n")?;

        let mut offsets = Vec::with_capacity(objects.len());
        for (index, body) in objects.iter().enumerate() {
            offsets.push(out.written);
            write!(out, "{} 0 obj\n{body}\nendobj\n", index + 1)?;
        }

        let xref = out.written;
        write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1)?;
        for offset in offsets {
            write!(out, "{offset:010} 00000 n \n")?;
        }
        write!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        )?;

        out.flush()?;
        Ok(())
    }
}

impl Rendition for Symbol {
    fn write_to(&self, out: &mut dyn Write) -> Result<(), RenderError> {
        match self.options.format {
            OutputFormat::Png => self.write_png(out),
            OutputFormat::Svg => self.write_svg(out),
            OutputFormat::Pdf => self.write_pdf(out),
            OutputFormat::Eps => self.write_eps(out),
        }
    }
}

fn rgb_hex(color: Color) -> String {
    Color { a: 255, ..color }.to_string()
}

fn svg_opacity(color: Color) -> String {
    if color.a == 255 {
        String::new()
    } else {
        format!(" fill-opacity=\"{:.3}\"", color.opacity())
    }
}

/// Tracks byte offsets for the PDF cross-reference table
struct CountingWriter<W> {
    inner: W,
    written: usize,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
