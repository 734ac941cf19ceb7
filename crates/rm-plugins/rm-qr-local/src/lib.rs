//! # rm-qr-local
//! rusty-maint/crates/rm-plugins/rm-qr-local/src/lib.rs
//! Local filesystem implementation of `QrStore`.
//! One PNG per machine code: `{output_dir}/{code}.png`, served under `url_prefix`.

use std::fs;
use std::io;
use std::path::PathBuf;

use image::{imageops, GrayImage, ImageFormat, Luma};
use qrcode::QrCode;
use rm_core::error::{AppError, Result};
use rm_core::models::{qr_link, validate_code};
use rm_core::traits::QrStore;

/// Pixels per QR module.
pub const MODULE_SIZE: u32 = 10;
/// Quiet zone around the symbol, in modules.
pub const BORDER: u32 = 4;
pub const EXTENSION: &str = "png";

pub struct LocalQrStore {
    /// Directory holding the images (e.g., "./static/qrcodes")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static/qrcodes")
    url_prefix: String,
}

impl LocalQrStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self { root_path: root, url_prefix: url_prefix.trim_end_matches('/').to_string() }
    }

    /// Renders `data` as a black-on-white symbol with the fixed module size
    /// and border.
    pub fn render(data: &str) -> Result<GrayImage> {
        let code = QrCode::new(data.as_bytes()).map_err(|e| AppError::QrGeneration(e.to_string()))?;
        let symbol = code
            .render::<Luma<u8>>()
            .module_dimensions(MODULE_SIZE, MODULE_SIZE)
            .quiet_zone(false)
            .build();

        let margin = BORDER * MODULE_SIZE;
        let mut canvas = GrayImage::from_pixel(
            symbol.width() + 2 * margin,
            symbol.height() + 2 * margin,
            Luma([255]),
        );
        imageops::overlay(&mut canvas, &symbol, i64::from(margin), i64::from(margin));
        Ok(canvas)
    }
}

fn io_err(e: io::Error) -> AppError {
    AppError::QrGeneration(e.to_string())
}

impl QrStore for LocalQrStore {
    /// Writes the image through a temporary file so a reader never sees a
    /// half-written PNG.
    fn generate(&self, code: &str, base_url: &str) -> Result<PathBuf> {
        validate_code(code)?;
        let link = qr_link(base_url, code);
        let image = Self::render(&link)?;

        fs::create_dir_all(&self.root_path).map_err(io_err)?;

        let target = self.artifact_path(code);
        let partial = self.root_path.join(format!("{code}.{EXTENSION}.partial"));
        image
            .save_with_format(&partial, ImageFormat::Png)
            .map_err(|e| AppError::QrGeneration(e.to_string()))?;
        if let Err(e) = fs::rename(&partial, &target) {
            let _ = fs::remove_file(&partial);
            return Err(io_err(e));
        }

        log::info!("qr for {code} written to {} ({link})", target.display());
        Ok(target)
    }

    fn artifact_path(&self, code: &str) -> PathBuf {
        self.root_path.join(format!("{code}.{EXTENSION}"))
    }

    fn url(&self, code: &str) -> String {
        format!("{}/{code}.{EXTENSION}", self.url_prefix)
    }

    fn discard(&self, code: &str) -> Result<()> {
        validate_code(code)?;
        match fs::remove_file(self.artifact_path(code)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(e)),
        }
    }
}
