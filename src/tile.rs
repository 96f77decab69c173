use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use image::{
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
    imageops::replace,
    DynamicImage, ExtendedColorType, ImageEncoder, ImageError, ImageReader, RgbaImage,
};
use indicatif::ProgressBar;
use num::Integer;
use thiserror::Error;

use crate::clap::Config;

/// Lowercase file-name suffixes considered for tiling.
const SUPPORTED_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

pub const JPEG_QUALITY: u8 = 90;

#[derive(Error, Debug)]
pub enum TileError {
    #[error("Please provide -i (input folder), -c (columns), and -o (output file)")]
    Usage,
    #[error("Failed to read folder {}: {source}", .path.display())]
    ReadDir { path: PathBuf, source: io::Error },
    #[error("No images loaded from {}", .path.display())]
    NoImages { path: PathBuf },
    #[error(
        "Image {} size {}x{} does not match the others ({}x{})",
        .path.display(), .found.0, .found.1, .expected.0, .expected.1
    )]
    SizeMismatch {
        path: PathBuf,
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("Canvas for {count} images of {width}x{height} in {columns} columns is too large")]
    CanvasTooLarge {
        count: usize,
        columns: u32,
        width: u32,
        height: u32,
    },
    #[error("Failed to create output file {}: {source}", .path.display())]
    Create { path: PathBuf, source: io::Error },
    #[error("Failed to save image {}: {source}", .path.display())]
    Encode { path: PathBuf, source: ImageError },
}

/// Codec used for the output file, chosen from its path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Png,
    Jpeg { quality: u8 },
}

impl OutputFormat {
    pub(crate) fn from_path(path: &Path) -> Self {
        if path.to_string_lossy().to_ascii_lowercase().ends_with(".png") {
            OutputFormat::Png
        } else {
            OutputFormat::Jpeg {
                quality: JPEG_QUALITY,
            }
        }
    }
}

/// Placement of `count` equally sized cells in rows of `columns`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Grid {
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl Grid {
    pub(crate) fn new(
        count: usize,
        columns: u32,
        cell_width: u32,
        cell_height: u32,
    ) -> Result<Self, TileError> {
        let too_large = || TileError::CanvasTooLarge {
            count,
            columns,
            width: cell_width,
            height: cell_height,
        };
        if columns == 0 {
            return Err(TileError::Usage);
        }
        let rows = u32::try_from(Integer::div_ceil(&count, &(columns as usize)))
            .map_err(|_| too_large())?;
        let grid = Grid {
            columns,
            rows,
            cell_width,
            cell_height,
        };
        grid.checked_dimensions().ok_or_else(too_large)?;
        Ok(grid)
    }

    fn checked_dimensions(&self) -> Option<(u32, u32)> {
        Some((
            self.columns.checked_mul(self.cell_width)?,
            self.rows.checked_mul(self.cell_height)?,
        ))
    }

    pub(crate) fn dimensions(&self) -> (u32, u32) {
        (self.columns * self.cell_width, self.rows * self.cell_height)
    }

    /// Top-left pixel of the cell holding the `index`-th image.
    pub(crate) fn cell_origin(&self, index: usize) -> (u32, u32) {
        let (row, col) = index.div_rem(&(self.columns as usize));
        (
            col as u32 * self.cell_width,
            row as u32 * self.cell_height,
        )
    }
}

pub(crate) fn tile(config: &Config) -> Result<(), TileError> {
    log::info!("[1/3] Collecting images from {}.", config.input.display());
    let images = collect_images(&config.input)?;
    log::info!("[1/3] Loaded {} images.", images.len());

    log::info!("[2/3] Compositing the grid.");
    let canvas = composite(&images, config.columns)?;
    drop(images);

    log::info!("[3/3] Writing {}.", config.output.display());
    let format = OutputFormat::from_path(&config.output);
    write_canvas(&canvas, &config.output, format)
}

/// Direct children of `folder` whose extension is one we decode, in file-name order.
/// Other files are ignored without logging.
pub(crate) fn candidate_files(folder: &Path) -> Result<Vec<PathBuf>, TileError> {
    let read_dir_error = |source| TileError::ReadDir {
        path: folder.to_path_buf(),
        source,
    };
    let mut files = vec![];
    for entry in fs::read_dir(folder).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        // An unreadable file type falls through to the open step, which logs it.
        if entry.file_type().is_ok_and(|file_type| file_type.is_dir()) {
            continue;
        }
        let path = entry.path();
        if has_supported_extension(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Matches on the whole name so a bare `.png` counts as a PNG candidate.
fn has_supported_extension(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|name| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|suffix| name.ends_with(suffix))
        })
}

/// Why a single candidate file was left out.
#[derive(Debug)]
enum Skip {
    Open(io::Error),
    Decode(ImageError),
}

/// Opens and decodes one file, sniffing the codec from its content.
fn load_image(path: &Path) -> Result<DynamicImage, Skip> {
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(Skip::Open)?;
    reader.decode().map_err(Skip::Decode)
}

/// Decodes every candidate in `folder`. The first decoded image fixes the cell
/// size; any later image of a different size aborts the whole collection.
pub(crate) fn collect_images(folder: &Path) -> Result<Vec<RgbaImage>, TileError> {
    let candidates = candidate_files(folder)?;
    let pb = ProgressBar::new(candidates.len() as u64);
    let mut images: Vec<RgbaImage> = vec![];

    for path in candidates {
        pb.inc(1);
        let img = match load_image(&path) {
            Ok(img) => img,
            Err(Skip::Open(err)) => {
                pb.suspend(|| log::warn!("Skipping {}: {}", path.display(), err));
                continue;
            }
            Err(Skip::Decode(err)) => {
                pb.suspend(|| log::warn!("Skipping {}: decode error {}", path.display(), err));
                continue;
            }
        };

        let found = (img.width(), img.height());
        if let Some(first) = images.first() {
            let expected = first.dimensions();
            if found != expected {
                pb.finish_and_clear();
                return Err(TileError::SizeMismatch {
                    path,
                    expected,
                    found,
                });
            }
        }
        log::debug!("Loaded {} ({}x{})", path.display(), found.0, found.1);
        images.push(img.into_rgba8());
    }
    pb.finish_and_clear();

    if images.is_empty() {
        return Err(TileError::NoImages {
            path: folder.to_path_buf(),
        });
    }
    Ok(images)
}

/// Copies each image, unscaled and unblended, into its grid cell in order.
/// Trailing cells of the last row stay transparent black.
pub(crate) fn composite(images: &[RgbaImage], columns: u32) -> Result<RgbaImage, TileError> {
    let (cell_width, cell_height) = images.first().map(RgbaImage::dimensions).unwrap_or((0, 0));
    let grid = Grid::new(images.len(), columns, cell_width, cell_height)?;
    let (width, height) = grid.dimensions();
    log::debug!(
        "Canvas {}x{}: {} columns x {} rows of {}x{} cells",
        width,
        height,
        grid.columns,
        grid.rows,
        cell_width,
        cell_height
    );

    let mut canvas = RgbaImage::new(width, height);
    for (i, img) in images.iter().enumerate() {
        let (x, y) = grid.cell_origin(i);
        replace(&mut canvas, img, x as i64, y as i64);
    }
    Ok(canvas)
}

/// Creates (or truncates) `path` and encodes the canvas into it.
pub(crate) fn write_canvas(
    canvas: &RgbaImage,
    path: &Path,
    format: OutputFormat,
) -> Result<(), TileError> {
    let file = File::create(path).map_err(|source| TileError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    let (width, height) = canvas.dimensions();

    let encoded = match format {
        OutputFormat::Png => PngEncoder::new(&mut writer).write_image(
            canvas.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        OutputFormat::Jpeg { quality } => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgba8(canvas.clone()).into_rgb8();
            JpegEncoder::new_with_quality(&mut writer, quality).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )
        }
    };
    encoded
        .and_then(|()| writer.flush().map_err(ImageError::IoError))
        .map_err(|source| TileError::Encode {
            path: path.to_path_buf(),
            source,
        })
}
