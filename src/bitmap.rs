//! Split files made of two BMP images stored back to back.
//!
//! The first bitmap found is the thermal rendering, the second the real
//! photograph. Each candidate "BM" signature is checked against the file
//! size stored in its header (u32 at offset 2); implausible sizes are
//! treated as false positives.
use std::{
    fs::{remove_file, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use serde_derive::*;

use crate::{
    cursor::ByteCursor,
    error::DecodeError,
    fallback,
    image::{DecodedImage, RealImage, Strategy},
    signature::{find, BMP_MAGIC},
};

/// 14 byte file header plus a 40 byte BITMAPINFOHEADER.
pub const MIN_BMP_SIZE: usize = 54;

/// Offset of the total file size in the BMP file header.
const BMP_SIZE_FIELD: usize = 2;

const MAX_IMAGES: usize = 2;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    Thermal,
    Real,
}

impl ImageRole {
    fn for_index(idx: usize) -> Self {
        if idx == 0 {
            ImageRole::Thermal
        } else {
            ImageRole::Real
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImageRole::Thermal => "thermal",
            ImageRole::Real => "real",
        }
    }
}

/// A bitmap found inside a larger buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddedBitmap<'a> {
    pub role: ImageRole,
    pub offset: usize,
    pub bytes: &'a [u8],
}

impl<'a> EmbeddedBitmap<'a> {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_all(self.bytes)
    }
}

/// Result of [`extract_bitmaps`]; fewer than two images is still a result.
#[derive(Debug, Clone, Default)]
pub struct BitmapExtraction<'a> {
    pub images: Vec<EmbeddedBitmap<'a>>,
}

/// One bitmap written to disk by [`BitmapExtraction::save_to_dir`].
#[derive(Serialize, Debug, Clone)]
pub struct ExtractedFile {
    #[serde(rename = "type")]
    pub role: ImageRole,
    pub filename: String,
    pub path: PathBuf,
    pub offset: usize,
    pub size: usize,
}

impl<'a> BitmapExtraction<'a> {
    pub fn count(&self) -> usize {
        self.images.len()
    }

    pub fn is_complete(&self) -> bool {
        self.images.len() == MAX_IMAGES
    }

    pub fn thermal(&self) -> Option<&EmbeddedBitmap<'a>> {
        self.by_role(ImageRole::Thermal)
    }

    pub fn real(&self) -> Option<&EmbeddedBitmap<'a>> {
        self.by_role(ImageRole::Real)
    }

    fn by_role(&self, role: ImageRole) -> Option<&EmbeddedBitmap<'a>> {
        self.images.iter().find(|i| i.role == role)
    }

    pub fn message(&self) -> String {
        if self.is_complete() {
            "Successfully extracted 2 BMP images.".into()
        } else {
            format!("Found {} BMP images.", self.count())
        }
    }

    /// Write each image as `<stem>_<role>.bmp` under `dir`, where `stem`
    /// is `original_name` up to its first dot with anything other than
    /// ASCII letters and digits replaced by `_`.
    ///
    /// Existing files are never replaced. When a name is taken, the stem
    /// gets the smallest `_<n>` suffix that is free for every role, so the
    /// images of one input keep a common prefix.
    pub fn save_to_dir(&self, dir: &Path, original_name: &str) -> io::Result<Vec<ExtractedFile>> {
        let stem = sanitized_stem(original_name);
        let roles: Vec<_> = self.images.iter().map(|i| i.role).collect();
        let created = create_new_files(dir, &stem, &roles)?;

        self.images
            .iter()
            .zip(created)
            .map(|(image, (filename, path, file))| {
                let mut writer = BufWriter::new(file);
                image.write_to(&mut writer)?;
                writer.flush()?;
                debug!("saved {} image -> {}", image.role.as_str(), path.display());
                Ok(ExtractedFile {
                    role: image.role,
                    filename,
                    path,
                    offset: image.offset,
                    size: image.len(),
                })
            })
            .collect()
    }
}

/// Atomically create one `<stem>[_<n>]_<role>.bmp` file per role.
fn create_new_files(
    dir: &Path,
    stem: &str,
    roles: &[ImageRole],
) -> io::Result<Vec<(String, PathBuf, File)>> {
    let mut attempt = 0usize;
    loop {
        let prefix = match attempt {
            0 => stem.to_string(),
            n => format!("{}_{}", stem, n),
        };
        let mut created = Vec::with_capacity(roles.len());
        let mut taken = false;
        for role in roles {
            let filename = format!("{}_{}.bmp", prefix, role.as_str());
            let path = dir.join(&filename);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => created.push((filename, path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    taken = true;
                    break;
                }
                Err(e) => {
                    discard(created)?;
                    return Err(e);
                }
            }
        }
        if !taken {
            return Ok(created);
        }
        debug!("{}_*.bmp taken in {}", prefix, dir.display());
        discard(created)?;
        attempt += 1;
    }
}

fn discard(created: Vec<(String, PathBuf, File)>) -> io::Result<()> {
    for (_, path, file) in created {
        drop(file);
        remove_file(path)?;
    }
    Ok(())
}

fn sanitized_stem(name: &str) -> String {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"[^A-Za-z0-9]").unwrap();
    }
    let base = Path::new(name)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = base.split('.').next().unwrap_or_default();
    RE.replace_all(stem, "_").into_owned()
}

/// Locate up to two bitmaps in `bytes`.
///
/// A candidate is rejected when its size field cannot be read, declares
/// less than [`MIN_BMP_SIZE`] bytes, or runs past the end of the buffer.
/// After a rejection the scan resumes right after the rejected "BM", so
/// a real signature inside the bogus range is not skipped. After an
/// accepted image it resumes at the image's end.
pub fn extract_bitmaps(bytes: &[u8]) -> BitmapExtraction<'_> {
    let cursor = ByteCursor::new(bytes);
    let mut images = Vec::with_capacity(MAX_IMAGES);
    let mut pos = 0;

    while images.len() < MAX_IMAGES {
        let offset = match find(bytes, BMP_MAGIC, pos) {
            Some(offset) => offset,
            None => break,
        };
        pos = offset + BMP_MAGIC.len();

        let size = match cursor.read_u32(offset + BMP_SIZE_FIELD) {
            Ok(size) => size as usize,
            Err(_) => {
                debug!("BM at {} too close to the end to read its size", offset);
                continue;
            }
        };
        if size < MIN_BMP_SIZE {
            debug!("BM at {} declares {} bytes, too small", offset, size);
            continue;
        }
        let image = match cursor.slice(offset, size) {
            Ok(image) => image,
            Err(_) => {
                debug!(
                    "BM at {} declares {} bytes, past the end of {} bytes",
                    offset,
                    size,
                    bytes.len()
                );
                continue;
            }
        };

        images.push(EmbeddedBitmap {
            role: ImageRole::for_index(images.len()),
            offset,
            bytes: image,
        });
        pos = offset + size;
    }

    if images.len() < MAX_IMAGES {
        debug!("expected {} bitmaps, found {}", MAX_IMAGES, images.len());
    }
    BitmapExtraction { images }
}

/// Decode strategy for dual-BMP files.
///
/// The thermal bitmap becomes a luminance field and the second bitmap is
/// kept as the real image. A single bitmap doubles as the real image. No
/// bitmap at all is a format mismatch.
pub fn decode(bytes: &[u8]) -> Result<Option<DecodedImage>, DecodeError> {
    let extraction = extract_bitmaps(bytes);
    let thermal = match extraction.thermal() {
        Some(thermal) => thermal,
        None => {
            debug!("{}", DecodeError::SignatureNotFound("BMP"));
            return Ok(None);
        }
    };
    if !extraction.is_complete() {
        warn!("partial dual BMP: {}", extraction.message());
    }

    let field = match fallback::decode_luminance(thermal.bytes, Some(::image::ImageFormat::Bmp)) {
        Ok(field) => Some(field),
        Err(e) if extraction.real().is_some() => {
            warn!("thermal bitmap at {} unreadable: {}", thermal.offset, e);
            None
        }
        Err(e) => return Err(e),
    };
    // A lone bitmap is also the only displayable picture of the file.
    let real_image = extraction
        .real()
        .unwrap_or(thermal)
        .bytes
        .to_vec();
    DecodedImage::new(Strategy::DualBitmap, field, Some(RealImage::new(real_image))).map(Some)
}
