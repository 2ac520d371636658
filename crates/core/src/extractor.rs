use crate::error::IngestError;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;

/// One page in reading order. Text and every embedded image are extracted
/// independently, so one failure does not hide the rest of the page.
#[derive(Debug)]
pub struct PdfPage {
    pub number: u32,
    pub text: Result<String, IngestError>,
    pub images: Vec<Result<EmbeddedImage, IngestError>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageData {
    /// Uncompressed samples, row-major, `colorants` samples per pixel.
    Raw(Vec<u8>),
    /// A complete JPEG file (`DCTDecode`).
    Jpeg(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    /// Colour samples per pixel, excluding alpha. 0 when the colour space is not recognised.
    pub colorants: u8,
    pub has_alpha: bool,
    pub bits_per_component: u8,
    pub data: ImageData,
}

impl EmbeddedImage {
    /// Only grayscale and RGB images are handed to OCR; CMYK and unrecognised
    /// colour models are skipped.
    pub fn is_gray_or_rgb(&self) -> bool {
        matches!(self.colorants, 1 | 3)
    }

    /// Decodes the samples into an [`image::DynamicImage`]. Raw buffers must be
    /// 8 bits per component; trailing padding bytes are ignored.
    pub fn to_image(&self) -> Result<DynamicImage, IngestError> {
        let samples = match &self.data {
            ImageData::Jpeg(bytes) => {
                return Ok(image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?)
            }
            ImageData::Raw(samples) => samples,
        };

        if self.bits_per_component != 8 {
            return Err(IngestError::ImageDecode(format!(
                "{} bits per component is not supported",
                self.bits_per_component
            )));
        }

        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(usize::from(self.colorants)))
            .ok_or_else(|| IngestError::ImageDecode("image dimensions overflow".to_string()))?;
        if samples.len() < expected {
            return Err(IngestError::ImageDecode(format!(
                "expected {expected} bytes for a {}x{} image, got {}",
                self.width,
                self.height,
                samples.len()
            )));
        }
        let pixels = samples[..expected].to_vec();

        let decoded = match self.colorants {
            1 => GrayImage::from_raw(self.width, self.height, pixels).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(self.width, self.height, pixels).map(DynamicImage::ImageRgb8),
            _ => None,
        };

        decoded.ok_or_else(|| {
            IngestError::ImageDecode(format!("cannot decode {} colorants", self.colorants))
        })
    }
}

pub trait PdfExtractor: Send + Sync {
    fn pages(&self, path: &Path) -> Result<Vec<PdfPage>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn pages(&self, path: &Path) -> Result<Vec<PdfPage>, IngestError> {
        let document = Document::load(path)?;

        let pages = document
            .get_pages()
            .into_iter()
            .map(|(number, page_id)| PdfPage {
                number,
                text: document.extract_text(&[number]).map_err(IngestError::from),
                images: match page_images(&document, page_id) {
                    Ok(images) => images,
                    Err(error) => vec![Err(error)],
                },
            })
            .collect();

        Ok(pages)
    }
}

fn pdf_error(message: impl Into<String>) -> IngestError {
    IngestError::PdfParse(message.into())
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Result<&'a Object, IngestError> {
    match object {
        Object::Reference(id) => Ok(document.get_object(*id)?),
        other => Ok(other),
    }
}

fn resolve_dict<'a>(
    document: &'a Document,
    object: &'a Object,
) -> Result<&'a Dictionary, IngestError> {
    match resolve(document, object)? {
        Object::Dictionary(dictionary) => Ok(dictionary),
        Object::Stream(stream) => Ok(&stream.dict),
        _ => Err(pdf_error("expected a dictionary")),
    }
}

/// The page's `/Resources`, walking up `/Parent` links when the page inherits them.
fn page_resources<'a>(
    document: &'a Document,
    page_id: ObjectId,
) -> Result<Option<&'a Dictionary>, IngestError> {
    const MAX_DEPTH: usize = 32;

    let mut node = document.get_dictionary(page_id)?;
    for _ in 0..MAX_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve_dict(document, resources).map(Some);
        }
        match node.get(b"Parent") {
            Ok(parent) => node = resolve_dict(document, parent)?,
            Err(_) => return Ok(None),
        }
    }

    Ok(None)
}

/// Image XObjects referenced by the page, in resource order.
fn page_images(
    document: &Document,
    page_id: ObjectId,
) -> Result<Vec<Result<EmbeddedImage, IngestError>>, IngestError> {
    let Some(resources) = page_resources(document, page_id)? else {
        return Ok(Vec::new());
    };
    let xobjects = match resources.get(b"XObject") {
        Ok(xobjects) => resolve_dict(document, xobjects)?,
        Err(_) => return Ok(Vec::new()),
    };

    let mut images = Vec::new();
    for (_name, object) in xobjects.iter() {
        let stream = match resolve(document, object) {
            Ok(Object::Stream(stream)) => stream,
            Ok(_) => continue,
            Err(error) => {
                images.push(Err(error));
                continue;
            }
        };

        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .map(|subtype| subtype == b"Image")
            .unwrap_or(false);

        if is_image {
            images.push(decode_image(document, stream));
        }
    }

    Ok(images)
}

fn decode_image(document: &Document, stream: &Stream) -> Result<EmbeddedImage, IngestError> {
    let dict = &stream.dict;
    let dimension = |key: &[u8]| -> Result<u32, IngestError> {
        let value = resolve(document, dict.get(key)?)?.as_i64()?;
        u32::try_from(value).map_err(|_| pdf_error(format!("invalid image dimension {value}")))
    };

    let width = dimension(b"Width")?;
    let height = dimension(b"Height")?;
    let bits_per_component = match dict.get(b"BitsPerComponent") {
        Ok(bits) => u8::try_from(resolve(document, bits)?.as_i64()?)
            .map_err(|_| pdf_error("invalid BitsPerComponent"))?,
        Err(_) => 8,
    };
    let colorants = match dict.get(b"ColorSpace") {
        Ok(space) => colorant_count(document, resolve(document, space)?),
        Err(_) => 0,
    };
    let has_alpha = dict.get(b"SMask").is_ok();

    let filters = stream_filters(document, dict)?;
    let data = match filters.as_slice() {
        [] => ImageData::Raw(stream.content.clone()),
        [only] if only == "DCTDecode" => ImageData::Jpeg(stream.content.clone()),
        _ if filters.iter().any(|name| name == "DCTDecode") => {
            return Err(pdf_error(format!("unsupported image filter chain {filters:?}")))
        }
        _ => ImageData::Raw(stream.decompressed_content()?),
    };

    Ok(EmbeddedImage {
        width,
        height,
        colorants,
        has_alpha,
        bits_per_component,
        data,
    })
}

fn stream_filters(document: &Document, dict: &Dictionary) -> Result<Vec<String>, IngestError> {
    let Ok(filter) = dict.get(b"Filter") else {
        return Ok(Vec::new());
    };

    match resolve(document, filter)? {
        Object::Name(name) => Ok(vec![String::from_utf8_lossy(name).into_owned()]),
        Object::Array(names) => names
            .iter()
            .map(|name| {
                resolve(document, name)?
                    .as_name()
                    .map(|name| String::from_utf8_lossy(name).into_owned())
                    .map_err(IngestError::from)
            })
            .collect(),
        _ => Err(pdf_error("unexpected /Filter value")),
    }
}

fn colorant_count(document: &Document, space: &Object) -> u8 {
    match space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => 1,
            b"DeviceRGB" | b"CalRGB" | b"RGB" => 3,
            b"DeviceCMYK" | b"CMYK" => 4,
            _ => 0,
        },
        Object::Array(parts) => {
            let family = parts.first().and_then(|part| part.as_name().ok());
            match family {
                Some(b"CalGray") => 1,
                Some(b"CalRGB") => 3,
                Some(b"ICCBased") => parts
                    .get(1)
                    .and_then(|profile| resolve_dict(document, profile).ok())
                    .and_then(|profile| profile.get(b"N").ok())
                    .and_then(|n| n.as_i64().ok())
                    .and_then(|n| u8::try_from(n).ok())
                    .unwrap_or(0),
                _ => 0,
            }
        }
        _ => 0,
    }
}
