// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! Image I/O collaborators: fetching bytes, decoding them, encoding PNG.

use crate::error::{RasterError, Result};
use image::{codecs::png::PngEncoder, ImageEncoder};

/// Source of encoded image bytes for `RasterContext::texture_from_url`.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

#[cfg(http_fetch)]
pub use http::HttpFetcher;

#[cfg(http_fetch)]
mod http {
    use super::ImageFetcher;
    use crate::error::{RasterError, Result};
    use log::debug;
    use reqwest::blocking::Client;

    /// Blocking HTTP(S) fetcher.
    pub struct HttpFetcher {
        http: Client,
    }

    impl HttpFetcher {
        pub fn new() -> Result<Self> {
            let http = Client::builder().build().map_err(|e| RasterError::FetchFailed {
                url: String::new(),
                reason: e.to_string(),
            })?;
            Ok(Self { http })
        }
    }

    impl ImageFetcher for HttpFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            let failed = |reason: String| RasterError::FetchFailed {
                url: url.to_string(),
                reason,
            };
            let response = self.http.get(url).send().map_err(|e| failed(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(failed(format!("http status {}", status)));
            }
            let bytes = response.bytes().map_err(|e| failed(e.to_string()))?;
            debug!("fetched {} ({} bytes)", url, bytes.len());
            Ok(bytes.to_vec())
        }
    }
}

/// Decode PNG or JPEG bytes into RGBA8, first row on top.
pub fn decode_image(bytes: &[u8]) -> Result<image::RgbaImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| RasterError::DecodeFailed(e.to_string()))
}

/// Encode top-to-bottom RGBA8 rows as a PNG file.
pub fn encode_png(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(RasterError::EncodeFailed(format!(
            "{} bytes for a {}x{} RGBA image",
            rgba.len(),
            width,
            height
        )));
    }
    let mut out = vec![];
    PngEncoder::new(&mut out)
        .write_image(rgba, width, height, image::ExtendedColorType::Rgba8)
        .map_err(|e| RasterError::EncodeFailed(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_encode_decode() {
        let rgba = [255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 9, 9, 9, 128];
        let png = encode_png(2, 2, &rgba).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let img = decode_image(&png).unwrap();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.as_raw().as_slice(), &rgba);
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(matches!(
            decode_image(b"not an image"),
            Err(RasterError::DecodeFailed(_))
        ));
    }

    #[test]
    fn short_buffer_does_not_encode() {
        assert!(matches!(
            encode_png(4, 4, &[0; 8]),
            Err(RasterError::EncodeFailed(_))
        ));
    }
}
