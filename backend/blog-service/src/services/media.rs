/// Image attachments for posts
///
/// Uploads are checked by decoding them, then written to
/// `{root}/posts/<uuid>.<ext>`. Posts store the path relative to `root`.
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

/// Sub-directory of the media root that holds post images
pub const POST_IMAGE_DIR: &str = "posts";

/// Image formats accepted for upload
const ACCEPTED_FORMATS: [(ImageFormat, &str); 5] = [
    (ImageFormat::Gif, "gif"),
    (ImageFormat::Png, "png"),
    (ImageFormat::Jpeg, "jpg"),
    (ImageFormat::WebP, "webp"),
    (ImageFormat::Bmp, "bmp"),
];

/// Uploaded file that decoded as a supported image
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    /// Check that `bytes` is a complete image in one of the accepted formats.
    ///
    /// The error is the message shown next to the form field.
    pub fn inspect(bytes: Vec<u8>) -> std::result::Result<Self, String> {
        const INVALID: &str =
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

        let format = image::guess_format(&bytes).map_err(|_| INVALID.to_string())?;
        let extension = ACCEPTED_FORMATS
            .iter()
            .find(|(accepted, _)| *accepted == format)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| INVALID.to_string())?;

        image::load_from_memory_with_format(&bytes, format).map_err(|e| {
            debug!(error = %e, "uploaded image failed to decode");
            INVALID.to_string()
        })?;

        Ok(Self { extension, bytes })
    }
}

/// File system storage for uploaded media
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a post image and return its path relative to the media root
    pub async fn save_post_image(&self, image: &UploadedImage) -> Result<String> {
        let dir = self.root.join(POST_IMAGE_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), image.extension);
        tokio::fs::write(dir.join(&file_name), &image.bytes).await?;

        let relative = format!("{}/{}", POST_IMAGE_DIR, file_name);
        debug!(path = %relative, size = image.bytes.len(), "stored post image");
        Ok(relative)
    }

    /// Public URL of a stored file
    pub fn url(&self, relative: &str) -> String {
        format!("{}{}", self.url_prefix, relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn png_is_accepted() {
        let image = UploadedImage::inspect(png_bytes()).unwrap();
        assert_eq!(image.extension, "png");
    }

    #[test]
    fn text_file_is_rejected() {
        let err = UploadedImage::inspect(b"definitely not an image".to_vec()).unwrap_err();
        assert!(err.contains("valid image"));
    }

    #[test]
    fn truncated_png_is_rejected() {
        let mut bytes = png_bytes();
        bytes.truncate(20);
        assert!(UploadedImage::inspect(bytes).is_err());
    }

    #[tokio::test]
    async fn saved_image_lands_under_posts() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path(), "/media/");
        let image = UploadedImage::inspect(png_bytes()).unwrap();

        let relative = storage.save_post_image(&image).await.unwrap();
        assert!(relative.starts_with("posts/"));
        assert!(relative.ends_with(".png"));
        assert!(dir.path().join(&relative).exists());
        assert_eq!(storage.url(&relative), format!("/media/{}", relative));
    }
}
