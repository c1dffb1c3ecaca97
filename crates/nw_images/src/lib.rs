use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::{debug, warn};

use nw_core::blobs::BlobStore;
use nw_core::models::{BlobMetadata, BlobRole};

pub const THUMBNAIL_WIDTH: u32 = 400;
pub const THUMBNAIL_HEIGHT: u32 = 300;

/// Downloads article images, stores the original, and derives a JPEG
/// thumbnail. Every operation is best-effort: an image that cannot be
/// fetched, decoded or stored yields an absent result and the article
/// pipeline carries on without it.
pub struct ImageService {
    blobs: Arc<dyn BlobStore>,
    client: reqwest::Client,
}

impl ImageService {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { blobs, client }
    }

    /// Download `image_url`, store the original and derive a default-sized
    /// thumbnail. Returns the original's blob id, or None on any failure.
    /// The original survives even when the thumbnail step fails.
    pub async fn ingest_from_url(&self, image_url: &str, article_id: i64) -> Option<String> {
        let response = match self.client.get(image_url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!("image fetch returned {} for {}", response.status(), image_url);
                return None;
            }
            Err(e) => {
                warn!("failed to fetch image {}: {}", image_url, e);
                return None;
            }
        };

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                warn!("failed to read image body from {}: {}", image_url, e);
                return None;
            }
        };

        let decoded = match image::load_from_memory(&bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("failed to decode image from {}: {}", image_url, e);
                return None;
            }
        };

        let filename = format!(
            "news_{}_{}{}",
            article_id,
            Utc::now().format("%Y%m%d%H%M%S"),
            extension_for(&content_type)
        );

        let meta = BlobMetadata {
            content_type,
            role: BlobRole::Original,
            article_id: Some(article_id),
            source_url: Some(image_url.to_string()),
            width: decoded.width(),
            height: decoded.height(),
            thumb_id: None,
            origin_id: None,
            uploaded_at: Utc::now(),
        };

        let image_id = match self.blobs.upload(bytes, &filename, meta).await {
            Ok(id) => id,
            Err(e) => {
                warn!("failed to store image from {}: {}", image_url, e);
                return None;
            }
        };

        if let Some(thumb_id) = self
            .generate_thumbnail(&image_id, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT)
            .await
        {
            if let Err(e) = self.blobs.set_thumbnail(&image_id, &thumb_id).await {
                warn!("failed to link thumbnail {} to {}: {}", thumb_id, image_id, e);
            }
        }

        Some(image_id)
    }

    /// Derive a JPEG thumbnail fitting within `width`x`height` from a stored
    /// original. Aspect ratio is preserved and the source is never upscaled
    /// or cropped.
    pub async fn generate_thumbnail(
        &self,
        image_id: &str,
        width: u32,
        height: u32,
    ) -> Option<String> {
        let bytes = match self.blobs.download(image_id).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("no stored image {} to thumbnail", image_id);
                return None;
            }
            Err(e) => {
                warn!("failed to load image {}: {}", image_id, e);
                return None;
            }
        };

        let decoded = match image::load_from_memory(&bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("failed to decode stored image {}: {}", image_id, e);
                return None;
            }
        };

        let (thumb_w, thumb_h) = fit_within(decoded.width(), decoded.height(), width, height);
        let resized = decoded.resize_exact(thumb_w, thumb_h, FilterType::Lanczos3);

        // JPEG carries no alpha channel.
        let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
        let mut encoded = Vec::new();
        if let Err(e) = rgb.write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Jpeg) {
            warn!("failed to encode thumbnail for {}: {}", image_id, e);
            return None;
        }

        let meta = BlobMetadata {
            content_type: "image/jpeg".to_string(),
            role: BlobRole::Thumbnail,
            article_id: None,
            source_url: None,
            width: thumb_w,
            height: thumb_h,
            thumb_id: None,
            origin_id: Some(image_id.to_string()),
            uploaded_at: Utc::now(),
        };

        let filename = format!("thumb_{}_{}x{}.jpg", image_id, width, height);
        match self.blobs.upload(encoded, &filename, meta).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("failed to store thumbnail for {}: {}", image_id, e);
                None
            }
        }
    }

    /// Bytes and content type of a stored blob. Unknown ids yield None.
    pub async fn get_bytes(&self, image_id: &str) -> Option<(Vec<u8>, String)> {
        let bytes = self.blobs.download(image_id).await.ok()??;
        let content_type = self
            .blobs
            .metadata(image_id)
            .await
            .ok()
            .flatten()
            .map(|m| m.content_type)
            .unwrap_or_else(|| "image/jpeg".to_string());
        Some((bytes, content_type))
    }

    /// Id of the thumbnail derived from `image_id`, if one exists.
    pub async fn thumbnail_id(&self, image_id: &str) -> Option<String> {
        self.blobs.metadata(image_id).await.ok()??.thumb_id
    }

    /// Remove a stored image and its thumbnail. Fire-and-forget cleanup;
    /// all errors are swallowed.
    pub async fn delete(&self, image_id: &str) {
        if let Some(thumb_id) = self.thumbnail_id(image_id).await {
            if let Err(e) = self.blobs.delete(&thumb_id).await {
                debug!("ignoring thumbnail delete failure for {}: {}", thumb_id, e);
            }
        }
        if let Err(e) = self.blobs.delete(image_id).await {
            debug!("ignoring image delete failure for {}: {}", image_id, e);
        }
    }
}

/// Largest dimensions with the source's aspect ratio that fit within the
/// target box without upscaling.
pub fn fit_within(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if src_w == 0 || src_h == 0 {
        return (src_w, src_h);
    }
    if src_w <= max_w && src_h <= max_h {
        return (src_w, src_h);
    }

    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).max(1);
    let h = ((src_h as f64 * scale).round() as u32).max(1);
    (w, h)
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type.to_lowercase().as_str() {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        _ => ".jpg",
    }
}
