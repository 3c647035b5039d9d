use anyhow::{bail, Context, Result};
use futures::StreamExt;
use image::io::Reader as ImageReader;
use indicatif::ProgressBar;
use std::io::Cursor;

/// Reads `width x height` from an image's header without decoding the pixels.
pub fn dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("Failed to sniff image format")?;
    reader
        .into_dimensions()
        .context("Failed to read image dimensions")
}

/// Fetches one image and renders its resolution as `"WxH"`. Every failure is
/// stringified into the cell value instead of propagating.
pub async fn probe_resolution(client: &reqwest::Client, url: &str) -> String {
    match fetch_dimensions(client, url).await {
        Ok((width, height)) => format!("{}x{}", width, height),
        Err(e) => format!("Error: {:#}", e),
    }
}

async fn fetch_dimensions(client: &reqwest::Client, url: &str) -> Result<(u32, u32)> {
    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to fetch image")?;
    if !response.status().is_success() {
        bail!(
            "Failed to fetch image (HTTP status code {})",
            response.status().as_u16()
        );
    }
    let bytes = response
        .bytes()
        .await
        .context("Failed to read image body")?;
    dimensions(&bytes)
}

/// Probes all URLs with at most `workers` requests in flight, preserving input
/// order so results line up with the sheet rows they came from.
pub async fn probe_all(
    client: &reqwest::Client,
    urls: &[String],
    workers: usize,
    progress: Option<&ProgressBar>,
) -> Vec<String> {
    futures::stream::iter(urls.iter().map(|url| async move {
        let resolution = probe_resolution(client, url).await;
        if let Some(bar) = progress {
            bar.inc(1);
        }
        resolution
    }))
    .buffered(workers.max(1))
    .collect()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(image::RgbaImage::new(width, height))
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn reads_dimensions_from_header() {
        assert_eq!(dimensions(&png_bytes(3, 2)).unwrap(), (3, 2));
    }

    #[test]
    fn garbage_bytes_are_an_error() {
        assert!(dimensions(b"not an image").is_err());
    }

    #[tokio::test]
    async fn probe_preserves_input_order() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(4, 5)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(1, 1)))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let urls = vec![
            format!("{}/a.png", server.uri()),
            format!("{}/missing.png", server.uri()),
            format!("{}/b.png", server.uri()),
        ];

        let results = probe_all(&client, &urls, 2, None).await;

        assert_eq!(results[0], "4x5");
        assert!(results[1].starts_with("Error:"));
        assert!(results[1].contains("404"));
        assert_eq!(results[2], "1x1");
    }
}
