//! Scanpipe demo: a synthetic camera feeding the detection pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use color_eyre::Result;
use tracing::{info, warn};

use scanpipe::capture::synthetic::SyntheticCamera;
use scanpipe::detect::{
    DetectedObject, DetectorCapability, DetectorImage, DetectorResult, Symbology,
};
use scanpipe::{DetectionSpeed, PixelRect, Scanner, ScannerCallbacks, ScannerConfig};

/// Toy detector: reports a synthetic code whenever mean luma crosses a
/// threshold, bucketed so the payload changes as the test pattern brightens.
struct LumaProbe;

#[async_trait]
impl DetectorCapability for LumaProbe {
    async fn process(&self, image: DetectorImage<'_>) -> DetectorResult<Vec<DetectedObject>> {
        let DetectorImage::YuvFrame(frame) = image else {
            return Ok(Vec::new());
        };

        let luma = &frame.planes[0].data;
        let mean = luma.iter().map(|&b| b as u64).sum::<u64>() / luma.len() as u64;
        if mean < 64 {
            return Ok(Vec::new());
        }

        let code = format!("luma-{}", mean / 32);
        Ok(vec![DetectedObject::new(code)
            .with_symbology(Symbology::QrCode)
            .with_bounding_box(PixelRect::new(10, 10, 50, 50))])
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter("scanpipe=debug")
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("scanpipe demo starting");

    let callbacks = ScannerCallbacks {
        on_result: Arc::new(|objects, image| {
            for object in &objects {
                info!(value = ?object.raw_value, "detected");
            }
            if let Some(image) = image {
                info!(bytes = image.data.len(), "return image attached");
            }
        }),
        on_error: Arc::new(|message| warn!(%message, "detection error")),
        on_torch_state: Arc::new(|state| info!(state, "torch state")),
        ..ScannerCallbacks::default()
    };

    let camera = Arc::new(SyntheticCamera::new(320, 240, 30));
    let mut scanner = Scanner::new(camera, Arc::new(LumaProbe), callbacks);

    let params = scanner
        .start(ScannerConfig {
            detection_speed: DetectionSpeed::SuppressDuplicates,
            ..ScannerConfig::default()
        })
        .await?;
    info!(
        width = params.width,
        height = params.height,
        has_flash = params.has_flash,
        "camera up"
    );

    tokio::time::sleep(Duration::from_secs(3)).await;
    scanner.stop()?;

    info!("scanpipe demo shutting down");
    Ok(())
}
