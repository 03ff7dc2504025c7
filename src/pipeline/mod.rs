//! Detection pipeline orchestration.
//!
//! Owns the `{Stopped, Starting, Running}` state machine and the single
//! tick worker that carries every frame from the camera through governance,
//! detection and filtering to the caller's callbacks.

pub mod governor;
pub mod window;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flume::bounded;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::capture::camera::{CameraCapability, CameraHandle, SurfaceHandle};
use crate::capture::frame::Frame;
use crate::convert::{self, EncodedImage};
use crate::detect::{DetectedObject, DetectorCapability, DetectorImage, FaceDetectorCapability};
use crate::error::{ScanResult, ScannerError};
use crate::ScannerConfig;
use governor::{FrameGovernor, GovernorState};

/// Parameters reported to the caller once the camera is up.
#[derive(Debug, Clone)]
pub struct StartParameters {
    /// Analysis dimensions in display orientation (swapped for sensors
    /// mounted at 90/270 degrees).
    pub width: u32,
    pub height: u32,
    pub has_flash: bool,
    pub surface: SurfaceHandle,
}

pub type ResultCallback = Arc<dyn Fn(Vec<DetectedObject>, Option<EncodedImage>) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(String) + Send + Sync>;
pub type TorchStateCallback = Arc<dyn Fn(bool) + Send + Sync>;
pub type ZoomStateCallback = Arc<dyn Fn(f32) + Send + Sync>;

/// Outward-facing callbacks invoked by the pipeline.
///
/// Detection failures arrive on `on_error` and never stop the stream.
#[derive(Clone)]
pub struct ScannerCallbacks {
    pub on_result: ResultCallback,
    pub on_error: ErrorCallback,
    pub on_torch_state: TorchStateCallback,
    pub on_zoom_state: ZoomStateCallback,
}

impl Default for ScannerCallbacks {
    fn default() -> Self {
        Self {
            on_result: Arc::new(|_, _| {}),
            on_error: Arc::new(|_| {}),
            on_torch_state: Arc::new(|_| {}),
            on_zoom_state: Arc::new(|_| {}),
        }
    }
}

enum State {
    Stopped,
    Starting,
    Running(Running),
}

struct Running {
    camera: Box<dyn CameraHandle>,
    worker: JoinHandle<()>,
    forwarders: Vec<JoinHandle<()>>,
    /// Shared with governor reset timers; set on stop so late timers no-op.
    cancel: Arc<AtomicBool>,
}

/// Everything one tick needs, moved into the worker task at start.
struct TickContext {
    detector: Arc<dyn DetectorCapability>,
    face_detector: Option<Arc<dyn FaceDetectorCapability>>,
    callbacks: ScannerCallbacks,
    governor: FrameGovernor,
    config: ScannerConfig,
}

/// The detection pipeline.
///
/// Camera, barcode detector and the optional face detector are capabilities
/// supplied by the embedder; the scanner decides which frames they see and
/// which results the caller sees.
pub struct Scanner {
    camera: Arc<dyn CameraCapability>,
    detector: Arc<dyn DetectorCapability>,
    face_detector: Option<Arc<dyn FaceDetectorCapability>>,
    callbacks: ScannerCallbacks,
    state: State,
}

impl Scanner {
    pub fn new(
        camera: Arc<dyn CameraCapability>,
        detector: Arc<dyn DetectorCapability>,
        callbacks: ScannerCallbacks,
    ) -> Self {
        Self {
            camera,
            detector,
            face_detector: None,
            callbacks,
            state: State::Stopped,
        }
    }

    /// Attach a face detector for the image redaction side path.
    pub fn with_face_detector(mut self, face_detector: Arc<dyn FaceDetectorCapability>) -> Self {
        self.face_detector = Some(face_detector);
        self
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    /// Start scanning: acquire the camera, spawn the tick worker and report
    /// the stream parameters.
    pub async fn start(&mut self, config: ScannerConfig) -> ScanResult<StartParameters> {
        if !matches!(self.state, State::Stopped) {
            return Err(ScannerError::AlreadyRunning);
        }
        self.state = State::Starting;

        let (frame_tx, frame_rx) = bounded::<Frame>(config.frame_queue_depth);
        let camera = match self.camera.acquire(frame_tx).await {
            Ok(camera) => camera,
            Err(e) => {
                self.state = State::Stopped;
                return Err(e);
            }
        };

        if config.torch_on_start {
            if let Err(e) = camera.set_torch(true) {
                warn!(error = %e, "could not enable torch on start");
            }
        }

        let (width, height) = camera.resolution();
        // Sensors mounted at 90/270 deliver transposed frames
        let portrait = camera.sensor_rotation_degrees() % 180 == 0;
        let (width, height) = if portrait {
            (width, height)
        } else {
            (height, width)
        };

        let cancel = Arc::new(AtomicBool::new(false));
        let mut forwarders = Vec::with_capacity(2);

        let torch_rx = camera.torch_events();
        let on_torch = Arc::clone(&self.callbacks.on_torch_state);
        forwarders.push(tokio::spawn(async move {
            while let Ok(state) = torch_rx.recv_async().await {
                on_torch(state);
            }
        }));

        let zoom_rx = camera.zoom_events();
        let on_zoom = Arc::clone(&self.callbacks.on_zoom_state);
        forwarders.push(tokio::spawn(async move {
            while let Ok(scale) = zoom_rx.recv_async().await {
                on_zoom(scale);
            }
        }));

        let ctx = TickContext {
            detector: Arc::clone(&self.detector),
            face_detector: self.face_detector.clone(),
            callbacks: self.callbacks.clone(),
            governor: FrameGovernor::new(
                config.detection_speed,
                Duration::from_millis(config.detection_timeout_ms),
            ),
            config: config.clone(),
        };
        let mut governor_state = GovernorState::with_cancel(Arc::clone(&cancel));

        // One task, frames processed strictly in order: governance state
        // needs no locking and results are never reordered.
        let worker = tokio::spawn(async move {
            while let Ok(frame) = frame_rx.recv_async().await {
                process_tick(&ctx, &mut governor_state, frame).await;
            }
            debug!("frame stream closed, tick worker exiting");
        });

        let params = StartParameters {
            width,
            height,
            has_flash: camera.has_flash(),
            surface: camera.surface(),
        };

        self.state = State::Running(Running {
            camera,
            worker,
            forwarders,
            cancel,
        });
        info!(width, height, speed = ?config.detection_speed, "scanner running");
        Ok(params)
    }

    /// Stop scanning and release the camera.
    ///
    /// A detection still in flight is abandoned at its await point; its late
    /// completion is never observed.
    pub fn stop(&mut self) -> ScanResult<()> {
        match std::mem::replace(&mut self.state, State::Stopped) {
            State::Running(running) => {
                running.cancel.store(true, Ordering::SeqCst);
                running.worker.abort();
                for forwarder in running.forwarders {
                    forwarder.abort();
                }
                running.camera.release();
                info!("scanner stopped");
                Ok(())
            }
            state => {
                self.state = state;
                Err(ScannerError::NotRunning)
            }
        }
    }

    /// Set linear zoom. `scale` must lie in [0, 1].
    pub fn set_zoom(&self, scale: f32) -> ScanResult<()> {
        let State::Running(running) = &self.state else {
            return Err(ScannerError::NotRunning);
        };
        if !(0.0..=1.0).contains(&scale) {
            return Err(ScannerError::ZoomOutOfRange(scale));
        }
        running.camera.set_zoom(scale)
    }

    /// Restore the default zoom ratio.
    pub fn reset_zoom(&self) -> ScanResult<()> {
        let State::Running(running) = &self.state else {
            return Err(ScannerError::NotRunning);
        };
        running.camera.reset_zoom()
    }

    /// Toggle the torch.
    pub fn set_torch(&self, enabled: bool) -> ScanResult<()> {
        let State::Running(running) = &self.state else {
            return Err(ScannerError::NotRunning);
        };
        running.camera.set_torch(enabled)
    }

    /// Analyze a single image file, bypassing the running state machine and
    /// the frame governor entirely.
    pub async fn analyze_static_image(&self, path: &Path) -> ScanResult<Vec<DetectedObject>> {
        let image = image::open(path)?;
        self.detector
            .process(DetectorImage::Bitmap(&image))
            .await
            .map_err(|e| ScannerError::Detection(e.to_string()))
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}

/// Process one frame end to end.
///
/// The frame is released exactly once: it drops at the end of whichever
/// branch exits this function.
#[instrument(skip_all, fields(w = frame.width, h = frame.height))]
async fn process_tick(ctx: &TickContext, state: &mut GovernorState, frame: Frame) {
    if !frame.has_image() {
        // Transient during camera reconfiguration; not an error
        trace!("frame without image data, skipping");
        return;
    }

    if !ctx.governor.should_submit(state) {
        metrics::counter!("frames_throttled_total").increment(1);
        return;
    }
    ctx.governor.schedule_reset(state);

    let detections = match ctx.detector.process(DetectorImage::YuvFrame(&frame)).await {
        Ok(detections) => detections,
        Err(e) => {
            (ctx.callbacks.on_error)(e.to_string());
            return;
        }
    };

    // Dedup looks at every detected object, before the window filter: a
    // duplicate is a duplicate even when it sits outside the scan window.
    let signatures: Vec<Option<String>> =
        detections.iter().map(|d| d.raw_value.clone()).collect();
    if !ctx.governor.on_result(state, &signatures) {
        return;
    }

    let survivors: Vec<DetectedObject> = match &ctx.config.scan_window {
        Some(window) => detections
            .into_iter()
            .filter(|d| window.contains(d.bounding_box, frame.width, frame.height))
            .collect(),
        None => detections,
    };
    if survivors.is_empty() {
        return;
    }

    let image = if ctx.config.return_image {
        build_return_image(ctx, &frame).await
    } else {
        None
    };

    metrics::counter!("results_emitted_total").increment(1);
    debug!(count = survivors.len(), "emitting detections");
    (ctx.callbacks.on_result)(survivors, image);
}

/// Convert the frame to a JPEG for the result callback, redacting detected
/// faces when configured.
async fn build_return_image(ctx: &TickContext, frame: &Frame) -> Option<EncodedImage> {
    let nv21 = convert::frame_to_nv21(frame);
    let width = frame.crop.width() as u32;
    let height = frame.crop.height() as u32;
    let mut rgb = convert::nv21_to_rgb(&nv21, width, height);

    if ctx.config.redact_faces {
        if let Some(face_detector) = &ctx.face_detector {
            match face_detector.process(DetectorImage::YuvFrame(frame)).await {
                Ok(faces) => convert::redact_regions(&mut rgb, width, height, &faces),
                Err(e) => {
                    // Redaction is best effort; an unredacted preview beats
                    // no preview, but it is worth a log line.
                    warn!(error = %e, "face detection failed, returning unredacted image");
                }
            }
        }
    }

    match convert::rgb_to_jpeg(&rgb, width, height) {
        Ok(data) => Some(EncodedImage {
            data,
            width,
            height,
        }),
        Err(e) => {
            warn!(error = %e, "bitmap encoding failed");
            None
        }
    }
}
