use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;

/// Live frame source backed by ffmpeg-next.
///
/// Opens a video file, stream URL, or capture device (e.g. `/dev/video0`)
/// and decodes it on a background thread, keeping only the latest RGB24
/// frame. Files are paced at their stream frame rate so they behave like a
/// camera. When the input ends, the last frame stays available.
pub struct FfmpegCaptureSource {
    latest: Arc<Mutex<Option<Frame>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FfmpegCaptureSource {
    /// Opens `input` and starts decoding. Returns once the input is open,
    /// or with the error that prevented opening it.
    pub fn open(input: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let latest = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);

        let handle = {
            let input = input.to_string();
            let latest = latest.clone();
            let stop = stop.clone();
            std::thread::Builder::new()
                .name("frame-capture".into())
                .spawn(move || {
                    let capture = match CaptureStream::open(&input) {
                        Ok(capture) => {
                            let _ = ready_tx.send(Ok(()));
                            capture
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e.to_string()));
                            return;
                        }
                    };
                    match capture.run(&latest, &stop) {
                        Ok(()) if stop.load(Ordering::Relaxed) => {}
                        Ok(()) => log::info!("Capture input '{input}' ended"),
                        Err(e) => log::warn!("Capture of '{input}' failed: {e}"),
                    }
                })?
        };

        let opened = ready_rx
            .recv()
            .unwrap_or_else(|_| Err("capture thread exited before opening input".to_string()));
        if let Err(message) = opened {
            let _ = handle.join();
            return Err(format!("Cannot open '{input}': {message}").into());
        }

        Ok(Self {
            latest,
            stop,
            handle: Some(handle),
        })
    }
}

impl FrameSource for FfmpegCaptureSource {
    fn is_frame_ready(&self) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn current_frame(&self) -> Result<Frame, Box<dyn std::error::Error>> {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(latest.clone().ok_or("no frame captured yet")?)
    }
}

impl Drop for FfmpegCaptureSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Capture thread panicked");
            }
        }
    }
}

/// Demuxer, decoder and RGB converter for one input. Lives entirely on
/// the capture thread.
struct CaptureStream {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    stream_index: usize,
    frame_interval: Option<Duration>,
}

impl CaptureStream {
    fn open(input: &str) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        ffmpeg_next::device::register_all();

        let ictx = ffmpeg_next::format::input(&input)?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        // Devices and streams deliver in real time on their own.
        let frame_interval = (Path::new(input).is_file() && fps > 0.0)
            .then(|| Duration::from_secs_f64(1.0 / fps));

        let scaler = scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg_next::format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            scaling::Flags::BILINEAR,
        )?;

        log::info!(
            "Opened '{input}': {}x{} @ {fps:.1} fps",
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            frame_interval,
        })
    }

    /// Decodes until the input ends or `stop` is set.
    fn run(
        mut self,
        latest: &Mutex<Option<Frame>>,
        stop: &AtomicBool,
    ) -> Result<(), ffmpeg_next::Error> {
        let mut publisher = FramePublisher {
            latest,
            width: self.decoder.width(),
            height: self.decoder.height(),
            sequence: 0,
            frame_interval: self.frame_interval,
            next_due: Instant::now(),
        };

        for (stream, packet) in self.ictx.packets() {
            if stop.load(Ordering::Relaxed) {
                return Ok(());
            }
            if stream.index() != self.stream_index {
                continue;
            }
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable packet: {e}");
                continue;
            }
            publisher.drain(&mut self.decoder, &mut self.scaler, stop)?;
        }

        if stop.load(Ordering::Relaxed) {
            return Ok(());
        }
        self.decoder.send_eof()?;
        publisher.drain(&mut self.decoder, &mut self.scaler, stop)
    }
}

struct FramePublisher<'a> {
    latest: &'a Mutex<Option<Frame>>,
    width: u32,
    height: u32,
    sequence: u64,
    frame_interval: Option<Duration>,
    next_due: Instant,
}

impl FramePublisher<'_> {
    fn drain(
        &mut self,
        decoder: &mut ffmpeg_next::decoder::Video,
        scaler: &mut scaling::Context,
        stop: &AtomicBool,
    ) -> Result<(), ffmpeg_next::Error> {
        let mut decoded = Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            if stop.load(Ordering::Relaxed) {
                return Ok(());
            }
            let mut rgb = Video::empty();
            scaler.run(&decoded, &mut rgb)?;
            let frame = Frame::new(
                extract_rgb_pixels(&rgb, self.width, self.height),
                self.width,
                self.height,
                3,
                self.sequence,
            );
            self.sequence += 1;
            *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
            self.pace();
        }
        Ok(())
    }

    /// Sleeps until the next frame is due. Falls back to "now" when
    /// decoding has fallen more than one frame behind.
    fn pace(&mut self) {
        let Some(interval) = self.frame_interval else {
            return;
        };
        self.next_due += interval;
        let now = Instant::now();
        if self.next_due > now {
            std::thread::sleep(self.next_due - now);
        } else if now - self.next_due > interval {
            self.next_due = now;
        }
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping per-row stride padding.
fn extract_rgb_pixels(rgb_frame: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
