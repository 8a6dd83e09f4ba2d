mod commands;
mod config;

use std::io::BufRead;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use facewatch_core::capture::domain::frame_source::FrameSource;
use facewatch_core::capture::infrastructure::ffmpeg_capture_source::FfmpegCaptureSource;
use facewatch_core::detection::infrastructure::onnx_yolo_locator::OnnxYoloLocator;
use facewatch_core::pipeline::detect_faces_use_case::DetectFacesUseCase;
use facewatch_core::pipeline::detection_loop::{DetectionLoop, LoopState};
use facewatch_core::pipeline::infrastructure::threaded_tick_scheduler::ThreadedTickScheduler;
use facewatch_core::pipeline::register_face_use_case::RegisterFaceUseCase;
use facewatch_core::presentation::domain::detection_sink::DetectionSink;
use facewatch_core::presentation::infrastructure::json_lines_sink::JsonLinesSink;
use facewatch_core::presentation::infrastructure::log_sink::LogSink;
use facewatch_core::recognition::domain::face_analyzer::FaceAnalyzer;
use facewatch_core::recognition::domain::recognition_state::RecognitionState;
use facewatch_core::recognition::infrastructure::arcface_embedder::ArcFaceEmbedder;
use facewatch_core::recognition::infrastructure::composite_face_analyzer::CompositeFaceAnalyzer;
use facewatch_core::recognition::infrastructure::genderage_estimator::GenderAgeEstimator;
use facewatch_core::recognition::infrastructure::reference_loader::load_reference_faces;
use facewatch_core::shared::constants::{
    EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use facewatch_core::shared::model_resolver::{self, ProgressFn};

use commands::Command;
use config::{Config, OutputFormat};

/// Live face detection with on-the-fly identity registration.
///
/// Reads commands from stdin while running (type `help`).
#[derive(Parser)]
#[command(name = "facewatch")]
struct Cli {
    /// Video source: capture device (e.g. /dev/video0), file, or stream URL.
    input: String,

    /// Config file (defaults to the user config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum embedding distance counted as a match.
    #[arg(long)]
    threshold: Option<f64>,

    /// Milliseconds between detection ticks.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Directory of reference faces laid out as <dir>/<name>/<image>.
    #[arg(long)]
    known_faces: Option<PathBuf>,

    /// Gender/age ONNX model; attributes are skipped without one.
    #[arg(long)]
    attribute_model: Option<PathBuf>,

    /// Detect only, without identity matching or registration.
    #[arg(long)]
    no_recognition: bool,

    /// Where detection results go.
    #[arg(long, value_enum)]
    output: Option<OutputFormat>,

    /// Start with detection stopped.
    #[arg(long)]
    paused: bool,

    /// Write the effective settings back to the config file.
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    fn apply_to(&self, config: &mut Config) {
        if let Some(threshold) = self.threshold {
            config.match_threshold = threshold;
        }
        if let Some(interval) = self.interval_ms {
            config.poll_interval_ms = interval;
        }
        if let Some(confidence) = self.confidence {
            config.detection_confidence = confidence;
        }
        if let Some(dir) = &self.known_faces {
            config.known_faces_dir = Some(dir.clone());
        }
        if let Some(model) = &self.attribute_model {
            config.attribute_model = Some(model.clone());
        }
        if self.no_recognition {
            config.recognition = false;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().or_else(Config::default_path);
    let mut config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    cli.apply_to(&mut config);
    config.validate()?;
    if cli.save_config {
        let path = config_path.ok_or("No config directory available")?;
        config.save(&path)?;
        log::info!("Saved settings to {}", path.display());
    }

    let analyzer = build_analyzer(&config)?;
    let recognition = if config.recognition {
        Some(Arc::new(build_recognition(&config, analyzer.as_ref())?))
    } else {
        None
    };

    let source: Arc<dyn FrameSource> = Arc::new(FfmpegCaptureSource::open(&cli.input)?);
    let sink: Box<dyn DetectionSink> = match config.output {
        OutputFormat::Json => Box::new(JsonLinesSink::new(std::io::stdout())),
        OutputFormat::Log => Box::new(LogSink::new()),
    };

    let use_case =
        DetectFacesUseCase::new(source.clone(), analyzer.clone(), sink, recognition.clone());
    let detection = DetectionLoop::new(
        use_case,
        Box::new(ThreadedTickScheduler::new()),
        Duration::from_millis(config.poll_interval_ms),
    );

    let mut session = Session {
        detection,
        registration: recognition
            .clone()
            .map(|state| RegisterFaceUseCase::new(analyzer.clone(), state)),
        recognition,
        source,
    };
    if !cli.paused {
        session.detection.start()?;
    }
    session.run_commands(std::io::stdin().lock())
}

fn build_analyzer(config: &Config) -> Result<Arc<dyn FaceAnalyzer>, Box<dyn std::error::Error>> {
    let locator_path = resolve_model(YOLO_MODEL_NAME, YOLO_MODEL_URL, "face detection")?;
    let mut analyzer = CompositeFaceAnalyzer::new(Arc::new(OnnxYoloLocator::new(
        &locator_path,
        config.detection_confidence,
    )?));

    if config.recognition {
        let embedder_path =
            resolve_model(EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, "face recognition")?;
        analyzer = analyzer.with_embedder(Arc::new(ArcFaceEmbedder::new(&embedder_path)?));
    }
    if let Some(model) = &config.attribute_model {
        log::info!("Loading attribute model: {}", model.display());
        analyzer = analyzer.with_estimator(Arc::new(GenderAgeEstimator::new(model)?));
    }
    Ok(Arc::new(analyzer))
}

fn build_recognition(
    config: &Config,
    analyzer: &dyn FaceAnalyzer,
) -> Result<RecognitionState, Box<dyn std::error::Error>> {
    let state = RecognitionState::new(config.match_threshold);
    if let Some(dir) = &config.known_faces_dir {
        let references = load_reference_faces(dir, analyzer)?;
        let count = state.register_all(references)?;
        log::info!(
            "Loaded {count} reference embedding(s) for {} identities from {}",
            state.identities().len(),
            dir.display()
        );
    }
    Ok(state)
}

fn resolve_model(
    name: &str,
    url: &str,
    label: &'static str,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {name}");
    let path = model_resolver::resolve(name, url, None, Some(download_progress(label)))?;
    Ok(path)
}

fn download_progress(label: &'static str) -> ProgressFn {
    Box::new(move |downloaded, total| {
        if total > 0 {
            let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
            eprint!("\rDownloading {label} model... {pct}%");
            if downloaded >= total {
                eprintln!();
            }
        } else {
            eprint!("\rDownloading {label} model... {downloaded} bytes");
        }
    })
}

/// Running state driven by stdin commands.
struct Session {
    detection: DetectionLoop,
    registration: Option<RegisterFaceUseCase>,
    recognition: Option<Arc<RecognitionState>>,
    source: Arc<dyn FrameSource>,
}

impl Session {
    fn run_commands(&mut self, input: impl BufRead) -> Result<(), Box<dyn std::error::Error>> {
        eprintln!("Type 'help' for commands.");
        for line in input.lines() {
            match commands::parse(&line?) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => self.handle(command),
                Ok(None) => {}
                Err(e) => eprintln!("{e}"),
            }
        }
        self.detection.stop();
        Ok(())
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start => match self.detection.start() {
                Ok(()) => eprintln!("Detection running"),
                Err(e) => eprintln!("Cannot start detection: {e}"),
            },
            Command::Stop => {
                self.detection.stop();
                eprintln!("Detection stopped");
            }
            Command::Toggle => match self.detection.toggle() {
                Ok(LoopState::Running) => eprintln!("Detection running"),
                Ok(LoopState::Stopped) => eprintln!("Detection stopped"),
                Err(e) => eprintln!("Cannot start detection: {e}"),
            },
            Command::Register(name) => self.register(&name),
            Command::List => self.list(),
            Command::Help => eprintln!("{}", commands::HELP),
            Command::Quit => {}
        }
    }

    fn register(&self, name: &str) {
        let Some(registration) = &self.registration else {
            eprintln!("Recognition is disabled; nothing to register");
            return;
        };
        match registration.capture_and_register(name, self.source.as_ref()) {
            Ok(registered) => eprintln!(
                "Registered '{}' ({} reference(s))",
                registered.name, registered.reference_count
            ),
            Err(e) => eprintln!("Registration failed: {e}"),
        }
    }

    fn list(&self) {
        let Some(recognition) = &self.recognition else {
            eprintln!("Recognition is disabled");
            return;
        };
        let identities = recognition.identities();
        if identities.is_empty() {
            eprintln!("No registered identities");
        }
        for (name, count) in identities {
            eprintln!("  {name} ({count})");
        }
    }
}
