//! VinaVoice Audio Player (vinavoice-ap) - Main entry point
//!
//! Loads a synthesized speech payload (base64 16-bit PCM) and plays it with
//! terminal transport controls. Commands arrive on stdin, one per line;
//! progress is rendered once per display frame while playing.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vinavoice_ap::audio::{
    read_speech_payload, DeviceContext, OutputContext, PlayableBuffer, VirtualClock,
    VirtualContext,
};
use vinavoice_ap::config::{ConfigOverrides, OutputKind, PlayerConfig};
use vinavoice_ap::playback::{FrameClock, PlaybackController, TickOutcome, TransportCommand};
use vinavoice_common::human_time::{format_clock, format_progress};
use vinavoice_common::{PlayerEvent, PlayerSnapshot};

/// Command-line arguments for vinavoice-ap
#[derive(Parser, Debug)]
#[command(name = "vinavoice-ap")]
#[command(about = "Speech playback with play/pause/restart/mute controls")]
#[command(version)]
struct Args {
    /// Base64 PCM payload file ("-" reads stdin)
    payload: Option<PathBuf>,

    /// Configuration file (overrides VINAVOICE_CONFIG and the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output device name
    #[arg(short, long, env = "VINAVOICE_DEVICE")]
    device: Option<String>,

    /// Play through a silent virtual output instead of an audio device
    #[arg(long)]
    null_output: bool,

    /// Payload sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Progress updates per second while playing
    #[arg(long)]
    frame_rate: Option<u32>,

    /// Start playing as soon as a payload is loaded
    #[arg(long)]
    autoplay: bool,

    /// Print player events as JSON lines
    #[arg(long)]
    json: bool,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            device_name: self.device.clone(),
            null_output: self.null_output,
            sample_rate: self.sample_rate,
            frame_rate_hz: self.frame_rate,
            autoplay: self.autoplay,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let config = PlayerConfig::load(args.config.as_deref(), args.overrides())
        .context("Failed to load configuration")?;

    // Initialize tracing (stderr, so stdout stays clean for the display)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("vinavoice_ap={}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting VinaVoice Audio Player (vinavoice-ap) v{} [{}] ({})",
        env!("CARGO_PKG_VERSION"),
        vinavoice_ap::GIT_HASH,
        vinavoice_ap::BUILD_PROFILE
    );

    if args.list_devices {
        for name in DeviceContext::list_devices().context("Failed to list audio devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let initial = match &args.payload {
        Some(path) => Some(load_payload(path, &config)?),
        None => None,
    };
    let payload_from_stdin = args.payload.as_deref() == Some(Path::new("-"));

    let session = Session {
        config: &config,
        json: args.json,
        commands_enabled: !payload_from_stdin,
    };

    match config.output {
        OutputKind::Device => {
            let context = DeviceContext::open(config.device_name.as_deref(), config.sample_rate)
                .context("Failed to open audio output (use --null-output to play silently)")?;
            info!(
                "Audio output: {} ({}Hz, {} channels)",
                context.device_name(),
                context.sample_rate(),
                context.channels()
            );
            session.run(context, None, initial).await
        }
        OutputKind::Null => {
            info!("Audio output: null (virtual clock)");
            let context = VirtualContext::new();
            let pacer = WallClockPacer::new(context.clock());
            session.run(context, Some(pacer), initial).await
        }
    }
}

/// Read and decode a payload file ("-" for stdin)
fn load_payload(path: &Path, config: &PlayerConfig) -> Result<PlayableBuffer> {
    let buffer = read_speech_payload(path, config.sample_rate, config.channels)
        .with_context(|| format!("Failed to load payload {}", path.display()))?;

    debug!(
        "Decoded {} samples ({:.2}s) from {}",
        buffer.samples().len(),
        buffer.duration_seconds(),
        path.display()
    );
    Ok(buffer)
}

/// Advances a virtual clock by elapsed wall time
struct WallClockPacer {
    clock: VirtualClock,
    last: Instant,
}

impl WallClockPacer {
    fn new(clock: VirtualClock) -> Self {
        Self {
            clock,
            last: Instant::now(),
        }
    }

    fn catch_up(&mut self) {
        let now = Instant::now();
        self.clock.advance(now.duration_since(self.last).as_secs_f64());
        self.last = now;
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Interactive player loop settings
struct Session<'a> {
    config: &'a PlayerConfig,
    json: bool,
    /// False when stdin already carried the payload
    commands_enabled: bool,
}

impl Session<'_> {
    async fn run<C: OutputContext>(
        &self,
        context: C,
        mut pacer: Option<WallClockPacer>,
        initial: Option<PlayableBuffer>,
    ) -> Result<()> {
        let mut player = PlaybackController::new(context);
        let mut events = player.subscribe();

        if let Some(buffer) = initial {
            self.load(&mut player, buffer);
            self.drain_events(&mut events);
        }

        if self.commands_enabled && !self.json {
            println!("{}", TransportCommand::HELP);
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = self.commands_enabled;
        let mut frames = FrameClock::new(self.config.frame_rate_hz);
        let mut was_scheduled = false;

        loop {
            let scheduled = player.is_scheduled();
            if scheduled && !was_scheduled {
                frames.reset();
            }
            was_scheduled = scheduled;

            tokio::select! {
                line = lines.next_line(), if stdin_open => {
                    if let Some(pacer) = pacer.as_mut() {
                        pacer.catch_up();
                    }
                    match line.context("Failed to read command")? {
                        Some(line) if line.trim().is_empty() => {}
                        Some(line) => {
                            if let Flow::Quit = self.handle_line(&mut player, &line) {
                                break;
                            }
                        }
                        None => {
                            debug!("stdin closed");
                            stdin_open = false;
                        }
                    }
                }
                _ = frames.tick(), if scheduled => {
                    if let Some(pacer) = pacer.as_mut() {
                        pacer.catch_up();
                    }
                    if player.tick() == TickOutcome::OutputClosed {
                        error!("Audio output closed during playback");
                    }
                }
                else => break,
            }

            self.drain_events(&mut events);
        }

        player.teardown();
        self.drain_events(&mut events);
        info!("Player shut down");
        Ok(())
    }

    fn handle_line<C: OutputContext>(
        &self,
        player: &mut PlaybackController<C>,
        line: &str,
    ) -> Flow {
        let command = match line.parse::<TransportCommand>() {
            Ok(command) => command,
            Err(e) => {
                warn!("{}", e);
                if !self.json {
                    println!("{}", TransportCommand::HELP);
                }
                return Flow::Continue;
            }
        };

        debug!("Command: {:?}", command);
        let result = match command {
            TransportCommand::Play => player.play(),
            TransportCommand::Pause => {
                player.pause();
                Ok(())
            }
            TransportCommand::Toggle => player.toggle(),
            TransportCommand::Restart => player.restart(),
            TransportCommand::Mute => {
                player.toggle_mute();
                Ok(())
            }
            TransportCommand::Status => {
                self.print_status(&player.snapshot());
                Ok(())
            }
            TransportCommand::Load(path) => {
                match load_payload(&path, self.config) {
                    Ok(buffer) => self.load(player, buffer),
                    Err(e) => error!("{:#}", e),
                }
                Ok(())
            }
            TransportCommand::Quit => return Flow::Quit,
        };

        if let Err(e) = result {
            error!("Playback failed: {}", e);
        }
        Flow::Continue
    }

    fn load<C: OutputContext>(&self, player: &mut PlaybackController<C>, buffer: PlayableBuffer) {
        if let Err(e) = player.load_buffer(buffer) {
            error!("Failed to load audio: {}", e);
            return;
        }
        if self.config.autoplay {
            if let Err(e) = player.play() {
                error!("Autoplay failed: {}", e);
            }
        }
    }

    fn drain_events(&self, events: &mut broadcast::Receiver<PlayerEvent>) {
        loop {
            match events.try_recv() {
                Ok(event) => self.render(&event),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!("Display skipped {} events", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    fn render(&self, event: &PlayerEvent) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize {} event: {}", event.event_type(), e),
            }
            return;
        }

        match event {
            PlayerEvent::BufferLoaded { duration } => {
                println!("loaded {} of audio", format_clock(*duration));
            }
            PlayerEvent::StateChanged { snapshot } => {
                println!(
                    "\r{} {}",
                    snapshot.status,
                    format_progress(snapshot.elapsed, snapshot.duration)
                );
            }
            PlayerEvent::Progress { elapsed, duration } => {
                print!("\r{}", format_progress(*elapsed, *duration));
                let _ = std::io::stdout().flush();
            }
            PlayerEvent::MuteChanged { muted } => {
                println!("\r{}", if *muted { "muted" } else { "unmuted" });
            }
            PlayerEvent::Ended { .. } => {
                println!("\rfinished");
            }
        }
    }

    fn print_status(&self, snapshot: &PlayerSnapshot) {
        if self.json {
            match serde_json::to_string(snapshot) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize status: {}", e),
            }
            return;
        }

        println!(
            "{} {}{}",
            snapshot.status,
            format_progress(snapshot.elapsed, snapshot.duration),
            if snapshot.muted { " [muted]" } else { "" }
        );
    }
}
