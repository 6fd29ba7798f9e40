//! Command-line entry point: one hint mode session against an X11 window.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use keyhint::config::{ConfigError, DEFAULT_ALPHABET, DEFAULT_TEXT_SIZE, HintConfig};
use keyhint::engine::{self, HintModeController, Outcome, SessionError, SessionTarget, TargetWindow};
use keyhint::provider::{
    AppHandle, DryRunPointer, EventLogger, FileHintSource, JsonlEventLogger, LogOverlayRenderer,
    PointerDriver, ProviderSet, TracingEventLogger, WindowHandle,
};
use keyhint::x11::{X11Context, X11Error, X11KeyboardSource, XFixesCursor, XTestPointer};

#[derive(Parser)]
#[command(name = "keyhint", version, about = "Click on-screen targets by typing their hint labels")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show hints and wait for the user to pick one.
    Run(RunArgs),

    /// List displays and the one an overlay would use.
    Screens {
        /// Target window XID (decimal or 0x-hex). Defaults to the active window.
        #[arg(long, value_parser = parse_xid)]
        window: Option<u32>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// JSON file of labelled targets.
    #[arg(long)]
    hints: PathBuf,

    /// Target window XID (decimal or 0x-hex). Defaults to the active window.
    #[arg(long, value_parser = parse_xid, conflicts_with = "no_window")]
    window: Option<u32>,

    /// Do not target any window; the overlay goes on the primary display.
    #[arg(long)]
    no_window: bool,

    /// Characters hint labels are drawn from.
    #[arg(long, env = "KEYHINT_ALPHABET", default_value = DEFAULT_ALPHABET)]
    alphabet: String,

    /// Overlay label text size.
    #[arg(long, env = "KEYHINT_TEXT_SIZE", default_value_t = DEFAULT_TEXT_SIZE)]
    text_size: f32,

    /// Log pointer actions instead of performing them.
    #[arg(long)]
    dry_run: bool,

    /// Append session events as JSON lines to this file.
    #[arg(long)]
    events_log: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    X11(#[from] X11Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

fn parse_xid(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid window id {s:?}: {e}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    keyhint::logging::init(cli.verbose);

    let result = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Screens { window } => screens(window),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "keyhint failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: RunArgs) -> Result<ExitCode, CliError> {
    let config = HintConfig::new(args.alphabet, args.text_size)?;
    let ctx = Arc::new(X11Context::connect()?);

    let window = if args.no_window {
        None
    } else {
        match args.window {
            Some(window) => Some(window),
            None => ctx.active_window()?,
        }
    };
    let target = session_target(&ctx, window)?;
    let displays = ctx.displays()?;

    let (telemetry, event_writer) = match args.events_log {
        Some(path) => {
            let (logger, handle) = JsonlEventLogger::open(path);
            (Arc::new(logger) as Arc<dyn EventLogger>, Some(handle))
        }
        None => (Arc::new(TracingEventLogger) as Arc<dyn EventLogger>, None),
    };

    let pointer: Arc<dyn PointerDriver> = if args.dry_run {
        Arc::new(DryRunPointer)
    } else {
        Arc::new(XTestPointer::new(&ctx)?)
    };

    let providers = ProviderSet {
        hints: Arc::new(FileHintSource::new(args.hints)),
        overlay: Arc::new(LogOverlayRenderer),
        input: Arc::new(X11KeyboardSource::new(ctx.clone())),
        pointer,
        cursor: Arc::new(XFixesCursor::new(&ctx)?),
        telemetry,
    };

    let controller = HintModeController::new(providers, config)?;
    let Some(session) = controller.start_session(target, displays) else {
        error!("hint mode already active");
        return Ok(ExitCode::FAILURE);
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    let outcome = engine::driver::run(session, shutdown).await;

    // Last handle on the event logger; the writer drains once it is gone.
    drop(controller);
    if let Some(writer) = event_writer {
        if let Err(e) = writer.await {
            error!(error = %e, "event log writer failed");
        }
    }

    let outcome = outcome?;
    info!(?outcome, "hint mode finished");

    Ok(match outcome {
        Outcome::Resolved { .. }
        | Outcome::Exited
        | Outcome::Cancelled
        | Outcome::Deadend { .. } => ExitCode::SUCCESS,
        Outcome::QueryFailed(_) | Outcome::InputUnavailable(_) | Outcome::NoDisplay => {
            ExitCode::FAILURE
        }
    })
}

fn session_target(ctx: &X11Context, window: Option<u32>) -> Result<SessionTarget, X11Error> {
    let Some(window) = window else {
        // No window, no owning client: PID 0 stands for "unknown".
        return Ok(SessionTarget {
            app: AppHandle(0),
            window: None,
        });
    };

    let frame = ctx.window_frame(window)?;
    let pid = ctx.window_pid(window)?.unwrap_or(0);
    Ok(SessionTarget {
        app: AppHandle(pid),
        window: Some(TargetWindow {
            handle: WindowHandle(window),
            frame,
        }),
    })
}

fn screens(window: Option<u32>) -> Result<ExitCode, CliError> {
    let ctx = X11Context::connect()?;
    let displays = ctx.displays()?;

    let window = match window {
        Some(window) => Some(window),
        None => ctx.active_window()?,
    };
    let frame = window.map(|w| ctx.window_frame(w)).transpose()?;
    let selected = engine::select_display(frame, &displays);

    for (i, display) in displays.iter().enumerate() {
        let f = display.frame;
        println!(
            "{i}: {}x{}+{}+{}{}{}",
            f.width,
            f.height,
            f.x,
            f.y,
            if display.primary { " primary" } else { "" },
            if Some(f) == selected { " *" } else { "" },
        );
    }
    if let (Some(window), Some(frame)) = (window, frame) {
        println!(
            "window 0x{window:x}: {}x{}+{}+{}",
            frame.width, frame.height, frame.x, frame.y
        );
    }

    Ok(ExitCode::SUCCESS)
}
