use anyhow::{bail, Context, Result};
use dualcam::library::{DirectoryLibrary, PhotoLibrary};
use dualcam::permissions::SystemAccess;
use dualcam::registry::DeviceRegistry;
use dualcam::testing::{SimulatedBackend, StaticAccess};
use dualcam::{CaptureBackend, DualCamApp, DualCamConfig, NokhwaBackend};
use std::env;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

const USAGE: &str = "Usage: dualcam <command> [args]

Commands:
  run [--count N] [--no-capture] [--simulate] [--config PATH] [--output DIR]
  interactive [--no-capture] [--simulate] [--config PATH] [--output DIR]
  list-devices [--json] [--simulate]
  config show|init [PATH]";

#[tokio::main]
async fn main() -> Result<()> {
    dualcam::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "run" => cmd_run(&args).await,
        "interactive" => cmd_interactive(&args).await,
        "list-devices" => cmd_list_devices(&args),
        "config" => cmd_config(&args),
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    }
}

/// Options shared by `run` and `interactive`.
struct SessionOptions {
    config: DualCamConfig,
    count: Option<usize>,
    simulate: bool,
}

fn parse_session_options(args: &[String]) -> Result<SessionOptions> {
    let mut config_path: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut count = None;
    let mut no_capture = false;
    let mut simulate = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--count" => {
                i += 1;
                let value = args.get(i).context("--count needs a value")?;
                count = Some(
                    value
                        .parse::<usize>()
                        .with_context(|| format!("invalid --count value: {}", value))?,
                );
            }
            "--config" => {
                i += 1;
                config_path = Some(args.get(i).context("--config needs a path")?.into());
            }
            "--output" => {
                i += 1;
                output = Some(args.get(i).context("--output needs a directory")?.into());
            }
            "--no-capture" => no_capture = true,
            "--simulate" => simulate = true,
            other => bail!("Unknown option: {}", other),
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => DualCamConfig::load_from_file(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => DualCamConfig::load_or_default(),
    };
    if let Some(dir) = output {
        config.storage.output_directory = dir;
    }
    if no_capture {
        config.sequence.capture_enabled = false;
    }

    Ok(SessionOptions {
        config,
        count,
        simulate,
    })
}

fn setup_ctrlc_handler() {
    let result = ctrlc::set_handler(move || {
        if CTRLC_RECEIVED.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!("\nReceived Ctrl+C, finishing queued switches (press again to abort)...");
    });
    if let Err(e) = result {
        log::warn!("Could not install Ctrl+C handler: {}", e);
    }
}

async fn cmd_run(args: &[String]) -> Result<()> {
    let options = parse_session_options(args)?;
    setup_ctrlc_handler();
    let count = options
        .count
        .unwrap_or(options.config.sequence.default_repeat_count);

    if options.simulate {
        run_sequence(&launch_simulated(options.config).await?, count)
    } else {
        run_sequence(&launch_native(options.config).await?, count)
    }
}

async fn cmd_interactive(args: &[String]) -> Result<()> {
    let options = parse_session_options(args)?;
    setup_ctrlc_handler();

    if options.simulate {
        interactive_loop(&launch_simulated(options.config).await?)
    } else {
        interactive_loop(&launch_native(options.config).await?)
    }
}

fn library_for(config: &DualCamConfig) -> Arc<dyn PhotoLibrary> {
    Arc::new(DirectoryLibrary::new(
        config.storage.output_directory.clone(),
        config.storage.file_prefix.clone(),
    ))
}

async fn launch_simulated(config: DualCamConfig) -> Result<DualCamApp<SimulatedBackend>> {
    let library = library_for(&config);
    DualCamApp::launch(config, Arc::new(StaticAccess::granted()), library, || {
        Ok(SimulatedBackend::phone())
    })
    .await
    .context("failed to start simulated camera session")
}

async fn launch_native(config: DualCamConfig) -> Result<DualCamApp<NokhwaBackend>> {
    let library = library_for(&config);
    DualCamApp::launch(config, Arc::new(SystemAccess), library, || {
        Ok(NokhwaBackend::new())
    })
    .await
    .context("failed to start camera session")
}

fn run_sequence<B: CaptureBackend + 'static>(app: &DualCamApp<B>, count: usize) -> Result<()> {
    if !app.is_ready() {
        print_log(app);
        bail!("camera pipeline unavailable");
    }

    let plan = app.capture_pressed(&count.to_string());
    println!(
        "Queued {} switch units ({} round trips), capture {}",
        plan.units,
        plan.repeat_count,
        if app.capture_enabled() { "on" } else { "off" }
    );
    app.wait_idle();

    print_log(app);
    print_status(app);
    Ok(())
}

fn interactive_loop<B: CaptureBackend + 'static>(app: &DualCamApp<B>) -> Result<()> {
    println!("Commands: capture N | toggle on|off | clear | log | status | wait | quit");
    print_status(app);

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        if CTRLC_RECEIVED.load(Ordering::SeqCst) {
            break;
        }
        let line = line.context("failed to read stdin")?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let rest = words.collect::<Vec<_>>().join(" ");

        match command {
            "capture" => {
                if !app.repeat_input_changed(&rest) {
                    println!("Enter a repeat count first");
                    continue;
                }
                let plan = app.capture_pressed(&rest);
                println!("Queued {} switch units", plan.units);
            }
            "toggle" => match rest.as_str() {
                "on" => app.set_capture_enabled(true),
                "off" => app.set_capture_enabled(false),
                _ => println!("Usage: toggle on|off"),
            },
            "clear" => app.clear_log(),
            "log" => print_log(app),
            "status" => print_status(app),
            "wait" => app.wait_idle(),
            "quit" | "exit" => break,
            other => println!("Unknown command: {}", other),
        }
    }

    app.wait_idle();
    Ok(())
}

fn print_log<B: CaptureBackend + 'static>(app: &DualCamApp<B>) {
    for line in app.log_lines() {
        println!("{}", line);
    }
}

fn print_status<B: CaptureBackend + 'static>(app: &DualCamApp<B>) {
    let stats = app.stats();
    println!(
        "camera: {}  capture: {}  processed: {}  saved: {}  failed: {}  dropped: {}",
        app.active_role(),
        if app.capture_enabled() { "on" } else { "off" },
        stats.processed,
        stats.saved,
        stats.failed,
        stats.dropped
    );
}

fn cmd_list_devices(args: &[String]) -> Result<()> {
    let json = args.contains(&"--json".to_string());
    if args.contains(&"--simulate".to_string()) {
        list_devices(&mut SimulatedBackend::phone(), json)
    } else {
        list_devices(&mut NokhwaBackend::new(), json)
    }
}

fn list_devices<B: CaptureBackend>(backend: &mut B, json: bool) -> Result<()> {
    let config = DualCamConfig::load_or_default();
    let registry = DeviceRegistry::new(config.camera.device_types);
    let devices = backend.devices().context("failed to enumerate cameras")?;

    if json {
        println!("{}", serde_json::to_string(&devices)?);
        return Ok(());
    }

    for d in &devices {
        println!("{}", d);
    }
    for role in dualcam::CameraRole::ALL {
        match registry.resolve_device(&devices, role) {
            Ok(input) => println!("{} camera: {}", role, input.device().name),
            Err(e) => println!("{}", e),
        }
    }
    Ok(())
}

fn cmd_config(args: &[String]) -> Result<()> {
    let path = args
        .get(3)
        .map(PathBuf::from)
        .unwrap_or_else(DualCamConfig::default_path);

    match args.get(2).map(String::as_str) {
        Some("show") => {
            let config = if path.exists() {
                DualCamConfig::load_from_file(&path)?
            } else {
                DualCamConfig::default()
            };
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Some("init") => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            DualCamConfig::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
        _ => {
            eprintln!("Usage: dualcam config show|init [PATH]");
            std::process::exit(1);
        }
    }
}
