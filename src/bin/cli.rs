use anyhow::{Context, Result};
use media_access::{
    AccessError, AccessErrorKind, AccessSnapshot, DeviceClass, MediaAccessConfig,
    MediaAccessManager, MediaError,
};
use std::env;
use std::sync::mpsc;

const USAGE: &str = "Usage: media-access-cli <status|request|hold> [camera|microphone|both] [--json]";

#[tokio::main]
async fn main() -> Result<()> {
    media_access::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    let json = args.iter().any(|a| a == "--json");
    let config = MediaAccessConfig::load_or_default();
    let command = match args[1].as_str() {
        "status" => Command::Status,
        "request" => Command::Request,
        "hold" => Command::Hold,
        other => {
            eprintln!("Unknown command: {}\n{}", other, USAGE);
            std::process::exit(1);
        }
    };
    let manager = MediaAccessManager::native_initialized(&config).await;

    match command {
        Command::Status => cmd_status(&manager, json),
        Command::Request => cmd_request(&manager, &args, json).await,
        Command::Hold => cmd_hold(&manager, &args, json).await,
    }
}

enum Command {
    Status,
    Request,
    Hold,
}

fn cmd_status(manager: &MediaAccessManager, json: bool) -> Result<()> {
    print_snapshot(&manager.snapshot(), json)
}

async fn cmd_request(manager: &MediaAccessManager, args: &[String], json: bool) -> Result<()> {
    let device_class = parse_device_class(args)?;
    let granted = manager.request_access(device_class).await;
    print_snapshot(&manager.snapshot(), json)?;
    manager.stop_session();

    if !granted {
        return Err(access_failure(manager).into());
    }
    Ok(())
}

async fn cmd_hold(manager: &MediaAccessManager, args: &[String], json: bool) -> Result<()> {
    let device_class = parse_device_class(args)?;
    if !manager.request_access(device_class).await {
        print_snapshot(&manager.snapshot(), json)?;
        return Err(access_failure(manager).into());
    }
    print_snapshot(&manager.snapshot(), json)?;

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("Failed to install Ctrl-C handler")?;

    if !json {
        println!("Holding {} session, press Ctrl-C to release", device_class);
    }
    tokio::task::spawn_blocking(move || rx.recv())
        .await
        .context("Ctrl-C wait task failed")?
        .context("Ctrl-C handler dropped")?;

    manager.stop_session();
    print_snapshot(&manager.snapshot(), json)
}

fn parse_device_class(args: &[String]) -> Result<DeviceClass> {
    match args.iter().skip(2).find(|a| !a.starts_with("--")) {
        Some(value) => value
            .parse::<DeviceClass>()
            .map_err(|e| anyhow::anyhow!("{}\n{}", e, USAGE)),
        None => Ok(DeviceClass::Both),
    }
}

fn access_failure(manager: &MediaAccessManager) -> MediaError {
    MediaError::Access(
        manager
            .error()
            .unwrap_or_else(|| AccessError::new(AccessErrorKind::Unknown)),
    )
}

fn print_snapshot(snapshot: &AccessSnapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    println!("camera:     {}", snapshot.camera_permission);
    println!("microphone: {}", snapshot.microphone_permission);
    println!("phase:      {:?}", snapshot.phase);
    match &snapshot.stream {
        Some(stream) => {
            println!("stream:     {} (opened {})", stream.id, stream.created_at);
            for track in &stream.tracks {
                println!(
                    "  {} '{}' live={} enabled={}",
                    track.capability, track.label, track.live, track.enabled
                );
            }
        }
        None => println!("stream:     none"),
    }
    if !snapshot.error_message.is_empty() {
        println!("error:      {}", snapshot.error_message);
    }
    Ok(())
}
