//! Reference control surface for the engine
//!
//! A stdin-driven command loop standing in for the graphical sliders and
//! checkboxes: start/stop the stream, toggle monitoring, and adjust effect
//! parameters while the engine runs. Device binding comes from an optional
//! JSON config file passed as the first argument.
//!
//! Run with `RUST_LOG=info` to see stream lifecycle logging.

use std::io::{self, BufRead, Write};

use trashmic::{list_input_devices, list_output_devices, AudioEngine, EngineConfig};

const HELP: &str = "\
commands:
  start | stop            open / close the streams
  monitor on|off          toggle the monitoring stream
  gain <x> | gain on|off  gain multiplier / enable
  rate <hz> | rate on|off downsample target rate / enable
  depth <n> | depth on|off  bit depth / enable
  static <0..1> | static on|off  static intensity / enable
  status                  engine and parameter state
  devices                 list audio devices
  quit";

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(flag) if flag == "--list-devices" => {
            print_devices();
            return;
        }
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(message) => {
                eprintln!("failed to load config '{path}': {message}");
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let mut engine = AudioEngine::new(config);
    let handle = engine.handle();

    println!("trashmic — type 'start' to open the stream, 'help' for commands");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };

        // A stream may have died since the last command
        if let Some(error) = engine.take_error() {
            eprintln!("stream failed, engine stopped: {error}");
        }

        let mut words = line.split_whitespace();
        let command = match words.next() {
            Some(word) => word,
            None => continue,
        };
        let argument = words.next();

        match (command, argument) {
            ("help", _) => println!("{HELP}"),
            ("start", _) => match engine.start() {
                Ok(()) => println!("stream running"),
                Err(error) => eprintln!("start failed: {error}"),
            },
            ("stop", _) => {
                engine.stop();
                println!("stream stopped");
            }
            ("monitor", Some("on")) => match engine.enable_monitoring() {
                Ok(()) => println!("monitoring on"),
                Err(error) => eprintln!("monitoring failed: {error}"),
            },
            ("monitor", Some("off")) => {
                engine.disable_monitoring();
                println!("monitoring off");
            }
            ("gain", Some("on")) => handle.params().set_gain_enabled(true),
            ("gain", Some("off")) => handle.params().set_gain_enabled(false),
            ("gain", Some(value)) => match value.parse::<f32>() {
                Ok(gain) => handle.params().set_gain(gain),
                Err(_) => eprintln!("not a number: {value}"),
            },
            ("rate", Some("on")) => handle.params().set_downsample_enabled(true),
            ("rate", Some("off")) => handle.params().set_downsample_enabled(false),
            ("rate", Some(value)) => match value.parse::<u32>() {
                Ok(rate) => handle.params().set_downsample_rate(rate),
                Err(_) => eprintln!("not a rate: {value}"),
            },
            ("depth", Some("on")) => handle.params().set_bit_depth_enabled(true),
            ("depth", Some("off")) => handle.params().set_bit_depth_enabled(false),
            ("depth", Some(value)) => match value.parse::<u32>() {
                Ok(depth) => handle.params().set_bit_depth(depth),
                Err(_) => eprintln!("not a bit depth: {value}"),
            },
            ("static", Some("on")) => handle.params().set_static_enabled(true),
            ("static", Some("off")) => handle.params().set_static_enabled(false),
            ("static", Some(value)) => match value.parse::<f32>() {
                Ok(intensity) => handle.params().set_static_intensity(intensity),
                Err(_) => eprintln!("not an intensity: {value}"),
            },
            ("status", _) => {
                println!("state: {:?}", engine.state());
                println!("monitoring: {}", engine.is_monitoring());
                println!("talking: {}", handle.is_talking());
                println!("underruns: {}", handle.monitor_underruns());
                println!("params: {:?}", handle.params().snapshot());
            }
            ("devices", _) => print_devices(),
            ("quit", _) | ("exit", _) => break,
            _ => println!("unknown command, try 'help'"),
        }
        io::stdout().flush().ok();
    }

    engine.stop();
}

fn load_config(path: &str) -> Result<EngineConfig, String> {
    let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&contents).map_err(|e| e.to_string())
}

fn print_devices() {
    match list_input_devices() {
        Ok(devices) => {
            println!("input devices:");
            for device in devices {
                let marker = if device.is_default { " (default)" } else { "" };
                println!("  {}{}", device.name, marker);
            }
        }
        Err(error) => eprintln!("input enumeration failed: {error}"),
    }
    match list_output_devices() {
        Ok(devices) => {
            println!("output devices:");
            for device in devices {
                let marker = if device.is_default { " (default)" } else { "" };
                println!("  {}{}", device.name, marker);
            }
        }
        Err(error) => eprintln!("output enumeration failed: {error}"),
    }
}
