/*!
```text
clc -l [--json]                      list platforms and devices
clc [-p ID] [-o OPTS] [--out-dir DIR] PATH
                                     build PATH, write <base>.hpp and <base>.cpp
```
`--mock` runs against the in-process mock provider instead of the native one.
*/

mod artifact;

use anyhow::{bail, format_err, Context as _, Result};
use artifact::Artifacts;
use clap::Parser;
use clhost::{
    context::Context,
    device::{Device, DEVICE_PROPERTIES},
    error::Error,
    platform::{Platform, PLATFORM_PROPERTIES},
    program::Program,
    provider::mock::MockProvider,
    query::{InfoSource, Property, PropertyValue},
    runtime::Runtime,
    types::DeviceType,
};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "clc", version)]
#[command(about = "Lists compute platforms and builds kernel sources into embeddable C++ sources")]
struct Cli {
    /// List platforms and devices with all of their properties.
    #[arg(short, long)]
    list: bool,
    /// With --list, print JSON.
    #[arg(long, requires = "list")]
    json: bool,
    /// Platform index to build on.
    #[arg(short, long, env = "CLC_PLATFORM", default_value_t = 0)]
    platform: usize,
    /// Build options, passed to the compiler verbatim.
    #[arg(short = 'o', long, default_value = "", allow_hyphen_values = true)]
    options: String,
    /// Directory for the generated files.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Use the mock provider.
    #[arg(long)]
    mock: bool,
    /// Kernel source file.
    #[arg(required_unless_present = "list")]
    path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let runtime = if cli.mock {
        Runtime::new(Arc::new(MockProvider::default()))
    } else {
        Runtime::builder()
            .build()
            .context("no native provider, enable the \"opencl\" feature or pass --mock")?
    };
    tracing::debug!("using provider {:?}", runtime.provider().name());
    if cli.list {
        list(&runtime, cli.json)
    } else {
        let path = cli.path.ok_or_else(|| format_err!("no PATH provided"))?;
        build(&runtime, cli.platform, &cli.options, &path, &cli.out_dir)
    }
}

#[derive(Serialize)]
struct Field {
    name: &'static str,
    id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<PropertyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Reads every property of `table`. A property that fails is kept with its error.
fn fields<S: InfoSource + ?Sized>(table: &'static [Property], source: &S) -> Vec<Field> {
    table
        .iter()
        .map(|property| {
            let (value, error) = match property.read(source) {
                Ok(value) => (Some(value), None),
                Err(e) => (None, Some(e.to_string())),
            };
            Field {
                name: property.name,
                id: property.id,
                value,
                error,
            }
        })
        .collect()
}

#[derive(Serialize)]
struct PlatformRecord {
    index: usize,
    properties: Vec<Field>,
    devices: Vec<Vec<Field>>,
}

fn list(runtime: &Runtime, json: bool) -> Result<()> {
    let records = runtime
        .platforms()?
        .iter()
        .enumerate()
        .map(|(index, platform)| {
            let devices = platform
                .devices(DeviceType::ALL)?
                .iter()
                .map(|device| fields(DEVICE_PROPERTIES, device))
                .collect();
            Ok(PlatformRecord {
                index,
                properties: fields(PLATFORM_PROPERTIES, platform),
                devices,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    println!("available platforms:");
    for record in records.iter() {
        let name = record
            .properties
            .iter()
            .find(|x| x.name == "name")
            .and_then(|x| x.value.as_ref())
            .map(ToString::to_string)
            .unwrap_or_default();
        println!("{}: {name}", record.index);
        print_fields(&record.properties, 1);
        for (index, device) in record.devices.iter().enumerate() {
            println!("\tdevice {index}:");
            print_fields(device, 2);
        }
    }
    Ok(())
}

fn print_fields(fields: &[Field], indent: usize) {
    let tabs = "\t".repeat(indent);
    for field in fields {
        match (&field.value, &field.error) {
            (Some(value), _) => println!("{tabs}{}: {value}", field.name),
            (None, Some(error)) => println!("{tabs}{}: <{error}>", field.name),
            (None, None) => println!("{tabs}{}:", field.name),
        }
    }
}

fn build(
    runtime: &Runtime,
    index: usize,
    options: &str,
    path: &Path,
    out_dir: &Path,
) -> Result<()> {
    let platform: &Platform = runtime.platform(index)?;
    println!("building on platform {index}: {}", platform.name()?);
    let devices = platform.devices(DeviceType::ALL)?;
    if devices.is_empty() {
        bail!("platform {index} has no devices");
    }
    println!("building for the following devices:");
    for (i, device) in devices.iter().enumerate() {
        println!(
            "{i}: {}, driver version: {}",
            device.name()?,
            device.driver_version()?
        );
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    let context = Context::new(platform, &devices)?;
    let mut program = Program::new(&context, &text)?;
    if let Err(e) = program.build(options) {
        print_build_logs(&program, &devices);
        return Err(e.into());
    }
    let artifacts = Artifacts::new(path, &text)?;
    for written in artifacts.write(out_dir)? {
        println!("wrote {}", written.display());
    }
    Ok(())
}

fn print_build_logs(program: &Program, devices: &[Device]) {
    for device in devices {
        let name = device.name().unwrap_or_default();
        match program.build_log(device) {
            Ok(log) => eprintln!("build log for {name}:\n{log}"),
            Err(e) => eprintln!("build log for {name} is unavailable: {e}"),
        }
    }
}
