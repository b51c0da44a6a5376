//! OpenCL Ray Tracer - render a kernel's output as a PPM image
//!
//! This application loads an OpenCL kernel from a text file, runs it once
//! over a fixed 2-D grid on the first available device, and writes the
//! gamma-corrected result as a plain-text PPM to stdout or a file.

use anyhow::{Context, Result};
use clap::Parser;
use clraytrace::opencl::OpenClBackend;
use clraytrace::source::{parse_size_string, DEFAULT_KERNEL_PATH};
use clraytrace::{render_image, RenderConfig};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Command line arguments for the OpenCL ray tracer
#[derive(Parser, Debug)]
#[clap(
    name = "clraytrace",
    about = "Run an OpenCL ray-tracing kernel over a fixed grid and print the image as PPM (P3).",
    version
)]
struct Args {
    /// Kernel source file
    #[clap(short, long, default_value = DEFAULT_KERNEL_PATH)]
    kernel: PathBuf,

    /// Kernel entry point taking the red, green and blue buffers
    #[clap(short, long, default_value = "vector_add")]
    entry: String,

    /// Image width in pixels
    #[clap(short = 'W', long, default_value = "1024")]
    width: usize,

    /// Image height in pixels
    #[clap(short = 'H', long, default_value = "768")]
    height: usize,

    /// Write the image here instead of stdout
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Largest accepted kernel source (e.g., 16K, 1M, 4096). Plain numbers are bytes.
    #[clap(long, value_parser = parse_size_string, default_value = "16K")]
    max_source_size: usize,

    /// Enable verbose logging
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    // Usage errors exit 1 like every other failure; help and version exit 0.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let config = RenderConfig {
        kernel_path: args.kernel,
        max_source_len: args.max_source_size,
        entry_point: args.entry,
        width: args.width,
        height: args.height,
    };

    log::info!(
        "Rendering {}x{} with '{}' from {}",
        config.width,
        config.height,
        config.entry_point,
        config.kernel_path.display()
    );

    let image = render_image(&config, OpenClBackend::new).context("Render failed")?;

    // The output is only opened once there is an image to put in it.
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            image.write_ppm(&mut out).context("Failed to write the image")?;
            out.flush().context("Failed to write the image")?;
            log::info!("Wrote {}", path.display());
        }
        None => {
            let mut out = BufWriter::new(io::stdout().lock());
            image.write_ppm(&mut out).context("Failed to write the image")?;
            out.flush().context("Failed to write the image")?;
        }
    }

    Ok(())
}
