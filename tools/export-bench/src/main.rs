//! Export benchmark CLI for PixelCapture.
//!
//! Crops a saved viewport screenshot and encodes the region in every
//! export format, writing each result next to the input.
//!
//! Usage:
//!   cargo run -- <viewport.png>                      Default centered 500x400 frame
//!   cargo run -- <viewport.png> <x> <y> <w> <h>      Explicit selection
//!   cargo run -- <viewport.png> --runs 20            Repeat each format for timing

use std::path::Path;
use std::time::Instant;

use pixel_capture_lib::capture::{
    self, ExportFormat, ImagePdfWriter, PdfWriter, SelectionFrame, SelectionRect,
};
use pixel_capture_lib::config::{Environment, DEFAULT_JPEG_QUALITY};
use pixel_capture_lib::export::screenshot_filename;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let positional = positional_args(&args);
    if positional.is_empty() {
        usage();
    }

    pixel_capture_lib::init_logging(Environment::Production);

    let runs = flag_value(&args, "--runs").unwrap_or(1).max(1) as usize;

    let input = Path::new(positional[0]);
    let viewport = image::open(input).unwrap_or_else(|e| {
        eprintln!("Could not open {}: {}", input.display(), e);
        std::process::exit(1);
    });

    let rect = match positional.len() {
        1 => SelectionFrame::centered(viewport.width() as i32, viewport.height() as i32).rect(),
        5 => {
            let n: Vec<i32> = positional[1..]
                .iter()
                .map(|s| {
                    s.parse().unwrap_or_else(|_| {
                        eprintln!("Not a number: {}", s);
                        std::process::exit(1);
                    })
                })
                .collect();
            SelectionRect::new(n[0], n[1], n[2], n[3])
        }
        _ => {
            eprintln!("Selection needs exactly four numbers: x y width height");
            std::process::exit(1);
        }
    };

    eprintln!(
        "Viewport {}x{}, selection {}x{} at {},{}, {} run(s) per format",
        viewport.width(),
        viewport.height(),
        rect.width,
        rect.height,
        rect.x,
        rect.y,
        runs
    );

    let out_dir = input.parent().unwrap_or_else(|| Path::new("."));
    let now = chrono::Local::now().naive_local();
    let pdf_writer = ImagePdfWriter::default();

    println!("format,bytes,median_ms,filename");

    for format in ExportFormat::ALL {
        let mut latencies: Vec<f64> = Vec::with_capacity(runs);
        let mut output: Option<Vec<u8>> = None;

        for _ in 0..runs {
            let start = Instant::now();
            let encoded = match capture::crop_and_encode(&viewport, &rect, format, DEFAULT_JPEG_QUALITY) {
                Ok(encoded) => encoded,
                Err(e) => {
                    eprintln!("  WARNING: {} failed: {}", format, e);
                    break;
                }
            };

            let bytes = if format == ExportFormat::Pdf {
                match pdf_writer.write_pdf(&encoded.bytes, encoded.width, encoded.height) {
                    Ok(pdf) => pdf,
                    Err(e) => {
                        eprintln!("  WARNING: PDF assembly failed: {}", e);
                        break;
                    }
                }
            } else {
                encoded.bytes
            };

            latencies.push(start.elapsed().as_secs_f64() * 1000.0);
            output = Some(bytes);
        }

        let Some(bytes) = output else { continue };

        latencies.sort_by(|a, b| a.total_cmp(b));
        let median = latencies[latencies.len() / 2];
        let filename = screenshot_filename(&now, format);

        if let Err(e) = std::fs::write(out_dir.join(&filename), &bytes) {
            eprintln!("  WARNING: could not write {}: {}", filename, e);
        }

        println!("{},{},{:.1},{}", format, bytes.len(), median, filename);
    }
}

/// Arguments before the first `--flag`, program name excluded.
fn positional_args(args: &[String]) -> Vec<&String> {
    args.iter()
        .skip(1)
        .take_while(|a| !a.starts_with("--"))
        .collect()
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  export-bench <viewport.png> [x y width height] [--runs N]");
    std::process::exit(1);
}

fn flag_value(args: &[String], flag: &str) -> Option<u32> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1)?.parse().ok()
}
