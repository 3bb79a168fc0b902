use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use watermark_inpaint::{
    default_output_path, InpaintMethod, Mode, ModeKind, ProcessOptions, ProcessResult, Rect,
    VisionEngine,
};

#[derive(Parser)]
#[command(
    name = "watermark-inpaint",
    about = "Locate rectangular watermarks in images and remove them via diffusion inpainting",
    version,
    after_help = "Simple usage: watermark-inpaint <image>  (auto-detect and reconstruct)\n\n\
                  Manual:  watermark-inpaint <image> --mode manual --region 40,40,120,30\n\
                  Batch:   watermark-inpaint <image> --mode batch --region ... --region ..."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output file or directory (default: {name}_restored.{ext})
    #[arg(short, long)]
    output: Option<String>,

    /// Operating mode: auto, manual, or batch
    #[arg(short, long, default_value = "auto")]
    mode: String,

    /// Watermark region as x,y,width,height (repeatable in batch mode)
    #[arg(short, long)]
    region: Vec<String>,

    /// Inpainting method: fast-marching or fluid-dynamics
    #[arg(long, default_value = "fast-marching")]
    method: String,

    /// Disable mask feathering (hard reconstruction edge)
    #[arg(long)]
    no_feather: bool,

    /// Region precision factor; values below 0.9 shrink the region
    #[arg(short, long, default_value = "1.0")]
    precision: f32,

    /// Padding in pixels around manual selections
    #[arg(long, default_value = "5")]
    padding: u32,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn parse_region(spec: &str) -> Result<Rect, String> {
    let parts: Vec<&str> = spec.split(',').collect();
    if parts.len() != 4 {
        return Err(format!("expected x,y,width,height, got {spec:?}"));
    }
    let mut values = [0u32; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse()
            .map_err(|e| format!("bad region component {part:?}: {e}"))?;
    }
    Ok(Rect::new(values[0], values[1], values[2], values[3]))
}

fn main() {
    let cli = Cli::parse();

    if !(0.0..=1.0).contains(&cli.precision) {
        eprintln!("Error: Precision must be between 0.0 and 1.0");
        process::exit(1);
    }

    let method = match cli.method.as_str() {
        "fast-marching" => InpaintMethod::FastMarching,
        "fluid-dynamics" => InpaintMethod::FluidDynamics,
        other => {
            eprintln!("Error: Unknown method {other:?} (use fast-marching or fluid-dynamics)");
            process::exit(1);
        }
    };

    let kind: ModeKind = match cli.mode.parse() {
        Ok(k) => k,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let regions: Vec<Rect> = cli
        .region
        .iter()
        .map(|spec| match parse_region(spec) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        })
        .collect();

    let mode = match kind {
        ModeKind::Automatic => Mode::Automatic,
        ModeKind::Manual => {
            let Some(&rect) = regions.first() else {
                eprintln!("Error: Manual mode requires --region x,y,width,height");
                process::exit(1);
            };
            Mode::Manual(rect)
        }
        ModeKind::Batch => Mode::Batch(regions),
    };

    let opts = ProcessOptions {
        method,
        feather: !cli.no_feather,
        precision: cli.precision,
        padding: cli.padding,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let engine = VisionEngine::new();

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if !opts.quiet {
        match &mode {
            Mode::Automatic => eprintln!("Automatic detection enabled"),
            Mode::Manual(r) => eprintln!("Manual region: {r:?}"),
            Mode::Batch(rs) => eprintln!("Batch mode: {} region(s)", rs.len()),
        }
        eprintln!();
    }

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: watermark-inpaint <input_dir> -o <output_dir>");
            process::exit(1);
        };
        engine.process_directory(input_path, &output_dir, &opts)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        vec![engine.process_file(input_path, &output_path, &mode, &opts)]
    };

    let mut success_count = 0u32;
    let mut skip_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &opts);
        if r.skipped {
            skip_count += 1;
        } else if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if skip_count > 0 {
            eprint!(", Skipped: {skip_count}");
        }
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.skipped {
        if !opts.quiet {
            eprintln!("[SKIP] {filename}: {}", result.message);
        }
    } else if result.success {
        if !opts.quiet {
            eprintln!("[OK] {filename}");
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if opts.verbose && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
