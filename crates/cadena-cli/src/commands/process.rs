//! File-based chain processing command.

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use cadena_core::math::linear_to_db;
use cadena_core::{BufferStream, ChainManager, MediaHandle, ParamKey, ParameterStore};
use cadena_io::{WavSpec, read_wav, write_wav};

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Render through the bypass topology, compressor out of the path
    #[arg(long)]
    bypass: bool,

    /// Threshold in dB
    #[arg(long, allow_negative_numbers = true)]
    threshold: Option<f32>,

    /// Knee width in dB
    #[arg(long, allow_negative_numbers = true)]
    knee: Option<f32>,

    /// Compression ratio (N as in N:1)
    #[arg(long, allow_negative_numbers = true)]
    ratio: Option<f32>,

    /// Attack time in seconds
    #[arg(long, allow_negative_numbers = true)]
    attack: Option<f32>,

    /// Release time in seconds
    #[arg(long, allow_negative_numbers = true)]
    release: Option<f32>,

    /// Output gain (linear)
    #[arg(long, allow_negative_numbers = true)]
    gain: Option<f32>,

    /// Processing block size
    #[arg(long, default_value = "512")]
    block_size: usize,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    println!("Reading {}...", args.input.display());
    let (samples, spec) = read_wav(&args.input)?;
    let sample_rate = spec.sample_rate as f32;

    println!(
        "  {} samples, {} Hz, {:.2}s",
        samples.len(),
        spec.sample_rate,
        samples.len() as f32 / sample_rate
    );
    anyhow::ensure!(!samples.is_empty(), "input has no audio");

    // The chain taps the media like a live element; keep the decoded
    // samples around for input stats.
    let media = MediaHandle::new(BufferStream::new(samples.clone(), sample_rate));
    let mut store = ParameterStore::new();
    let chain = ChainManager::attach(media, sample_rate, &mut store);

    let requested = [
        (ParamKey::Threshold, args.threshold),
        (ParamKey::Knee, args.knee),
        (ParamKey::Ratio, args.ratio),
        (ParamKey::Attack, args.attack),
        (ParamKey::Release, args.release),
        (ParamKey::OutputGain, args.gain),
    ];
    for (key, value) in requested {
        if let Some(raw) = value {
            let stored = store.set_param(key, raw);
            if (stored - raw).abs() > f32::EPSILON {
                println!("  {} clamped to {}{}", key.name(), stored, key.unit());
            }
        }
    }

    store.set_enabled(!args.bypass);
    println!("Routing: {:?}", chain.borrow().state());

    let pb = ProgressBar::new(samples.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("##-"),
    );

    let mut output = vec![0.0_f32; samples.len()];
    let mut max_reduction = 0.0_f32;
    let mut rendered = 0_u64;
    for block in output.chunks_mut(args.block_size) {
        chain.borrow_mut().process_block(block);
        if let Some(reduction) = chain.borrow().reduction_db() {
            max_reduction = max_reduction.max(reduction);
        }
        rendered += block.len() as u64;
        pb.set_position(rendered);
    }
    pb.finish_with_message("done");

    chain.borrow_mut().dispose();

    println!("\nStats:");
    println!(
        "  Input:  RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(rms(&samples)),
        linear_to_db(peak(&samples))
    );
    println!(
        "  Output: RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(rms(&output)),
        linear_to_db(peak(&output))
    );
    if !args.bypass {
        println!("  Max reduction: {max_reduction:.1} dB");
    }

    let out_spec = WavSpec {
        channels: 1,
        sample_rate: spec.sample_rate,
        bits_per_sample: args.bit_depth,
    };

    println!("\nWriting {}...", args.output.display());
    write_wav(&args.output, &output, out_spec)?;
    println!("Done!");

    Ok(())
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
}
