//! Scripted session playback command.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Args;

use cadena_core::{ChainManager, ParamKey, ParameterStore};
use cadena_io::{WavSpec, open_media, read_wav_info, write_wav};

use crate::script::{ScriptAction, ScriptEvent, load_script};

#[derive(Args)]
pub struct SessionArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// JSON session script
    #[arg(short, long)]
    script: PathBuf,

    /// Processing block size
    #[arg(long, default_value = "512")]
    block_size: usize,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(args: SessionArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.block_size > 0, "block size must be at least 1");
    let script = load_script(&args.script)?;

    println!("Reading {}...", args.input.display());
    let info = read_wav_info(&args.input)?;
    let sample_rate = info.sample_rate as f32;
    let media = open_media(&args.input)?;

    let mut store = ParameterStore::new();
    let chain = ChainManager::attach(media, sample_rate, &mut store);

    println!(
        "Running {} event(s) over {:.2}s of audio...",
        script.events.len(),
        info.duration_secs
    );

    let total = usize::try_from(info.num_frames)?;
    let mut output = vec![0.0_f32; total];
    let mut rendered = 0_usize;
    let mut next_event = 0_usize;

    while rendered < total {
        while next_event < script.events.len() {
            let event = &script.events[next_event];
            let due = (event.at * f64::from(sample_rate)) as usize;
            if due > rendered {
                break;
            }
            apply_event(event, &mut store, &chain)?;
            next_event += 1;
        }

        let until = script.events.get(next_event).map_or(total, |event| {
            ((event.at * f64::from(sample_rate)) as usize).clamp(rendered, total)
        });
        let step = (until - rendered).max(1).min(args.block_size);
        chain
            .borrow_mut()
            .process_block(&mut output[rendered..rendered + step]);
        rendered += step;
    }

    // Events timed past the end of the input still run, so a trailing
    // dispose in the script is honored.
    for event in &script.events[next_event..] {
        apply_event(event, &mut store, &chain)?;
    }

    chain.borrow_mut().dispose();

    let out_spec = WavSpec {
        channels: 1,
        sample_rate: info.sample_rate,
        bits_per_sample: args.bit_depth,
    };
    println!("Writing {}...", args.output.display());
    write_wav(&args.output, &output, out_spec)?;
    println!("Done!");

    Ok(())
}

fn apply_event(
    event: &ScriptEvent,
    store: &mut ParameterStore,
    chain: &Rc<RefCell<ChainManager>>,
) -> anyhow::Result<()> {
    match &event.action {
        ScriptAction::Enable => store.set_enabled(true),
        ScriptAction::Disable => store.set_enabled(false),
        ScriptAction::Toggle => {
            store.toggle();
        }
        ScriptAction::Set { param, value } => {
            let key = ParamKey::by_name(param).ok_or_else(|| {
                anyhow::anyhow!("unknown parameter '{param}' at {:.2}s", event.at)
            })?;
            store.set_param(key, *value);
        }
        ScriptAction::Dispose => chain.borrow_mut().dispose(),
    }
    println!(
        "  [{:7.2}s] {} -> {:?}",
        event.at,
        event.action,
        chain.borrow().state()
    );
    Ok(())
}
