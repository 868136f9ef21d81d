//! Parameter listing command.

use clap::Args;

use cadena_core::ParamKey;

#[derive(Args)]
pub struct ParamsArgs {
    /// Show a single parameter in detail
    #[arg(value_name = "NAME")]
    name: Option<String>,
}

pub fn run(args: ParamsArgs) -> anyhow::Result<()> {
    match args.name {
        Some(name) => {
            let key = ParamKey::by_name(&name)
                .ok_or_else(|| anyhow::anyhow!("Unknown parameter: {name}"))?;
            let range = key.range();
            println!("{}", key.name());
            println!("  Range:   {} to {}{}", range.min, range.max, key.unit());
            println!("  Default: {}{}", key.default_value(), key.unit());
        }
        None => {
            println!("Chain parameters:");
            println!();
            println!("  {:<12} {:>8} {:>8} {:>9}", "NAME", "MIN", "MAX", "DEFAULT");
            for key in ParamKey::ALL {
                let range = key.range();
                println!(
                    "  {:<12} {:>8} {:>8} {:>9}{}",
                    key.name(),
                    range.min,
                    range.max,
                    key.default_value(),
                    key.unit()
                );
            }
            println!();
            println!("Values outside a range are clamped, never rejected.");
        }
    }
    Ok(())
}
