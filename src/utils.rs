use time::macros::format_description;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber. `RUST_LOG` applies unless `verbose` is set.
pub fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    };
    let timer = LocalTime::new(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_writer(std::io::stderr)
        .init();
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if let Some(output) = &args.output {
        if output == &args.dump {
            anyhow::bail!("--output must not overwrite the input dump {:?}", args.dump);
        }
    }

    if let Some(suffix_list) = &args.suffix_list {
        if suffix_list.is_dir() {
            anyhow::bail!("--suffix-list must be a file, got directory {:?}", suffix_list);
        }
    }

    Ok(())
}
