use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use rtsp_media::{Media, MediaConfig, MediaFactory, RangeUnit, TimeRange};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum Unit {
    Npt,
    Smpte,
    #[value(name = "smpte-25")]
    Smpte25,
}

impl From<Unit> for RangeUnit {
    fn from(unit: Unit) -> Self {
        match unit {
            Unit::Npt => RangeUnit::Npt,
            Unit::Smpte => RangeUnit::Smpte,
            Unit::Smpte25 => RangeUnit::Smpte25,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "rtsp-media-launch",
    about = "Construct and prepare media from a launch description"
)]
struct Args {
    /// Launch description, e.g. "( videotestsrc ! rtpvrawpay pt=96 name=pay0 )"
    launch: String,

    /// Resource URL the media is constructed for
    #[arg(long, short, default_value = "rtsp://localhost:8554/test")]
    url: String,

    /// Share one media between requests for the same resource; a second
    /// request is made to show whether the instance is reused
    #[arg(long)]
    shared: bool,

    /// Allow preparing again after unprepare
    #[arg(long)]
    reusable: bool,

    /// Range to seek to once prepared (e.g. npt=5-)
    #[arg(long)]
    seek: Option<String>,

    /// Unit used to print ranges
    #[arg(long, value_enum, default_value = "npt")]
    unit: Unit,

    /// Number of prepare/unprepare cycles
    #[arg(long, default_value_t = 1)]
    cycles: u32,

    /// Timeout for each prepare/unprepare/seek, in milliseconds
    #[arg(long, default_value_t = 20_000)]
    timeout_ms: u64,
}

/// Construct twice for `url`, as two clients would, and report whether both
/// requests got the same media.
fn construct_for_two_clients(
    factory: &MediaFactory,
    url: &str,
) -> rtsp_media::Result<(Arc<Media>, bool)> {
    let first = factory.construct(url)?;
    let second = factory.construct(url)?;
    Ok((first.clone(), Arc::ptr_eq(&first, &second)))
}

fn run(args: &Args) -> rtsp_media::Result<()> {
    let seek = args.seek.as_deref().map(TimeRange::parse).transpose()?;
    let unit = RangeUnit::from(args.unit);

    let factory = MediaFactory::with_config(MediaConfig {
        transition_timeout: Duration::from_millis(args.timeout_ms),
        reusable: args.reusable,
        shared: args.shared,
    });
    factory.set_launch(&args.launch)?;

    let (media, same) = construct_for_two_clients(&factory, &args.url)?;
    println!(
        "second request for {} {} the same media",
        media.resource_key(),
        if same { "reuses" } else { "does not reuse" }
    );

    for cycle in 1..=args.cycles {
        tracing::info!(cycle, "preparing");
        media.prepare()?;

        println!("media {} prepared, {} stream(s)", media.resource_key(), media.n_streams());
        for stream in media.streams() {
            println!("{}", stream.media_line());
            for attribute in stream.sdp_attributes() {
                println!("{attribute}");
            }
        }
        if let Some(range) = media.get_range_string(false, unit) {
            println!("Range: {range}");
        }

        if let Some(range) = &seek {
            media.seek(range)?;
            if let Some(range) = media.get_range_string(false, unit) {
                println!("Range after seek: {range}");
            }
        }

        media.unprepare()?;
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rtsp-media-launch: {e}");
            ExitCode::FAILURE
        }
    }
}
