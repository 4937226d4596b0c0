#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod frame_loop;
mod map_log;

use std::sync::atomic::Ordering;
use std::time::Duration;

use abstutil::{prettyprint_usize, Timer};
use anyhow::Result;
use structopt::StructOpt;

use playback::{AnimationControls, Driver, Session};

use self::frame_loop::FrameLoop;
use self::map_log::LoggingMap;

#[derive(StructOpt)]
struct Args {
    /// The path to a CSV track, with longitude, latitude, and time columns
    #[structopt(long)]
    track: String,
    /// The path to a JSON list of photos to pause on
    #[structopt(long)]
    photos: Option<String>,
    /// The path to a JSON preset with animation controls
    #[structopt(long)]
    preset: Option<String>,
    /// Write the animation controls in effect to this path, then quit
    #[structopt(long)]
    export_preset: Option<String>,
    /// Start playback this many milliseconds into the track
    #[structopt(long)]
    seek_ms: Option<f64>,
    /// Milliseconds between simulated display refreshes
    #[structopt(long, default_value = "16")]
    frame_interval_ms: u64,
    /// Stop after this many frames
    #[structopt(long)]
    max_frames: Option<usize>,
    /// Stop after playback wraps around this many times
    #[structopt(long, default_value = "1")]
    loops: usize,
    /// Write the final route split and current point as GeoJSON to this path
    #[structopt(long)]
    geojson_out: Option<String>,
}

impl Args {
    fn load(&self, timer: &mut Timer) -> Result<Session> {
        timer.start("read track");
        let track = track::load_csv(fs_err::File::open(&self.track)?)?;
        timer.stop("read track");

        let photos = match self.photos {
            Some(ref path) => track::load_photos(fs_err::File::open(path)?, &track)?,
            None => Vec::new(),
        };

        let controls = match self.preset {
            Some(ref path) => AnimationControls::import_preset(&fs_err::read_to_string(path)?)?,
            None => AnimationControls::default(),
        };

        info!(
            "Track has {} points over {}m and {}s, with {} photos",
            prettyprint_usize(track.len()),
            track.length().inner_meters().round(),
            (track.duration_ms() / 1000.0).round(),
            prettyprint_usize(photos.len())
        );
        Session::new(track, photos, controls)
    }
}

fn main() -> Result<()> {
    abstutil::logger::setup();

    let args = Args::from_iter(abstutil::cli_args());
    if args.frame_interval_ms == 0 {
        bail!("--frame-interval-ms must be positive");
    }

    let session = args.load(&mut Timer::new("load inputs"))?;

    if let Some(ref path) = args.export_preset {
        fs_err::write(path, session.controls().export_preset()?)?;
        info!("Wrote {}", path);
        return Ok(());
    }

    let _controls_log =
        session.subscribe_controls(|controls| debug!("Animating with {:?}", controls));
    let _photo_log = session.displaying_photo.subscribe(|photo| match photo {
        Some(idx) => info!("Showing photo #{}", idx),
        None => debug!("No photo showing"),
    });

    let mut driver = Driver::new(session, LoggingMap::new());
    if let Some(ms) = args.seek_ms {
        driver.scrub_to(ms);
        driver.scrub_end();
    }

    let mut frame_loop = FrameLoop::new(Duration::from_millis(args.frame_interval_ms));
    frame_loop.max_frames = args.max_frames;
    frame_loop.max_loops = Some(args.loops);
    // Pressing enter ends playback early
    let cancel = frame_loop.cancel_handle();
    std::thread::spawn(move || {
        let mut line = String::new();
        // Closed or redirected stdin reads 0 bytes; that shouldn't stop anything
        if let Ok(1..) = std::io::stdin().read_line(&mut line) {
            cancel.store(true, Ordering::Relaxed);
        }
    });
    let frames = frame_loop.run(&mut driver);
    info!(
        "Played {} frames, ending at {}ms with {} camera moves",
        prettyprint_usize(frames),
        driver.cursor().round(),
        prettyprint_usize(driver.map().eases)
    );

    if let Some(ref path) = args.geojson_out {
        let fc = driver.map().to_geojson();
        fs_err::write(path, serde_json::to_string_pretty(&fc)?)?;
        info!("Wrote {}", path);
    }

    Ok(())
}
