use clap::Parser;
use navball::framebuffer::{color, FrameBuffer};
use navball::port::{DigitalOutput, Level, LinePort};
use navball::telemetry::{open_serial, run_ingest};
use navball::{render, AttitudeStore, FieldWidth, FrameDecoder, NavballRenderer, St7735};
use navball::{HEIGHT, WIDTH};
use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::thread::sleep;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Attitude indicator: serial telemetry in, SPI LCD out")]
struct Args {
    /// Telemetry serial port
    #[arg(long, default_value = "/dev/ttyUSB0")]
    serial: String,

    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Panel spidev node
    #[arg(long, default_value = "/dev/spidev0.0")]
    spi: String,

    #[arg(long, default_value = "/dev/gpiochip0")]
    gpiochip: String,

    /// Data/command select line offset
    #[arg(long, default_value_t = 24)]
    dc: u32,

    /// Panel reset line offset
    #[arg(long, default_value_t = 25)]
    reset: u32,

    /// Heartbeat LED line offset
    #[arg(long, default_value_t = 26)]
    led: u32,

    /// Decode 32-bit angle fields instead of 16-bit
    #[arg(long)]
    wide: bool,
}

/// Stand-in renderer: tilted horizon split by pitch and roll (angles in
/// centidegrees) with a heading tick. The real navball drops in behind the
/// same trait.
struct HorizonRenderer {
    frame: FrameBuffer,
}

impl HorizonRenderer {
    fn new() -> HorizonRenderer {
        HorizonRenderer {
            frame: FrameBuffer::new(WIDTH, HEIGHT),
        }
    }
}

impl NavballRenderer for HorizonRenderer {
    fn render(&mut self, pitch: i32, roll: i32, yaw: i32) -> &FrameBuffer {
        let mid = HEIGHT as i32 / 2;
        let cx = WIDTH as i32 / 2;
        for x in 0..WIDTH as i32 {
            // small-angle tilt: centidegrees to radians is /5730
            let horizon = mid - pitch / 25 + (x - cx) * roll / 5730;
            for y in 0..HEIGHT as i32 {
                let c = if y < horizon {
                    color::SKY_BLUE
                } else {
                    color::GROUND_BROWN
                };
                self.frame.set_pixel(x, y, c);
            }
        }
        let tick = yaw.rem_euclid(36_000) * WIDTH as i32 / 36_000;
        for y in 0..8 {
            self.frame.set_pixel(tick, y, color::WHITE);
        }
        self.frame.set_pixel(cx, mid, color::GREEN);
        &self.frame
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let store = Arc::new(AttitudeStore::new());
    let width = if args.wide {
        FieldWidth::Wide
    } else {
        FieldWidth::Narrow
    };

    {
        let store = Arc::clone(&store);
        let serial = args.serial.clone();
        let baud = args.baud;
        thread::Builder::new()
            .name("telemetry".into())
            .spawn(move || {
                let port = match open_serial(&serial, baud) {
                    Ok(port) => port,
                    Err(e) => {
                        error!("unable to open serial port {serial}: {e}");
                        return;
                    }
                };
                info!("reading telemetry from {serial} at {baud} baud");
                if let Err(e) = run_ingest(port, FrameDecoder::new(width), &store) {
                    error!("telemetry read failed: {e}");
                }
            })?;
    }

    {
        let store = Arc::clone(&store);
        let (spi, chip) = (args.spi.clone(), args.gpiochip.clone());
        let (dc, reset) = (args.dc, args.reset);
        thread::Builder::new().name("render".into()).spawn(move || {
            let mut display = match St7735::open(&spi, &chip, dc, reset) {
                Ok(display) => display,
                Err(e) => {
                    error!("lcd init failed: {e}");
                    return;
                }
            };
            let mut renderer = HorizonRenderer::new();
            render::run(&store, &mut renderer, &mut display);
        })?;
    }

    let mut led = LinePort::request(&args.gpiochip, args.led, "navball-led")?;
    loop {
        led.set(Level::High);
        info!("heartbeat");
        sleep(Duration::from_secs(5));
        led.set(Level::Low);
        sleep(Duration::from_secs(5));
    }
}
