//! Host simulator for the LED-matrix board.
//!
//! Every demo runs on the embassy std executor with simulated peripherals.
//! Input comes from stdin, one command per line:
//!
//! - `1` / `2`: press button 1 / button 2
//! - `tap E3 59 28 F7`, `remove`: RFID card on / off the reader (door demo)
//! - `on`, `off`, `toggle`, `pattern`, `fill R G B`: LED commands (toggle demo)
//! - `join MAC AID`, `leave MAC AID`: station events (ap demo)

use core::cell::RefCell;
use std::{
    convert::Infallible,
    io::BufRead,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
    time::Duration as StdDuration,
};

use clap::{Parser, Subcommand};
use embassy_executor::{Executor, Spawner};
use embassy_net::{Config, Ipv4Address, Ipv4Cidr, Runner, StackResources};
use embassy_net_tuntap::TunTapDevice;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use embassy_time::{Delay, Timer};
use embedded_hal::{
    digital::{self, InputPin},
    i2c::{self, ErrorKind, I2c, NoAcknowledgeSource},
    pwm::{self, SetDutyCycle},
    spi::{self, SpiDevice},
};
use ledbox_core::{
    mk_static,
    utils::{
        config::{BrokerConfig, DoorConfig, GameConfig, Settings},
        connection::{
            publish::{BrokerEvent, Publisher, SensorBridge},
            softap::{ApEvent, ApMonitor},
        },
        controllers::{
            i2c::{crc8, Shtc3, SHTC3_ADDRESS},
            spi::Icm42688p,
            LEDCommand, LedModule, LED_CHANNEL,
        },
        games::Board,
        lock::{
            door::{self, DoorEvent, LOCK_CHANNEL},
            tags::parse_uid,
        },
        wss, DoorLock, Grid,
    },
};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use smart_leds_trait::{SmartLedsWrite, RGB8};
use static_cell::StaticCell;
use tracing::{error, info, warn};

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// JSON settings file; missing fields keep their defaults
    #[clap(long)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    demo: Demo,
}

#[derive(Subcommand)]
enum Demo {
    Snake,
    Dice,
    EggTimer,
    Reaction,
    Blink,
    Toggle,
    /// RFID door lock with its web UI
    Door {
        /// TAP device name
        #[clap(long, default_value = "tap0")]
        tap: String,
        /// use a static IP instead of DHCP
        #[clap(long)]
        static_ip: bool,
        #[clap(long, default_value_t = 8000)]
        port: u16,
    },
    /// Climate and motion readings published to the broker
    Sensors,
    /// Soft access point station tracking
    Ap,
}

#[derive(Clone, Copy, Debug)]
enum Game {
    Snake,
    Dice,
    EggTimer,
    Reaction,
    Blink,
    Toggle,
}

/// Button levels, `true` while held.
static BUTTONS: [AtomicBool; 2] = [AtomicBool::new(false), AtomicBool::new(false)];

/// How long a stdin press holds the button down.
const PRESS_MS: u64 = 150;

static AP_EVENTS: Channel<CriticalSectionRawMutex, ApEvent, 4> = Channel::new();

/// Active-low button pin backed by [`BUTTONS`].
struct KeyPin(usize);

impl digital::ErrorType for KeyPin {
    type Error = Infallible;
}

impl InputPin for KeyPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!BUTTONS[self.0].load(Ordering::Relaxed))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(BUTTONS[self.0].load(Ordering::Relaxed))
    }
}

/// Prints the matrix row by row whenever the frame changes.
#[derive(Default)]
struct MatrixPrinter {
    last: Vec<RGB8>,
}

fn pixel(c: RGB8) -> char {
    match (c.r, c.g, c.b) {
        (0, 0, 0) => '.',
        (r, g, b) if r > 0 && g > 0 && b > 0 => 'W',
        (r, g, b) if r >= g && r >= b => 'R',
        (_, g, b) if g >= b => 'G',
        _ => 'B',
    }
}

impl SmartLedsWrite for MatrixPrinter {
    type Color = RGB8;
    type Error = Infallible;

    fn write<T, I>(
        &mut self,
        iterator: T,
    ) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let frame: Vec<RGB8> = iterator.into_iter().map(Into::into).collect();
        if frame == self.last {
            return Ok(());
        }
        for (row, cells) in frame.chunks(Grid::MATRIX_5X5.cols()).enumerate() {
            let line: String = cells.iter().map(|c| pixel(*c)).collect();
            info!(row, "{line}");
        }
        self.last = frame;
        Ok(())
    }
}

/// Servo channel with one duty tick per microsecond of the 20 ms period.
struct LogPwm;

impl pwm::ErrorType for LogPwm {
    type Error = Infallible;
}

impl SetDutyCycle for LogPwm {
    fn max_duty_cycle(&self) -> u16 {
        20_000
    }

    fn set_duty_cycle(
        &mut self,
        duty: u16,
    ) -> Result<(), Self::Error> {
        info!(pulse_us = duty, "servo pulse");
        Ok(())
    }
}

/// SHTC3 answering with a room climate plus noise.
struct SimShtc3 {
    rng: SmallRng,
    measuring: bool,
}

impl i2c::ErrorType for SimShtc3 {
    type Error = ErrorKind;
}

impl I2c for SimShtc3 {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != SHTC3_ADDRESS {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for op in operations {
            match op {
                i2c::Operation::Write(cmd) => self.measuring = *cmd == [0x78, 0x66],
                i2c::Operation::Read(buf) => {
                    if !self.measuring || buf.len() != 6 {
                        return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
                    }
                    let t: f32 = 21.0 + self.rng.random_range(-0.5..0.5);
                    let h: f32 = 45.0 + self.rng.random_range(-2.0..2.0);
                    let t_raw = ((t + 45.0) * 65536.0 / 175.0) as u16;
                    let h_raw = (h * 65536.0 / 100.0) as u16;
                    for (chunk, raw) in buf.chunks_mut(3).zip([t_raw, h_raw]) {
                        let [hi, lo] = raw.to_be_bytes();
                        chunk.copy_from_slice(&[hi, lo, crc8(&[hi, lo])]);
                    }
                    self.measuring = false;
                }
            }
        }
        Ok(())
    }
}

/// ICM42688P register file lying flat on a table.
struct SimImu {
    rng: SmallRng,
    regs: [u8; 128],
}

impl SimImu {
    fn read(
        &mut self,
        buf: &mut [u8],
    ) {
        let reg = buf[0] & 0x7F;
        if reg == 0x1F && buf.len() == 7 {
            let mut axis = |g: f32| {
                let noisy = g + self.rng.random_range(-0.02..0.02);
                ((noisy * 16384.0) as i16).to_le_bytes()
            };
            let (x, y, z) = (axis(0.0), axis(0.0), axis(1.0));
            buf[1..].copy_from_slice(&[x[0], x[1], y[0], y[1], z[0], z[1]]);
            return;
        }
        for (i, b) in buf[1..].iter_mut().enumerate() {
            *b = self.regs[(reg as usize + i) & 0x7F];
        }
    }
}

impl spi::ErrorType for SimImu {
    type Error = Infallible;
}

impl SpiDevice for SimImu {
    fn transaction(
        &mut self,
        operations: &mut [spi::Operation<'_, u8>],
    ) -> Result<(), Self::Error> {
        for op in operations {
            match op {
                spi::Operation::Write(bytes) => {
                    if let &[reg, val] = *bytes {
                        info!(reg, val, "IMU register write");
                        self.regs[(reg & 0x7F) as usize] = val;
                    }
                }
                spi::Operation::TransferInPlace(buf) => self.read(buf),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Logs what would go to the broker.
#[derive(Default)]
struct LogPublisher {
    next_id: u32,
}

impl Publisher for LogPublisher {
    type Error = Infallible;

    fn publish(
        &mut self,
        topic: &str,
        payload: &str,
    ) -> Result<(), Self::Error> {
        self.next_id += 1;
        info!(msg_id = self.next_id, topic, payload, "publish");
        Ok(())
    }
}

type HostBoard = Board<MatrixPrinter, KeyPin, KeyPin>;

#[embassy_executor::task]
async fn game_task(
    game: Game,
    mut board: HostBoard,
    config: GameConfig,
) -> ! {
    let mut rng = SmallRng::from_os_rng();
    info!(?game, "starting demo");
    match game {
        Game::Snake => match board.run_snake(&mut rng, &config).await {
            Ok(never) => match never {},
            Err(e) => error!(?e, "snake could not start"),
        },
        Game::Dice => board.run_dice(&mut rng).await,
        Game::EggTimer => board.run_egg_timer().await,
        Game::Reaction => board.run_reaction(&mut rng).await,
        Game::Blink => board.run_blink().await,
        Game::Toggle => board.run_toggle(&config).await,
    }
    loop {
        Timer::after_secs(3600).await;
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, TunTapDevice>) -> ! {
    runner.run().await
}

#[embassy_executor::task]
async fn door_task(lock: DoorLock<LogPwm>) -> ! {
    door::run(lock).await
}

#[embassy_executor::task]
async fn sensor_task(
    bus: &'static RefCell<SimShtc3>,
    config: BrokerConfig,
) -> ! {
    let mut climate = Shtc3::new(bus);
    let mut imu = Icm42688p::new(SimImu {
        rng: SmallRng::from_os_rng(),
        regs: [0; 128],
    });
    let mut delay = Delay;
    if let Err(e) = imu.init(&mut delay) {
        error!(?e, "IMU init failed");
    }

    let mut bridge = SensorBridge::new(LogPublisher::default());
    info!(uri = config.uri.as_str(), "connecting to broker");
    bridge.dispatch(BrokerEvent::Connected);
    bridge.run(&mut climate, &mut imu, &mut delay, &config).await
}

#[embassy_executor::task]
async fn ap_task() -> ! {
    let mut monitor = ApMonitor::default();
    loop {
        let event = AP_EVENTS.receive().await;
        monitor.dispatch(event);
        info!(stations = monitor.stations(), "access point");
    }
}

async fn run_door(
    spawner: Spawner,
    tap: &str,
    static_ip: bool,
    port: u16,
    config: DoorConfig,
) {
    let lock = match DoorLock::new(LogPwm, config) {
        Ok(lock) => lock,
        Err(never) => match never {},
    };
    spawner.spawn(door_task(lock)).unwrap();

    let device = TunTapDevice::new(tap).unwrap();
    let net_config = if static_ip {
        Config::ipv4_static(embassy_net::StaticConfigV4 {
            address: Ipv4Cidr::new(Ipv4Address::new(192, 168, 69, 2), 24),
            dns_servers: heapless::Vec::new(),
            gateway: Some(Ipv4Address::new(192, 168, 69, 1)),
        })
    } else {
        Config::dhcpv4(Default::default())
    };

    static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        device,
        net_config,
        RESOURCES.init(StackResources::new()),
        rand::random(),
    );
    spawner.spawn(net_task(runner)).unwrap();

    info!("Waiting for network link...");
    stack.wait_config_up().await;

    info!("Starting WebSocket server on port {port}");
    wss(0, port, stack, None).await
}

#[embassy_executor::task]
async fn main_task(
    spawner: Spawner,
    demo: Demo,
    settings: Settings,
) {
    let board = || Board::new(LedModule::new(MatrixPrinter::default()), KeyPin(0), KeyPin(1));
    let game = match demo {
        Demo::Snake => Game::Snake,
        Demo::Dice => Game::Dice,
        Demo::EggTimer => Game::EggTimer,
        Demo::Reaction => Game::Reaction,
        Demo::Blink => Game::Blink,
        Demo::Toggle => Game::Toggle,
        Demo::Door {
            tap,
            static_ip,
            port,
        } => return run_door(spawner, &tap, static_ip, port, settings.door).await,
        Demo::Sensors => {
            let bus = mk_static!(
                RefCell<SimShtc3>,
                RefCell::new(SimShtc3 {
                    rng: SmallRng::from_os_rng(),
                    measuring: false,
                })
            );
            spawner.spawn(sensor_task(bus, settings.broker)).unwrap();
            return;
        }
        Demo::Ap => {
            let ap = &settings.access_point;
            if let Err(e) = ap.validate() {
                error!(?e, "invalid access point settings");
                return;
            }
            info!(
                ssid = ap.ssid.as_str(),
                channel = ap.channel,
                auth = ?ap.auth_method(),
                max_connections = ap.max_connections,
                "access point up"
            );
            spawner.spawn(ap_task()).unwrap();
            return;
        }
    };
    spawner.spawn(game_task(game, board(), settings.game)).unwrap();
}

fn load_settings(path: Option<&Path>) -> Settings {
    let Some(path) = path else {
        return Settings::default();
    };
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
        error!(?path, %e, "cannot read settings");
        std::process::exit(1)
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        error!(?path, %e, "invalid settings");
        std::process::exit(1)
    })
}

fn parse_mac(text: &str) -> Option<[u8; 6]> {
    let mut mac = [0u8; 6];
    let mut parts = text.split(':');
    for byte in mac.iter_mut() {
        *byte = u8::from_str_radix(parts.next()?, 16).ok()?;
    }
    parts.next().is_none().then_some(mac)
}

fn press(button: usize) {
    BUTTONS[button].store(true, Ordering::Relaxed);
    std::thread::spawn(move || {
        std::thread::sleep(StdDuration::from_millis(PRESS_MS));
        BUTTONS[button].store(false, Ordering::Relaxed);
    });
}

fn handle_line(line: &str) {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return;
    };
    let rest: Vec<&str> = words.collect();
    let led = |cmd: LEDCommand| {
        if LED_CHANNEL.try_send(cmd).is_err() {
            warn!("LED queue full");
        }
    };
    let station = |rest: &[&str]| match rest {
        [mac, aid] => Some((parse_mac(mac)?, aid.parse::<u16>().ok()?)),
        _ => None,
    };

    match cmd {
        "1" => press(0),
        "2" => press(1),
        "tap" => match parse_uid(&rest.join(" ")) {
            Some(uid) => {
                if LOCK_CHANNEL.try_send(DoorEvent::TagDetected(uid)).is_err() {
                    warn!("door queue full");
                }
            }
            None => warn!("usage: tap <uid hex>"),
        },
        "remove" => {
            if LOCK_CHANNEL.try_send(DoorEvent::TagRemoved).is_err() {
                warn!("door queue full");
            }
        }
        "on" => led(LEDCommand::On),
        "off" => led(LEDCommand::Off),
        "toggle" => led(LEDCommand::Toggle),
        "pattern" => led(LEDCommand::Pattern),
        "fill" => match rest.iter().map(|v| v.parse::<u8>()).collect::<Result<Vec<_>, _>>() {
            Ok(rgb) if rgb.len() == 3 => led(LEDCommand::Fill {
                r: rgb[0],
                g: rgb[1],
                b: rgb[2],
            }),
            _ => warn!("usage: fill <r> <g> <b>"),
        },
        "join" | "leave" => match station(&rest) {
            Some((mac, aid)) => {
                let event = if cmd == "join" {
                    ApEvent::StationJoined { mac, aid }
                } else {
                    ApEvent::StationLeft {
                        mac,
                        aid,
                        reason: 8,
                    }
                };
                if AP_EVENTS.try_send(event).is_err() {
                    warn!("station event queue full");
                }
            }
            None => warn!("usage: {cmd} <aa:bb:cc:dd:ee:ff> <aid>"),
        },
        other => warn!(command = other, "unknown command"),
    }
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let opts = Opts::parse();
    let settings = load_settings(opts.config.as_deref());

    std::thread::spawn(|| {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => handle_line(line.trim()),
                Err(e) => {
                    error!(%e, "stdin closed");
                    break;
                }
            }
        }
    });

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner
            .spawn(main_task(spawner, opts.demo, settings))
            .unwrap();
    });
}
