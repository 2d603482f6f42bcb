//! Hosted simulation: a scripted pilot flies a toy rigid body through the
//! real control loop, scheduler and ESC driver.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::PwmPin;
use embedded_time::{clock, rate::Fraction, Clock};
use log::{info, warn, LevelFilter};
use quad_stabilizer::config::{
    ESC_DUTY_MAX, ESC_DUTY_MIN, LEFT_STICK_CENTER_X, LEFT_STICK_CENTER_Y, LOOP_RATE_HZ,
    RIGHT_STICK_CENTER,
};
use quad_stabilizer::control::{
    Attitude, Axis, CommandFrame, Joystick, PidGains, TuningOverride,
};
use quad_stabilizer::hal::{Builder, RCESC};
use quad_stabilizer::{copter_tasks, AttitudeSensor, Copter, Link, LogReporter, Scheduler};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tokio::sync::mpsc;

const SIM_SECONDS: u64 = 15;
const PILOT_PERIOD_MS: u64 = 20;

/// Degrees per second squared per unit of motor speed difference.
const TILT_GAIN: f32 = 6.;
const YAW_GAIN: f32 = 3.;
const DAMPING: f32 = 2.;

/// Rigid body with independent roll, pitch and yaw axes.
#[derive(Debug, Default)]
struct Plant {
    duty: [u16; 4],
    roll_deg: f32,
    pitch_deg: f32,
    roll_rate_dps: f32,
    pitch_rate_dps: f32,
    yaw_rate_dps: f32,
}

impl Plant {
    fn disturbed() -> Self {
        Self {
            roll_deg: 12.,
            pitch_deg: -8.,
            yaw_rate_dps: 30.,
            ..Self::default()
        }
    }

    fn speed(&self, index: usize) -> f32 {
        let duty = f32::from(self.duty[index].saturating_sub(ESC_DUTY_MIN));
        duty * 180. / f32::from(ESC_DUTY_MAX - ESC_DUTY_MIN)
    }

    fn step(&mut self, dt: f32) {
        let [top_left, top_right, bottom_left, bottom_right] =
            [0, 1, 2, 3].map(|index| self.speed(index));

        let roll_accel = TILT_GAIN * ((top_right + bottom_right) - (top_left + bottom_left))
            - DAMPING * self.roll_rate_dps;
        let pitch_accel = TILT_GAIN * ((top_left + top_right) - (bottom_left + bottom_right))
            - DAMPING * self.pitch_rate_dps;
        let yaw_accel = YAW_GAIN * ((top_right + bottom_left) - (top_left + bottom_right))
            - DAMPING * self.yaw_rate_dps;

        self.roll_rate_dps += roll_accel * dt;
        self.pitch_rate_dps += pitch_accel * dt;
        self.yaw_rate_dps += yaw_accel * dt;
        self.roll_deg += self.roll_rate_dps * dt;
        self.pitch_deg += self.pitch_rate_dps * dt;
    }

    fn attitude(&self) -> Attitude {
        Attitude::new(self.roll_deg, self.pitch_deg, self.yaw_rate_dps)
    }
}

type SharedPlant = Arc<Mutex<Plant>>;

fn lock(plant: &SharedPlant) -> MutexGuard<'_, Plant> {
    plant.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One ESC signal line feeding the plant.
struct PlantPin {
    plant: SharedPlant,
    index: usize,
}

impl PwmPin for PlantPin {
    type Duty = u16;

    fn disable(&mut self) {}

    fn enable(&mut self) {}

    fn get_duty(&self) -> u16 {
        lock(&self.plant).duty[self.index]
    }

    fn get_max_duty(&self) -> u16 {
        u16::MAX
    }

    fn set_duty(&mut self, duty: u16) {
        lock(&self.plant).duty[self.index] = duty;
    }
}

struct PlantSensor(SharedPlant);

impl AttitudeSensor for PlantSensor {
    type Error = ();

    fn read(&mut self) -> Attitude {
        lock(&self.0).attitude()
    }
}

/// Radio link backed by a channel of encoded frames.
struct ChannelLink {
    frames: mpsc::Receiver<Vec<u8>>,
    acks: u64,
}

impl Link for ChannelLink {
    type Error = ();

    fn try_receive(&mut self) -> Option<CommandFrame> {
        let bytes = self.frames.try_recv().ok()?;
        match CommandFrame::decode(&bytes) {
            Ok(frame) => Some(frame),
            Err(error) => {
                warn!("dropping frame: {}", error);
                None
            }
        }
    }

    fn send_ack(&mut self, _health: u16) {
        self.acks += 1;
    }
}

struct HostClock {
    start: Instant,
}

impl Clock for HostClock {
    type T = u32;

    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<embedded_time::Instant<Self>, clock::Error> {
        // Wraps like a hardware microsecond counter
        let micros = self.start.elapsed().as_micros() as u32;
        Ok(embedded_time::Instant::new(micros))
    }
}

struct HostDelay;

impl DelayMs<u16> for HostDelay {
    fn delay_ms(&mut self, ms: u16) {
        std::thread::sleep(Duration::from_millis(ms.into()));
    }
}

/// Stick positions at `t` seconds after the pilot starts transmitting.
fn pilot_frame(t: f32) -> CommandFrame {
    // Ramp up to about 60% throttle over five seconds
    let centered = CommandFrame {
        throttle: ((t / 5.).min(1.) * 600.) as u16,
        joystick_left: Joystick::new(LEFT_STICK_CENTER_X, LEFT_STICK_CENTER_Y),
        joystick_right: Joystick::new(RIGHT_STICK_CENTER, RIGHT_STICK_CENTER),
        tuning: None,
    };

    match t {
        t if (7.0..7.05).contains(&t) => CommandFrame {
            tuning: Some(TuningOverride {
                axis: Axis::Roll,
                gains: PidGains::new(1.5, 0.03, 0.35),
            }),
            ..centered
        },
        t if (9.0..10.0).contains(&t) => CommandFrame {
            joystick_left: Joystick::new(LEFT_STICK_CENTER_X + 250, LEFT_STICK_CENTER_Y),
            ..centered
        },
        t if (11.0..12.0).contains(&t) => CommandFrame {
            joystick_right: Joystick::new(RIGHT_STICK_CENTER - 300, RIGHT_STICK_CENTER),
            ..centered
        },
        _ => centered,
    }
}

async fn pilot(frames: mpsc::Sender<Vec<u8>>) {
    let start = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_millis(PILOT_PERIOD_MS));

    loop {
        ticker.tick().await;
        let frame = pilot_frame(start.elapsed().as_secs_f32());

        let mut buf = [0; CommandFrame::TUNING_LEN];
        let len = frame.encode(&mut buf);
        if frames.send(buf[..len].to_vec()).await.is_err() {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let plant: SharedPlant = Arc::new(Mutex::new(Plant::disturbed()));
    let escs: [RCESC<PlantPin>; 4] = [0, 1, 2, 3].map(|index| {
        Builder::standard().build(PlantPin {
            plant: plant.clone(),
            index,
        })
    });

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(pilot(tx));

    let link = ChannelLink { frames: rx, acks: 0 };
    let mut copter = Copter::builder(link, PlantSensor(plant.clone()), escs)
        .reporter(LogReporter)
        .build();

    // Arming blocks for a few seconds
    let mut copter = tokio::task::spawn_blocking(move || {
        copter.start(&mut HostDelay).map(|()| copter)
    })
    .await??;

    let mut tasks = copter_tasks();
    let clock = HostClock {
        start: Instant::now(),
    };
    let mut scheduler = Scheduler::new(&mut tasks, clock, LOOP_RATE_HZ);

    let period = Duration::from_micros(scheduler.loop_period().0.into());
    let mut interval = tokio::time::interval(period);
    let deadline = tokio::time::sleep(Duration::from_secs(SIM_SECONDS));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(deadline, ctrl_c);

    let mut last_step = Instant::now();
    loop {
        tokio::select! {
            _ = interval.tick() => {
                lock(&plant).step(last_step.elapsed().as_secs_f32());
                last_step = Instant::now();
                scheduler.run(&mut copter)?;
            }
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            _ = &mut deadline => break,
        }
    }

    info!(
        "simulation done after {} acks, final attitude {:?}",
        copter.link.acks,
        lock(&plant).attitude()
    );
    Ok(())
}
