use core::{
    cell::{Cell, RefCell},
    future::Future,
    pin::{pin, Pin},
    task::{Context, Poll, Waker},
};
use std::{convert::Infallible, rc::Rc, thread, time::Duration};

use embedded_hal::pwm::{self, ErrorType, SetDutyCycle};
use embedded_hal_mock::eh1::{
    delay::NoopDelay,
    digital::{Mock as PinMock, State, Transaction as PinTrans},
    i2c::{Mock as I2cMock, Transaction as I2cTrans},
    spi::{Mock as SpiMock, Transaction as SpiTrans},
};
use ledbox_core::utils::{
    config::DoorConfig,
    connection::publish::{
        BrokerEvent, Publisher, SensorBridge, TOPIC_ACCELERATION, TOPIC_HUMIDITY,
        TOPIC_TEMPERATURE,
    },
    controllers::{
        i2c::{crc8, SensorError, Shtc3, SHTC3_ADDRESS},
        spi::Icm42688p,
        Button,
    },
    lock::{
        door::{self, DoorEvent, DoorLock, Effect, LockCommand, LockReply, LOCK_CHANNEL},
        LockError,
    },
};

/// Poll a future once with a waker that does nothing.
fn poll_once<F: Future>(fut: Pin<&mut F>) -> Poll<F::Output> {
    fut.poll(&mut Context::from_waker(Waker::noop()))
}

/// Poll until ready, sleeping a millisecond between polls.
fn block_on<F: Future>(fut: F) -> F::Output {
    let mut fut = pin!(fut);
    loop {
        if let Poll::Ready(out) = poll_once(fut.as_mut()) {
            return out;
        }
        thread::sleep(Duration::from_millis(1));
    }
}

/// One SHTC3 data word followed by its CRC.
fn word(raw: u16) -> Vec<u8> {
    let [hi, lo] = raw.to_be_bytes();
    vec![hi, lo, crc8(&[hi, lo])]
}

/// Measurement response: ~25 °C, 50 %RH.
fn climate_response() -> Vec<u8> {
    let mut data = word(0x6666);
    data.extend(word(0x8000));
    data
}

fn measure(response: Vec<u8>) -> Vec<I2cTrans> {
    vec![
        I2cTrans::write(SHTC3_ADDRESS, vec![0x78, 0x66]),
        I2cTrans::read(SHTC3_ADDRESS, response),
    ]
}

fn spi_write(
    reg: u8,
    val: u8,
) -> Vec<SpiTrans<u8>> {
    vec![
        SpiTrans::transaction_start(),
        SpiTrans::write_vec(vec![reg, val]),
        SpiTrans::transaction_end(),
    ]
}

/// Burst read returning x = 0, y = 0, z = +1 g.
fn accel_read() -> Vec<SpiTrans<u8>> {
    vec![
        SpiTrans::transaction_start(),
        SpiTrans::transfer_in_place(
            vec![0x9F, 0, 0, 0, 0, 0, 0],
            vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40],
        ),
        SpiTrans::transaction_end(),
    ]
}

#[derive(Default)]
struct Recorder {
    sent: Vec<(String, String)>,
    offline: bool,
}

impl Publisher for Recorder {
    type Error = &'static str;

    fn publish(
        &mut self,
        topic: &str,
        payload: &str,
    ) -> Result<(), Self::Error> {
        if self.offline {
            return Err("offline");
        }
        self.sent.push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

#[test]
fn test_shtc3_measurement() {
    let expectations = measure(climate_response());
    let i2c_bus = RefCell::new(I2cMock::new(&expectations));
    let mut sensor = Shtc3::new(&i2c_bus);

    let climate = sensor.read(&mut NoopDelay::new()).unwrap();
    assert!((climate.temperature - 25.0).abs() < 0.01);
    assert!((climate.humidity - 50.0).abs() < 0.01);
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_shtc3_rejects_bad_crc() {
    let mut response = climate_response();
    response[5] ^= 0xFF;
    let expectations = measure(response);
    let i2c_bus = RefCell::new(I2cMock::new(&expectations));
    let mut sensor = Shtc3::new(&i2c_bus);

    let err = sensor.read(&mut NoopDelay::new()).unwrap_err();
    assert!(matches!(err, SensorError::Crc { .. }));
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_icm42688p_init_sequence() {
    let expectations: Vec<_> = [(0x06, 0x01), (0x11, 0x00), (0x4E, 0x0F), (0x50, 0x03)]
        .into_iter()
        .flat_map(|(reg, val)| spi_write(reg, val))
        .collect();
    let mut imu = Icm42688p::new(SpiMock::new(&expectations));
    imu.init(&mut NoopDelay::new()).unwrap();
    imu.release().done();
}

#[test]
fn test_icm42688p_register_read_sets_read_flag() {
    let expectations = [
        SpiTrans::transaction_start(),
        SpiTrans::transfer_in_place(vec![0xF5, 0x00], vec![0x00, 0xDB]),
        SpiTrans::transaction_end(),
    ];
    let mut imu = Icm42688p::new(SpiMock::new(&expectations));
    assert_eq!(imu.read_register(0x75).unwrap(), 0xDB);
    imu.release().done();
}

#[test]
fn test_icm42688p_accel_burst() {
    let expectations = accel_read();
    let mut imu = Icm42688p::new(SpiMock::new(&expectations));
    let a = imu.read_accel_g().unwrap();
    assert_eq!((a.x, a.y, a.z), (0.0, 0.0, 1.0));
    imu.release().done();
}

#[test]
fn test_sensor_readings_are_published() {
    let i2c_exp = measure(climate_response());
    let i2c_bus = RefCell::new(I2cMock::new(&i2c_exp));
    let mut sensor = Shtc3::new(&i2c_bus);
    let spi_exp = accel_read();
    let mut imu = Icm42688p::new(SpiMock::new(&spi_exp));

    let mut bridge = SensorBridge::new(Recorder::default());
    bridge.dispatch(BrokerEvent::Connected);
    assert!(bridge.is_connected());

    let climate = sensor.read(&mut NoopDelay::new()).unwrap();
    bridge.publish_climate(&climate).unwrap();
    let accel = imu.read_accel_g().unwrap();
    bridge.publish_accel(&accel).unwrap();

    let sent: Vec<(&str, &str)> = bridge
        .publisher()
        .sent
        .iter()
        .map(|(t, p)| (t.as_str(), p.as_str()))
        .collect();
    assert_eq!(
        sent,
        [
            (TOPIC_TEMPERATURE, "25.00"),
            (TOPIC_HUMIDITY, "50.00"),
            (TOPIC_ACCELERATION, r#"{"x":0.000,"y":0.000,"z":1.000}"#),
        ]
    );

    bridge.dispatch(BrokerEvent::Published { msg_id: 7 });
    assert_eq!(bridge.acked(), 1);
    bridge.dispatch(BrokerEvent::Disconnected);
    assert!(!bridge.is_connected());

    i2c_bus.borrow_mut().done();
    imu.release().done();
}

#[test]
fn test_publish_failure_is_reported() {
    let mut bridge = SensorBridge::new(Recorder {
        offline: true,
        ..Recorder::default()
    });
    let climate = ledbox_core::utils::controllers::i2c::convert(0x6666, 0x8000);
    assert!(bridge.publish_climate(&climate).is_err());
}

#[test]
fn test_button_reports_falling_edge_once() {
    let expectations = [
        PinTrans::get(State::High),
        PinTrans::get(State::Low),
        PinTrans::get(State::Low),
        PinTrans::get(State::High),
        PinTrans::get(State::Low),
    ];
    let mut button = Button::new(PinMock::new(&expectations));
    let presses: Vec<bool> = (0..5).map(|_| button.poll_pressed().unwrap()).collect();
    assert_eq!(presses, [false, true, false, false, true]);
    button.release().done();
}

#[test]
fn test_button_confirm_needs_two_low_reads() {
    let expectations = [
        PinTrans::get(State::Low),
        PinTrans::get(State::Low),
        PinTrans::get(State::High),
        PinTrans::get(State::Low),
        PinTrans::get(State::High),
    ];
    let mut button = Button::new(PinMock::new(&expectations));
    assert!(block_on(button.confirm_pressed()).unwrap());
    assert!(!block_on(button.confirm_pressed()).unwrap());
    assert!(!block_on(button.confirm_pressed()).unwrap());
    button.release().done();
}

/// PWM channel keeping every duty written.
struct DutyLog(Vec<u16>);

impl ErrorType for DutyLog {
    type Error = Infallible;
}

impl SetDutyCycle for DutyLog {
    fn max_duty_cycle(&self) -> u16 {
        20_000
    }

    fn set_duty_cycle(
        &mut self,
        duty: u16,
    ) -> Result<(), Self::Error> {
        self.0.push(duty);
        Ok(())
    }
}

#[test]
fn test_door_session_from_web_json() {
    let config = DoorConfig {
        close_delay_ms: 250,
        ..DoorConfig::default()
    };
    let mut door = DoorLock::new(DutyLog(Vec::new()), config).unwrap();
    let web = |door: &mut DoorLock<DutyLog>, json: &str| -> String {
        let cmd: LockCommand = serde_json::from_str(json).unwrap();
        match door.dispatch(DoorEvent::Web { id: 0, cmd }).unwrap() {
            Effect::Reply(reply) => serde_json::to_string(&reply).unwrap(),
            other => panic!("expected reply, got {other:?}"),
        }
    };

    // unknown card: register it from the browser
    let card = heapless::Vec::from_slice(&[0x04, 0xA2, 0x3C, 0x91]).unwrap();
    door.dispatch(DoorEvent::TagDetected(card)).unwrap();
    assert_eq!(door.servo_angle(), 0);
    assert_eq!(web(&mut door, r#"{"lc":"add_tag","name":"Spare"}"#), r#"{"reply":"ok"}"#);
    assert_eq!(
        door.dispatch(DoorEvent::TagRemoved).unwrap(),
        Effect::ScheduleClose(250)
    );
    door.dispatch(DoorEvent::CloseTimerElapsed).unwrap();

    // the new card now opens the door
    let card = heapless::Vec::from_slice(&[0x04, 0xA2, 0x3C, 0x91]).unwrap();
    door.dispatch(DoorEvent::TagDetected(card)).unwrap();
    assert_eq!(door.servo_angle(), 90);

    assert_eq!(
        web(&mut door, r#"{"lc":"list_tags"}"#),
        r#"{"reply":"tags","tags":[{"uid":"E3 59 28 F7","name":"Chica"},{"uid":"04 A2 3C 91","name":"Spare"}]}"#
    );
    assert_eq!(
        web(&mut door, r#"{"lc":"remove_tag","uid":"ffff"}"#),
        r#"{"reply":"error","reason":"tag_not_found"}"#
    );
    assert_eq!(
        web(&mut door, r#"{"lc":"toggle_lock"}"#),
        r#"{"reply":"status","locked":true,"tag_present":true,"valid_tag_present":true,"close_pending":false}"#
    );
    assert_eq!(door.servo_angle(), 0);
}

/// PWM channel that fails every write while jammed.
struct Jammable {
    duties: Rc<RefCell<Vec<u16>>>,
    jammed: Rc<Cell<bool>>,
}

impl ErrorType for Jammable {
    type Error = pwm::ErrorKind;
}

impl SetDutyCycle for Jammable {
    fn max_duty_cycle(&self) -> u16 {
        20_000
    }

    fn set_duty_cycle(
        &mut self,
        duty: u16,
    ) -> Result<(), Self::Error> {
        if self.jammed.get() {
            return Err(pwm::ErrorKind::Other);
        }
        self.duties.borrow_mut().push(duty);
        Ok(())
    }
}

#[test]
fn test_door_task_routes_replies_and_closes_on_deadline() {
    const CLOSED_US: u16 = 500;
    const OPEN_US: u16 = 1500;

    let duties = Rc::new(RefCell::new(Vec::new()));
    let jammed = Rc::new(Cell::new(false));
    let pwm = Jammable {
        duties: duties.clone(),
        jammed: jammed.clone(),
    };
    let config = DoorConfig {
        close_delay_ms: 20,
        ..DoorConfig::default()
    };
    let last_duty = || duties.borrow().last().copied();

    let mut task = pin!(door::run(DoorLock::new(pwm, config).unwrap()));
    assert_eq!(last_duty(), Some(CLOSED_US));
    assert!(poll_once(task.as_mut()).is_pending());

    // a caller that goes away before its reply arrives
    {
        let abandoned = pin!(door::request(LockCommand::Status));
        assert!(poll_once(abandoned).is_pending());
    }
    assert!(poll_once(task.as_mut()).is_pending());

    // the next caller skips the orphaned reply and gets its own
    let mut listing = pin!(door::request(LockCommand::ListTags));
    assert!(poll_once(listing.as_mut()).is_pending());
    assert!(poll_once(task.as_mut()).is_pending());
    match poll_once(listing.as_mut()) {
        Poll::Ready(LockReply::Tags { tags }) => assert_eq!(tags.len(), 1),
        other => panic!("expected tag list, got {other:?}"),
    }

    // the task arms the close deadline and fires it
    let seed = heapless::Vec::from_slice(&[0xE3, 0x59, 0x28, 0xF7]).unwrap();
    LOCK_CHANNEL.try_send(DoorEvent::TagDetected(seed)).unwrap();
    assert!(poll_once(task.as_mut()).is_pending());
    assert_eq!(last_duty(), Some(OPEN_US));
    LOCK_CHANNEL.try_send(DoorEvent::TagRemoved).unwrap();
    assert!(poll_once(task.as_mut()).is_pending());
    assert_eq!(last_duty(), Some(OPEN_US));
    thread::sleep(Duration::from_millis(60));
    assert!(poll_once(task.as_mut()).is_pending());
    assert_eq!(last_duty(), Some(CLOSED_US));

    // a servo failure during a web command still answers
    jammed.set(true);
    let mut locking = pin!(door::request(LockCommand::ToggleLock));
    assert!(poll_once(locking.as_mut()).is_pending());
    assert!(poll_once(task.as_mut()).is_pending());
    assert_eq!(
        poll_once(locking.as_mut()),
        Poll::Ready(LockReply::Error {
            reason: LockError::ServoFault
        })
    );

    jammed.set(false);
    let mut status = pin!(door::request(LockCommand::Status));
    assert!(poll_once(status.as_mut()).is_pending());
    assert!(poll_once(task.as_mut()).is_pending());
    assert!(matches!(
        poll_once(status.as_mut()),
        Poll::Ready(LockReply::Status { locked: false, .. })
    ));
}
