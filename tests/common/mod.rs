//! Reference log decoder shared by the integration tests.
//!
//! Reads the text header, then decodes every data frame back into field
//! values using only what the header declares. Decoding stops quietly at a
//! truncated frame, the way a log cut off by a full device ends.

#![allow(dead_code)]

use std::collections::BTreeMap;

use blackbox_rs::fields::MAIN_FIELDS;
use blackbox_rs::{
    Blackbox, BlackboxConfig, BlackboxState, FlightData, GpsSolution, MainState, MemoryDevice,
    SlowState, SystemConfig,
};

/// One column declared by the `H Field` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub signed: bool,
    pub predictor: u8,
    pub encoding: u8,
    /// Predictor and encoding in `P` frames, for the main family.
    pub inter: Option<(u8, u8)>,
}

#[derive(Debug, Default, Clone)]
pub struct LogHeader {
    /// Every `H key:value` line that is not a field line, in order.
    pub lines: Vec<(String, String)>,
    pub fields: BTreeMap<char, Vec<FieldInfo>>,
}

impl LogHeader {
    pub fn value(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn field_names(&self, frame: char) -> Vec<&str> {
        self.fields
            .get(&frame)
            .map(|f| f.iter().map(|i| i.name.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn field_index(&self, frame: char, name: &str) -> Option<usize> {
        self.fields.get(&frame)?.iter().position(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SyncBeep(u32),
    InflightAdjustmentInt { function: u8, value: i32 },
    InflightAdjustmentFloat { function: u8, value: f32 },
    LoggingResume { iteration: u32, time: u32 },
    Disarm(u32),
    FlightMode { flags: u32, last_flags: u32 },
    GovernorState(u32),
    LogEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Intra(Vec<i64>),
    Inter(Vec<i64>),
    Slow(Vec<i64>),
    Gps(Vec<i64>),
    GpsHome(Vec<i64>),
    Event(Event),
}

impl Frame {
    pub fn marker(&self) -> char {
        match self {
            Frame::Intra(_) => 'I',
            Frame::Inter(_) => 'P',
            Frame::Slow(_) => 'S',
            Frame::Gps(_) => 'G',
            Frame::GpsHome(_) => 'H',
            Frame::Event(_) => 'E',
        }
    }

    /// Values of a main frame.
    pub fn main_values(&self) -> Option<&[i64]> {
        match self {
            Frame::Intra(v) | Frame::Inter(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct DecodedLog {
    pub header: LogHeader,
    pub frames: Vec<Frame>,
    /// The log ended with an end-of-log event.
    pub complete: bool,
}

impl DecodedLog {
    /// Frame markers in order, events included.
    pub fn markers(&self) -> String {
        self.frames.iter().map(Frame::marker).collect()
    }

    pub fn main_frames(&self) -> impl Iterator<Item = &[i64]> {
        self.frames.iter().filter_map(Frame::main_values)
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.frames.iter().filter_map(|f| match f {
            Frame::Event(e) => Some(e),
            _ => None,
        })
    }
}

/// Decode every log stored back to back in `bytes`.
pub fn decode_logs(bytes: &[u8]) -> Vec<DecodedLog> {
    let mut reader = Reader { bytes, pos: 0 };
    let mut logs = Vec::new();
    while !reader.at_end() {
        let header = parse_header(&mut reader);
        assert!(
            !header.lines.is_empty(),
            "expected a header at byte {}",
            reader.pos
        );
        let mut state = DecodeState::new(&header);
        let mut log = DecodedLog {
            header,
            ..Default::default()
        };
        while !reader.at_end() {
            match state.frame(&log.header, &mut reader) {
                Some(frame) => {
                    let end = frame == Frame::Event(Event::LogEnd);
                    log.frames.push(frame);
                    if end {
                        log.complete = true;
                        break;
                    }
                }
                // Truncated frame.
                None => reader.pos = bytes.len(),
            }
        }
        logs.push(log);
    }
    logs
}

/// Decode a buffer holding exactly one log.
pub fn decode_log(bytes: &[u8]) -> DecodedLog {
    let mut logs = decode_logs(bytes);
    assert_eq!(logs.len(), 1, "expected one log");
    logs.remove(0)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn byte(&mut self) -> Option<u8> {
        let b = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn unsigned_vb(&mut self) -> Option<u32> {
        let mut value = 0u32;
        for shift in (0..35).step_by(7) {
            let b = self.byte()?;
            value |= u32::from(b & 0x7F) << shift;
            if b & 0x80 == 0 {
                return Some(value);
            }
        }
        None
    }

    fn signed_vb(&mut self) -> Option<i32> {
        let v = self.unsigned_vb()?;
        Some(((v >> 1) as i32) ^ -((v & 1) as i32))
    }

    fn neg_14bit(&mut self) -> Option<i32> {
        let v = self.unsigned_vb()? & 0x3FFF;
        Some(-sign_extend(v, 14))
    }

    fn tag2_3s32(&mut self) -> Option<[i32; 3]> {
        let lead = self.byte()?;
        let values = match lead >> 6 {
            0 => [
                sign_extend(u32::from(lead >> 4), 2),
                sign_extend(u32::from(lead >> 2), 2),
                sign_extend(u32::from(lead), 2),
            ],
            1 => {
                let b = self.byte()?;
                [
                    sign_extend(u32::from(lead), 4),
                    sign_extend(u32::from(b >> 4), 4),
                    sign_extend(u32::from(b), 4),
                ]
            }
            2 => [
                sign_extend(u32::from(lead), 6),
                sign_extend(u32::from(self.byte()?), 6),
                sign_extend(u32::from(self.byte()?), 6),
            ],
            _ => {
                let mut values = [0; 3];
                for (i, value) in values.iter_mut().enumerate() {
                    let width = ((lead >> (2 * i)) & 0x03) as usize + 1;
                    let mut raw = 0u32;
                    for n in 0..width {
                        raw |= u32::from(self.byte()?) << (8 * n);
                    }
                    *value = sign_extend(raw, 8 * width as u32);
                }
                values
            }
        };
        Some(values)
    }

    fn tag8_4s16(&mut self) -> Option<[i32; 4]> {
        let selector = self.byte()?;
        let mut values = [0; 4];
        let mut nibble: Option<u8> = None;
        for (i, value) in values.iter_mut().enumerate() {
            *value = match (selector >> (2 * i)) & 0x03 {
                0 => 0,
                1 => match nibble.take() {
                    Some(n) => sign_extend(u32::from(n), 4),
                    None => {
                        let b = self.byte()?;
                        nibble = Some(b & 0x0F);
                        sign_extend(u32::from(b >> 4), 4)
                    }
                },
                2 => match nibble {
                    Some(n) => {
                        let b = self.byte()?;
                        nibble = Some(b & 0x0F);
                        i32::from(((n << 4) | (b >> 4)) as i8)
                    }
                    None => i32::from(self.byte()? as i8),
                },
                _ => match nibble {
                    Some(n) => {
                        let b1 = self.byte()?;
                        let b2 = self.byte()?;
                        nibble = Some(b2 & 0x0F);
                        let raw = (u16::from(n) << 12) | (u16::from(b1) << 4) | u16::from(b2 >> 4);
                        i32::from(raw as i16)
                    }
                    None => {
                        let hi = self.byte()?;
                        let lo = self.byte()?;
                        i32::from(i16::from_be_bytes([hi, lo]))
                    }
                },
            };
        }
        Some(values)
    }

    fn tag8_8svb(&mut self, count: usize) -> Option<Vec<i32>> {
        if count == 1 {
            return Some(vec![self.signed_vb()?]);
        }
        let header = self.byte()?;
        (0..count)
            .map(|i| {
                if header & (1 << i) != 0 {
                    self.signed_vb()
                } else {
                    Some(0)
                }
            })
            .collect()
    }
}

fn sign_extend(raw: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((raw << shift) as i32) >> shift
}

fn parse_header(reader: &mut Reader<'_>) -> LogHeader {
    let mut header = LogHeader::default();
    let mut field_lines: BTreeMap<(char, String), Vec<String>> = BTreeMap::new();

    while reader.bytes[reader.pos..].starts_with(b"H ") {
        let rest = &reader.bytes[reader.pos..];
        let Some(len) = rest.iter().position(|&b| b == b'\n') else {
            break;
        };
        let line = String::from_utf8_lossy(&rest[2..len]).into_owned();
        reader.pos += len + 1;

        let (key, value) = line.split_once(':').expect("header line without ':'");
        if let Some(field) = key.strip_prefix("Field ") {
            let (frame, attr) = field.split_once(' ').expect("malformed field line");
            let frame = frame.chars().next().expect("empty frame letter");
            let values = if value.is_empty() {
                Vec::new()
            } else {
                value.split(',').map(str::to_owned).collect()
            };
            field_lines.insert((frame, attr.to_owned()), values);
        } else {
            header.lines.push((key.to_owned(), value.to_owned()));
        }
    }

    for frame in ['I', 'S', 'G', 'H'] {
        let Some(names) = field_lines.get(&(frame, "name".to_owned())) else {
            continue;
        };
        let column = |attr: &str, i: usize| -> u8 {
            field_lines[&(frame, attr.to_owned())][i]
                .parse()
                .expect("numeric field attribute")
        };
        let inter = |attr: &str, i: usize| -> Option<u8> {
            let values = field_lines.get(&('P', attr.to_owned()))?;
            values[i].parse().ok()
        };
        let fields = names
            .iter()
            .enumerate()
            .map(|(i, name)| FieldInfo {
                name: name.clone(),
                signed: column("signed", i) == 1,
                predictor: column("predictor", i),
                encoding: column("encoding", i),
                inter: if frame == 'I' {
                    Some((
                        inter("predictor", i).expect("P predictor"),
                        inter("encoding", i).expect("P encoding"),
                    ))
                } else {
                    None
                },
            })
            .collect();
        header.fields.insert(frame, fields);
    }

    header
}

/// Decoder context carried from frame to frame.
struct DecodeState {
    vbat_ref: i64,
    previous: Vec<i64>,
    before_previous: Vec<i64>,
    home: [i64; 2],
    last_main_time: i64,
    time_index: Option<usize>,
}

impl DecodeState {
    fn new(header: &LogHeader) -> Self {
        Self {
            vbat_ref: header
                .value("vbatref")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            previous: Vec::new(),
            before_previous: Vec::new(),
            home: [0; 2],
            last_main_time: 0,
            time_index: header.field_index('I', "time"),
        }
    }

    fn frame(&mut self, header: &LogHeader, reader: &mut Reader<'_>) -> Option<Frame> {
        let marker = reader.byte()?;
        let table = |c: char| header.fields.get(&c).map(Vec::as_slice).unwrap_or(&[]);
        let frame = match marker {
            b'I' => {
                let values = self.fields(table('I'), reader, Coding::Intra)?;
                self.previous = values.clone();
                self.before_previous = values.clone();
                self.note_main_time(&values);
                Frame::Intra(values)
            }
            b'P' => {
                let values = self.fields(table('I'), reader, Coding::Inter)?;
                self.before_previous = std::mem::replace(&mut self.previous, values.clone());
                self.note_main_time(&values);
                Frame::Inter(values)
            }
            b'S' => Frame::Slow(self.fields(table('S'), reader, Coding::Intra)?),
            b'H' => {
                let values = self.fields(table('H'), reader, Coding::Intra)?;
                self.home = [values[0], values[1]];
                Frame::GpsHome(values)
            }
            b'G' => Frame::Gps(self.fields(table('G'), reader, Coding::Intra)?),
            b'E' => Frame::Event(event(reader)?),
            other => panic!("unknown frame marker {other:#04x} at byte {}", reader.pos - 1),
        };
        Some(frame)
    }

    fn note_main_time(&mut self, values: &[i64]) {
        if let Some(i) = self.time_index {
            self.last_main_time = values[i];
        }
    }

    fn fields(
        &self,
        table: &[FieldInfo],
        reader: &mut Reader<'_>,
        coding: Coding,
    ) -> Option<Vec<i64>> {
        let coding_of = |f: &FieldInfo| match coding {
            Coding::Intra => (f.predictor, f.encoding),
            Coding::Inter => f.inter.unwrap_or((f.predictor, f.encoding)),
        };

        let mut deltas = vec![0i64; table.len()];
        let mut i = 0;
        while i < table.len() {
            let (_, encoding) = coding_of(&table[i]);
            let group = match encoding {
                6 => 8,
                7 => 3,
                8 => 4,
                _ => 1,
            };
            let mut len = 1;
            while len < group && i + len < table.len() && coding_of(&table[i + len]).1 == encoding
            {
                len += 1;
            }
            match encoding {
                0 => deltas[i] = i64::from(reader.signed_vb()?),
                1 => deltas[i] = i64::from(reader.unsigned_vb()?),
                3 => deltas[i] = i64::from(reader.neg_14bit()?),
                6 => {
                    for (n, v) in reader.tag8_8svb(len)?.into_iter().enumerate() {
                        deltas[i + n] = i64::from(v);
                    }
                }
                7 => {
                    for (n, v) in reader.tag2_3s32()?.into_iter().take(len).enumerate() {
                        deltas[i + n] = i64::from(v);
                    }
                }
                8 => {
                    for (n, v) in reader.tag8_4s16()?.into_iter().take(len).enumerate() {
                        deltas[i + n] = i64::from(v);
                    }
                }
                9 => {}
                other => panic!("unknown encoding {other}"),
            }
            i += len;
        }

        let values = table
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let (predictor, encoding) = coding_of(field);
                let raw = self.predict(predictor, i, &field.name) + deltas[i];
                normalize(raw, field.signed, encoding == 8)
            })
            .collect();
        Some(values)
    }

    fn predict(&self, predictor: u8, i: usize, name: &str) -> i64 {
        let prev = || self.previous.get(i).copied().unwrap_or(0);
        let prev2 = || self.before_previous.get(i).copied().unwrap_or(0);
        match predictor {
            0 => 0,
            1 => prev(),
            2 => 2 * prev() - prev2(),
            3 => (prev() + prev2()) / 2,
            6 => prev() + 1,
            7 => self.home[usize::from(name.ends_with("[1]"))],
            9 => self.vbat_ref,
            10 => self.last_main_time,
            other => panic!("unknown predictor {other}"),
        }
    }
}

#[derive(Clone, Copy)]
enum Coding {
    Intra,
    Inter,
}

/// Wrap a reconstructed value to the width the wire carries it in.
fn normalize(raw: i64, signed: bool, sixteen_bit: bool) -> i64 {
    match (sixteen_bit, signed) {
        (true, true) => i64::from(raw as i16),
        (true, false) => i64::from(raw as u16),
        (false, true) => i64::from(raw as i32),
        (false, false) => i64::from(raw as u32),
    }
}

fn event(reader: &mut Reader<'_>) -> Option<Event> {
    let id = reader.byte()?;
    let event = match id {
        0 => Event::SyncBeep(reader.unsigned_vb()?),
        13 => {
            let function = reader.byte()?;
            if function & 0x80 != 0 {
                let mut bytes = [0u8; 4];
                for b in &mut bytes {
                    *b = reader.byte()?;
                }
                Event::InflightAdjustmentFloat {
                    function: function & 0x7F,
                    value: f32::from_le_bytes(bytes),
                }
            } else {
                Event::InflightAdjustmentInt {
                    function,
                    value: reader.signed_vb()?,
                }
            }
        }
        14 => Event::LoggingResume {
            iteration: reader.unsigned_vb()?,
            time: reader.unsigned_vb()?,
        },
        15 => Event::Disarm(reader.unsigned_vb()?),
        30 => Event::FlightMode {
            flags: reader.unsigned_vb()?,
            last_flags: reader.unsigned_vb()?,
        },
        40 => Event::GovernorState(reader.unsigned_vb()?),
        255 => {
            let message = b"End of log\0";
            for &expected in message {
                assert_eq!(reader.byte()?, expected, "corrupt end-of-log marker");
            }
            Event::LogEnd
        }
        other => panic!("unknown event id {other}"),
    };
    Some(event)
}

/// Scripted craft: main states are produced by a closure of the iteration.
pub struct ScriptedCraft {
    pub system: SystemConfig,
    pub armed: bool,
    pub main: fn(u32) -> MainState,
    pub slow: SlowState,
    pub gps: Option<GpsSolution>,
    pub home: [i32; 2],
    pub battery: u16,
    pub flight_mode: u32,
    /// Iteration number handed to `main`, bumped by the test loop.
    pub tick: std::cell::Cell<u32>,
}

impl ScriptedCraft {
    pub fn new(main: fn(u32) -> MainState) -> Self {
        Self {
            system: SystemConfig::default(),
            armed: true,
            main,
            slow: SlowState::default(),
            gps: None,
            home: [0; 2],
            battery: 0,
            flight_mode: 0,
            tick: std::cell::Cell::new(0),
        }
    }
}

impl FlightData for ScriptedCraft {
    fn system_config(&self) -> &SystemConfig {
        &self.system
    }

    fn is_armed(&self) -> bool {
        self.armed
    }

    fn load_main(&self, state: &mut MainState) {
        *state = (self.main)(self.tick.get());
    }

    fn slow_state(&self) -> SlowState {
        self.slow
    }

    fn gps(&self) -> Option<GpsSolution> {
        self.gps
    }

    fn gps_home(&self) -> [i32; 2] {
        self.home
    }

    fn flight_mode_flags(&self) -> u32 {
        self.flight_mode
    }

    fn battery_voltage(&self) -> u16 {
        self.battery
    }
}

/// Run one control loop iteration at `tick` milliseconds.
pub fn step(bb: &mut Blackbox<MemoryDevice>, craft: &ScriptedCraft, tick: &mut u32) {
    craft.tick.set(*tick);
    bb.update(u64::from(*tick) * 1000, craft);
    *tick += 1;
}

/// Tick until the recorder is logging data frames.
pub fn run_until_running(bb: &mut Blackbox<MemoryDevice>, craft: &ScriptedCraft, tick: &mut u32) {
    for _ in 0..5000 {
        if bb.state() == BlackboxState::Running {
            return;
        }
        step(bb, craft, tick);
    }
    panic!("recorder stuck in {:?}", bb.state());
}

/// Record `iterations` logged iterations and finish with a disarm event.
pub fn record(
    config: BlackboxConfig,
    craft: &ScriptedCraft,
    iterations: u32,
) -> Blackbox<MemoryDevice> {
    record_on(MemoryDevice::new(1 << 22), config, craft, iterations)
}

/// [`record`] onto a prepared device.
pub fn record_on(
    device: MemoryDevice,
    config: BlackboxConfig,
    craft: &ScriptedCraft,
    iterations: u32,
) -> Blackbox<MemoryDevice> {
    let looptime = craft.system.looptime_us;
    let mut bb = Blackbox::new(config, device, looptime);
    let mut tick = 0;
    run_until_running(&mut bb, craft, &mut tick);
    for _ in 0..iterations {
        step(&mut bb, craft, &mut tick);
    }
    bb.disarm(1, u64::from(tick) * 1000);
    // Stop at the first tick back in `Stopped`; the craft is still armed.
    for _ in 0..10 {
        if bb.state() == BlackboxState::Stopped {
            break;
        }
        step(&mut bb, craft, &mut tick);
    }
    bb
}

/// Bytes of the text header at the start of `bytes`.
pub fn header_bytes(bytes: &[u8]) -> &[u8] {
    let mut pos = 0;
    while bytes[pos..].starts_with(b"H ") {
        match bytes[pos..].iter().position(|&b| b == b'\n') {
            Some(len) => pos += len + 1,
            None => break,
        }
    }
    &bytes[..pos]
}

/// Check every decoded main frame against the state the craft reported.
///
/// The frame's time column identifies the tick it was recorded on.
pub fn assert_main_frames_match(log: &DecodedLog, main: fn(u32) -> MainState) -> usize {
    let names = log.header.field_names('I');
    let time = log.header.field_index('I', "time").expect("time column");
    let iteration = log
        .header
        .field_index('I', "loopIteration")
        .expect("loopIteration column");
    let defs: Vec<_> = names
        .iter()
        .map(|name| {
            MAIN_FIELDS
                .iter()
                .find(|d| d.to_string() == *name)
                .unwrap_or_else(|| panic!("unknown field {name}"))
        })
        .collect();

    let mut checked = 0;
    for values in log.main_frames() {
        assert_eq!(values.len(), defs.len());
        let mut expected = main((values[time] / 1000) as u32);
        expected.time = values[time] as u32;
        expected.iteration = values[iteration] as u32;
        for (def, &value) in defs.iter().zip(values) {
            assert_eq!(value, def.read(&expected), "field {def} at time {}", values[time]);
        }
        checked += 1;
    }
    checked
}
