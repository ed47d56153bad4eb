//! PostgreSQL binary codecs for the built-in wire types.
//!
//! These are the leaf codecs every field codec bottoms out in. Layouts:
//!
//! ```text
//! bool        1 byte, 0 / 1
//! int2/4/8    big-endian two's complement
//! float4/8    big-endian IEEE 754
//! numeric     ndigits:i16 weight:i16 sign:u16 dscale:u16 digit:i16*ndigits
//! char, text  UTF-8
//! bytea       raw bytes
//! date        days since 2000-01-01 (i32)
//! timestamp   microseconds since 2000-01-01 00:00:00 (i64)
//! time        microseconds since midnight (i64), 24:00:00 is chrono's 23:59:60
//! timetz      microseconds since midnight (i64) + seconds west of UTC (i32)
//! interval    microseconds (i64) + days (i32) + months (i32)
//! uuid        16 bytes
//! json        UTF-8 JSON text
//! jsonb       version byte 1 + UTF-8 JSON text
//! ```

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Timelike};
use uuid::Uuid;

use crate::error::{DecodeError, EncodeError};
use crate::registry::ScalarCodec;
use crate::value::{Decimal, Interval, TimeTz, Value};
use crate::wire::{ByteReader, WireType};

/// Days from 0001-01-01 (CE day 1) to 2000-01-01.
const PG_EPOCH_CE_DAYS: i32 = 730_120;
/// Microseconds from the Unix epoch to 2000-01-01 00:00:00 UTC.
const PG_EPOCH_UNIX_MICROS: i64 = 946_684_800_000_000;
const MICROS_PER_SEC: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SEC;
const JSONB_VERSION: u8 = 1;

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_BASE: i16 = 10_000;

/// Built-in codec for one `WireType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinCodec {
    wire: WireType,
}

impl BuiltinCodec {
    pub fn new(wire: WireType) -> Self {
        Self { wire }
    }

    pub fn wire(&self) -> WireType {
        self.wire
    }
}

impl ScalarCodec for BuiltinCodec {
    fn type_name(&self) -> &str {
        self.wire.name()
    }

    fn oid(&self) -> u32 {
        self.wire.oid()
    }

    fn array_oid(&self) -> u32 {
        self.wire.array_oid()
    }

    fn decode(&self, raw: &[u8]) -> Result<Value, DecodeError> {
        let name = self.wire.name();
        let mut r = ByteReader::new(raw, name);
        let value = match self.wire {
            WireType::Bool => match r.array::<1>()? {
                [0] => Value::Bool(false),
                [1] => Value::Bool(true),
                [b] => return Err(DecodeError::malformed(name, format!("byte {b}"))),
            },
            WireType::Int2 => Value::Int2(r.i16()?),
            WireType::Int4 => Value::Int4(r.i32()?),
            WireType::Int8 => Value::Int8(r.i64()?),
            WireType::Float4 => Value::Float4(f32::from_be_bytes(r.array()?)),
            WireType::Float8 => Value::Float8(f64::from_be_bytes(r.array()?)),
            WireType::Numeric => Value::Numeric(decode_numeric(&mut r)?),
            WireType::Char => return decode_char(raw).map(Value::Char),
            WireType::Text => return decode_text(raw, name).map(|s| Value::Text(s.to_string())),
            WireType::Bytea => return Ok(Value::Bytea(raw.to_vec())),
            WireType::Date => Value::Date(decode_date(r.i32()?)?),
            WireType::Timestamp => Value::Timestamp(decode_timestamp(r.i64()?)?.naive_utc()),
            WireType::TimestampTz => Value::TimestampTz(decode_timestamp(r.i64()?)?),
            WireType::Time => Value::Time(decode_time(r.i64()?)?),
            WireType::TimeTz => {
                let time = decode_time(r.i64()?)?;
                let west = r.i32()?;
                let offset = FixedOffset::west_opt(west)
                    .ok_or_else(|| DecodeError::out_of_range(west, "zone offset"))?;
                Value::TimeTz(TimeTz::new(time, offset))
            }
            WireType::Interval => {
                let microseconds = r.i64()?;
                let days = r.i32()?;
                let months = r.i32()?;
                Value::Interval(Interval::new(months, days, microseconds))
            }
            WireType::Uuid => Value::Uuid(Uuid::from_bytes(r.array()?)),
            WireType::Json => return decode_json(raw, name).map(Value::Json),
            WireType::Jsonb => {
                let [version] = r.array::<1>()?;
                if version != JSONB_VERSION {
                    return Err(DecodeError::malformed(name, format!("version {version}")));
                }
                return decode_json(&raw[1..], name).map(Value::Json);
            }
        };
        r.finish()?;
        Ok(value)
    }

    fn encode(&self, value: &Value, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let name = self.wire.name();
        match (self.wire, value) {
            (WireType::Bool, Value::Bool(v)) => out.push(u8::from(*v)),
            (WireType::Int2, Value::Int2(v)) => out.extend_from_slice(&v.to_be_bytes()),
            (WireType::Int4, Value::Int4(v)) => out.extend_from_slice(&v.to_be_bytes()),
            (WireType::Int8, Value::Int8(v)) => out.extend_from_slice(&v.to_be_bytes()),
            (WireType::Float4, Value::Float4(v)) => out.extend_from_slice(&v.to_be_bytes()),
            (WireType::Float8, Value::Float8(v)) => out.extend_from_slice(&v.to_be_bytes()),
            (WireType::Numeric, Value::Numeric(v)) => encode_numeric(*v, out)?,
            (WireType::Char, Value::Char(c)) => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            (WireType::Text, Value::Text(s)) => out.extend_from_slice(s.as_bytes()),
            (WireType::Bytea, Value::Bytea(b)) => out.extend_from_slice(b),
            (WireType::Date, Value::Date(d)) => {
                let days = d.num_days_from_ce() - PG_EPOCH_CE_DAYS;
                out.extend_from_slice(&days.to_be_bytes());
            }
            (WireType::Timestamp, Value::Timestamp(ts)) => {
                let micros = encode_timestamp(ts.and_utc().timestamp_micros(), name)?;
                out.extend_from_slice(&micros.to_be_bytes());
            }
            (WireType::TimestampTz, Value::TimestampTz(ts)) => {
                let micros = encode_timestamp(ts.timestamp_micros(), name)?;
                out.extend_from_slice(&micros.to_be_bytes());
            }
            (WireType::Time, Value::Time(t)) => {
                out.extend_from_slice(&encode_time(*t).to_be_bytes());
            }
            (WireType::TimeTz, Value::TimeTz(t)) => {
                out.extend_from_slice(&encode_time(t.time).to_be_bytes());
                let west = -t.offset.local_minus_utc();
                out.extend_from_slice(&west.to_be_bytes());
            }
            (WireType::Interval, Value::Interval(iv)) => {
                out.extend_from_slice(&iv.microseconds.to_be_bytes());
                out.extend_from_slice(&iv.days.to_be_bytes());
                out.extend_from_slice(&iv.months.to_be_bytes());
            }
            (WireType::Uuid, Value::Uuid(u)) => out.extend_from_slice(u.as_bytes()),
            (WireType::Json, Value::Json(doc)) => encode_json(doc, name, out)?,
            (WireType::Jsonb, Value::Json(doc)) => {
                out.push(JSONB_VERSION);
                encode_json(doc, name, out)?;
            }
            (_, other) => return Err(EncodeError::mismatch(name, other.kind())),
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════
//  Text / JSON
// ════════════════════════════════════════════════════════════════

fn decode_text<'a>(raw: &'a [u8], name: &str) -> Result<&'a str, DecodeError> {
    std::str::from_utf8(raw).map_err(|e| DecodeError::malformed(name, e))
}

fn decode_char(raw: &[u8]) -> Result<char, DecodeError> {
    let name = WireType::Char.name();
    let text = decode_text(raw, name)?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(DecodeError::malformed(
            name,
            format!("{} characters", text.chars().count()),
        )),
    }
}

fn decode_json(raw: &[u8], name: &str) -> Result<serde_json::Value, DecodeError> {
    serde_json::from_slice(raw).map_err(|e| DecodeError::malformed(name, e))
}

fn encode_json(doc: &serde_json::Value, name: &str, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    serde_json::to_writer(out, doc).map_err(|e| EncodeError::unrepresentable(name, e))
}

// ════════════════════════════════════════════════════════════════
//  Date / time
// ════════════════════════════════════════════════════════════════

fn decode_date(days: i32) -> Result<NaiveDate, DecodeError> {
    days.checked_add(PG_EPOCH_CE_DAYS)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| DecodeError::out_of_range(days, "date"))
}

fn decode_timestamp(micros: i64) -> Result<DateTime<chrono::Utc>, DecodeError> {
    micros
        .checked_add(PG_EPOCH_UNIX_MICROS)
        .and_then(DateTime::from_timestamp_micros)
        .ok_or_else(|| DecodeError::out_of_range(micros, "timestamp"))
}

fn encode_timestamp(unix_micros: i64, name: &str) -> Result<i64, EncodeError> {
    unix_micros
        .checked_sub(PG_EPOCH_UNIX_MICROS)
        .ok_or_else(|| EncodeError::out_of_range(unix_micros, name))
}

fn decode_time(micros: i64) -> Result<NaiveTime, DecodeError> {
    // The server allows 24:00:00. chrono has no such time, so it maps to
    // the leap second representation, which encodes back to the same count.
    if micros == MICROS_PER_DAY {
        return NaiveTime::from_hms_micro_opt(23, 59, 59, 1_000_000)
            .ok_or_else(|| DecodeError::out_of_range(micros, "time"));
    }
    let secs = micros.div_euclid(MICROS_PER_SEC);
    let nanos = micros.rem_euclid(MICROS_PER_SEC) * 1_000;
    u32::try_from(secs)
        .ok()
        .and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos as u32))
        .ok_or_else(|| DecodeError::out_of_range(micros, "time"))
}

fn encode_time(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight()) * MICROS_PER_SEC
        + i64::from(time.nanosecond() / 1_000)
}

// ════════════════════════════════════════════════════════════════
//  Numeric
// ════════════════════════════════════════════════════════════════

fn decode_numeric(r: &mut ByteReader<'_>) -> Result<Decimal, DecodeError> {
    let name = WireType::Numeric.name();
    let ndigits = r.i16()?;
    let weight = r.i16()?;
    let sign = r.u16()?;
    let dscale = r.u16()?;

    if sign != NUMERIC_POS && sign != NUMERIC_NEG {
        return Err(DecodeError::malformed(name, format!("special value 0x{sign:04x}")));
    }
    if ndigits < 0 {
        return Err(DecodeError::malformed(name, format!("{ndigits} digits")));
    }

    let negative = sign == NUMERIC_NEG;
    let overflow = || DecodeError::out_of_range("numeric", "Decimal");
    let push = |acc: i128, digit: i128| {
        let acc = acc.checked_mul(10)?;
        if negative {
            acc.checked_sub(digit)
        } else {
            acc.checked_add(digit)
        }
    };

    // Walk the decimal digits most significant first. `exp` is the power
    // of ten of the next digit; digits below the display scale must be 0.
    let min_exp = -i32::from(dscale);
    let mut exp = 4 * i32::from(weight) + 3;
    let mut acc: i128 = 0;
    for _ in 0..ndigits {
        let group = r.i16()?;
        if !(0..NUMERIC_BASE).contains(&group) {
            return Err(DecodeError::malformed(name, format!("digit {group}")));
        }
        for place in [1000, 100, 10, 1] {
            let digit = i128::from(group / place % 10);
            if exp >= min_exp {
                acc = push(acc, digit).ok_or_else(overflow)?;
            } else if digit != 0 {
                return Err(DecodeError::malformed(name, "digits beyond display scale"));
            }
            exp -= 1;
        }
    }

    // Implicit zeros between the last digit and the display scale.
    if acc != 0 && exp >= min_exp {
        acc = 10i128
            .checked_pow((exp - min_exp + 1).unsigned_abs())
            .and_then(|p| acc.checked_mul(p))
            .ok_or_else(overflow)?;
    }

    Ok(Decimal::new(acc, dscale))
}

fn encode_numeric(value: Decimal, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    let name = WireType::Numeric.name();
    let overflow = || EncodeError::out_of_range(value, name);

    // Decimal digits with at least one integer digit, split at the point.
    let scale = usize::from(value.scale);
    let digits = value.mantissa.unsigned_abs().to_string();
    let digits = format!("{digits:0>width$}", width = scale + 1);
    let (int, frac) = digits.as_bytes().split_at(digits.len() - scale);

    // Integer digits group from the point leftwards, fraction digits
    // rightwards; both are zero-padded to whole base-10000 groups.
    let int_pad = (4 - int.len() % 4) % 4;
    let frac_pad = (4 - frac.len() % 4) % 4;
    let padded: Vec<u8> = std::iter::repeat_n(b'0', int_pad)
        .chain(int.iter().copied())
        .chain(frac.iter().copied())
        .chain(std::iter::repeat_n(b'0', frac_pad))
        .collect();
    let mut groups: Vec<i16> = padded
        .chunks(4)
        .map(|chunk| chunk.iter().fold(0i16, |acc, b| acc * 10 + i16::from(b - b'0')))
        .collect();

    let mut weight = ((int.len() + int_pad) / 4) as i32 - 1;
    let leading = groups.iter().take_while(|g| **g == 0).count();
    groups.drain(..leading);
    weight -= leading as i32;
    while groups.last() == Some(&0) {
        groups.pop();
    }

    let ndigits = i16::try_from(groups.len()).map_err(|_| overflow())?;
    let weight = if groups.is_empty() {
        0
    } else {
        i16::try_from(weight).map_err(|_| overflow())?
    };
    let sign = if value.mantissa < 0 {
        NUMERIC_NEG
    } else {
        NUMERIC_POS
    };

    out.extend_from_slice(&ndigits.to_be_bytes());
    out.extend_from_slice(&weight.to_be_bytes());
    out.extend_from_slice(&sign.to_be_bytes());
    out.extend_from_slice(&value.scale.to_be_bytes());
    for digit in groups {
        out.extend_from_slice(&digit.to_be_bytes());
    }
    Ok(())
}
