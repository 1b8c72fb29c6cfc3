//! Physical value types carried by scalar and vector elements.
//!
//! # Responsibility
//! - Enumerate the closed set of physical types and their wire widths.
//! - Convert between the 12-byte PQDIF timestamp and Unix epoch time.
//!
//! # Invariants
//! - Every physical type has a fixed, non-zero byte width.
//! - All multi-byte values are little-endian.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Declared storage type of a scalar or vector element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalType {
    Boolean1,
    Boolean2,
    Boolean4,
    Char1,
    Char2,
    Integer1,
    Integer2,
    Integer4,
    UnsignedInteger1,
    UnsignedInteger2,
    UnsignedInteger4,
    Real4,
    Real8,
    Complex8,
    Complex16,
    Timestamp,
    Guid,
}

impl PhysicalType {
    /// Wire code used by the physical layer.
    pub fn code(self) -> u8 {
        match self {
            Self::Boolean1 => 1,
            Self::Boolean2 => 2,
            Self::Boolean4 => 3,
            Self::Char1 => 10,
            Self::Char2 => 11,
            Self::Integer1 => 20,
            Self::Integer2 => 21,
            Self::Integer4 => 22,
            Self::UnsignedInteger1 => 30,
            Self::UnsignedInteger2 => 31,
            Self::UnsignedInteger4 => 32,
            Self::Real4 => 40,
            Self::Real8 => 41,
            Self::Complex8 => 42,
            Self::Complex16 => 43,
            Self::Timestamp => 50,
            Self::Guid => 60,
        }
    }

    /// Parses a wire code. Returns `None` for codes outside the closed set.
    pub fn from_code(code: u8) -> Option<Self> {
        let physical_type = match code {
            1 => Self::Boolean1,
            2 => Self::Boolean2,
            3 => Self::Boolean4,
            10 => Self::Char1,
            11 => Self::Char2,
            20 => Self::Integer1,
            21 => Self::Integer2,
            22 => Self::Integer4,
            30 => Self::UnsignedInteger1,
            31 => Self::UnsignedInteger2,
            32 => Self::UnsignedInteger4,
            40 => Self::Real4,
            41 => Self::Real8,
            42 => Self::Complex8,
            43 => Self::Complex16,
            50 => Self::Timestamp,
            60 => Self::Guid,
            _ => return None,
        };
        Some(physical_type)
    }

    /// Width in bytes of one value of this type.
    pub fn byte_size(self) -> usize {
        match self {
            Self::Boolean1 | Self::Char1 | Self::Integer1 | Self::UnsignedInteger1 => 1,
            Self::Boolean2 | Self::Char2 | Self::Integer2 | Self::UnsignedInteger2 => 2,
            Self::Boolean4 | Self::Integer4 | Self::UnsignedInteger4 | Self::Real4 => 4,
            Self::Real8 | Self::Complex8 => 8,
            Self::Timestamp => TIMESTAMP_SIZE,
            Self::Complex16 | Self::Guid => 16,
        }
    }
}

impl Display for PhysicalType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

const TIMESTAMP_SIZE: usize = 12;
const SECONDS_PER_DAY: f64 = 86_400.0;
const MILLIS_PER_DAY: i64 = 86_400_000;
/// Days between 1900-01-01 and 1970-01-01.
const UNIX_EPOCH_DAYS: i64 = 25_567;

/// PQDIF timestamp: whole days since 1900-01-01 plus seconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Timestamp {
    pub days: u32,
    pub seconds: f64,
}

impl Timestamp {
    pub fn new(days: u32, seconds: f64) -> Self {
        Self { days, seconds }
    }

    /// Current wall-clock time (UTC).
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let whole_days = elapsed.as_secs() / 86_400;
        let seconds = elapsed.as_secs_f64() - (whole_days as f64) * SECONDS_PER_DAY;
        Self {
            days: (UNIX_EPOCH_DAYS as u64 + whole_days) as u32,
            seconds,
        }
    }

    /// Converts Unix epoch milliseconds.
    ///
    /// Returns `None` for instants before 1900-01-01 or past the `u32` day range.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        let days = millis.div_euclid(MILLIS_PER_DAY) + UNIX_EPOCH_DAYS;
        let days = u32::try_from(days).ok()?;
        let millis_of_day = millis.rem_euclid(MILLIS_PER_DAY);
        Some(Self {
            days,
            seconds: millis_of_day as f64 / 1000.0,
        })
    }

    /// Unix epoch milliseconds, rounded to the nearest millisecond.
    pub fn to_unix_millis(&self) -> i64 {
        (i64::from(self.days) - UNIX_EPOCH_DAYS) * MILLIS_PER_DAY
            + (self.seconds * 1000.0).round() as i64
    }

    pub(crate) fn to_bytes(self) -> [u8; TIMESTAMP_SIZE] {
        let mut bytes = [0u8; TIMESTAMP_SIZE];
        bytes[..4].copy_from_slice(&self.days.to_le_bytes());
        bytes[4..].copy_from_slice(&self.seconds.to_le_bytes());
        bytes
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let days = u32::from_le_bytes(bytes.get(..4)?.try_into().ok()?);
        let seconds = f64::from_le_bytes(bytes.get(4..TIMESTAMP_SIZE)?.try_into().ok()?);
        Some(Self { days, seconds })
    }
}

/// Decoded value of one physical slot, used for generic inspection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalValue {
    Boolean(bool),
    Char(u16),
    Integer(i64),
    UnsignedInteger(u64),
    Real(f64),
    Complex { re: f64, im: f64 },
    Timestamp(Timestamp),
    Guid(Uuid),
}

impl PhysicalValue {
    /// Decodes one value of `physical_type` from the front of `bytes`.
    pub fn decode(physical_type: PhysicalType, bytes: &[u8]) -> Option<Self> {
        let raw = bytes.get(..physical_type.byte_size())?;
        let value = match physical_type {
            PhysicalType::Boolean1 | PhysicalType::Boolean2 | PhysicalType::Boolean4 => {
                Self::Boolean(raw.iter().any(|byte| *byte != 0))
            }
            PhysicalType::Char1 => Self::Char(u16::from(raw[0])),
            PhysicalType::Char2 => Self::Char(u16::from_le_bytes([raw[0], raw[1]])),
            PhysicalType::Integer1 => Self::Integer(i64::from(raw[0] as i8)),
            PhysicalType::Integer2 => {
                Self::Integer(i64::from(i16::from_le_bytes([raw[0], raw[1]])))
            }
            PhysicalType::Integer4 => {
                Self::Integer(i64::from(i32::from_le_bytes(raw.try_into().ok()?)))
            }
            PhysicalType::UnsignedInteger1 => Self::UnsignedInteger(u64::from(raw[0])),
            PhysicalType::UnsignedInteger2 => {
                Self::UnsignedInteger(u64::from(u16::from_le_bytes([raw[0], raw[1]])))
            }
            PhysicalType::UnsignedInteger4 => {
                Self::UnsignedInteger(u64::from(u32::from_le_bytes(raw.try_into().ok()?)))
            }
            PhysicalType::Real4 => Self::Real(f64::from(f32::from_le_bytes(raw.try_into().ok()?))),
            PhysicalType::Real8 => Self::Real(f64::from_le_bytes(raw.try_into().ok()?)),
            PhysicalType::Complex8 => Self::Complex {
                re: f64::from(f32::from_le_bytes(raw[..4].try_into().ok()?)),
                im: f64::from(f32::from_le_bytes(raw[4..].try_into().ok()?)),
            },
            PhysicalType::Complex16 => Self::Complex {
                re: f64::from_le_bytes(raw[..8].try_into().ok()?),
                im: f64::from_le_bytes(raw[8..].try_into().ok()?),
            },
            PhysicalType::Timestamp => Self::Timestamp(Timestamp::from_bytes(raw)?),
            PhysicalType::Guid => Self::Guid(guid_from_bytes(raw)?),
        };
        Some(value)
    }
}

/// GUIDs are stored in the Microsoft mixed-endian layout.
pub(crate) fn guid_to_bytes(value: Uuid) -> [u8; 16] {
    value.to_bytes_le()
}

pub(crate) fn guid_from_bytes(bytes: &[u8]) -> Option<Uuid> {
    let raw: [u8; 16] = bytes.get(..16)?.try_into().ok()?;
    Some(Uuid::from_bytes_le(raw))
}
