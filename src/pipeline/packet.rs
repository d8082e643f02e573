//! Type-erased, timestamped packet — the unit of data moving through the pipeline.
//!
//! A `Packet` owns one boxed payload of any `'static + Send + Sync` type plus
//! the payload's type identity. The type is checked on every access, so a
//! stage asking for the wrong type gets a `TypeMismatch` error instead of a
//! bad cast.
//!
//! Packets are move-only. Handing one from a port to a stage and on to the
//! next port moves the box; the payload (often a full video frame) is never
//! copied.

use crate::pipeline::clock::Timestamp;
use crate::pipeline::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::fmt;

/// Type name reported for the payload of an empty packet.
const EMPTY_TYPE_NAME: &str = "<empty>";

struct Payload {
    value: Box<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

/// Timestamped carrier for a single value.
///
/// `Packet::default()` is the empty packet: no payload, invalid timestamp.
/// Ports hand it out when there is nothing to read.
pub struct Packet {
    payload: Option<Payload>,
    timestamp: Timestamp,
}

impl Packet {
    /// Wrap `value`, stamping it with the next process timestamp.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::with_timestamp(value, Timestamp::now())
    }

    /// Wrap `value` with an explicit timestamp.
    pub fn with_timestamp<T: Any + Send + Sync>(value: T, timestamp: Timestamp) -> Self {
        Self {
            payload: Some(Payload {
                value: Box::new(value),
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
            }),
            timestamp,
        }
    }

    /// The empty packet.
    #[inline]
    pub fn empty() -> Self {
        Self {
            payload: None,
            timestamp: Timestamp::INVALID,
        }
    }

    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Whether this packet carries a payload and a valid timestamp.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.payload.is_some() && self.timestamp.is_valid()
    }

    /// Name of the stored payload type (`"<empty>"` for the empty packet).
    pub fn type_name(&self) -> &'static str {
        self.payload
            .as_ref()
            .map(|p| p.type_name)
            .unwrap_or(EMPTY_TYPE_NAME)
    }

    /// Whether the stored payload is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.payload
            .as_ref()
            .is_some_and(|p| p.type_id == TypeId::of::<T>())
    }

    /// Borrow the payload as a `T`.
    pub fn get<T: Any>(&self) -> PipelineResult<&T> {
        self.check::<T>()?;
        self.payload
            .as_ref()
            .and_then(|p| p.value.downcast_ref::<T>())
            .ok_or_else(|| self.mismatch::<T>())
    }

    /// Mutably borrow the payload as a `T`.
    pub fn get_mut<T: Any>(&mut self) -> PipelineResult<&mut T> {
        self.check::<T>()?;
        let found = self.type_name();
        self.payload
            .as_mut()
            .and_then(|p| p.value.downcast_mut::<T>())
            .ok_or(PipelineError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found,
            })
    }

    /// Move the payload out as a `T`.
    pub fn into_inner<T: Any>(self) -> PipelineResult<T> {
        self.check::<T>()?;
        let found = self.type_name();
        match self.payload {
            Some(p) => p
                .value
                .downcast::<T>()
                .map(|boxed| *boxed)
                .map_err(|_| PipelineError::TypeMismatch {
                    expected: std::any::type_name::<T>(),
                    found,
                }),
            None => Err(PipelineError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found,
            }),
        }
    }

    /// Keep the payload, replace the timestamp with a fresh one.
    ///
    /// Useful when a stage emits a derived value and wants it ordered after
    /// everything it has already written.
    pub fn restamp(mut self) -> Self {
        self.timestamp = Timestamp::now();
        self
    }

    fn check<T: Any>(&self) -> PipelineResult<()> {
        if self.is::<T>() {
            Ok(())
        } else {
            Err(self.mismatch::<T>())
        }
    }

    fn mismatch<T: Any>(&self) -> PipelineError {
        PipelineError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            found: self.type_name(),
        }
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Packets compare by identity: same timestamp, same payload type.
///
/// Timestamps from the process clock are unique, so two packets that compare
/// equal are the same emission. Payloads themselves are opaque and never
/// compared.
impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        let type_of = |p: &Packet| p.payload.as_ref().map(|p| p.type_id);
        self.timestamp == other.timestamp && type_of(self) == type_of(other)
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("type", &self.type_name())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet {{ type: {}, timestamp: {} }}",
            self.type_name(),
            self.timestamp.as_micros()
        )
    }
}

/// Scalar configuration values, as read from a config file.
///
/// Converted into side packets holding `bool`, `i64`, `f64` or `String`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Wrap the value in a packet with its natural Rust type.
    pub fn into_packet(self) -> Packet {
        match self {
            ConfigValue::Bool(v) => Packet::new(v),
            ConfigValue::Int(v) => Packet::new(v),
            ConfigValue::Float(v) => Packet::new(v),
            ConfigValue::String(v) => Packet::new(v),
        }
    }
}
