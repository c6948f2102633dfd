//! Watchpoints: named, typed, non-owning views of caller memory.
//!
//! # Safety
//!
//! A watchpoint stores a raw pointer into memory it does not own. The safe
//! constructors only accept `&'static` atomics, so the referent provably
//! outlives the registry. [`Watchpoint::from_raw`] is `unsafe` and moves the
//! lifetime, alignment and synchronisation obligations onto the caller.
#![allow(unsafe_code)]

use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{
    AtomicI8, AtomicI16, AtomicI32, AtomicI64, AtomicU8, AtomicU16, AtomicU32, AtomicU64,
    Ordering,
};

/// Numeric type of the watched value; selects the read-and-format rule.
///
/// The names follow the C types of an LP64 platform: `Long` is 64 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ValueType {
    /// `i8`.
    Char,
    /// `i16`.
    Short,
    /// `i32`.
    Int,
    /// `i64`.
    Long,
    /// `f32`, rendered with six decimals.
    Float,
    /// `f64`, rendered with six decimals.
    Double,
    /// `u8`.
    UChar,
    /// `u16`.
    UShort,
    /// `u32`.
    UInt,
    /// `u64`.
    ULong,
}

impl ValueType {
    /// Size in bytes of the watched value. Also its required alignment.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Char | Self::UChar => 1,
            Self::Short | Self::UShort => 2,
            Self::Int | Self::UInt | Self::Float => 4,
            Self::Long | Self::ULong | Self::Double => 8,
        }
    }

    /// C spelling of the type.
    #[must_use]
    pub const fn c_name(self) -> &'static str {
        match self {
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::UChar => "unsigned char",
            Self::UShort => "unsigned short",
            Self::UInt => "unsigned int",
            Self::ULong => "unsigned long",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Atomic integer types that can be watched without `unsafe`.
pub trait Watchable: sealed::Sealed + Sync {
    /// Tag recorded for values of this type.
    const VALUE_TYPE: ValueType;
}

macro_rules! watchable {
    ($($atomic:ty => $tag:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $atomic {}
            impl Watchable for $atomic {
                const VALUE_TYPE: ValueType = ValueType::$tag;
            }
        )*
    };
}

watchable! {
    AtomicI8 => Char,
    AtomicI16 => Short,
    AtomicI32 => Int,
    AtomicI64 => Long,
    AtomicU8 => UChar,
    AtomicU16 => UShort,
    AtomicU32 => UInt,
    AtomicU64 => ULong,
}

#[derive(Clone, Copy)]
struct Location(NonNull<u8>);

// SAFETY: the location is only ever read, through atomic loads, and the
// constructors require the referent to stay valid for the registry lifetime.
unsafe impl Send for Location {}
// SAFETY: see above; shared reads through atomics are data-race free.
unsafe impl Sync for Location {}

/// A named, typed reference to caller-owned memory rendered at dump time.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use dump::Watchpoint;
///
/// static REQUESTS: AtomicI32 = AtomicI32::new(0);
///
/// let watch = Watchpoint::new("requests", &REQUESTS);
/// REQUESTS.store(7, Ordering::Relaxed);
/// assert_eq!(watch.render_value(), "7");
/// assert_eq!(watch.render_line(), "requests: 7");
/// ```
#[derive(Clone)]
pub struct Watchpoint {
    name: String,
    value_type: ValueType,
    location: Location,
}

impl Watchpoint {
    /// Watches a `'static` atomic integer.
    pub fn new<T: Watchable>(name: impl Into<String>, value: &'static T) -> Self {
        Self {
            name: name.into(),
            value_type: T::VALUE_TYPE,
            location: Location(NonNull::from(value).cast()),
        }
    }

    /// Watches an `f32` stored as raw bits in a `'static` atomic.
    pub fn f32_bits(name: impl Into<String>, bits: &'static AtomicU32) -> Self {
        Self {
            name: name.into(),
            value_type: ValueType::Float,
            location: Location(NonNull::from(bits).cast()),
        }
    }

    /// Watches an `f64` stored as raw bits in a `'static` atomic.
    pub fn f64_bits(name: impl Into<String>, bits: &'static AtomicU64) -> Self {
        Self {
            name: name.into(),
            value_type: ValueType::Double,
            location: Location(NonNull::from(bits).cast()),
        }
    }

    /// Watches arbitrary memory described by `value_type`.
    ///
    /// Returns `None` when `location` is null or not aligned to
    /// [`ValueType::size`].
    ///
    /// # Safety
    ///
    /// `location` must point to a live value of the type named by
    /// `value_type` for as long as the watchpoint (or any registry holding
    /// it) exists. Concurrent writes to the referent must be atomic; the
    /// watchpoint reads it with relaxed atomic loads.
    pub unsafe fn from_raw(
        name: impl Into<String>,
        value_type: ValueType,
        location: *const u8,
    ) -> Option<Self> {
        let location = NonNull::new(location.cast_mut())?;
        if location.as_ptr().align_offset(value_type.size()) != 0 {
            return None;
        }
        Some(Self {
            name: name.into(),
            value_type,
            location: Location(location),
        })
    }

    /// Name printed before the value.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type tag selecting the read rule.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Reads the current value and formats it.
    #[must_use]
    pub fn render_value(&self) -> String {
        let ptr = self.location.0.as_ptr();
        // SAFETY: every constructor guarantees a live, suitably aligned
        // referent of the tagged type.
        unsafe {
            match self.value_type {
                ValueType::Char => AtomicI8::from_ptr(ptr.cast()).load(Ordering::Relaxed).to_string(),
                ValueType::Short => {
                    AtomicI16::from_ptr(ptr.cast()).load(Ordering::Relaxed).to_string()
                }
                ValueType::Int => AtomicI32::from_ptr(ptr.cast()).load(Ordering::Relaxed).to_string(),
                ValueType::Long => {
                    AtomicI64::from_ptr(ptr.cast()).load(Ordering::Relaxed).to_string()
                }
                ValueType::UChar => {
                    AtomicU8::from_ptr(ptr.cast()).load(Ordering::Relaxed).to_string()
                }
                ValueType::UShort => {
                    AtomicU16::from_ptr(ptr.cast()).load(Ordering::Relaxed).to_string()
                }
                ValueType::UInt => {
                    AtomicU32::from_ptr(ptr.cast()).load(Ordering::Relaxed).to_string()
                }
                ValueType::ULong => {
                    AtomicU64::from_ptr(ptr.cast()).load(Ordering::Relaxed).to_string()
                }
                ValueType::Float => {
                    let bits = AtomicU32::from_ptr(ptr.cast()).load(Ordering::Relaxed);
                    format!("{:.6}", f32::from_bits(bits))
                }
                ValueType::Double => {
                    let bits = AtomicU64::from_ptr(ptr.cast()).load(Ordering::Relaxed);
                    format!("{:.6}", f64::from_bits(bits))
                }
            }
        }
    }

    /// Renders `"<name>: <value>"` without a trailing newline.
    #[must_use]
    pub fn render_line(&self) -> String {
        format!("{}: {}", self.name, self.render_value())
    }
}

impl fmt::Debug for Watchpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchpoint")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("location", &self.location.0)
            .finish()
    }
}
