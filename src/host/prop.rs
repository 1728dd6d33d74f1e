//! Typed property accessor
//!
//! The host exposes one multiplexed capability per entity family that both
//! reads and writes dozens of heterogeneous named properties on an opaque
//! handle: called with a null write pointer it returns a pointer to the
//! current value, called with a non-null one it stores the pointed-at value.
//! This module owns every cast around that `void*` protocol; the rest of the
//! crate only sees typed reads and writes selected by a compile-time
//! property descriptor.
//!
//! Conventions at this boundary (they must hold on both sides):
//! - booleans travel as 0/non-zero `i32`
//! - volume-like properties are linear gain, never decibels; dB conversion
//!   belongs to the entity wrappers above

use libc::{c_char, c_void};
use std::ffi::{CStr, CString};
use std::ptr;

/// Signature of a get-or-set property multiplexer capability:
/// `accessor(handle, property_name, write_ptr_or_null, extra) -> value_ptr_or_null`.
pub type InfoMux =
    unsafe extern "C" fn(*mut c_void, *const c_char, *mut c_void, *mut c_void) -> *mut c_void;

/// Declared type of a named property; selects the decode/encode path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropKind {
    /// 0/non-zero integer flag
    Bool,
    /// 32-bit integer
    Int,
    /// 64-bit float
    Float,
    /// NUL-terminated string in host-owned memory
    Str,
    /// Opaque pointer, passed back verbatim
    Ptr,
}

/// Compile-time descriptor of one named property.
#[derive(Clone, Copy, Debug)]
pub struct PropDesc {
    /// Host-side property key.
    pub key: &'static CStr,
    /// Declared value type.
    pub kind: PropKind,
}

/// Track property descriptors.
pub mod track_prop {
    use super::{PropDesc, PropKind};

    pub const NAME: PropDesc = PropDesc { key: c"P_NAME", kind: PropKind::Str };
    /// Linear gain, not dB.
    pub const VOLUME: PropDesc = PropDesc { key: c"D_VOL", kind: PropKind::Float };
    pub const PAN: PropDesc = PropDesc { key: c"D_PAN", kind: PropKind::Float };
    pub const MUTE: PropDesc = PropDesc { key: c"B_MUTE", kind: PropKind::Bool };
    pub const SOLO: PropDesc = PropDesc { key: c"I_SOLO", kind: PropKind::Int };
}

/// Take property descriptors.
pub mod take_prop {
    use super::{PropDesc, PropKind};

    pub const NAME: PropDesc = PropDesc { key: c"P_NAME", kind: PropKind::Str };
    /// Linear gain, not dB.
    pub const VOLUME: PropDesc = PropDesc { key: c"D_VOL", kind: PropKind::Float };
    pub const PAN: PropDesc = PropDesc { key: c"D_PAN", kind: PropKind::Float };
    /// Opaque handle of the take's media source.
    pub const SOURCE: PropDesc = PropDesc { key: c"P_SOURCE", kind: PropKind::Ptr };
}

/// One entity's view of a property multiplexer.
///
/// Obtained from the registry with the multiplexer already gated on
/// availability: if the capability is unresolved every read yields `None`
/// and every write returns `false`, without touching the host.
#[derive(Clone, Copy)]
pub struct PropAccessor {
    mux: Option<InfoMux>,
    target: *mut c_void,
}

impl PropAccessor {
    pub(crate) fn new(mux: Option<InfoMux>, target: *mut c_void) -> Self {
        Self { mux, target }
    }

    /// Issue the multiplexer call. `None` when the capability is unresolved
    /// or the handle is null; otherwise the host's returned pointer verbatim.
    fn call(&self, key: &CStr, write_ptr: *mut c_void) -> Option<*mut c_void> {
        let mux = self.mux?;
        if self.target.is_null() {
            return None;
        }
        Some(unsafe { mux(self.target, key.as_ptr(), write_ptr, ptr::null_mut()) })
    }

    /// Issue a write through the multiplexer. The host signals failure for a
    /// write the same way as for a read, by returning null.
    fn write_call(&self, key: &CStr, write_ptr: *mut c_void) -> bool {
        self.call(key, write_ptr).is_some_and(|p| !p.is_null())
    }

    pub fn read_f64(&self, desc: PropDesc) -> Option<f64> {
        if desc.kind != PropKind::Float {
            return None;
        }
        let p = self.call(desc.key, ptr::null_mut())?;
        if p.is_null() {
            return None;
        }
        Some(unsafe { *(p as *const f64) })
    }

    pub fn write_f64(&self, desc: PropDesc, value: f64) -> bool {
        if desc.kind != PropKind::Float {
            return false;
        }
        let mut v = value;
        self.write_call(desc.key, &mut v as *mut f64 as *mut c_void)
    }

    pub fn read_i32(&self, desc: PropDesc) -> Option<i32> {
        if desc.kind != PropKind::Int {
            return None;
        }
        let p = self.call(desc.key, ptr::null_mut())?;
        if p.is_null() {
            return None;
        }
        Some(unsafe { *(p as *const i32) })
    }

    pub fn write_i32(&self, desc: PropDesc, value: i32) -> bool {
        if desc.kind != PropKind::Int {
            return false;
        }
        let mut v = value;
        self.write_call(desc.key, &mut v as *mut i32 as *mut c_void)
    }

    pub fn read_bool(&self, desc: PropDesc) -> Option<bool> {
        if desc.kind != PropKind::Bool {
            return None;
        }
        let p = self.call(desc.key, ptr::null_mut())?;
        if p.is_null() {
            return None;
        }
        Some(unsafe { *(p as *const i32) } != 0)
    }

    pub fn write_bool(&self, desc: PropDesc, value: bool) -> bool {
        if desc.kind != PropKind::Bool {
            return false;
        }
        let mut v: i32 = value.into();
        self.write_call(desc.key, &mut v as *mut i32 as *mut c_void)
    }

    /// Copy a string value out of host-owned memory, bounded by `capacity`
    /// bytes and stopping at the first NUL. The host keeps ownership of the
    /// returned buffer; nothing is retained past this call.
    pub fn read_str(&self, desc: PropDesc, capacity: usize) -> Option<String> {
        if desc.kind != PropKind::Str || capacity == 0 {
            return None;
        }
        let p = self.call(desc.key, ptr::null_mut())?;
        if p.is_null() {
            return None;
        }
        let mut bytes = Vec::with_capacity(capacity.min(64));
        for i in 0..capacity {
            let b = unsafe { *(p as *const u8).add(i) };
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn write_str(&self, desc: PropDesc, value: &str) -> bool {
        if desc.kind != PropKind::Str {
            return false;
        }
        let c = match CString::new(value) {
            Ok(c) => c,
            Err(_) => return false,
        };
        self.write_call(desc.key, c.as_ptr() as *mut c_void)
    }

    /// Write an opaque pointer property; the pointer itself is the value.
    pub fn write_ptr(&self, desc: PropDesc, value: *mut c_void) -> bool {
        if desc.kind != PropKind::Ptr || value.is_null() {
            return false;
        }
        self.write_call(desc.key, value)
    }

    /// Read an opaque pointer property. The pointer is host-owned and only
    /// meaningful when passed back to the host.
    pub fn read_ptr(&self, desc: PropDesc) -> Option<*mut c_void> {
        if desc.kind != PropKind::Ptr {
            return None;
        }
        let p = self.call(desc.key, ptr::null_mut())?;
        if p.is_null() {
            return None;
        }
        Some(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::api::HostApi;
    use crate::host::mock::{MockHost, MockProject};

    #[test]
    fn test_unbound_accessor_fails_closed() {
        let acc = PropAccessor::new(None, 0x1 as *mut c_void);
        assert_eq!(acc.read_f64(track_prop::VOLUME), None);
        assert!(!acc.write_f64(track_prop::VOLUME, 1.0));
        assert_eq!(acc.read_str(track_prop::NAME, 64), None);
        assert!(!acc.write_str(track_prop::NAME, "x"));
    }

    #[test]
    fn test_kind_mismatch_fails_closed() {
        let _host = MockHost::install(MockProject::with_tracks(&["A"]));
        let api = HostApi::get();
        let tr = api.get_track(0);
        let props = api.track_props(tr);
        // NAME is a string property; numeric reads must refuse it.
        assert_eq!(props.read_f64(track_prop::NAME), None);
        assert_eq!(props.read_i32(track_prop::NAME), None);
        assert!(!props.write_bool(track_prop::VOLUME, true));
    }

    #[test]
    fn test_round_trip_every_kind() {
        let _host = MockHost::install(MockProject::with_tracks(&["A"]));
        let api = HostApi::get();
        let props = api.track_props(api.get_track(0));

        assert!(props.write_f64(track_prop::VOLUME, 0.25));
        assert_eq!(props.read_f64(track_prop::VOLUME), Some(0.25));

        assert!(props.write_i32(track_prop::SOLO, 2));
        assert_eq!(props.read_i32(track_prop::SOLO), Some(2));

        assert!(props.write_bool(track_prop::MUTE, true));
        assert_eq!(props.read_bool(track_prop::MUTE), Some(true));
        assert!(props.write_bool(track_prop::MUTE, false));
        assert_eq!(props.read_bool(track_prop::MUTE), Some(false));

        assert!(props.write_str(track_prop::NAME, "Lead Guitar"));
        assert_eq!(
            props.read_str(track_prop::NAME, 256),
            Some("Lead Guitar".to_string())
        );
    }

    #[test]
    fn test_bounded_string_read() {
        let _host = MockHost::install(MockProject::with_tracks(&["Lead Guitar"]));
        let api = HostApi::get();
        let props = api.track_props(api.get_track(0));
        assert_eq!(
            props.read_str(track_prop::NAME, 4),
            Some("Lead".to_string())
        );
        assert_eq!(props.read_str(track_prop::NAME, 0), None);
    }

    #[test]
    fn test_unknown_key_is_host_failure() {
        let _host = MockHost::install(MockProject::with_tracks(&["A"]));
        let api = HostApi::get();
        let props = api.track_props(api.get_track(0));
        let bogus = PropDesc { key: c"D_BOGUS", kind: PropKind::Float };
        assert_eq!(props.read_f64(bogus), None);
        // A rejected write must not report success either.
        assert!(!props.write_f64(bogus, 1.0));
        assert!(!props.write_i32(PropDesc { key: c"I_BOGUS", kind: PropKind::Int }, 1));
        assert!(!props.write_bool(PropDesc { key: c"B_BOGUS", kind: PropKind::Bool }, true));
        assert!(!props.write_str(PropDesc { key: c"P_BOGUS", kind: PropKind::Str }, "x"));
    }
}
