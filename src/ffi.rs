//! C ABI for embedding the recorder in a plugin host.
//!
//! Mirrors the host's instance contract: instantiate with a sample rate,
//! bind ports by index, then `activate → run* → deactivate → cleanup`.
//! The host serializes these calls; `jamrecord_drain` and the status
//! functions belong to the same non-audio context as `activate`.
//!
//! All public functions use `catch_unwind` so panics never cross the FFI
//! boundary. Config and status are exchanged as JSON strings; the caller
//! frees returned strings with `jamrecord_free_string`.

// FFI functions inherently receive raw pointers from C callers. Every function
// performs a null check before dereferencing, and the dereference is inside
// `catch_unwind`.
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::ffi::{CStr, CString, c_void};
use std::os::raw::c_char;
use std::panic::{AssertUnwindSafe, catch_unwind};

use log::warn;

use crate::config::RecorderConfig;
use crate::error::RecorderError;
use crate::events::{EventReceiver, log_event};
use crate::ports::{ControlPorts, PortIndex};
use crate::processor::{ActiveProcessor, ProcessorState, RecordedAudio, StreamProcessor};
use crate::ring_buffer::RingBufferStore;

/// Magic number to detect use-after-free or corrupted handles.
const HANDLE_MAGIC: u64 = 0x4A41_4D52_4543_0001;

// ---------------------------------------------------------------------------
// JamRecordHandle: opaque type exposed as `*mut JamRecordHandle` over FFI
// ---------------------------------------------------------------------------

enum Lifecycle {
    Configured(StreamProcessor),
    Active(ActiveProcessor),
    /// Activation failed; only cleanup is meaningful.
    Failed,
}

impl Lifecycle {
    fn name(&self) -> &'static str {
        match self {
            Lifecycle::Configured(_) => "configured",
            Lifecycle::Active(_) => "active",
            Lifecycle::Failed => "failed",
        }
    }

    fn processor_state(&self) -> Option<&ProcessorState> {
        match self {
            Lifecycle::Configured(p) => Some(p.state()),
            Lifecycle::Active(p) => Some(p.state()),
            Lifecycle::Failed => None,
        }
    }

    fn processor_state_mut(&mut self) -> Option<&mut ProcessorState> {
        match self {
            Lifecycle::Configured(p) => Some(p.state_mut()),
            Lifecycle::Active(p) => Some(p.state_mut()),
            Lifecycle::Failed => None,
        }
    }

    fn store(&self) -> Option<&RingBufferStore> {
        match self {
            Lifecycle::Configured(p) => p.store(),
            Lifecycle::Active(p) => Some(p.store()),
            Lifecycle::Failed => None,
        }
    }
}

/// Buffers bound by `jamrecord_connect_port`.
#[derive(Clone, Copy)]
struct PortBindings {
    format: *const i32,
    record: *const i32,
    save: *const i32,
    clip: *mut i32,
    input_l: *const f32,
    input_r: *const f32,
    output_l: *mut f32,
    output_r: *mut f32,
}

impl Default for PortBindings {
    fn default() -> Self {
        PortBindings {
            format: std::ptr::null(),
            record: std::ptr::null(),
            save: std::ptr::null(),
            clip: std::ptr::null_mut(),
            input_l: std::ptr::null(),
            input_r: std::ptr::null(),
            output_l: std::ptr::null_mut(),
            output_r: std::ptr::null_mut(),
        }
    }
}

impl PortBindings {
    fn audio_bound(&self) -> bool {
        !(self.input_l.is_null()
            || self.input_r.is_null()
            || self.output_l.is_null()
            || self.output_r.is_null())
    }

    /// Read the control inputs. Unbound controls read as zero.
    unsafe fn read_controls(&self) -> ControlPorts {
        let read = |ptr: *const i32| {
            if ptr.is_null() {
                0
            } else {
                unsafe { *ptr }
            }
        };
        ControlPorts {
            format: read(self.format),
            record: read(self.record),
            save: read(self.save),
            clip: 0,
        }
    }
}

pub struct JamRecordHandle {
    magic: u64,
    ports: PortBindings,
    lifecycle: Lifecycle,
    events: EventReceiver,
    last_error: Option<String>,
}

impl JamRecordHandle {
    fn is_valid(&self) -> bool {
        self.magic == HANDLE_MAGIC
    }

    fn set_error(&mut self, err: &RecorderError) {
        self.last_error = Some(err.to_string());
    }

    fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Log pending processor events.
    fn poll_events(&mut self) {
        while let Some(event) = self.events.try_recv() {
            log_event(&event);
        }
    }

    fn recorded(&mut self) -> Result<&mut dyn RecordedAudio, RecorderError> {
        match &mut self.lifecycle {
            Lifecycle::Configured(p) => Ok(p as &mut dyn RecordedAudio),
            Lifecycle::Active(p) => Ok(p as &mut dyn RecordedAudio),
            Lifecycle::Failed => Err(RecorderError::Lifecycle(
                "instance failed to activate".to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Convert a `*const c_char` to a `&str`, returning `None` on null or invalid UTF-8.
unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Allocate a `CString` on the heap and return a raw pointer.
/// The caller is responsible for freeing it with `jamrecord_free_string`.
fn to_c_string(s: &str) -> *mut c_char {
    CString::new(s).map_or(std::ptr::null_mut(), CString::into_raw)
}

/// True if two `len`-sample buffers share any memory.
fn buffers_overlap(a: *const f32, b: *const f32, len: usize) -> bool {
    let bytes = len.saturating_mul(std::mem::size_of::<f32>());
    let (a, b) = (a as usize, b as usize);
    a < b.saturating_add(bytes) && b < a.saturating_add(bytes)
}

/// Validate a handle pointer: non-null and magic number matches.
///
/// The host guarantees calls on one instance are never concurrent, which is
/// what makes handing out a unique reference sound.
fn validate_handle<'a>(handle: *mut JamRecordHandle) -> Option<&'a mut JamRecordHandle> {
    if handle.is_null() {
        return None;
    }
    let h = unsafe { &mut *handle };
    if h.is_valid() { Some(h) } else { None }
}

// ---------------------------------------------------------------------------
// Instance lifecycle
// ---------------------------------------------------------------------------

/// Create an instance for `sample_rate`, configured from a JSON object.
///
/// Fields missing from `config_json` (or a null/empty/invalid string) take
/// their defaults. Returns null if the sample rate or config is unusable.
#[unsafe(no_mangle)]
pub extern "C" fn jamrecord_instantiate(
    sample_rate: f64,
    config_json: *const c_char,
) -> *mut JamRecordHandle {
    catch_unwind(|| {
        let mut config = RecorderConfig::default();
        let json_str = unsafe { cstr_to_str(config_json) }.unwrap_or("");
        if !json_str.is_empty() {
            match serde_json::from_str::<RecorderConfig>(json_str) {
                Ok(partial) => config.merge(partial),
                Err(e) => warn!("Ignoring invalid config JSON: {}", e),
            }
        }

        let (processor, events) = match StreamProcessor::setup(sample_rate, &config) {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Failed to instantiate recorder: {}", e);
                return std::ptr::null_mut();
            }
        };

        let handle = Box::new(JamRecordHandle {
            magic: HANDLE_MAGIC,
            ports: PortBindings::default(),
            lifecycle: Lifecycle::Configured(processor),
            events,
            last_error: None,
        });

        Box::into_raw(handle)
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Bind `data` to the port at `port` (see `PortIndex`). Unknown indices are
/// ignored. The pointer must stay valid until rebound or cleanup.
#[unsafe(no_mangle)]
pub extern "C" fn jamrecord_connect_port(handle: *mut JamRecordHandle, port: u32, data: *mut c_void) {
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let Some(handle) = validate_handle(handle) else {
            return;
        };
        let Ok(port) = PortIndex::try_from(port) else {
            return;
        };
        let ports = &mut handle.ports;
        match port {
            PortIndex::Format => ports.format = data.cast_const().cast(),
            PortIndex::Record => ports.record = data.cast_const().cast(),
            PortIndex::Save => ports.save = data.cast_const().cast(),
            PortIndex::Clip => ports.clip = data.cast(),
            PortIndex::InputL => ports.input_l = data.cast_const().cast(),
            PortIndex::InputR => ports.input_r = data.cast_const().cast(),
            PortIndex::OutputL => ports.output_l = data.cast(),
            PortIndex::OutputR => ports.output_r = data.cast(),
        }
    }));
}

/// Allocate and rewind the ring. Returns 0 on success, -1 on error
/// (retrieve with `jamrecord_get_last_error`). An allocation failure leaves
/// the instance unusable.
#[unsafe(no_mangle)]
pub extern "C" fn jamrecord_activate(handle: *mut JamRecordHandle) -> i32 {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(handle) = validate_handle(handle) else {
            return -1;
        };
        handle.clear_error();

        match std::mem::replace(&mut handle.lifecycle, Lifecycle::Failed) {
            Lifecycle::Configured(processor) => match processor.activate() {
                Ok(active) => {
                    handle.lifecycle = Lifecycle::Active(active);
                    0
                }
                Err(e) => {
                    handle.set_error(&e);
                    -1
                }
            },
            other => {
                let err = RecorderError::Lifecycle(format!(
                    "activate called while {}",
                    other.name()
                ));
                handle.lifecycle = other;
                handle.set_error(&err);
                -1
            }
        }
    }))
    .unwrap_or(-1)
}

/// Process `n_samples` frames from the bound ports. Does nothing unless the
/// instance is active and all four audio ports are bound.
///
/// Real-time safe: no allocation, locking or logging.
#[unsafe(no_mangle)]
pub extern "C" fn jamrecord_run(handle: *mut JamRecordHandle, n_samples: u32) {
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let Some(handle) = validate_handle(handle) else {
            return;
        };
        let ports = handle.ports;
        let Lifecycle::Active(processor) = &mut handle.lifecycle else {
            return;
        };
        if !ports.audio_bound() {
            return;
        }

        let n = n_samples as usize;
        let mut controls = unsafe { ports.read_controls() };

        // Hosts may bind an output to its input buffer, so copy with memmove
        // semantics and record from the outputs.
        let (left, right) = unsafe {
            if ports.input_l != ports.output_l.cast_const() {
                std::ptr::copy(ports.input_l, ports.output_l, n);
            }
            if ports.input_r != ports.output_r.cast_const() {
                std::ptr::copy(ports.input_r, ports.output_r, n);
            }
            (
                std::slice::from_raw_parts_mut(ports.output_l, n),
                std::slice::from_raw_parts_mut(ports.output_r, n),
            )
        };

        processor.process_block_in_place(n, left, right, &mut controls);

        if !ports.clip.is_null() {
            unsafe { *ports.clip = controls.clip };
        }
    }));
}

/// Stop processing; recorded audio stays drainable. No-op unless active.
#[unsafe(no_mangle)]
pub extern "C" fn jamrecord_deactivate(handle: *mut JamRecordHandle) {
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let Some(handle) = validate_handle(handle) else {
            return;
        };
        match std::mem::replace(&mut handle.lifecycle, Lifecycle::Failed) {
            Lifecycle::Active(active) => {
                handle.lifecycle = Lifecycle::Configured(active.deactivate());
            }
            other => handle.lifecycle = other,
        }
        handle.poll_events();
    }));
}

/// Destroy an instance, releasing its ring. Passing null is a safe no-op.
#[unsafe(no_mangle)]
pub extern "C" fn jamrecord_cleanup(handle: *mut JamRecordHandle) {
    if handle.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        if validate_handle(handle).is_none() {
            return;
        }
        let mut handle = unsafe { Box::from_raw(handle) };
        // Invalidate magic before cleanup so stale pointers fail fast
        handle.magic = 0;
        handle.poll_events();
        match std::mem::replace(&mut handle.lifecycle, Lifecycle::Failed) {
            Lifecycle::Active(active) => active.deactivate().teardown(),
            Lifecycle::Configured(processor) => processor.teardown(),
            Lifecycle::Failed => {}
        }
    }));
}

// ---------------------------------------------------------------------------
// Control-context access
// ---------------------------------------------------------------------------

/// Copy up to `max_frames` of the oldest unread frames into `out_l`/`out_r`.
///
/// Returns the number of frames copied, or -1 on error (for example while
/// the record control is still active, or if the two buffers overlap).
#[unsafe(no_mangle)]
pub extern "C" fn jamrecord_drain(
    handle: *mut JamRecordHandle,
    out_l: *mut f32,
    out_r: *mut f32,
    max_frames: u32,
) -> i64 {
    if out_l.is_null() || out_r.is_null() {
        return -1;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let Some(handle) = validate_handle(handle) else {
            return -1;
        };
        handle.clear_error();
        handle.poll_events();

        let n = max_frames as usize;
        if n > 0 && buffers_overlap(out_l, out_r, n) {
            handle.set_error(&RecorderError::Config(
                "drain buffers for left and right must not overlap".to_string(),
            ));
            return -1;
        }
        let (left, right) = unsafe {
            (
                std::slice::from_raw_parts_mut(out_l, n),
                std::slice::from_raw_parts_mut(out_r, n),
            )
        };

        let result = handle
            .recorded()
            .and_then(|recorded| recorded.read_into(left, right));
        match result {
            Ok(copied) => i64::try_from(copied).unwrap_or(i64::MAX),
            Err(e) => {
                handle.set_error(&e);
                -1
            }
        }
    }))
    .unwrap_or(-1)
}

/// Take the most recent unhandled save request. Returns true and writes the
/// requested format to `format_out` if there was one.
#[unsafe(no_mangle)]
pub extern "C" fn jamrecord_take_save_request(
    handle: *mut JamRecordHandle,
    format_out: *mut i32,
) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(handle) = validate_handle(handle) else {
            return false;
        };
        handle.poll_events();
        let Some(request) = handle
            .lifecycle
            .processor_state_mut()
            .and_then(ProcessorState::take_save_request)
        else {
            return false;
        };
        if !format_out.is_null() {
            unsafe { *format_out = request.format };
        }
        true
    }))
    .unwrap_or(false)
}

/// Return a JSON object describing the instance.
///
/// Example: `{"state": "active", "recording": true, "clip": false, ...}`
///
/// The caller must free the returned string with `jamrecord_free_string`.
/// Returns null on failure.
#[unsafe(no_mangle)]
pub extern "C" fn jamrecord_get_status_json(handle: *mut JamRecordHandle) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(handle) = validate_handle(handle) else {
            return std::ptr::null_mut();
        };
        handle.poll_events();

        let state = handle.lifecycle.processor_state();
        let store = handle.lifecycle.store();

        let status = serde_json::json!({
            "state": handle.lifecycle.name(),
            "recording": state.is_some_and(ProcessorState::is_recording),
            "clip": state.is_some_and(ProcessorState::clip),
            "sample_rate": state.map(ProcessorState::sample_rate),
            "overrun_frames": state.map_or(0, ProcessorState::overrun_frames),
            "dropped_events": state.map_or(0, ProcessorState::dropped_events),
            "capacity_frames": store.map_or(0, RingBufferStore::capacity),
            "unread_frames": store.map_or(0, RingBufferStore::unread),
            "pending_save": state.and_then(ProcessorState::pending_save).map(|r| r.format),
        });

        to_c_string(&status.to_string())
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Get the last error message, or null if no error has occurred.
///
/// The caller must free the returned string with `jamrecord_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn jamrecord_get_last_error(handle: *mut JamRecordHandle) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(handle) = validate_handle(handle) else {
            return std::ptr::null_mut();
        };
        handle
            .last_error
            .as_deref()
            .map_or(std::ptr::null_mut(), to_c_string)
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Free a string previously returned by any `jamrecord_*` function.
///
/// Passing null is a safe no-op.
#[unsafe(no_mangle)]
pub extern "C" fn jamrecord_free_string(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        drop(unsafe { CString::from_raw(s) });
    });
}
