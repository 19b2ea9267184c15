//! FFI bindings for interview signal scoring
//!
//! This module provides C-compatible functions for driving a scoring session
//! from other languages. Landmarks are pushed one NDJSON record at a time (see
//! [`crate::replay`]). Returned strings are allocated here and must be freed
//! by the caller using `signals_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::AnalyzerConfig;
use crate::encoder::ReportEncoder;
use crate::replay::{replay_record, FrameRecord, ReplaySource};
use crate::session::InterviewSession;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Negative or non-finite scores mean "not available"
fn optional_score(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

// ============================================================================
// Session API
// ============================================================================

/// Opaque handle to an interview session fed from recorded landmarks
pub struct SessionHandle {
    session: InterviewSession<ReplaySource>,
    encoder: ReportEncoder,
}

/// Create a new scoring session.
///
/// # Safety
/// - `config_json` must be NULL (defaults) or a valid null-terminated C string
///   holding an analyzer configuration.
/// - Returns a pointer that must be freed with `signals_session_free`.
/// - Returns NULL on error; call `signals_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn signals_session_new(config_json: *const c_char) -> *mut SessionHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        AnalyzerConfig::default()
    } else {
        let json = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match AnalyzerConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let handle = Box::new(SessionHandle {
        session: InterviewSession::with_config(ReplaySource::new(), config),
        encoder: ReportEncoder::new(),
    });
    Box::into_raw(handle)
}

/// Free a session.
///
/// # Safety
/// - `session` must be a valid pointer returned by `signals_session_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn signals_session_free(session: *mut SessionHandle) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Push one recorded frame (a single NDJSON record) into the session.
///
/// # Safety
/// - `session` must be a valid pointer returned by `signals_session_new`.
/// - `record_json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error; call `signals_last_error` for details.
#[no_mangle]
pub unsafe extern "C" fn signals_session_push_record(
    session: *mut SessionHandle,
    record_json: *const c_char,
) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let handle = &mut *session;

    let line = match cstr_to_string(record_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid record string pointer");
            return -1;
        }
    };

    let next_line = handle.session.frames_processed() as usize + 1;
    let result = FrameRecord::parse(&line, next_line)
        .and_then(|record| replay_record(&mut handle.session, record, None));
    match result {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Encode the session's current scores as a JSON payload.
///
/// Pass a negative value for `answer_quality` or `sentiment` when that score
/// is not available.
///
/// # Safety
/// - `session` must be a valid pointer returned by `signals_session_new`.
/// - Returns a newly allocated string that must be freed with `signals_free_string`.
/// - Returns NULL on error; call `signals_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn signals_session_report(
    session: *const SessionHandle,
    answer_quality: f64,
    sentiment: f64,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &*session;
    let report = handle
        .session
        .report_with(optional_score(answer_quality), optional_score(sentiment));

    match handle.encoder.encode_to_json(&handle.session, &report) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by this library.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a `signals_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn signals_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next `signals_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn signals_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn signals_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
