//! C FFI Interface for the packet-tunnel adapter
//!
//! Lets a host written in another language (Swift, Kotlin, C) validate
//! adapter settings and answer the traffic-counter control message without
//! linking the whole session machinery.

#![allow(clippy::missing_safety_doc)]

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;

use crate::config::SessionSettings;
use crate::control::ControlChannel;
use crate::engine::TransportStatistics;
use crate::VpnError;

/// Error codes returned by C FFI functions
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OvpnError {
    Success = 0,
    InvalidConfig = 1,
    MissingCredentials = 2,
    EngineError = 3,
    InvalidParameter = 5,
    BufferTooSmall = 7,
    NoResponse = 8,
    InternalError = 99,
}

impl From<VpnError> for OvpnError {
    fn from(error: VpnError) -> Self {
        match error {
            VpnError::Configuration(_) | VpnError::Config(_) => OvpnError::InvalidConfig,
            VpnError::Credentials(_) => OvpnError::MissingCredentials,
            VpnError::Engine(_) | VpnError::FatalEngine(_) | VpnError::NonFatalEngine(_) => {
                OvpnError::EngineError
            }
            _ => OvpnError::InternalError,
        }
    }
}

unsafe fn write_error(err: &VpnError, error_msg: *mut c_char, error_msg_len: usize) {
    if error_msg.is_null() || error_msg_len == 0 {
        return;
    }

    let error_cstr = CString::new(err.to_string()).unwrap_or_default();
    let error_bytes = error_cstr.as_bytes();
    let copy_len = std::cmp::min(error_bytes.len(), error_msg_len - 1);

    ptr::copy_nonoverlapping(error_bytes.as_ptr() as *const c_char, error_msg, copy_len);
    *error_msg.add(copy_len) = 0; // Null terminate
}

/// Parse and validate adapter settings
///
/// # Parameters
/// - `settings_str`: TOML settings string
/// - `error_msg`: Output buffer for error messages (nullable)
/// - `error_msg_len`: Size of error message buffer
///
/// # Returns
/// - 0 on success
/// - Error code on failure
#[no_mangle]
pub unsafe extern "C" fn ovpn_validate_settings(
    settings_str: *const c_char,
    error_msg: *mut c_char,
    error_msg_len: usize,
) -> c_int {
    if settings_str.is_null() {
        return OvpnError::InvalidParameter as c_int;
    }

    let settings_str = match CStr::from_ptr(settings_str).to_str() {
        Ok(s) => s,
        Err(_) => return OvpnError::InvalidParameter as c_int,
    };

    let result = settings_str
        .parse::<SessionSettings>()
        .and_then(|settings| settings.validate());

    match result {
        Ok(()) => OvpnError::Success as c_int,
        Err(err) => {
            write_error(&err, error_msg, error_msg_len);
            OvpnError::from(err) as c_int
        }
    }
}

/// Answer a control message with the given counters
///
/// # Parameters
/// - `message`, `message_len`: raw control message bytes
/// - `token`: expected control token (NUL-terminated)
/// - `bytes_in`, `bytes_out`: current counters
/// - `out`, `out_len`: response buffer
/// - `written`: receives the response length (nullable)
///
/// # Returns
/// - 0 on success
/// - `NoResponse` when the message is not the token
/// - Error code on failure
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn ovpn_control_response(
    message: *const u8,
    message_len: usize,
    token: *const c_char,
    bytes_in: u64,
    bytes_out: u64,
    out: *mut u8,
    out_len: usize,
    written: *mut usize,
) -> c_int {
    if message.is_null() || token.is_null() || out.is_null() {
        return OvpnError::InvalidParameter as c_int;
    }

    let token = match CStr::from_ptr(token).to_str() {
        Ok(s) => s,
        Err(_) => return OvpnError::InvalidParameter as c_int,
    };

    let message = std::slice::from_raw_parts(message, message_len);
    let stats = TransportStatistics {
        bytes_in,
        bytes_out,
        ..Default::default()
    };

    let Some(response) = ControlChannel::new(token).handle(message, stats) else {
        return OvpnError::NoResponse as c_int;
    };

    if response.len() > out_len {
        return OvpnError::BufferTooSmall as c_int;
    }

    ptr::copy_nonoverlapping(response.as_ptr(), out, response.len());
    if !written.is_null() {
        *written = response.len();
    }

    OvpnError::Success as c_int
}

/// Get library version
///
/// # Returns
/// - Version string (caller must not free)
#[no_mangle]
pub unsafe extern "C" fn ovpn_version() -> *const c_char {
    static VERSION_CSTR: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION_CSTR.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let version = unsafe { CStr::from_ptr(ovpn_version()) };
        assert_eq!(version.to_str().unwrap(), crate::VERSION);
    }

    #[test]
    fn test_validate_settings() {
        let good = CString::new("[control]\ntoken = \"STATS\"\n").unwrap();
        let rc = unsafe { ovpn_validate_settings(good.as_ptr(), ptr::null_mut(), 0) };
        assert_eq!(rc, OvpnError::Success as c_int);

        let bad = CString::new("[logging]\nlevel = \"loud\"\n").unwrap();
        let mut buf = vec![0 as c_char; 64];
        let rc = unsafe { ovpn_validate_settings(bad.as_ptr(), buf.as_mut_ptr(), buf.len()) };
        assert_eq!(rc, OvpnError::InvalidConfig as c_int);
        let msg = unsafe { CStr::from_ptr(buf.as_ptr()) }.to_str().unwrap();
        assert!(msg.starts_with("Settings error"));

        let rc = unsafe { ovpn_validate_settings(ptr::null(), ptr::null_mut(), 0) };
        assert_eq!(rc, OvpnError::InvalidParameter as c_int);
    }

    #[test]
    fn test_control_response() {
        let token = CString::new("SOME_STATIC_KEY").unwrap();
        let message = b"SOME_STATIC_KEY";
        let mut out = vec![0u8; 128];
        let mut written = 0usize;

        let rc = unsafe {
            ovpn_control_response(
                message.as_ptr(),
                message.len(),
                token.as_ptr(),
                100,
                200,
                out.as_mut_ptr(),
                out.len(),
                &mut written,
            )
        };
        assert_eq!(rc, OvpnError::Success as c_int);

        let decoded: serde_json::Value = serde_json::from_slice(&out[..written]).unwrap();
        assert_eq!(decoded["bytesIn"], 100);
        assert_eq!(decoded["bytesOut"], 200);
    }

    #[test]
    fn test_control_response_errors() {
        let token = CString::new("SOME_STATIC_KEY").unwrap();
        let mut out = vec![0u8; 4];

        let other = b"hello";
        let rc = unsafe {
            ovpn_control_response(
                other.as_ptr(),
                other.len(),
                token.as_ptr(),
                1,
                2,
                out.as_mut_ptr(),
                out.len(),
                ptr::null_mut(),
            )
        };
        assert_eq!(rc, OvpnError::NoResponse as c_int);

        let message = b"SOME_STATIC_KEY";
        let rc = unsafe {
            ovpn_control_response(
                message.as_ptr(),
                message.len(),
                token.as_ptr(),
                1,
                2,
                out.as_mut_ptr(),
                out.len(),
                ptr::null_mut(),
            )
        };
        assert_eq!(rc, OvpnError::BufferTooSmall as c_int);
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            OvpnError::from(VpnError::Credentials("x".into())),
            OvpnError::MissingCredentials
        );
        assert_eq!(
            OvpnError::from(VpnError::FatalEngine("x".into())),
            OvpnError::EngineError
        );
        assert_eq!(
            OvpnError::from(VpnError::Io("x".into())),
            OvpnError::InternalError
        );
    }
}
