use snobal_core::BatchError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for FFI error types.
///
/// - `code()` - Returns the error code passed across the FFI boundary
/// - `msg()` - Returns the error message for diagnostic purposes
pub(crate) trait SnobalError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> SnobalErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `SnobalError` for the batch entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultSnobalError {
    code: SnobalErrorCode,
    msg: String,
}

impl DefaultSnobalError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"records"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: SnobalErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }
}

impl SnobalError for DefaultSnobalError {
    fn code(&self) -> SnobalErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

impl From<&BatchError> for DefaultSnobalError {
    fn from(error: &BatchError) -> Self {
        let code = match error {
            BatchError::LengthMismatch { .. } | BatchError::InvalidParams(_) => {
                SnobalErrorCode::InvalidParameter
            }
            BatchError::ThreadPool(_) => SnobalErrorCode::ThreadPool,
            BatchError::Fatal { .. } => SnobalErrorCode::Fatal,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

/// FFI error codes returned by snowpack functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnobalErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Invalid parameter: heights, roughness or timestep levels rejected.
    InvalidParameter = 2,

    /// The worker pool could not be created.
    ThreadPool = 3,

    /// A cell hit a non-recoverable error; the batch was abandoned and
    /// records may be partially updated.
    Fatal = 4,
}

impl From<DefaultSnobalError> for SnobalErrorCode {
    fn from(error: DefaultSnobalError) -> Self {
        error.code
    }
}

thread_local! {
    /// Thread-local storage for the most recent FFI error (C string, error code).
    /// The CString is stored here so the pointer handed out stays valid.
    static LAST_ERROR: RefCell<(Option<CString>, SnobalErrorCode)> = const { RefCell::new((None, SnobalErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, SnobalErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, SnobalErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if the last call on this thread failed.
/// - `null` if the last call succeeded or the message cannot be converted.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```c
/// SnobalErrorCode err = snobal_run_batch(n, 0, true, in1, in2, pp, &params, records, NULL);
/// if (err != Ok) {
///     const char* msg = snobal_get_last_error();
///     if (msg) {
///         fprintf(stderr, "snobal batch failed: %s\n", msg);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn snobal_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code.
///
/// Returns `Ok` (0) if the last call on this thread succeeded.
#[no_mangle]
pub extern "C" fn snobal_get_last_error_code() -> SnobalErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
