//! The engine's C entry points. Complex values (column name lists, rows,
//! records) cross the boundary as JSON strings rather than as raw arrays
//! of pointers — the host already links `serde_json` on its side for
//! config parsing, and a JSON array is a much smaller surface to get
//! wrong than a hand-rolled length-prefixed buffer.

use crate::error::report;
use crate::progress::{nnstore_progress_t, resolve as resolve_progress};
use crate::types::*;
use crate::utils::get_or_create_runtime;
use nnstore_core::types::ColumnType;
use nnstore_core::Config;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};

unsafe fn cstr<'a>(ptr: *const c_char) -> Result<&'a str, c_int> {
    if ptr.is_null() {
        return Err(NNSTORE_ERROR_NULL_POINTER);
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| NNSTORE_ERROR_INVALID_UTF8)
}

fn json_out<T: serde::Serialize>(value: &T, out: *mut *mut c_char) -> c_int {
    let json = match serde_json::to_string(value) {
        Ok(j) => j,
        Err(_) => return NNSTORE_ERROR_UNKNOWN,
    };
    let c_string = match CString::new(json) {
        Ok(c) => c,
        Err(_) => return NNSTORE_ERROR_UNKNOWN,
    };
    unsafe { *out = c_string.into_raw() };
    NNSTORE_OK
}

unsafe fn json_in<T: serde::de::DeserializeOwned>(ptr: *const c_char) -> Result<T, c_int> {
    let s = cstr(ptr)?;
    serde_json::from_str(s).map_err(|_| NNSTORE_ERROR_INVALID_JSON)
}

/// Create a new engine handle.
///
/// # Arguments
/// * `config_json` - engine configuration as JSON, or NULL for defaults.
///
/// # Safety
/// `config_json`, if non-null, must be a valid null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn nnstore_engine_create(
    config_json: *const c_char,
) -> *mut nnstore_engine_t {
    let config = if config_json.is_null() {
        Config::default()
    } else {
        let s = match CStr::from_ptr(config_json).to_str() {
            Ok(s) => s,
            Err(_) => return std::ptr::null_mut(),
        };
        match serde_json::from_str(s) {
            Ok(c) => c,
            Err(_) => return std::ptr::null_mut(),
        }
    };
    Box::into_raw(Box::new(nnstore_engine_t {
        engine: nnstore_core::Engine::new(config),
    }))
}

/// Free an engine handle.
///
/// # Safety
/// `engine` must be a handle returned by [`nnstore_engine_create`], and
/// becomes invalid after this call.
#[no_mangle]
pub unsafe extern "C" fn nnstore_engine_free(engine: *mut nnstore_engine_t) {
    if !engine.is_null() {
        let _ = Box::from_raw(engine);
    }
}

/// Release every loaded data source / generative data / model / cached
/// tree; the engine's configuration is left untouched.
///
/// # Safety
/// `engine` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn nnstore_reset(engine: *mut nnstore_engine_t) -> c_int {
    if engine.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    (*engine).engine.reset();
    NNSTORE_OK
}

macro_rules! engine_ref {
    ($ptr:expr) => {{
        if $ptr.is_null() {
            return NNSTORE_ERROR_NULL_POINTER;
        }
        &(*$ptr).engine
    }};
}

macro_rules! ok_or_report {
    ($result:expr) => {
        match $result {
            Ok(v) => v,
            Err(e) => return report(e),
        }
    };
}

/// Create a fresh, empty data source.
///
/// # Safety
/// `engine`, `column_types`, and `column_names` must be valid for
/// `count` elements; each `column_names` entry must be a valid
/// null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn nnstore_ds_create(
    engine: *mut nnstore_engine_t,
    column_types: *const c_int,
    column_names: *const *const c_char,
    count: usize,
) -> c_int {
    if engine.is_null() || (count > 0 && (column_types.is_null() || column_names.is_null())) {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    let type_slice = std::slice::from_raw_parts(column_types, count);
    let mut types = Vec::with_capacity(count);
    for &tag in type_slice {
        types.push(ok_or_report!(ColumnType::from_wire_tag(tag)));
    }
    let name_slice = std::slice::from_raw_parts(column_names, count);
    let mut names = Vec::with_capacity(count);
    for &ptr in name_slice {
        match cstr(ptr) {
            Ok(s) => names.push(s.to_string()),
            Err(code) => return code,
        }
    }
    (*engine).engine.ds_create(&types, &names);
    NNSTORE_OK
}

/// # Safety
/// `engine` and `path` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_ds_read(
    engine: *mut nnstore_engine_t,
    path: *const c_char,
) -> c_int {
    let engine = engine_ref!(engine);
    let path = match cstr(path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    ok_or_report!(engine.ds_read(path));
    NNSTORE_OK
}

/// # Safety
/// `engine` and `path` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_ds_write(
    engine: *mut nnstore_engine_t,
    path: *const c_char,
) -> c_int {
    let engine = engine_ref!(engine);
    let path = match cstr(path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    ok_or_report!(engine.ds_write(path));
    NNSTORE_OK
}

/// Append one row. `cells_json` is a JSON array of strings, one per
/// column in storage order.
///
/// # Safety
/// `engine` and `cells_json` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_ds_add_value_row(
    engine: *mut nnstore_engine_t,
    cells_json: *const c_char,
) -> c_int {
    let engine = engine_ref!(engine);
    let cells: Vec<String> = match json_in(cells_json) {
        Ok(v) => v,
        Err(code) => return code,
    };
    ok_or_report!(engine.ds_add_value_row(&cells));
    NNSTORE_OK
}

/// # Safety
/// `engine` and `indices` must be valid for `count` elements.
#[no_mangle]
pub unsafe extern "C" fn nnstore_ds_activate_columns(
    engine: *mut nnstore_engine_t,
    indices: *const usize,
    count: usize,
) -> c_int {
    let engine = engine_ref!(engine);
    if count > 0 && indices.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    let slice = std::slice::from_raw_parts(indices, count);
    ok_or_report!(engine.ds_activate_columns(slice));
    NNSTORE_OK
}

/// # Safety
/// `engine` and `indices` must be valid for `count` elements.
#[no_mangle]
pub unsafe extern "C" fn nnstore_ds_deactivate_columns(
    engine: *mut nnstore_engine_t,
    indices: *const usize,
    count: usize,
) -> c_int {
    let engine = engine_ref!(engine);
    if count > 0 && indices.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    let slice = std::slice::from_raw_parts(indices, count);
    ok_or_report!(engine.ds_deactivate_columns(slice));
    NNSTORE_OK
}

/// Writes a JSON array of column names to `*out`. The caller must free it
/// with [`crate::nnstore_string_free`].
///
/// # Safety
/// `engine` and `out` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_ds_get_active_column_names(
    engine: *mut nnstore_engine_t,
    out: *mut *mut c_char,
) -> c_int {
    let engine = engine_ref!(engine);
    if out.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    let names = ok_or_report!(engine.ds_get_active_column_names());
    json_out(&names, out)
}

/// # Safety
/// `engine` and `out` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_ds_get_inactive_column_names(
    engine: *mut nnstore_engine_t,
    out: *mut *mut c_char,
) -> c_int {
    let engine = engine_ref!(engine);
    if out.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    let names = ok_or_report!(engine.ds_get_inactive_column_names());
    json_out(&names, out)
}

/// # Safety
/// `engine` and `out` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_ds_get_number_of_rows(
    engine: *mut nnstore_engine_t,
    out: *mut usize,
) -> c_int {
    let engine = engine_ref!(engine);
    if out.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    *out = ok_or_report!(engine.ds_get_number_of_rows());
    NNSTORE_OK
}

/// Writes row `index` (0-based, every column, raw values) to `*out` as a
/// JSON array of strings.
///
/// # Safety
/// `engine` and `out` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_ds_get_row(
    engine: *mut nnstore_engine_t,
    index: usize,
    out: *mut *mut c_char,
) -> c_int {
    let engine = engine_ref!(engine);
    if out.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    let row = ok_or_report!(engine.ds_get_row(index));
    json_out(&row, out)
}

/// # Safety
/// `engine` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_create(engine: *mut nnstore_engine_t) -> c_int {
    let engine = engine_ref!(engine);
    ok_or_report!(engine.gd_create());
    NNSTORE_OK
}

/// # Safety
/// `engine` and `path` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_read(
    engine: *mut nnstore_engine_t,
    path: *const c_char,
) -> c_int {
    let engine = engine_ref!(engine);
    let path = match cstr(path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    ok_or_report!(engine.gd_read(path));
    NNSTORE_OK
}

/// # Safety
/// `engine` and `path` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_write(
    engine: *mut nnstore_engine_t,
    path: *const c_char,
) -> c_int {
    let engine = engine_ref!(engine);
    let path = match cstr(path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    ok_or_report!(engine.gd_write(path));
    NNSTORE_OK
}

/// Append already-normalised rows. `values`/`len` is a flat buffer, a
/// multiple of the generative data's dimension long.
///
/// # Safety
/// `engine` and `values` must be valid for `len` elements.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_add_value_rows(
    engine: *mut nnstore_engine_t,
    values: *const f32,
    len: usize,
) -> c_int {
    let engine = engine_ref!(engine);
    if len > 0 && values.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    let slice = std::slice::from_raw_parts(values, len);
    ok_or_report!(engine.gd_add_value_rows(slice));
    NNSTORE_OK
}

/// `index` is 0-based.
///
/// # Safety
/// `engine` and `out` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_get_row(
    engine: *mut nnstore_engine_t,
    index: usize,
    out: *mut *mut c_char,
) -> c_int {
    let engine = engine_ref!(engine);
    if out.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    let row = ok_or_report!(engine.gd_get_row(index));
    json_out(&row, out)
}

/// `column_i` is 0-based.
///
/// # Safety
/// `engine` and `out` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_get_min(
    engine: *mut nnstore_engine_t,
    column_i: usize,
    out: *mut f32,
) -> c_int {
    let engine = engine_ref!(engine);
    if out.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    *out = ok_or_report!(engine.gd_get_min(column_i));
    NNSTORE_OK
}

/// `column_i` is 0-based.
///
/// # Safety
/// `engine` and `out` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_get_max(
    engine: *mut nnstore_engine_t,
    column_i: usize,
    out: *mut f32,
) -> c_int {
    let engine = engine_ref!(engine);
    if out.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    *out = ok_or_report!(engine.gd_get_max(column_i));
    NNSTORE_OK
}

/// # Safety
/// `engine` and `out` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_get_number_of_rows(
    engine: *mut nnstore_engine_t,
    out: *mut usize,
) -> c_int {
    let engine = engine_ref!(engine);
    if out.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    *out = ok_or_report!(engine.gd_get_number_of_rows());
    NNSTORE_OK
}

/// `indices_json` is a JSON array of feature-vector positions; `out`
/// receives a JSON array of their names.
///
/// # Safety
/// `engine`, `indices_json`, and `out` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_get_column_names(
    engine: *mut nnstore_engine_t,
    indices_json: *const c_char,
    out: *mut *mut c_char,
) -> c_int {
    let engine = engine_ref!(engine);
    if out.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    let indices: Vec<usize> = match json_in(indices_json) {
        Ok(v) => v,
        Err(code) => return code,
    };
    let names = ok_or_report!(engine.gd_get_column_names(&indices));
    json_out(&names, out)
}

/// Rebuild the density tree and run a full density pass. `k < 0` uses the
/// engine's configured default.
///
/// # Safety
/// `engine` must be valid; `progress`, if non-null, must point to a live
/// `nnstore_progress_t`.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_calculate_density_values(
    engine: *mut nnstore_engine_t,
    k: i64,
    progress: *const nnstore_progress_t,
) -> c_int {
    let engine = engine_ref!(engine);
    let k = if k < 0 { None } else { Some(k as usize) };
    let progress = resolve_progress(progress);
    ok_or_report!(engine.gd_calculate_density_values(k, progress.as_ref()));
    NNSTORE_OK
}

/// # Safety
/// `engine`, `number_vector`, and `out` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_calculate_density_value(
    engine: *mut nnstore_engine_t,
    number_vector: *const f32,
    len: usize,
    k: usize,
    use_tree: bool,
    out: *mut f32,
) -> c_int {
    let engine = engine_ref!(engine);
    if out.is_null() || (len > 0 && number_vector.is_null()) {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    let slice = std::slice::from_raw_parts(number_vector, len);
    *out = ok_or_report!(engine.gd_calculate_density_value(slice, k, use_tree));
    NNSTORE_OK
}

/// # Safety
/// `engine` and `out` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_density_value_quantile(
    engine: *mut nnstore_engine_t,
    percent: f32,
    out: *mut f32,
) -> c_int {
    let engine = engine_ref!(engine);
    if out.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    *out = ok_or_report!(engine.gd_density_value_quantile(percent));
    NNSTORE_OK
}

/// # Safety
/// `engine` and `out` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_density_value_inverse_quantile(
    engine: *mut nnstore_engine_t,
    value: f32,
    out: *mut f32,
) -> c_int {
    let engine = engine_ref!(engine);
    if out.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    *out = ok_or_report!(engine.gd_density_value_inverse_quantile(value));
    NNSTORE_OK
}

/// `record_json` is a JSON array of strings (`"NA"` for missing cells);
/// `out` receives a JSON array of `k` such rows.
///
/// # Safety
/// `engine`, `record_json`, and `out` must be valid; `progress`, if
/// non-null, must point to a live `nnstore_progress_t`.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_k_nearest_neighbors(
    engine: *mut nnstore_engine_t,
    record_json: *const c_char,
    k: usize,
    use_tree: bool,
    progress: *const nnstore_progress_t,
    out: *mut *mut c_char,
) -> c_int {
    let engine = engine_ref!(engine);
    if out.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    let record: Vec<String> = match json_in(record_json) {
        Ok(v) => v,
        Err(code) => return code,
    };
    let progress = resolve_progress(progress);
    let neighbors =
        ok_or_report!(engine.gd_k_nearest_neighbors(&record, k, use_tree, progress.as_ref()));
    json_out(&neighbors, out)
}

/// # Safety
/// `engine`, `record_json`, and `out` must be valid; `progress`, if
/// non-null, must point to a live `nnstore_progress_t`.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gd_complete(
    engine: *mut nnstore_engine_t,
    record_json: *const c_char,
    use_tree: bool,
    progress: *const nnstore_progress_t,
    out: *mut *mut c_char,
) -> c_int {
    let engine = engine_ref!(engine);
    if out.is_null() {
        return NNSTORE_ERROR_NULL_POINTER;
    }
    let record: Vec<String> = match json_in(record_json) {
        Ok(v) => v,
        Err(code) => return code,
    };
    let progress = resolve_progress(progress);
    let completed = ok_or_report!(engine.gd_complete(&record, use_tree, progress.as_ref()));
    json_out(&completed, out)
}

/// Wrap the current data source as a fresh, untrained generative model.
///
/// # Safety
/// `engine` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gm_create(engine: *mut nnstore_engine_t) -> c_int {
    let engine = engine_ref!(engine);
    ok_or_report!(engine.gm_create());
    NNSTORE_OK
}

/// Writes the current generative model record to `path`, first reading
/// its trained-model blobs back in from sibling files named after
/// `model_name`. Blocks the calling thread on the engine's internal
/// Tokio runtime.
///
/// # Safety
/// `engine`, `path`, and `model_name` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gm_write(
    engine: *mut nnstore_engine_t,
    path: *const c_char,
    model_name: *const c_char,
) -> c_int {
    let engine = engine_ref!(engine);
    let path = match cstr(path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let model_name = match cstr(model_name) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let runtime = match get_or_create_runtime() {
        Ok(r) => r,
        Err(_) => return NNSTORE_ERROR_INIT,
    };
    ok_or_report!(runtime.block_on(engine.gm_write(path, model_name)));
    NNSTORE_OK
}

/// Reads a model record from `path` and writes its trained-model blobs
/// back out as sibling files named after `model_name`. Blocks the calling
/// thread on the engine's internal Tokio runtime.
///
/// # Safety
/// `engine`, `path`, and `model_name` must be valid.
#[no_mangle]
pub unsafe extern "C" fn nnstore_gm_read(
    engine: *mut nnstore_engine_t,
    path: *const c_char,
    model_name: *const c_char,
) -> c_int {
    let engine = engine_ref!(engine);
    let path = match cstr(path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let model_name = match cstr(model_name) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let runtime = match get_or_create_runtime() {
        Ok(r) => r,
        Err(_) => return NNSTORE_ERROR_INIT,
    };
    ok_or_report!(runtime.block_on(engine.gm_read(path, model_name)));
    NNSTORE_OK
}

macro_rules! gm_getter {
    ($name:ident, $method:ident, $ty:ty) => {
        /// # Safety
        /// `engine` and `out` must be valid.
        #[no_mangle]
        pub unsafe extern "C" fn $name(engine: *mut nnstore_engine_t, out: *mut $ty) -> c_int {
            let engine = engine_ref!(engine);
            if out.is_null() {
                return NNSTORE_ERROR_NULL_POINTER;
            }
            *out = ok_or_report!(engine.$method());
            NNSTORE_OK
        }
    };
}

macro_rules! gm_setter {
    ($name:ident, $method:ident, $ty:ty) => {
        /// # Safety
        /// `engine` must be valid.
        #[no_mangle]
        pub unsafe extern "C" fn $name(engine: *mut nnstore_engine_t, value: $ty) -> c_int {
            let engine = engine_ref!(engine);
            ok_or_report!(engine.$method(value));
            NNSTORE_OK
        }
    };
}

gm_getter!(
    nnstore_gm_get_n_training_iterations,
    gm_get_n_training_iterations,
    c_int
);
gm_setter!(
    nnstore_gm_set_n_training_iterations,
    gm_set_n_training_iterations,
    c_int
);
gm_getter!(
    nnstore_gm_get_n_initialization_iterations,
    gm_get_n_initialization_iterations,
    c_int
);
gm_setter!(
    nnstore_gm_set_n_initialization_iterations,
    gm_set_n_initialization_iterations,
    c_int
);
gm_getter!(
    nnstore_gm_get_n_hidden_layer_units,
    gm_get_n_hidden_layer_units,
    c_int
);
gm_setter!(
    nnstore_gm_set_n_hidden_layer_units,
    gm_set_n_hidden_layer_units,
    c_int
);
gm_getter!(nnstore_gm_get_learning_rate, gm_get_learning_rate, f32);
gm_setter!(nnstore_gm_set_learning_rate, gm_set_learning_rate, f32);
gm_getter!(nnstore_gm_get_dropout, gm_get_dropout, f32);
gm_setter!(nnstore_gm_set_dropout, gm_set_dropout, f32);
