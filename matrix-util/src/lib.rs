pub mod common_io; // buffered readers and writers (plain, gzip, stdio)
pub mod ndarray_util; // log-odds, xlogy and argmax helpers on ndarray
