pub mod chain; // fixed-capacity blocks of log-likelihood samples
pub mod convergence; // entropy-based stationarity check
pub mod traits; // convergence criterion interface
