pub mod aggregate;
pub mod artifact;
pub mod chart;
pub mod config;
pub mod report;
pub mod runtime;
pub mod table;

/// KB per MB as reported by cgroup memory accounting
pub const KB_PER_MB: f64 = 1024.0;
