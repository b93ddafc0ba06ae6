pub mod batch;
pub mod bonds;
pub mod callable;
pub mod report;
