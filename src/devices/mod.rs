//! Bus peripheral drivers

pub mod bno080;
