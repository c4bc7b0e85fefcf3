//! Approximate frequency estimation over high-volume key streams under a
//! fixed memory budget: a count-min sketch (one-sided minimum estimator) and
//! a count sketch (sign-corrected median estimator), both supporting
//! destructive bucket merging or hierarchical-resolution compression.

pub mod cm_sketch;
pub mod count_sketch;
pub mod hash;
pub mod log;
pub mod table;
