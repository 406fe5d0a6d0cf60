// ContentShield: dual-model harmful content detection.
//
// This is the library root. Each module corresponds to one stage of the
// analysis pipeline: normalize → prefilter → classifiers → fusion, with
// the analyzer orchestrating and the result cache sitting beside it.

pub mod analyzer;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod extract;
pub mod fusion;
pub mod normalize;
pub mod prefilter;
