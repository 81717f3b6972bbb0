//! Pipeline orchestration for the gauntlet build fetcher.
//!
//! Ties the leaderboard and match search clients, the build extractor, and
//! the output assembler into the end-to-end `fetch` run.

pub mod assembler;
pub mod pipeline;
