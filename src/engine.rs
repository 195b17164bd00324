//! The engine context: everything that used to be ambient state.
//!
//! Pattern tables (read-only after construction), the scratch marks of
//! the block flood and the move generators, the single RNG stream and
//! the effective expansion threshold all live here and are threaded
//! through every operation that needs them.

use std::path::Path;

use crate::constants::{EXPAND_VISITS, EXPAND_VISITS_BARE};
use crate::largepat::{LargePatternDict, KSIZE};
use crate::pat3::Pat3Set;
use crate::rng::Lcg;
use crate::sets::Mark;

pub struct Engine {
    /// 3x3 pattern set, compiled at startup.
    pub pat3: Pat3Set,
    /// Large-pattern dictionary; empty when the files were missing.
    pub large: LargePatternDict,
    /// The one random stream.
    pub rng: Lcg,
    /// Leaf visits before expansion; lowered when no large patterns
    /// are loaded so in-tree statistics can stand in for the priors.
    pub expand_visits: u32,
    /// Scratch marks: block-flood stones and liberties, and the
    /// dedup set of the capture-move generator. Each is owned by one
    /// computation at a time.
    pub mark1: Mark,
    pub mark2: Mark,
    pub suggested: Mark,
}

impl Engine {
    /// Engine without large patterns (unit tests, benchmarks).
    pub fn new(seed: u32) -> Self {
        Engine {
            pat3: Pat3Set::compile(),
            large: LargePatternDict::empty(),
            rng: Lcg::new(seed),
            expand_visits: EXPAND_VISITS,
            mark1: Mark::new(),
            mark2: Mark::new(),
            suggested: Mark::new(),
        }
    }

    /// Engine with the large-pattern dictionary loaded from the two
    /// pattern files. A missing or unreadable file is not fatal: the
    /// engine logs a warning and plays on without the dictionary,
    /// expanding earlier to compensate.
    pub fn with_patterns(seed: u32, prob_file: &Path, spat_file: &Path) -> Self {
        let mut engine = Engine::new(seed);
        match LargePatternDict::load_files(prob_file, spat_file, KSIZE) {
            Ok(dict) => {
                log::info!(
                    "loaded {} large patterns from {} and {}",
                    dict.len(),
                    prob_file.display(),
                    spat_file.display()
                );
                engine.large = dict;
            }
            Err(err) => {
                log::warn!("cannot load pattern files ({err:#}); playing without large patterns");
                engine.expand_visits = EXPAND_VISITS_BARE;
            }
        }
        engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_engine_compiles_patterns() {
        let eng = Engine::new(1);
        assert!(!eng.pat3.is_empty());
        assert!(eng.large.is_empty());
        assert_eq!(eng.expand_visits, EXPAND_VISITS);
    }

    #[test]
    fn missing_files_lower_expansion_threshold() {
        let eng = Engine::with_patterns(
            1,
            Path::new("/nonexistent/patterns.prob"),
            Path::new("/nonexistent/patterns.spat"),
        );
        assert!(eng.large.is_empty());
        assert_eq!(eng.expand_visits, EXPAND_VISITS_BARE);
    }
}
