//! Randomized splitting of bundles into review sessions

use crate::io::configuration::CurationConfig;
use crate::io::error::{Result, invalid_parameter};
use crate::session::discovery::Bundle;
use crate::session::review::ReviewSession;
use rand::seq::SliceRandom;
use rand::{SeedableRng, rngs::StdRng};
use regex::Regex;

/// Bundles left out of a review
///
/// Each value is either a bundle id or a glob (`*`, `?`) matched against
/// the result file's name and its full path.
#[derive(Debug, Clone, Default)]
pub struct Exclusion {
    ids: Vec<usize>,
    patterns: Vec<Regex>,
}

fn glob_regex(glob: &str) -> Result<Regex> {
    let mut pattern = String::from("^");
    for part in glob.split_inclusive(['*', '?']) {
        let (literal, wildcard) = match part.strip_suffix('*') {
            Some(literal) => (literal, ".*"),
            None => part
                .strip_suffix('?')
                .map_or((part, ""), |literal| (literal, ".")),
        };
        pattern.push_str(&regex::escape(literal));
        pattern.push_str(wildcard);
    }
    pattern.push('$');
    Regex::new(&pattern).map_err(|err| invalid_parameter("exclude", &glob, &err))
}

impl Exclusion {
    /// Exclusion from command line values
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error for an empty value or a zero id
    pub fn parse(values: &[String]) -> Result<Self> {
        let mut exclusion = Self::default();
        for value in values {
            let value = value.trim();
            if value.is_empty() {
                return Err(invalid_parameter("exclude", &value, &"empty pattern"));
            }
            match value.parse::<usize>() {
                Ok(0) => return Err(invalid_parameter("exclude", &value, &"ids start at 1")),
                Ok(id) => exclusion.ids.push(id),
                Err(_) => exclusion.patterns.push(glob_regex(value)?),
            }
        }
        Ok(exclusion)
    }

    /// True when nothing is excluded
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.patterns.is_empty()
    }

    /// True when `bundle` is left out
    pub fn matches(&self, bundle: &Bundle) -> bool {
        if self.ids.contains(&bundle.id()) {
            return true;
        }
        let name = bundle.file_name();
        let path = bundle.roi_path().to_string_lossy();
        self.patterns
            .iter()
            .any(|pattern| pattern.is_match(&name) || pattern.is_match(&path))
    }
}

/// Builds blinded review sessions from loaded bundles
///
/// All randomness comes from one `StdRng`: the order in which bundles are
/// assigned to sessions and the display order inside each session. Neither
/// depends on file or directory names.
pub struct SessionBuilder {
    roi_per_session: usize,
    revisit_culled: bool,
    exclusion: Exclusion,
    rng: StdRng,
}

impl SessionBuilder {
    /// Builder seeded from operating system entropy
    pub fn new(config: &CurationConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Builder with a fixed seed for reproducible sessions
    pub fn with_seed(config: &CurationConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    /// Seeded builder when `seed` is given, entropy seeded otherwise
    pub fn from_seed(config: &CurationConfig, seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(config, seed),
            None => Self::new(config),
        }
    }

    fn with_rng(config: &CurationConfig, rng: StdRng) -> Self {
        Self {
            roi_per_session: config.roi_per_session,
            revisit_culled: config.revisit_culled,
            exclusion: Exclusion::default(),
            rng,
        }
    }

    /// Leave the bundles matched by `exclusion` out of every session
    #[must_use]
    pub fn excluding(mut self, exclusion: Exclusion) -> Self {
        self.exclusion = exclusion;
        self
    }

    /// Assign bundles to sessions
    ///
    /// Bundles are shuffled and appended to the current session until it
    /// holds at least `roi_per_session` reviewable records. Excluded bundles
    /// and bundles with nothing to review are left out.
    pub fn partition(&mut self, bundles: &[Bundle]) -> Vec<Vec<usize>> {
        let mut order: Vec<usize> = bundles
            .iter()
            .enumerate()
            .filter(|(_, bundle)| {
                if self.exclusion.matches(bundle) {
                    tracing::debug!(bundle = bundle.id(), "excluded");
                    return false;
                }
                let keep = bundle.reviewable_count(self.revisit_culled) > 0;
                if !keep {
                    tracing::debug!(bundle = bundle.id(), "no reviewable records, skipped");
                }
                keep
            })
            .map(|(index, _)| index)
            .collect();
        order.shuffle(&mut self.rng);

        let mut sessions = Vec::new();
        let mut current = Vec::new();
        let mut count = 0;
        for index in order {
            count += bundles
                .get(index)
                .map_or(0, |bundle| bundle.reviewable_count(self.revisit_culled));
            current.push(index);

            if self.roi_per_session > 0 && count >= self.roi_per_session {
                sessions.push(std::mem::take(&mut current));
                count = 0;
            }
        }
        if !current.is_empty() {
            sessions.push(current);
        }
        sessions
    }

    /// Shuffled session `id` over `bundle_indices`
    pub fn session(
        &mut self,
        id: usize,
        bundle_indices: Vec<usize>,
        bundles: &[Bundle],
    ) -> ReviewSession {
        ReviewSession::new(
            id,
            bundle_indices,
            bundles,
            self.revisit_culled,
            &mut self.rng,
        )
    }

    /// Partition `bundles` and shuffle every resulting session
    pub fn build(&mut self, bundles: &[Bundle]) -> Vec<ReviewSession> {
        let partition = self.partition(bundles);
        tracing::debug!(sessions = partition.len(), "sessions planned");
        partition
            .into_iter()
            .enumerate()
            .map(|(index, indices)| self.session(index + 1, indices, bundles))
            .collect()
    }
}
