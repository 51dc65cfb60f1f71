//! Property-test run profile read from the environment.
//!
//! `FILTRO_PBT_CASES` overrides the case count. An invalid override falls
//! back to the default with a warning.

use std::env;

/// Environment variable controlling proptest case counts.
pub const FILTRO_PBT_CASES_ENV_KEY: &str = "FILTRO_PBT_CASES";

/// Runtime profile for property-test execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProptestRunProfile {
    cases: u32,
}

impl ProptestRunProfile {
    /// Loads a profile, falling back to `default_cases`.
    ///
    /// # Examples
    /// ```
    /// use filtro_test_support::pbt::ProptestRunProfile;
    ///
    /// let profile = ProptestRunProfile::load(32);
    /// assert!(profile.cases() > 0);
    /// ```
    #[must_use]
    pub fn load(default_cases: u32) -> Self {
        Self {
            cases: override_or(FILTRO_PBT_CASES_ENV_KEY, default_cases, parse_cases),
        }
    }

    /// Cases to run per property.
    #[must_use]
    #[rustfmt::skip]
    pub fn cases(&self) -> u32 { self.cases }
}

fn override_or<T: Copy>(key: &'static str, default: T, parse: fn(&str) -> Option<T>) -> T {
    let Ok(raw) = env::var(key) else {
        return default;
    };
    parse(&raw).unwrap_or_else(|| {
        tracing::warn!(env = key, raw = %raw, "ignoring invalid property-test override");
        default
    })
}

fn parse_cases(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|&cases| cases > 0)
}
