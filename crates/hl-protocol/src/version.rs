//! Client version gating.
//!
//! The bridge client ships with the user's hub process; old versions speak
//! incompatible wire shapes and must be fenced off before any directive
//! logic runs.

use semver::{Version, VersionReq};

/// Oldest client version that is still allowed to operate.
const MIN_CLIENT_VERSION: &str = ">=2.13.1";

/// Features gated on the client version that introduced them.
const FEATURES: &[(&str, &str)] = &[
    ("reportState", ">=2.2.0"),
    ("provision", ">=2.8.0"),
    ("msgRateLimiter", ">=2.12.0"),
];

fn satisfies(version: &str, requirement: &str) -> bool {
    let Ok(version) = Version::parse(version) else {
        return false;
    };
    let Ok(req) = VersionReq::parse(requirement) else {
        return false;
    };
    req.matches(&version)
}

/// Whether a client of the given version may connect at all.
pub fn is_allowed_client_version(client_version: &str) -> bool {
    satisfies(client_version, MIN_CLIENT_VERSION)
}

/// Whether the named feature is supported by a client of the given version.
/// Unknown features are never supported.
pub fn is_feature_supported_by_client(feature: &str, client_version: &str) -> bool {
    FEATURES
        .iter()
        .find(|(name, _)| *name == feature)
        .is_some_and(|(_, req)| satisfies(client_version, req))
}
