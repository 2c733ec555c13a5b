// Version selection for OCSF schema snapshots

/// Markers that identify pre-release schema versions
const UNSTABLE_MARKERS: [&str; 4] = ["dev", "alpha", "beta", "rc"];

/// Check whether a version string names a stable release
pub fn is_stable_version(version: &str) -> bool {
    let lower = version.to_lowercase();
    !UNSTABLE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Pick the lexicographically last stable version
///
/// Plain string ordering; `1.10.0` sorts before `1.9.0`.
pub fn latest_stable<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    versions
        .into_iter()
        .map(String::as_str)
        .filter(|v| is_stable_version(v))
        .max()
}
