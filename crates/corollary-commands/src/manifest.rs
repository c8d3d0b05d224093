//! OSGi bundle manifests.

/// Suffix marking a Maven snapshot version.
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

const BUNDLE_VERSION: &str = "Bundle-Version:";

/// Map a Maven version to its OSGi form (`1.0-SNAPSHOT` → `1.0.qualifier`).
pub fn osgi_version(version: &str) -> String {
    match version.strip_suffix(SNAPSHOT_SUFFIX) {
        Some(release) => format!("{release}.qualifier"),
        None => version.to_string(),
    }
}

/// Replace the `Bundle-Version` header of a manifest.
///
/// Returns `None` if the manifest has no such header.
pub fn update_bundle_version(manifest: &str, version: &str) -> Option<String> {
    let mut updated = String::with_capacity(manifest.len());
    let mut found = false;

    for raw in manifest.split_inclusive('\n') {
        let body = raw.trim_end_matches(['\r', '\n']);
        if body.trim_start().starts_with(BUNDLE_VERSION) {
            found = true;
            updated.push_str(BUNDLE_VERSION);
            updated.push(' ');
            updated.push_str(version);
            updated.push_str(&raw[body.len()..]);
        } else {
            updated.push_str(raw);
        }
    }

    found.then_some(updated)
}
