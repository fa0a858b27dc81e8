//! Collision-free destination names
//!
//! The probe is check-then-use and is not atomic against writers outside the
//! engine. The engine is the only writer into its destination while a
//! request runs, and the copy itself refuses to replace an existing file.

use crate::library::FileSystem;
use std::path::Path;

/// Return `proposed` if it is free in `destination`, otherwise the first free
/// `"{stem} ({n}).{ext}"` for n = 1, 2, 3, ...
pub fn unique_destination_name(fs: &dyn FileSystem, destination: &Path, proposed: &str) -> String {
    if !fs.exists(&destination.join(proposed)) {
        return proposed.to_string();
    }

    let (stem, extension) = split_name(proposed);

    let mut counter: u64 = 1;
    loop {
        let candidate = match extension {
            Some(ext) => format!("{} ({}).{}", stem, counter, ext),
            None => format!("{} ({})", stem, counter),
        };
        if !fs.exists(&destination.join(&candidate)) {
            return candidate;
        }
        counter += 1;
    }
}

/// Split a file name into stem and extension.
///
/// Leading-dot names such as `.hidden` have no extension.
fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(0) | None => (name, None),
        Some(idx) if idx == name.len() - 1 => (name, None),
        Some(idx) => (&name[..idx], Some(&name[idx + 1..])),
    }
}
