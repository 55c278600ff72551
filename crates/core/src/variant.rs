//! Tagged configuration file variants.
//!
//! When an RPM transaction finds a config file the administrator has
//! modified, it leaves the packaged version next to it under a tagged
//! suffix instead of overwriting it. This module knows the three suffixes,
//! locates the variants that exist for a base file, and recovers the base
//! path from a tagged filename.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Suffix
// ---------------------------------------------------------------------------

/// The three variant suffixes an RPM transaction can leave behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suffix {
    /// `.rpmnew` — the packaged version offered alongside the admin's file.
    New,
    /// `.rpmsave` — the admin's file, backed up after a forced upgrade.
    Save,
    /// `.rpmorig` — the pre-package original, backed up like `.rpmsave`.
    Orig,
}

/// Which prompt polarity a variant drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    /// The variant is an offered update; the base file stays primary.
    Offered,
    /// The variant is the administrator's backup; the base file now holds
    /// the packaged version.
    Backup,
}

impl Suffix {
    /// All suffixes, in the order a base file's variants are processed.
    pub const ALL: [Suffix; 3] = [Suffix::New, Suffix::Save, Suffix::Orig];

    /// The filename extension carrying this suffix (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            Suffix::New => "rpmnew",
            Suffix::Save => "rpmsave",
            Suffix::Orig => "rpmorig",
        }
    }

    /// Parse a filename extension (without the dot) into a suffix.
    pub fn from_extension(ext: &str) -> Option<Suffix> {
        match ext {
            "rpmnew" => Some(Suffix::New),
            "rpmsave" => Some(Suffix::Save),
            "rpmorig" => Some(Suffix::Orig),
            _ => None,
        }
    }

    /// The prompt polarity this suffix drives.
    pub fn kind(self) -> VariantKind {
        match self {
            Suffix::New => VariantKind::Offered,
            Suffix::Save | Suffix::Orig => VariantKind::Backup,
        }
    }
}

impl fmt::Display for Suffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.extension())
    }
}

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// A tagged counterpart of a base configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// The base configuration file the variant belongs to.
    pub base: PathBuf,
    /// Which suffix the variant carries.
    pub suffix: Suffix,
    /// Full path of the variant file (`base` + `.` + suffix).
    pub path: PathBuf,
}

impl Variant {
    /// Describe the variant a given suffix would have for `base`, whether
    /// or not it exists on disk.
    pub fn new(base: &Path, suffix: Suffix) -> Variant {
        let mut name = base.as_os_str().to_os_string();
        name.push(".");
        name.push(suffix.extension());
        Variant {
            base: base.to_path_buf(),
            suffix,
            path: PathBuf::from(name),
        }
    }

    /// Direct existence check. Uses `symlink_metadata` so a dangling
    /// symlink variant still counts as present.
    pub fn exists(&self) -> bool {
        fs::symlink_metadata(&self.path).is_ok()
    }
}

/// Locate the variants that currently exist on disk for `base`.
///
/// Each suffix is probed with a direct existence check rather than a
/// directory listing. Never fails; a missing suffix simply yields no
/// variant.
pub fn locate(base: &Path) -> Vec<Variant> {
    Suffix::ALL
        .iter()
        .map(|&suffix| Variant::new(base, suffix))
        .filter(Variant::exists)
        .collect()
}

/// If `path` carries a variant suffix, return the base path it belongs to
/// together with the suffix. Used by the orphan scanner to recover the
/// candidate base file from a walked filename.
pub fn split_tagged(path: &Path) -> Option<(PathBuf, Suffix)> {
    let ext = path.extension()?.to_str()?;
    let suffix = Suffix::from_extension(ext)?;
    Some((path.with_extension(""), suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_suffix_roundtrip() {
        for suffix in Suffix::ALL {
            assert_eq!(Suffix::from_extension(suffix.extension()), Some(suffix));
        }
        assert_eq!(Suffix::from_extension("bak"), None);
    }

    #[test]
    fn test_suffix_kind() {
        assert_eq!(Suffix::New.kind(), VariantKind::Offered);
        assert_eq!(Suffix::Save.kind(), VariantKind::Backup);
        assert_eq!(Suffix::Orig.kind(), VariantKind::Backup);
    }

    #[test]
    fn test_variant_path_construction() {
        let v = Variant::new(Path::new("/etc/foo.conf"), Suffix::New);
        assert_eq!(v.path, PathBuf::from("/etc/foo.conf.rpmnew"));
        assert_eq!(v.base, PathBuf::from("/etc/foo.conf"));
    }

    #[test]
    fn test_locate_finds_only_present_suffixes() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("app.conf");
        std::fs::write(&base, "installed\n").unwrap();
        std::fs::write(dir.path().join("app.conf.rpmnew"), "offered\n").unwrap();
        std::fs::write(dir.path().join("app.conf.rpmsave"), "saved\n").unwrap();

        let found = locate(&base);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].suffix, Suffix::New);
        assert_eq!(found[1].suffix, Suffix::Save);
    }

    #[test]
    fn test_locate_counts_dangling_symlink() {
        #[cfg(unix)]
        {
            let dir = TempDir::new().unwrap();
            let base = dir.path().join("link.conf");
            std::os::unix::fs::symlink("/nonexistent/target", dir.path().join("link.conf.rpmnew"))
                .unwrap();

            let found = locate(&base);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].suffix, Suffix::New);
        }
    }

    #[test]
    fn test_split_tagged() {
        let (base, suffix) = split_tagged(Path::new("/etc/foo.conf.rpmsave")).unwrap();
        assert_eq!(base, PathBuf::from("/etc/foo.conf"));
        assert_eq!(suffix, Suffix::Save);

        assert!(split_tagged(Path::new("/etc/foo.conf")).is_none());
        assert!(split_tagged(Path::new("/etc/foo.tar.gz")).is_none());
    }
}
