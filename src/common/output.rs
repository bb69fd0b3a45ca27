use std::path::{Path, PathBuf};

/// Path of the one-row-per-article companion of a researcher profile file:
/// "profiles.csv" -> "profiles_expand.csv"
pub fn expanded_path<P: AsRef<Path>>(base: P) -> PathBuf {
    sibling_with_suffix(base.as_ref(), "expand")
}

/// Path of the next-hop walker input derived from a cited-articles file:
/// "cited.csv" -> "cited_next_hop.csv"
pub fn next_hop_path<P: AsRef<Path>>(base: P) -> PathBuf {
    sibling_with_suffix(base.as_ref(), "next_hop")
}

fn sibling_with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let extension = base.extension().and_then(|s| s.to_str());
    let filename = match extension {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext),
        None => format!("{}_{}", stem, suffix),
    };
    match base.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.join(filename),
        _ => PathBuf::from(filename),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expanded_path_generation() {
        assert_eq!(expanded_path("profiles.csv"), PathBuf::from("profiles_expand.csv"));
    }

    #[test]
    fn test_expanded_path_with_directory() {
        assert_eq!(
            expanded_path("/path/to/profiles.csv"),
            PathBuf::from("/path/to/profiles_expand.csv")
        );
    }

    #[test]
    fn test_next_hop_path_no_extension() {
        assert_eq!(next_hop_path("cited"), PathBuf::from("cited_next_hop"));
    }
}
