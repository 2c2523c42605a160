//! Image reference parsing and hierarchical registry matching.

/// Strip the tag or digest from an image reference, leaving `registry/path`.
///
/// Only the last path segment is inspected for a tag so that a registry port
/// (`localhost:5000/img`) survives.
#[must_use]
pub fn repository_of(image: &str) -> &str {
    let image = image.split_once('@').map_or(image, |(repo, _)| repo);
    match (image.rfind('/'), image.rfind(':')) {
        (Some(slash), Some(colon)) if colon > slash => &image[..colon],
        _ => image,
    }
}

/// Whether `prefix` covers `repository` on `/` segment boundaries.
///
/// `fake.repo.com` covers `fake.repo.com/image` but not
/// `fake.repo.com.private.com/image` or `private.fake.repo.com/image`.
#[must_use]
pub fn covers(prefix: &str, repository: &str) -> bool {
    let prefix = prefix.trim().trim_end_matches('/');
    if prefix.is_empty() {
        return false;
    }
    match repository.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

/// Split a comma-separated registry list, dropping blanks.
#[must_use]
pub fn parse_registry_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_strips_tag_and_digest() {
        assert_eq!(repository_of("fake.repo.com/image:v1.0.0"), "fake.repo.com/image");
        assert_eq!(
            repository_of("fake.repo.com/image@sha256:abcd"),
            "fake.repo.com/image"
        );
        assert_eq!(
            repository_of("localhost:5000/plugins/login:v1"),
            "localhost:5000/plugins/login"
        );
        assert_eq!(repository_of("localhost:5000/login"), "localhost:5000/login");
        assert_eq!(repository_of("fake.repo.com"), "fake.repo.com");
    }

    #[test]
    fn covers_respects_segment_boundaries() {
        let repo = "fake.repo.com/image";
        assert!(covers("fake.repo.com", repo));
        assert!(covers("fake.repo.com/", repo));
        assert!(covers("fake.repo.com/image", repo));
        assert!(!covers("fake.repo.com/foo", repo));
        assert!(!covers("fake.repo.com/image/foo", repo));
        assert!(!covers("fake.repo.com.private.com", repo));
        assert!(!covers("private.fake.repo.com", repo));
        assert!(!covers("fake.repo.co", repo));
        assert!(!covers("", repo));
    }

    #[test]
    fn registry_list_parsing() {
        assert_eq!(
            parse_registry_list(" a.io , ,b.io/x,"),
            vec!["a.io".to_string(), "b.io/x".to_string()]
        );
        assert!(parse_registry_list("").is_empty());
    }
}
