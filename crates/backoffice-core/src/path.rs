/// Join a configured domain with a stored relative path.
///
/// Absolute `http://`/`https://` paths and empty paths are returned as is.
pub fn make_image_path(domain: &str, path: &str) -> String {
    if path.is_empty() || path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let domain = domain.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if domain.is_empty() {
        return path.to_string();
    }
    format!("{domain}/{path}")
}
