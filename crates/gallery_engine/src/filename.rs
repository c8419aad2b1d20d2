use gallery_core::FilterKind;
use sha2::{Digest, Sha256};

/// Windows-safe, deterministic name: `{sanitized_title}--{filter}--{short_hash(url)}.png`
pub fn export_filename(title: &str, filter: FilterKind, source_url: &str) -> String {
    let sanitized = sanitize_title(title);
    let hash = short_hash(source_url);
    format!("{sanitized}--{}--{hash}.png", filter.id())
}

/// Sidecar metadata name for an exported image.
pub fn sidecar_filename(image_filename: &str) -> String {
    let stem = image_filename.strip_suffix(".png").unwrap_or(image_filename);
    format!("{stem}.json")
}

fn sanitize_title(input: &str) -> String {
    let mut cleaned: String = input
        .chars()
        .map(|c| {
            if is_forbidden(c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = "untitled".to_string();
    }
    // Collapse multiple underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }
    let mut final_name: String = compacted.chars().take(80).collect();
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use gallery_core::FilterKind;

    use super::{export_filename, sidecar_filename};

    #[test]
    fn name_is_stable_and_carries_filter() {
        let url = "https://picsum.photos/400/300?random=7";
        let first = export_filename("Photo 7", FilterKind::Sepia, url);
        let second = export_filename("Photo 7", FilterKind::Sepia, url);
        assert_eq!(first, second);
        assert!(first.starts_with("Photo 7--sepia--"));
        assert!(first.ends_with(".png"));
        assert_eq!(first.len(), "Photo 7--sepia--".len() + 8 + ".png".len());
    }

    #[test]
    fn forbidden_characters_are_replaced() {
        let name = export_filename("a/b:c??d", FilterKind::None, "u");
        assert!(name.starts_with("a_b_c_d--none--"));
    }

    #[test]
    fn reserved_and_empty_titles_are_adjusted() {
        assert!(export_filename("CON", FilterKind::Blur, "u").starts_with("CON_--blur--"));
        assert!(export_filename("  ..  ", FilterKind::Blur, "u").starts_with("untitled--"));
    }

    #[test]
    fn sidecar_swaps_extension() {
        assert_eq!(sidecar_filename("x--none--0a1b2c3d.png"), "x--none--0a1b2c3d.json");
    }
}
