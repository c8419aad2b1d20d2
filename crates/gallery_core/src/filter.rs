use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named image filters. Each one is a fixed parameterisation; callers cannot
/// tune the intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    None,
    Blur,
    Brightness,
    Contrast,
    Grayscale,
    Sepia,
}

impl FilterKind {
    pub const ALL: [FilterKind; 6] = [
        FilterKind::None,
        FilterKind::Blur,
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::Grayscale,
        FilterKind::Sepia,
    ];

    /// Stable identifier, used in task ids, filenames and persisted state.
    pub fn id(self) -> &'static str {
        match self {
            FilterKind::None => "none",
            FilterKind::Blur => "blur",
            FilterKind::Brightness => "brightness",
            FilterKind::Contrast => "contrast",
            FilterKind::Grayscale => "grayscale",
            FilterKind::Sepia => "sepia",
        }
    }

    /// Short label for the filter picker.
    pub fn label(self) -> &'static str {
        match self {
            FilterKind::None => "Original",
            FilterKind::Blur => "Blur",
            FilterKind::Brightness => "Bright",
            FilterKind::Contrast => "Contrast",
            FilterKind::Grayscale => "B&W",
            FilterKind::Sepia => "Sepia",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFilter(pub String);

impl fmt::Display for UnknownFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown filter '{}'", self.0)
    }
}

impl std::error::Error for UnknownFilter {}

impl FromStr for FilterKind {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FilterKind::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownFilter(wanted.to_string()))
    }
}
