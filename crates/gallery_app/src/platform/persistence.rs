use std::fs;
use std::path::{Path, PathBuf};

use gallery_core::{FilterKind, ImageId, Preferences, ViewMode};
use gallery_engine::{ensure_output_dir, AtomicFileWriter};
use gallery_logging::{gallery_error, gallery_info, gallery_warn};
use serde::{Deserialize, Serialize};

const STATE_FILENAME: &str = ".gallery_state.ron";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
struct PersistedState {
    filter: FilterKind,
    view_mode: ViewMode,
    liked: Vec<ImageId>,
}

pub(crate) fn load_preferences(output_dir: &Path) -> Preferences {
    let path = output_dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Preferences::default();
        }
        Err(err) => {
            gallery_warn!("Failed to read preferences from {:?}: {}", path, err);
            return Preferences::default();
        }
    };

    let state: PersistedState = match ron::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            gallery_warn!("Failed to parse preferences from {:?}: {}", path, err);
            return Preferences::default();
        }
    };

    gallery_info!("Loaded preferences from {:?}", path);
    Preferences {
        filter: state.filter,
        view_mode: state.view_mode,
        liked: state.liked,
    }
}

pub(crate) fn save_preferences(output_dir: &Path, preferences: &Preferences) {
    if let Err(err) = ensure_output_dir(output_dir) {
        gallery_error!("Failed to ensure output dir {:?}: {}", output_dir, err);
        return;
    }

    let state = PersistedState {
        filter: preferences.filter,
        view_mode: preferences.view_mode,
        liked: preferences.liked.clone(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&state, pretty) {
        Ok(text) => text,
        Err(err) => {
            gallery_error!("Failed to serialize preferences: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(PathBuf::from(output_dir));
    if let Err(err) = writer.write(STATE_FILENAME, &content) {
        gallery_error!("Failed to write preferences to {:?}: {}", output_dir, err);
    }
}
