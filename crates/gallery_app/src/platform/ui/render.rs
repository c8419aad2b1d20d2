use gallery_core::{CardView, GalleryViewModel, LoadState, ViewMode};

pub fn render(view: &GalleryViewModel) -> Vec<String> {
    let mut lines = Vec::with_capacity(view.cards.len() + 2);
    lines.push(status_line(view));
    lines.push(format!(
        "Filter: {} | View: {} | Background: {} ({} queued)",
        view.filter.label(),
        view_mode_label(view.view_mode),
        view.background_label(),
        view.background.queue_len
    ));
    lines.extend(
        view.cards
            .iter()
            .filter(|card| !matches!(card.load, LoadState::Hidden))
            .map(format_card),
    );
    if view.loading {
        lines.push("Loading more photos...".to_string());
    } else if !view.has_more {
        lines.push("All photos loaded".to_string());
    }
    lines
}

pub fn status_line(view: &GalleryViewModel) -> String {
    let network = if view.online {
        view.effective_type.label()
    } else {
        "offline"
    };
    format!(
        "Photos: {} | Revealed: {} | Network: {} | Quality: {}",
        view.photo_count,
        view.revealed_count,
        network,
        view.quality.label()
    )
}

fn format_card(card: &CardView) -> String {
    let state = match &card.load {
        LoadState::Hidden => "hidden".to_string(),
        LoadState::Loading { .. } => "loading".to_string(),
        LoadState::Loaded { width, height } => format!("{width}x{height}"),
        LoadState::Failed { reason } => format!("failed to load: {reason}"),
    };
    let mut flags = String::new();
    if card.processed {
        flags.push_str(" [processed]");
    }
    if card.liked {
        flags.push_str(" [liked]");
    }
    format!(
        "  #{id:>3} {title} ({category}) {state}{flags}",
        id = card.image_id,
        title = card.title,
        category = card.category,
    )
}

fn view_mode_label(mode: ViewMode) -> &'static str {
    match mode {
        ViewMode::Grid => "grid",
        ViewMode::List => "list",
    }
}
