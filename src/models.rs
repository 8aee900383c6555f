use crate::identity::UserId;
use crate::layout::{BlockSpec, Theme, TrackerLayout};
use crate::tracker::{Block, CellPosition, CellStatus, Mood, CELLS_PER_ROW, DAYS_PER_WEEK};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub label: String,
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct CellView {
    pub index: usize,
    pub status: CellStatus,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct RowView {
    pub prefix: String,
    pub weeks: Vec<Vec<CellView>>,
    pub ticks: usize,
    pub crosses: usize,
    pub mood: Mood,
    pub emoji: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BlockView {
    pub label: String,
    pub badge: Option<String>,
    pub theme: Theme,
    pub rows: Vec<RowView>,
}

impl BlockView {
    pub fn build(spec: &BlockSpec, block: &Block) -> Self {
        let rows = block
            .row_summaries()
            .into_iter()
            .map(|summary| {
                let start = summary.row * CELLS_PER_ROW;
                let weeks: Vec<Vec<CellView>> = block
                    .row(summary.row)
                    .chunks(DAYS_PER_WEEK)
                    .enumerate()
                    .map(|(week, days)| {
                        days.iter()
                            .enumerate()
                            .map(|(day, status)| {
                                let index = start + week * DAYS_PER_WEEK + day;
                                CellView {
                                    index,
                                    status: *status,
                                    title: CellPosition::of(index).title(),
                                }
                            })
                            .collect()
                    })
                    .collect();
                RowView {
                    prefix: spec.prefix(summary.row).to_string(),
                    weeks,
                    ticks: summary.ticks,
                    crosses: summary.crosses,
                    mood: summary.mood,
                    emoji: summary.mood.emoji(),
                }
            })
            .collect();

        Self {
            label: spec.label.clone(),
            badge: spec.badge.clone(),
            theme: spec.theme,
            rows,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrackerView {
    pub title: String,
    pub subtitle: String,
    pub user_id: Option<UserId>,
    pub persisting: bool,
    pub blocks: Vec<BlockView>,
}

impl TrackerView {
    pub fn build(
        layout: &TrackerLayout,
        user_id: Option<UserId>,
        persisting: bool,
        blocks: &[Block],
    ) -> Self {
        let blocks = layout
            .blocks
            .iter()
            .filter_map(|spec| {
                blocks
                    .iter()
                    .find(|block| block.label() == spec.label)
                    .map(|block| BlockView::build(spec, block))
            })
            .collect();

        Self {
            title: layout.title.clone(),
            subtitle: layout.subtitle.clone(),
            user_id,
            persisting,
            blocks,
        }
    }
}

/// Web app manifest so browsers offer "Add to Home Screen".
#[derive(Debug, Serialize)]
pub struct Manifest {
    pub name: String,
    pub short_name: String,
    pub start_url: &'static str,
    pub display: &'static str,
    pub background_color: &'static str,
    pub theme_color: &'static str,
}

impl Manifest {
    pub fn for_layout(layout: &TrackerLayout) -> Self {
        let theme_color = layout
            .blocks
            .first()
            .map(|block| block.theme.style().heading)
            .unwrap_or("#1f2937");
        Self {
            name: layout.title.clone(),
            short_name: "Tracker".to_string(),
            start_url: "/",
            display: "standalone",
            background_color: "#f9fafb",
            theme_color,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MoodView {
    pub mood: Mood,
    pub emoji: &'static str,
    pub caption: &'static str,
}

pub fn mood_key() -> Vec<MoodView> {
    Mood::LEGEND
        .iter()
        .map(|mood| MoodView {
            mood: *mood,
            emoji: mood.emoji(),
            caption: mood.caption(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_view_groups_cells_by_week() {
        let layout = TrackerLayout::default();
        let spec = &layout.blocks[1];
        let block = Block::blank(&spec.label, spec.rows).toggled(30);
        let view = BlockView::build(spec, &block);

        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[1].prefix, "Y");
        assert_eq!(view.rows[1].weeks.len(), 4);
        assert!(view.rows[1].weeks.iter().all(|week| week.len() == 7));

        let cell = &view.rows[1].weeks[0][2];
        assert_eq!(cell.index, 30);
        assert_eq!(cell.status, CellStatus::Tick);
        assert_eq!(cell.title, "Week 5, Day 3");
        assert_eq!(view.rows[1].ticks, 1);
        assert_eq!(view.rows[1].emoji, "☺️");
        assert_eq!(view.rows[0].mood, Mood::Neutral);
    }

    #[test]
    fn tracker_view_follows_layout_order() {
        let layout = TrackerLayout::default();
        let blocks: Vec<Block> = layout
            .blocks
            .iter()
            .rev()
            .map(|spec| Block::blank(&spec.label, spec.rows))
            .collect();
        let view = TrackerView::build(&layout, None, false, &blocks);
        let labels: Vec<_> = view.blocks.iter().map(|b| b.label.as_str()).collect();
        let expected: Vec<_> = layout.blocks.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, expected);
    }

    #[test]
    fn manifest_uses_layout_title_and_first_theme() {
        let layout = TrackerLayout::default();
        let manifest = Manifest::for_layout(&layout);
        assert_eq!(manifest.name, layout.title);
        assert_eq!(manifest.start_url, "/");
        assert_eq!(manifest.display, "standalone");
        assert_eq!(manifest.theme_color, Theme::Orange.style().heading);

        let bare = TrackerLayout {
            blocks: Vec::new(),
            ..TrackerLayout::default()
        };
        assert_eq!(Manifest::for_layout(&bare).theme_color, "#1f2937");
    }

    #[test]
    fn mood_key_lists_every_mood_once() {
        let key = mood_key();
        assert_eq!(key.len(), 9);
        assert_eq!(key[0].emoji, "🙂");
        assert_eq!(key[8].mood, Mood::Overwhelmed);
    }
}
