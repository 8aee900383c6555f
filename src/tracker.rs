use crate::store::Document;
use serde::{Deserialize, Serialize};

pub const DAYS_PER_WEEK: usize = 7;
pub const WEEKS_PER_ROW: usize = 4;
pub const CELLS_PER_ROW: usize = WEEKS_PER_ROW * DAYS_PER_WEEK;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    #[default]
    Blank,
    Tick,
    Cross,
}

impl CellStatus {
    pub const ALL: [CellStatus; 3] = [CellStatus::Blank, CellStatus::Tick, CellStatus::Cross];

    /// Next status in the cycle blank -> tick -> cross -> blank.
    pub fn toggle(self) -> Self {
        match self {
            CellStatus::Blank => CellStatus::Tick,
            CellStatus::Tick => CellStatus::Cross,
            CellStatus::Cross => CellStatus::Blank,
        }
    }
}

pub fn toggle(status: CellStatus) -> CellStatus {
    status.toggle()
}

/// Returns a copy of `cells` with `index` advanced one step.
///
/// Panics when `index` is out of range.
pub fn apply_toggle(cells: &[CellStatus], index: usize) -> Vec<CellStatus> {
    assert!(
        index < cells.len(),
        "cell index {index} out of range for block of {} cells",
        cells.len()
    );
    let mut next = cells.to_vec();
    next[index] = next[index].toggle();
    next
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowCounts {
    pub ticks: usize,
    pub crosses: usize,
}

/// Counts ticks and crosses over exactly one row.
pub fn aggregate_row(cells: &[CellStatus]) -> RowCounts {
    assert_eq!(
        cells.len(),
        CELLS_PER_ROW,
        "a row holds exactly {CELLS_PER_ROW} cells"
    );
    RowCounts {
        ticks: cells.iter().filter(|s| **s == CellStatus::Tick).count(),
        crosses: cells.iter().filter(|s| **s == CellStatus::Cross).count(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mood {
    #[serde(rename = "overwhelmed-worst")]
    Overwhelmed,
    Discouraged,
    Concerned,
    Elated,
    Celebratory,
    Amused,
    Happy,
    Pleased,
    Neutral,
}

impl Mood {
    /// Legend order, calmest first.
    pub const LEGEND: [Mood; 9] = [
        Mood::Neutral,
        Mood::Pleased,
        Mood::Happy,
        Mood::Amused,
        Mood::Celebratory,
        Mood::Elated,
        Mood::Concerned,
        Mood::Discouraged,
        Mood::Overwhelmed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Overwhelmed => "overwhelmed-worst",
            Mood::Discouraged => "discouraged",
            Mood::Concerned => "concerned",
            Mood::Elated => "elated",
            Mood::Celebratory => "celebratory",
            Mood::Amused => "amused",
            Mood::Happy => "happy",
            Mood::Pleased => "pleased",
            Mood::Neutral => "neutral",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Mood::Overwhelmed => "🤯",
            Mood::Discouraged => "😔",
            Mood::Concerned => "😳",
            Mood::Elated => "🤩",
            Mood::Celebratory => "🥳",
            Mood::Amused => "😆",
            Mood::Happy => "😁",
            Mood::Pleased => "☺️",
            Mood::Neutral => "🙂",
        }
    }

    pub fn caption(self) -> &'static str {
        match self {
            Mood::Overwhelmed => "Ouch, let's try again.",
            Mood::Discouraged => "You're going the wrong way.",
            Mood::Concerned => "Oops, a few misses.",
            Mood::Elated => "Absolutely crushed it!",
            Mood::Celebratory => "Congratulations!! You did it!",
            Mood::Amused => "Keep going, you've got this!",
            Mood::Happy => "You're doing great!",
            Mood::Pleased => "Great start",
            Mood::Neutral => "Neutral",
        }
    }
}

/// Maps a row's counts to a mood. Cross thresholds are checked first and win
/// over any qualifying tick count.
pub fn mood_for(ticks: usize, crosses: usize) -> Mood {
    if crosses >= 28 {
        Mood::Overwhelmed
    } else if crosses >= 14 {
        Mood::Discouraged
    } else if crosses >= 9 {
        Mood::Concerned
    } else if ticks >= 28 {
        Mood::Elated
    } else if ticks >= 20 {
        Mood::Celebratory
    } else if ticks >= 14 {
        Mood::Amused
    } else if ticks >= 7 {
        Mood::Happy
    } else if ticks >= 1 {
        Mood::Pleased
    } else {
        Mood::Neutral
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPosition {
    pub row: usize,
    pub week: usize,
    pub day: usize,
}

impl CellPosition {
    pub fn of(index: usize) -> Self {
        Self {
            row: index / CELLS_PER_ROW,
            week: (index % CELLS_PER_ROW) / DAYS_PER_WEEK,
            day: index % DAYS_PER_WEEK,
        }
    }

    /// 1-based week number across the whole block.
    pub fn week_number(&self) -> usize {
        self.row * WEEKS_PER_ROW + self.week + 1
    }

    pub fn title(&self) -> String {
        format!("Week {}, Day {}", self.week_number(), self.day + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowSummary {
    pub row: usize,
    pub ticks: usize,
    pub crosses: usize,
    pub mood: Mood,
}

/// One labeled grid. The cell count is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    label: String,
    cells: Vec<CellStatus>,
}

impl Block {
    pub fn expected_len(rows: usize) -> usize {
        rows * CELLS_PER_ROW
    }

    pub fn blank(label: impl Into<String>, rows: usize) -> Self {
        Self {
            label: label.into(),
            cells: vec![CellStatus::Blank; Self::expected_len(rows)],
        }
    }

    /// Builds the block for `label` from a remote document.
    ///
    /// A missing document, a missing entry, an entry that does not decode, or
    /// an entry of the wrong length all yield an all-blank block.
    pub fn materialize(label: &str, rows: usize, document: Option<&Document>) -> Self {
        let expected = Self::expected_len(rows);
        let remote = document
            .and_then(|doc| doc.get(label))
            .and_then(|value| serde_json::from_value::<Vec<CellStatus>>(value.clone()).ok())
            .filter(|cells| cells.len() == expected);

        match remote {
            Some(cells) => Self {
                label: label.to_string(),
                cells,
            },
            None => Self::blank(label, rows),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn cells(&self) -> &[CellStatus] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// New block with the cell at `index` toggled. `self` is left untouched.
    pub fn toggled(&self, index: usize) -> Self {
        Self {
            label: self.label.clone(),
            cells: apply_toggle(&self.cells, index),
        }
    }

    pub fn row(&self, row: usize) -> &[CellStatus] {
        let start = row * CELLS_PER_ROW;
        &self.cells[start..start + CELLS_PER_ROW]
    }

    pub fn row_summaries(&self) -> Vec<RowSummary> {
        self.cells
            .chunks_exact(CELLS_PER_ROW)
            .enumerate()
            .map(|(row, cells)| {
                let RowCounts { ticks, crosses } = aggregate_row(cells);
                RowSummary {
                    row,
                    ticks,
                    crosses,
                    mood: mood_for(ticks, crosses),
                }
            })
            .collect()
    }

    /// The document field this block persists as.
    pub fn to_field(&self) -> (String, serde_json::Value) {
        (self.label.clone(), serde_json::json!(self.cells))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row_of(status: CellStatus) -> Vec<CellStatus> {
        vec![status; CELLS_PER_ROW]
    }

    #[test]
    fn toggle_cycles_through_three_states() {
        assert_eq!(toggle(CellStatus::Blank), CellStatus::Tick);
        assert_eq!(toggle(CellStatus::Tick), CellStatus::Cross);
        assert_eq!(toggle(CellStatus::Cross), CellStatus::Blank);
        for status in CellStatus::ALL {
            assert_eq!(toggle(toggle(toggle(status))), status);
        }
    }

    #[test]
    fn apply_toggle_changes_only_the_target_cell() {
        let mut cells = vec![CellStatus::Blank; 56];
        cells[3] = CellStatus::Tick;
        cells[40] = CellStatus::Cross;

        for index in [0, 3, 40, 55] {
            let next = apply_toggle(&cells, index);
            assert_eq!(next.len(), cells.len());
            assert_eq!(next[index], toggle(cells[index]));
            for (i, (before, after)) in cells.iter().zip(&next).enumerate() {
                if i != index {
                    assert_eq!(before, after, "cell {i} changed");
                }
            }
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn apply_toggle_rejects_out_of_range_index() {
        let cells = vec![CellStatus::Blank; CELLS_PER_ROW];
        apply_toggle(&cells, CELLS_PER_ROW);
    }

    #[test]
    fn aggregate_row_counts_uniform_rows() {
        assert_eq!(
            aggregate_row(&row_of(CellStatus::Tick)),
            RowCounts { ticks: 28, crosses: 0 }
        );
        assert_eq!(
            aggregate_row(&row_of(CellStatus::Cross)),
            RowCounts { ticks: 0, crosses: 28 }
        );
        assert_eq!(
            aggregate_row(&row_of(CellStatus::Blank)),
            RowCounts { ticks: 0, crosses: 0 }
        );
    }

    #[test]
    #[should_panic(expected = "exactly 28")]
    fn aggregate_row_asserts_length() {
        aggregate_row(&[CellStatus::Tick; 27]);
    }

    #[test]
    fn mood_thresholds() {
        assert_eq!(mood_for(0, 0), Mood::Neutral);
        assert_eq!(mood_for(1, 0), Mood::Pleased);
        assert_eq!(mood_for(6, 0), Mood::Pleased);
        assert_eq!(mood_for(7, 0), Mood::Happy);
        assert_eq!(mood_for(14, 0), Mood::Amused);
        assert_eq!(mood_for(20, 0), Mood::Celebratory);
        assert_eq!(mood_for(28, 0), Mood::Elated);
        assert_eq!(mood_for(0, 8), Mood::Neutral);
        assert_eq!(mood_for(0, 9), Mood::Concerned);
        assert_eq!(mood_for(0, 14), Mood::Discouraged);
        assert_eq!(mood_for(0, 28), Mood::Overwhelmed);
    }

    #[test]
    fn crosses_win_over_ticks() {
        assert_eq!(mood_for(20, 14), Mood::Discouraged);
        assert_eq!(mood_for(19, 9), Mood::Concerned);
        assert_eq!(mood_for(5, 8), Mood::Pleased);
    }

    #[test]
    fn mood_serializes_to_symbol_names() {
        for mood in Mood::LEGEND {
            assert_eq!(serde_json::to_value(mood).unwrap(), json!(mood.as_str()));
        }
    }

    #[test]
    fn cell_position_layout() {
        let pos = CellPosition::of(0);
        assert_eq!((pos.row, pos.week, pos.day), (0, 0, 0));
        let pos = CellPosition::of(37);
        assert_eq!((pos.row, pos.week, pos.day), (1, 1, 2));
        assert_eq!(pos.title(), "Week 6, Day 3");
    }

    #[test]
    fn materialize_uses_matching_remote_entry() {
        let mut cells = vec!["blank"; 28];
        cells[2] = "tick";
        let doc = json!({ "Saving": cells, "Other": ["tick"] });
        let block = Block::materialize("Saving", 1, doc.as_object());
        assert_eq!(block.len(), 28);
        assert_eq!(block.cells()[2], CellStatus::Tick);
    }

    #[test]
    fn materialize_discards_wrong_length_entry() {
        let doc = json!({ "Saving": vec!["tick"; 28] });
        let block = Block::materialize("Saving", 2, doc.as_object());
        assert_eq!(block.len(), 56);
        assert!(block.cells().iter().all(|s| *s == CellStatus::Blank));
    }

    #[test]
    fn materialize_discards_undecodable_entry() {
        let mut cells = vec![json!("tick"); 28];
        cells[5] = json!("maybe");
        let doc = json!({ "Saving": cells });
        let block = Block::materialize("Saving", 1, doc.as_object());
        assert_eq!(block, Block::blank("Saving", 1));
    }

    #[test]
    fn materialize_without_document_or_label_is_blank() {
        assert_eq!(Block::materialize("Saving", 3, None), Block::blank("Saving", 3));
        let doc = json!({ "Budget": vec!["tick"; 28] });
        assert_eq!(
            Block::materialize("Saving", 1, doc.as_object()),
            Block::blank("Saving", 1)
        );
    }

    #[test]
    fn toggled_leaves_original_intact() {
        let block = Block::blank("Saving", 1);
        let next = block.toggled(4);
        assert_eq!(block.cells()[4], CellStatus::Blank);
        assert_eq!(next.cells()[4], CellStatus::Tick);
        assert_eq!(next.label(), "Saving");
    }

    #[test]
    fn single_row_walkthrough() {
        let mut block = Block::blank("Spending", 1);
        for _ in 0..3 {
            block = block.toggled(0);
        }
        assert_eq!(block, Block::blank("Spending", 1));

        block = block.toggled(0);
        let summary = &block.row_summaries()[0];
        assert_eq!((summary.ticks, summary.crosses), (1, 0));
        assert_eq!(summary.mood, Mood::Pleased);

        let mut block = Block::blank("Spending", 1);
        for index in 0..7 {
            block = block.toggled(index);
        }
        let summary = &block.row_summaries()[0];
        assert_eq!((summary.ticks, summary.crosses), (7, 0));
        assert_eq!(summary.mood, Mood::Happy);
    }

    #[test]
    fn row_summaries_cover_each_row() {
        let mut block = Block::blank("Three", 3);
        for index in 56..84 {
            block = block.toggled(index).toggled(index);
        }
        let summaries = block.row_summaries();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].mood, Mood::Neutral);
        assert_eq!(summaries[2].crosses, 28);
        assert_eq!(summaries[2].mood, Mood::Overwhelmed);
        assert_eq!(block.row(2).len(), CELLS_PER_ROW);
    }

    #[test]
    fn field_round_trips_through_materialize() {
        let block = Block::blank("Budget", 1).toggled(0).toggled(1).toggled(1);
        let (label, value) = block.to_field();
        let mut doc = Document::new();
        doc.insert(label, value);
        assert_eq!(Block::materialize("Budget", 1, Some(&doc)), block);
    }
}
