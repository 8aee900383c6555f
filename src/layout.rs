use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Orange,
    Purple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemeStyle {
    pub heading: &'static str,
    pub prefix: &'static str,
    pub tick_fill: &'static str,
    pub tick_border: &'static str,
}

impl Theme {
    pub const ALL: [Theme; 2] = [Theme::Orange, Theme::Purple];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Orange => "orange",
            Theme::Purple => "purple",
        }
    }

    pub fn style(self) -> ThemeStyle {
        match self {
            Theme::Orange => ThemeStyle {
                heading: "#c2410c",
                prefix: "#ea580c",
                tick_fill: "#f97316",
                tick_border: "#ea580c",
            },
            Theme::Purple => ThemeStyle {
                heading: "#7e22ce",
                prefix: "#9333ea",
                tick_fill: "#a855f7",
                tick_border: "#9333ea",
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub label: String,
    pub rows: usize,
    pub theme: Theme,
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub badge: Option<String>,
}

impl BlockSpec {
    pub fn prefix(&self, row: usize) -> &str {
        self.prefixes.get(row).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerLayout {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub blocks: Vec<BlockSpec>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout has no blocks")]
    Empty,
    #[error("block label must not be empty")]
    EmptyLabel,
    #[error("block '{0}' must have at least one row")]
    NoRows(String),
    #[error("block label '{0}' is used more than once")]
    DuplicateLabel(String),
}

impl TrackerLayout {
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.blocks.is_empty() {
            return Err(LayoutError::Empty);
        }
        let mut seen = HashSet::new();
        for block in &self.blocks {
            if block.label.trim().is_empty() {
                return Err(LayoutError::EmptyLabel);
            }
            if block.rows == 0 {
                return Err(LayoutError::NoRows(block.label.clone()));
            }
            if !seen.insert(block.label.as_str()) {
                return Err(LayoutError::DuplicateLabel(block.label.clone()));
            }
        }
        Ok(())
    }

    pub fn block(&self, label: &str) -> Option<&BlockSpec> {
        self.blocks.iter().find(|block| block.label == label)
    }
}

impl Default for TrackerLayout {
    fn default() -> Self {
        let prefixes = |items: &[&str]| -> Vec<String> { items.iter().map(|p| p.to_string()).collect() };
        Self {
            title: "Tana's Financial Skills Tracker".to_string(),
            subtitle: "Track your progress each day across the three financial goals!".to_string(),
            blocks: vec![
                BlockSpec {
                    label: "Spending Awareness (X)".to_string(),
                    rows: 1,
                    theme: Theme::Orange,
                    prefixes: prefixes(&["X"]),
                    badge: Some("X: Track Daily Spending".to_string()),
                },
                BlockSpec {
                    label: "Spending + Budgeting (X + Y)".to_string(),
                    rows: 2,
                    theme: Theme::Purple,
                    prefixes: prefixes(&["X", "Y"]),
                    badge: Some("Y: Budget Planning".to_string()),
                },
                BlockSpec {
                    label: "Spending + Budgeting + Saving (X + Y + Z)".to_string(),
                    rows: 3,
                    theme: Theme::Orange,
                    prefixes: prefixes(&["X", "Y", "Z"]),
                    badge: Some("Z: Saving Habit".to_string()),
                },
            ],
        }
    }
}
