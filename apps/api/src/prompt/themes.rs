use serde::Serialize;

/// Visual theme the report uses for one candidate. Assigned by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Blue,
    Green,
    Purple,
    Amber,
    Teal,
    Rose,
}

/// Fixed assignment order. Candidate N gets `PALETTE[(N - 1) % PALETTE.len()]`.
pub const PALETTE: [Theme; 6] = [
    Theme::Blue,
    Theme::Green,
    Theme::Purple,
    Theme::Amber,
    Theme::Teal,
    Theme::Rose,
];

impl Theme {
    pub fn for_position(index: usize) -> Theme {
        PALETTE[index % PALETTE.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            Theme::Blue => "Blue",
            Theme::Green => "Green",
            Theme::Purple => "Purple",
            Theme::Amber => "Amber",
            Theme::Teal => "Teal",
            Theme::Rose => "Rose",
        }
    }

    /// Tailwind colour family, e.g. `blue` for `blue-800` / `blue-500`.
    pub fn tailwind(self) -> &'static str {
        match self {
            Theme::Blue => "blue",
            Theme::Green => "green",
            Theme::Purple => "purple",
            Theme::Amber => "amber",
            Theme::Teal => "teal",
            Theme::Rose => "rose",
        }
    }
}
