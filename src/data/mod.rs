//! Static game data tables.

mod spell_colors;

pub use spell_colors::spell_shade;
