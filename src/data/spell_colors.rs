//! Spell-circle shading for the active effects panel.
//!
//! Each known effect name maps to its spell circle, and each circle
//! has a background shade so the panel groups visually by source.

fn spell_circle(name: &str) -> Option<u32> {
    let circle = match name {
        "Spirit Warding I" | "Spirit Barrier" | "Spirit Defense" | "Disease Resistance"
        | "Poison Resistance" | "Spirit Warding II" | "Water Walking" | "Fasthr's Reward"
        | "Lesser Shroud" => 100,
        "Spirit Shield" | "Purify Air" | "Bravery" | "Heroism" | "Manna" | "Spirit Servant"
        | "Spell Shield" | "Untrammel" => 200,
        "Prayer of Protection" | "Benediction" | "Warding Sphere" | "Prayer" | "Soul Ward"
        | "Ethereal Censer" => 300,
        "Elemental Defense I" | "Elemental Defense II" | "Elemental Defense III"
        | "Elemental Targeting" | "Elemental Barrier" | "Lock Pick Enhancement"
        | "Disarm Enhancement" | "Presence" => 400,
        "Thurfel's Ward" | "Strength" | "Elemental Deflection" | "Elemental Bias"
        | "Elemental Focus" | "Haste" | "Mage Armor - Fire" | "Mage Armor - Water"
        | "Mage Armor - Air" | "Mage Armor - Earth" | "Mage Armor - Lightning" | "Celerity"
        | "Temporal Reversion" | "Rapid Fire" | "Mana Leech" => 500,
        "Natural Colors" | "Resist Elements" | "Nature's Bounty" | "Phoen's Strength"
        | "Self Control" | "Sneaking" | "Mobility" | "Nature's Touch" | "Wall of Thorns"
        | "Camouflage" => 600,
        "Cloak of Shadows" | "Pestilence" => 700,
        "Prismatic Guard" | "Mass Blur" | "Melgorehn's Aura" | "Tremors" | "Wizard's Shield" => {
            900
        }
        "Song of Luck" | "Fortitude Song" | "Kai's Triumph Song" | "Song of Valor"
        | "Sonic Shield Song" | "Sonic Weapon Song" | "Sonic Armor" | "Song of Mirrors" => 1000,
        "Empathic Focus" | "Strength Of Will" | "Troll's Blood" | "Intensity" => 1100,
        "Foresight" | "Mindward" | "Mind over Body" | "Premonition" | "Blink" => 1200,
        "Mantle of Faith" | "Arm of the Arkati" | "Zealot" => 1600,
        "Focused" => 1700,
        "Armor Support" | "Armored Fluidity" | "Stance of the Mongoose" => 9500,
        "Next Bounty" => 9725,
        "Symbol of Protection" | "Symbol of Courage" | "Symbol of Supremacy" => 9800,
        "Sign of Staunching" | "Sign of Warding" | "Sign of Striking" | "Sign of Defending"
        | "Sign of Smiting" | "Sign of Deflection" | "Sign of Swords" | "Sign of Shields"
        | "Sign of Dissipation" | "Sigil of Defense" | "Sigil of Offense"
        | "Sigil of Concentration" | "Sigil of Major Bane" => 9900,
        _ => return None,
    };
    Some(circle)
}

fn circle_color(circle: u32) -> Option<&'static str> {
    let color = match circle {
        100 => "600000",  // Minor Spirit
        200 => "2b0000",  // Major Spirit
        300 => "f5533d",  // Cleric
        400 => "3455db",  // Minor Elemental
        500 => "0f4880",  // Major Elemental
        600 => "002a15",  // Ranger
        700 => "58007e",  // Sorcerer
        900 => "3e92cf",  // Wizard
        1000 => "108ebc", // Bard
        1100 => "932906", // Empath
        1200 => "975e31", // Minor Mental
        1600 => "716891", // Paladin
        1700 => "d08216",
        9500 => "4b6a88", // Armor
        9725 => "093145",
        9800 => "6d8891", // Voln
        9900 => "6d8891", // CoL
        _ => return None,
    };
    Some(color)
}

/// Background shade for an effect name, if its spell circle is known.
pub fn spell_shade(name: &str) -> Option<&'static str> {
    spell_circle(name).and_then(circle_color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_spells_shade_by_circle() {
        assert_eq!(spell_shade("Haste"), Some("0f4880"));
        assert_eq!(spell_shade("Sign of Swords"), Some("6d8891"));
    }

    #[test]
    fn unknown_effects_have_no_shade() {
        assert_eq!(spell_shade("Mystery Sauce"), None);
    }
}
