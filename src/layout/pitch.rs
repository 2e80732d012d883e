//! Pitch → staff position arithmetic.

use serde::{Deserialize, Serialize};

use crate::model::{Clef, KeySignature};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accidental {
    Sharp,
    Flat,
    Natural,
}

/// (diatonic step, alteration) per pitch class, spelling black keys as sharps.
const SHARP_SPELLING: [(i32, i32); 12] = [
    (0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (3, 0),
    (3, 1), (4, 0), (4, 1), (5, 0), (5, 1), (6, 0),
];

/// Same, spelling black keys as flats.
const FLAT_SPELLING: [(i32, i32); 12] = [
    (0, 0), (1, -1), (1, 0), (2, -1), (2, 0), (3, 0),
    (4, -1), (4, 0), (5, -1), (5, 0), (6, -1), (6, 0),
];

/// Steps altered by a key signature, in the order accidentals are added.
const SHARP_ORDER: [i32; 7] = [3, 0, 4, 1, 5, 2, 6]; // F C G D A E B
const FLAT_ORDER: [i32; 7] = [6, 2, 5, 1, 4, 0, 3]; // B E A D G C F

/// Reference pitches sitting on the bottom staff line, as diatonic numbers
/// (octave × 7 + step).
const TREBLE_REFERENCE: i32 = 4 * 7 + 2; // E4
const BASS_REFERENCE: i32 = 2 * 7 + 4; // G2

/// Staff position of the middle line; stems flip here.
pub(crate) const MIDDLE_LINE: i32 = 4;
/// Staff position of the top line.
pub(crate) const TOP_LINE: i32 = 8;

fn spelling(pitch: u8, key: &KeySignature) -> (i32, i32, i32) {
    let pc = (pitch % 12) as usize;
    let octave = pitch as i32 / 12 - 1;
    let (step, alter) = if key.fifths < 0 { FLAT_SPELLING[pc] } else { SHARP_SPELLING[pc] };
    (octave, step, alter)
}

fn key_alteration(step: i32, key: &KeySignature) -> i32 {
    let count = key.fifths.unsigned_abs().min(7) as usize;
    if key.fifths > 0 && SHARP_ORDER[..count].contains(&step) {
        1
    } else if key.fifths < 0 && FLAT_ORDER[..count].contains(&step) {
        -1
    } else {
        0
    }
}

/// Diatonic offset of `pitch` from the clef's bottom line: 0 is the bottom
/// line, 1 the first space, 8 the top line. Negative and >8 positions need
/// ledger lines.
pub fn staff_position(pitch: u8, clef: Clef, key: &KeySignature) -> i32 {
    let (octave, step, _) = spelling(pitch, key);
    let reference = match clef {
        Clef::Treble => TREBLE_REFERENCE,
        Clef::Bass => BASS_REFERENCE,
    };
    octave * 7 + step - reference
}

/// Accidental to draw in front of `pitch` under `key`, if any.
pub(super) fn accidental(pitch: u8, key: &KeySignature) -> Option<Accidental> {
    let (_, step, alter) = spelling(pitch, key);
    if alter == key_alteration(step, key) {
        return None;
    }
    Some(match alter {
        1 => Accidental::Sharp,
        -1 => Accidental::Flat,
        _ => Accidental::Natural,
    })
}

/// Y of a staff position, given the staff's top line.
pub(super) fn position_to_y(position: i32, staff_top: f64, line_spacing: f64) -> f64 {
    staff_top + (TOP_LINE - position) as f64 * line_spacing / 2.0
}

/// Ledger line ys for a note at `position`.
pub(super) fn ledger_lines(position: i32, staff_top: f64, line_spacing: f64) -> Vec<f64> {
    let mut ys = Vec::new();
    let mut p = -2;
    while p >= position {
        ys.push(position_to_y(p, staff_top, line_spacing));
        p -= 2;
    }
    let mut p = TOP_LINE + 2;
    while p <= position {
        ys.push(position_to_y(p, staff_top, line_spacing));
        p += 2;
    }
    ys
}

#[cfg(test)]
mod tests {
    use super::*;

    const C_MAJOR: KeySignature = KeySignature { fifths: 0 };

    #[test]
    fn reference_pitches_sit_on_the_bottom_line() {
        assert_eq!(staff_position(64, Clef::Treble, &C_MAJOR), 0); // E4
        assert_eq!(staff_position(43, Clef::Bass, &C_MAJOR), 0); // G2
    }

    #[test]
    fn middle_lines() {
        assert_eq!(staff_position(71, Clef::Treble, &C_MAJOR), MIDDLE_LINE); // B4
        assert_eq!(staff_position(50, Clef::Bass, &C_MAJOR), MIDDLE_LINE); // D3
        assert_eq!(staff_position(77, Clef::Treble, &C_MAJOR), TOP_LINE); // F5
    }

    #[test]
    fn middle_c_needs_one_ledger_line_in_treble() {
        let pos = staff_position(60, Clef::Treble, &C_MAJOR);
        assert_eq!(pos, -2);
        assert_eq!(ledger_lines(pos, 0.0, 10.0), vec![50.0]);
        assert_eq!(staff_position(60, Clef::Bass, &C_MAJOR), 10);
    }

    #[test]
    fn extreme_pitches_still_get_positions() {
        let low = staff_position(21, Clef::Treble, &C_MAJOR);
        let high = staff_position(108, Clef::Bass, &C_MAJOR);
        assert!(low < -20);
        assert!(high > 30);
        assert!(ledger_lines(high, 0.0, 10.0).len() > 10);
    }

    #[test]
    fn flat_keys_spell_black_keys_as_flats() {
        let f_major = KeySignature { fifths: -1 };
        // A#4 / Bb4
        assert_eq!(staff_position(70, Clef::Treble, &C_MAJOR), 3);
        assert_eq!(staff_position(70, Clef::Treble, &f_major), 4);
        assert_eq!(accidental(70, &f_major), None);
        assert_eq!(accidental(70, &C_MAJOR), Some(Accidental::Sharp));
        assert_eq!(accidental(71, &f_major), Some(Accidental::Natural));
    }

    #[test]
    fn sharp_keys_absorb_their_sharps() {
        let g_major = KeySignature { fifths: 1 };
        assert_eq!(accidental(66, &g_major), None); // F#4
        assert_eq!(accidental(65, &g_major), Some(Accidental::Natural)); // F4
        assert_eq!(accidental(61, &g_major), Some(Accidental::Sharp)); // C#4
    }
}
