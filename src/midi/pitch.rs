// Pitch names - conversion between scientific pitch notation and MIDI numbers
// "C4" = 60, "A4" = 69, "C-1" = 0, "G9" = 127

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Semitone offset of a natural letter relative to C
fn letter_offset(letter: char) -> Option<i32> {
    match letter.to_ascii_uppercase() {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

/// Convert a pitch name (e.g. "C4", "F#3", "Bb2", "Ebb5", "Fx1") into a MIDI number
///
/// Accepts sharps (`#`, `♯`, `x` = double sharp) and flats (`b`, `♭`) after the letter,
/// followed by a (possibly negative) octave number. Returns None when the name
/// cannot be parsed or falls outside 0-127.
pub fn pitch_name_to_midi(name: &str) -> Option<u8> {
    let name = name.trim();
    let mut chars = name.char_indices();

    let (_, letter) = chars.next()?;
    let mut semitone = letter_offset(letter)?;

    let mut octave_start = name.len();
    for (idx, c) in chars {
        match c {
            '#' | '♯' => semitone = semitone.checked_add(1)?,
            'x' => semitone = semitone.checked_add(2)?,
            'b' | '♭' => semitone = semitone.checked_sub(1)?,
            _ => {
                octave_start = idx;
                break;
            }
        }
    }

    let octave: i32 = name[octave_start..].parse().ok()?;
    let midi = octave
        .checked_add(1)?
        .checked_mul(12)?
        .checked_add(semitone)?;

    u8::try_from(midi).ok().filter(|n| *n <= 127)
}

/// Convert a MIDI number into a pitch name, spelled with sharps (e.g. 61 -> "C#4")
pub fn midi_to_pitch_name(midi: u8) -> String {
    let octave = (midi / 12) as i32 - 1;
    let note_index = (midi % 12) as usize;

    format!("{}{}", NOTE_NAMES[note_index], octave)
}
