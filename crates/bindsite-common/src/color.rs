//! Confidence colouring for structure viewers.
//!
//! Processed structures carry a binding probability in `[0, 100]` in the
//! B-factor column. Viewers colour each atom on a white → blue ramp.

pub const GRADIENT_MIN: f64 = 0.0;
pub const GRADIENT_MAX: f64 = 100.0;

const LOW: (u8, u8, u8) = (0xff, 0xff, 0xff);
const HIGH: (u8, u8, u8) = (0x00, 0x00, 0xff);

/// `#rrggbb` for a confidence value; out-of-range values are clamped.
pub fn confidence_color(value: f64) -> String {
    let t = if value.is_nan() {
        0.0
    } else {
        ((value - GRADIENT_MIN) / (GRADIENT_MAX - GRADIENT_MIN)).clamp(0.0, 1.0)
    };
    let lerp = |a: u8, b: u8| -> u8 { (a as f64 + (b as f64 - a as f64) * t).round() as u8 };
    format!(
        "#{:02x}{:02x}{:02x}",
        lerp(LOW.0, HIGH.0),
        lerp(LOW.1, HIGH.1),
        lerp(LOW.2, HIGH.2)
    )
}

/// A coordinate record's identity plus its B-factor value.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomConfidence {
    pub serial: String,
    pub name: String,
    pub res_name: String,
    pub chain: String,
    pub res_seq: String,
    pub value: f64,
}

/// Per-atom confidence values from the `ATOM`/`HETATM` records of a PDB text.
///
/// The B-factor lives in columns 61–66. Atoms whose value is missing or
/// unparsable take the lowest value seen, so they render at the cool end.
pub fn atom_confidences(pdb: &str) -> Vec<AtomConfidence> {
    let mut atoms = Vec::new();
    let mut missing = Vec::new();

    for line in pdb.lines() {
        if !(line.starts_with("ATOM") || line.starts_with("HETATM")) {
            continue;
        }
        let value = column(line, 60, 66).parse::<f64>().ok();
        if value.is_none() {
            missing.push(atoms.len());
        }
        atoms.push(AtomConfidence {
            serial: column(line, 6, 11).to_string(),
            name: column(line, 12, 16).to_string(),
            res_name: column(line, 17, 20).to_string(),
            chain: column(line, 21, 22).to_string(),
            res_seq: column(line, 22, 26).to_string(),
            value: value.unwrap_or(f64::NAN),
        });
    }

    if !missing.is_empty() {
        let floor = atoms
            .iter()
            .map(|a| a.value)
            .filter(|v| !v.is_nan())
            .fold(f64::INFINITY, f64::min);
        let floor = if floor.is_finite() { floor } else { GRADIENT_MIN };
        for i in missing {
            atoms[i].value = floor;
        }
    }
    atoms
}

fn column(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len()))
        .unwrap_or("")
        .trim()
}
