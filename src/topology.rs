use std::collections::HashMap;

use thiserror::Error;

/// A MIDI note number addressing one pad.
pub type Note = u8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("pad topology has no pads")]
    Empty,
    #[error("zone {0:?} has no pads")]
    EmptyZone(String),
    #[error("pad {note} is assigned to both zone {first:?} and zone {second:?}")]
    Overlap {
        note: Note,
        first: String,
        second: String,
    },
    #[error("pad {0} appears more than once in the pad ordering")]
    DuplicateInOrder(Note),
    #[error("pad {0} is not assigned to any zone")]
    Unassigned(Note),
    #[error("pad {0} belongs to a zone but is missing from the pad ordering")]
    MissingFromOrder(Note),
    #[error("row {row} references unknown pad {note}")]
    UnknownRowPad { row: usize, note: Note },
    #[error("value {0} is outside the 7-bit MIDI range")]
    OutOfRange(u8),
}

/// A named group of pads sharing one color.
#[derive(Debug, Clone)]
pub struct Zone {
    pub name: String,
    pub color: u8,
    pub pads: Vec<Note>,
}

/// The validated, immutable pad layout.
///
/// Pads are addressed by their index in the pad ordering; everything that
/// walks the grid walks it in this order.
#[derive(Debug, Clone)]
pub struct PadTopology {
    notes: Vec<Note>,
    colors: Vec<u8>,
    zones: Vec<Zone>,
    rows: Vec<Vec<usize>>,
}

impl PadTopology {
    /// Builds a topology from zones, an optional explicit ordering and
    /// optional physical rows. Without an ordering the zones are
    /// concatenated in the order given.
    pub fn new(
        zones: Vec<Zone>,
        order: Option<Vec<Note>>,
        rows: Option<Vec<Vec<Note>>>,
    ) -> Result<Self, TopologyError> {
        let mut owner: HashMap<Note, usize> = HashMap::new();

        for (zone_idx, zone) in zones.iter().enumerate() {
            if zone.pads.is_empty() {
                return Err(TopologyError::EmptyZone(zone.name.clone()));
            }
            check_midi(zone.color)?;

            for &note in &zone.pads {
                check_midi(note)?;
                if let Some(prev) = owner.insert(note, zone_idx) {
                    return Err(TopologyError::Overlap {
                        note,
                        first: zones[prev].name.clone(),
                        second: zone.name.clone(),
                    });
                }
            }
        }

        let notes = match order {
            Some(order) => order,
            None => zones.iter().flat_map(|z| z.pads.iter().copied()).collect(),
        };

        if notes.is_empty() {
            return Err(TopologyError::Empty);
        }

        let mut index_of: HashMap<Note, usize> = HashMap::with_capacity(notes.len());
        let mut zone_of = Vec::with_capacity(notes.len());

        for (idx, &note) in notes.iter().enumerate() {
            if index_of.insert(note, idx).is_some() {
                return Err(TopologyError::DuplicateInOrder(note));
            }
            match owner.get(&note) {
                Some(&zone) => zone_of.push(zone),
                None => return Err(TopologyError::Unassigned(note)),
            }
        }

        if let Some(&missing) = owner.keys().find(|note| !index_of.contains_key(note)) {
            return Err(TopologyError::MissingFromOrder(missing));
        }

        let mut pad_rows = Vec::new();
        for (row, row_notes) in rows.unwrap_or_default().iter().enumerate() {
            let pads = row_notes
                .iter()
                .map(|&note| {
                    index_of
                        .get(&note)
                        .copied()
                        .ok_or(TopologyError::UnknownRowPad { row, note })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if !pads.is_empty() {
                pad_rows.push(pads);
            }
        }
        if pad_rows.is_empty() {
            pad_rows.push((0..notes.len()).collect());
        }

        let colors = zone_of.iter().map(|&z| zones[z].color).collect();

        Ok(Self {
            notes,
            colors,
            zones,
            rows: pad_rows,
        })
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, pad: usize) -> Note {
        self.notes[pad]
    }

    /// Color of the zone owning `pad`, resolved at construction.
    pub fn color(&self, pad: usize) -> u8 {
        self.colors[pad]
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Physical rows as lists of pad indices. Never empty.
    pub fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }
}

fn check_midi(value: u8) -> Result<(), TopologyError> {
    if value > 127 {
        Err(TopologyError::OutOfRange(value))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn zone(name: &str, color: u8, pads: &[Note]) -> Zone {
        Zone {
            name: name.into(),
            color,
            pads: pads.to_vec(),
        }
    }

    #[test]
    fn concatenates_zones_without_ordering() {
        let t = PadTopology::new(
            vec![zone("a", 10, &[36, 40]), zone("b", 20, &[37, 41])],
            None,
            None,
        )
        .unwrap();

        assert_eq!(t.notes(), &[36, 40, 37, 41]);
        assert_eq!(t.color(1), 10);
        assert_eq!(t.color(2), 20);
        assert_eq!(t.color(3), 20);
        assert_eq!(t.rows(), &[vec![0, 1, 2, 3]]);
    }

    #[test]
    fn explicit_ordering_keeps_zone_colors() {
        let t = PadTopology::new(
            vec![zone("a", 10, &[36, 40]), zone("b", 20, &[37, 41])],
            Some(vec![36, 37, 40, 41]),
            Some(vec![vec![40, 41], vec![36, 37]]),
        )
        .unwrap();

        let colors: Vec<_> = (0..t.len()).map(|p| t.color(p)).collect();
        assert_eq!(colors, vec![10, 20, 10, 20]);
        assert_eq!(t.rows(), &[vec![2, 3], vec![0, 1]]);
    }

    #[test]
    fn rejects_broken_partitions() {
        assert_eq!(
            PadTopology::new(vec![], None, None).unwrap_err(),
            TopologyError::Empty
        );

        assert!(matches!(
            PadTopology::new(
                vec![zone("a", 1, &[36, 37]), zone("b", 2, &[37])],
                None,
                None
            ),
            Err(TopologyError::Overlap { note: 37, .. })
        ));

        assert_eq!(
            PadTopology::new(vec![zone("a", 1, &[36])], Some(vec![36, 37]), None).unwrap_err(),
            TopologyError::Unassigned(37)
        );

        assert_eq!(
            PadTopology::new(vec![zone("a", 1, &[36, 37])], Some(vec![36]), None).unwrap_err(),
            TopologyError::MissingFromOrder(37)
        );

        assert_eq!(
            PadTopology::new(vec![zone("a", 1, &[36])], None, Some(vec![vec![99]])).unwrap_err(),
            TopologyError::UnknownRowPad { row: 0, note: 99 }
        );

        assert_eq!(
            PadTopology::new(vec![zone("a", 1, &[])], None, None).unwrap_err(),
            TopologyError::EmptyZone("a".into())
        );

        assert_eq!(
            PadTopology::new(vec![zone("a", 200, &[36])], None, None).unwrap_err(),
            TopologyError::OutOfRange(200)
        );
    }
}
