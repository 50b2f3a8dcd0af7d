use crate::engine::error::EngineError;
use crate::model::{Day, Section};

/// Every schedule block occupies a fixed 90-minute slot.
pub const BLOCK_MINUTES: u32 = 90;

/// Occupied slot in minutes since midnight, half-open on [start, end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub day: Day,
    pub start: u32,
    pub end: u32,
}

/// Parse "HH:MM" to minutes since midnight.
pub fn minutes_of(hhmm: &str) -> Option<u32> {
    let (h, m) = hhmm.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

pub fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Expand a section to its occupied intervals. Explicit schedule blocks
/// win; rows without blocks fall back to the legacy days x [start, end]
/// range, one interval per listed day. Unparseable times contribute
/// nothing.
pub fn occupancy(section: &Section) -> Vec<Occupancy> {
    if !section.schedule_blocks.is_empty() {
        return section
            .schedule_blocks
            .iter()
            .filter_map(|b| {
                let start = minutes_of(&b.start_time)?;
                Some(Occupancy {
                    day: b.day,
                    start,
                    end: start + BLOCK_MINUTES,
                })
            })
            .collect();
    }

    let (Some(start_raw), Some(end_raw)) = (&section.start_time, &section.end_time) else {
        return Vec::new();
    };
    let (Some(start), Some(end)) = (minutes_of(start_raw), minutes_of(end_raw)) else {
        return Vec::new();
    };
    if end <= start {
        return Vec::new();
    }
    section
        .days
        .iter()
        .map(|&day| Occupancy { day, start, end })
        .collect()
}

/// Half-open overlap; touching endpoints do not conflict.
pub fn overlaps(a: &Occupancy, b: &Occupancy) -> bool {
    a.day == b.day && a.start < b.end && a.end > b.start
}

/// Check a candidate section against the others, in input order, and
/// return the first conflict found. `exclude` lists section ids the caller
/// knows are changing together with the candidate (the section being
/// edited, or the partner of a two-section swap).
///
/// Date windows are deliberately not consulted: two sections in disjoint
/// terms that share a weekly slot still conflict. Known limitation,
/// preserved as-is.
pub fn validate(
    candidate: &Section,
    others: &[Section],
    exclude: &[String],
) -> Result<(), EngineError> {
    let candidate_slots = occupancy(candidate);
    if candidate_slots.is_empty() {
        return Ok(());
    }

    for other in others {
        if other.id == candidate.id || exclude.iter().any(|id| *id == other.id) {
            continue;
        }
        for slot in occupancy(other) {
            if candidate_slots.iter().any(|c| overlaps(c, &slot)) {
                return Err(EngineError::ScheduleConflict {
                    section_name: other.name.clone(),
                    day: slot.day,
                    start: format_minutes(slot.start),
                    end: format_minutes(slot.end),
                });
            }
        }
    }
    Ok(())
}
