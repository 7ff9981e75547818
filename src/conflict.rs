//! Overlap and collision decisions shared by scheduling and seat allocation.
//!
//! Nothing here touches storage: callers load the committed state inside their
//! transaction and ask these functions whether the candidate fits.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::ReservationStatus;

/// The time slot a screening occupies on a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreeningSlot {
    pub id: Uuid,
    pub screen_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One seat held by a reservation on a screening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatClaim {
    pub screening_id: Uuid,
    pub seat_id: Uuid,
    pub status: ReservationStatus,
}

/// End instant of a screening that starts at `start` and runs `duration_minutes`.
pub fn screening_end(start: DateTime<Utc>, duration_minutes: i32) -> DateTime<Utc> {
    start + Duration::minutes(i64::from(duration_minutes))
}

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)` share an instant.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// First existing screening on `screen_id` whose slot overlaps the candidate.
/// Back-to-back slots (`a.end == b.start`) do not conflict.
pub fn schedule_conflict<'a>(
    screen_id: Uuid,
    candidate_start: DateTime<Utc>,
    candidate_end: DateTime<Utc>,
    existing: &'a [ScreeningSlot],
) -> Option<&'a ScreeningSlot> {
    existing.iter().find(|slot| {
        slot.screen_id == screen_id
            && overlaps(candidate_start, candidate_end, slot.start, slot.end)
    })
}

/// Seats in `candidate_seat_ids` already held by a non-cancelled reservation on
/// `screening_id`. An empty set means the candidate can be committed.
pub fn seat_conflict(
    screening_id: Uuid,
    candidate_seat_ids: &[Uuid],
    existing_claims: &[SeatClaim],
) -> BTreeSet<Uuid> {
    let held: HashSet<Uuid> = existing_claims
        .iter()
        .filter(|claim| claim.screening_id == screening_id && claim.status.is_active())
        .map(|claim| claim.seat_id)
        .collect();

    candidate_seat_ids
        .iter()
        .filter(|seat_id| held.contains(seat_id))
        .copied()
        .collect()
}
