//! Grouping of shared tracks by the number of members holding them.
//!
//! Everything here is pure: inputs are borrowed, results are owned copies, and
//! nothing is cached between calls.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use itertools::Itertools;
use shared::{
    music::Track,
    playlist::{MembershipRecord, Playlist, SharedCountBuckets},
    room::Member,
};
use tracing::debug;

use crate::error::{Result, TunematesError};

/// Number of tracks the default threshold tries to show.
pub const DEFAULT_TRACK_TARGET: usize = 40;

/// Cutoff state for the groups shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdSelection {
    ideal_shared_count: u32,
    min_limit: u32,
    max_limit: u32,
    /// Populated shared counts, highest first.
    available: Vec<u32>,
    counts_to_include: BTreeSet<u32>,
}

impl ThresholdSelection {
    fn new(available: Vec<u32>, ideal_shared_count: u32) -> Self {
        let min_limit = available.iter().copied().min().unwrap_or(ideal_shared_count);
        let max_limit = available.iter().copied().max().unwrap_or(ideal_shared_count);
        let counts_to_include = available
            .iter()
            .copied()
            .filter(|&count| count >= ideal_shared_count)
            .collect();
        Self {
            ideal_shared_count,
            min_limit,
            max_limit,
            available,
            counts_to_include,
        }
    }

    pub fn ideal_shared_count(&self) -> u32 {
        self.ideal_shared_count
    }

    pub fn min_limit(&self) -> u32 {
        self.min_limit
    }

    pub fn max_limit(&self) -> u32 {
        self.max_limit
    }

    /// Included shared counts, highest first.
    pub fn counts_to_include(&self) -> Vec<u32> {
        self.counts_to_include.iter().rev().copied().collect()
    }

    pub fn includes(&self, count: u32) -> bool {
        self.counts_to_include.contains(&count)
    }

    /// Includes every populated count at or above `count`, clamped to the limits.
    pub fn set_threshold(&mut self, count: u32) {
        let count = count.clamp(self.min_limit, self.max_limit);
        self.counts_to_include = self
            .available
            .iter()
            .copied()
            .filter(|&c| c >= count)
            .collect();
    }

    /// Returns false when `count` has no populated group.
    pub fn include(&mut self, count: u32) -> bool {
        if !self.available.contains(&count) {
            return false;
        }
        self.counts_to_include.insert(count);
        true
    }

    pub fn exclude(&mut self, count: u32) {
        self.counts_to_include.remove(&count);
    }

    /// Returns whether `count` is included afterwards.
    pub fn toggle(&mut self, count: u32) -> bool {
        if self.counts_to_include.contains(&count) {
            self.counts_to_include.remove(&count);
            false
        } else {
            self.include(count)
        }
    }

    pub fn reset(&mut self) {
        let ideal = self.ideal_shared_count;
        self.set_threshold(ideal);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Threshold {
    /// Not a single track is shared.
    NoOverlap,
    Limits(ThresholdSelection),
}

/// Tracks grouped by shared count, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    groups: BTreeMap<u32, Vec<Track>>,
    membership: MembershipRecord,
    members: HashMap<String, Member>,
    threshold: Threshold,
}

impl Grouping {
    /// Shared counts with at least one track, highest first.
    pub fn shared_counts(&self) -> Vec<u32> {
        self.groups
            .iter()
            .rev()
            .filter(|(_, tracks)| !tracks.is_empty())
            .map(|(&count, _)| count)
            .collect()
    }

    pub fn groups(&self) -> &BTreeMap<u32, Vec<Track>> {
        &self.groups
    }

    pub fn group(&self, shared_count: u32) -> &[Track] {
        self.groups
            .get(&shared_count)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn members(&self) -> &HashMap<String, Member> {
        &self.members
    }

    pub fn threshold(&self) -> &Threshold {
        &self.threshold
    }

    pub fn selection(&self) -> Option<&ThresholdSelection> {
        match &self.threshold {
            Threshold::NoOverlap => None,
            Threshold::Limits(selection) => Some(selection),
        }
    }

    pub fn selection_mut(&mut self) -> Option<&mut ThresholdSelection> {
        match &mut self.threshold {
            Threshold::NoOverlap => None,
            Threshold::Limits(selection) => Some(selection),
        }
    }

    pub fn is_no_overlap(&self) -> bool {
        matches!(self.threshold, Threshold::NoOverlap)
    }

    pub fn total_track_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Tracks of every included group, highest shared count first.
    pub fn selected_tracks(&self) -> Vec<&Track> {
        let Some(selection) = self.selection() else {
            return vec![];
        };
        self.groups
            .iter()
            .rev()
            .filter(|(count, _)| selection.includes(**count))
            .flat_map(|(_, tracks)| tracks.iter())
            .collect()
    }

    pub fn selected_track_count(&self) -> usize {
        self.selected_tracks().len()
    }

    /// Profiles of the members holding the recording, sorted by name.
    /// Ids without a known profile are skipped.
    pub fn members_holding(&self, isrc: &str) -> Vec<&Member> {
        self.membership
            .get(isrc)
            .map(|ids| {
                ids.iter()
                    .unique()
                    .filter_map(|id| self.members.get(id))
                    .sorted_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Walks shared counts from highest to lowest and stops once the cumulative
/// track count reaches [`DEFAULT_TRACK_TARGET`]. Lands on the lowest populated
/// count when the target is never reached. `None` when no group has tracks.
pub fn find_best_default_shared_count(groups: &SharedCountBuckets) -> Option<u32> {
    let mut cumulative = 0;
    let mut best = None;

    for (&count, tracks) in groups.iter().rev().filter(|(_, t)| !t.is_empty()) {
        cumulative += tracks.len();
        best = Some(count);
        if cumulative >= DEFAULT_TRACK_TARGET {
            break;
        }
    }

    best
}

/// Builds the grouping for the backend's shared-count buckets.
///
/// Fails with [`TunematesError::MalformedInput`] when a bucket disagrees with
/// the membership record.
pub fn compute_grouping(
    buckets: &SharedCountBuckets,
    membership: &MembershipRecord,
    members: &HashMap<String, Member>,
) -> Result<Grouping> {
    let mut groups = BTreeMap::new();
    let mut kept_membership = MembershipRecord::new();

    for (&count, tracks) in buckets {
        if tracks.is_empty() {
            continue;
        }
        if count == 0 {
            return Err(TunematesError::MalformedInput(
                "tracks grouped as shared by 0 members".to_string(),
            ));
        }
        if !members.is_empty() && count as usize > members.len() {
            return Err(TunematesError::MalformedInput(format!(
                "tracks shared by {} members but the room has {}",
                count,
                members.len()
            )));
        }

        for track in tracks {
            let isrc = track_isrc(track)?;
            let holders = membership_of(membership, track, isrc)?;
            let distinct: Vec<String> = holders.iter().unique().cloned().collect();
            if distinct.len() != count as usize {
                return Err(TunematesError::MalformedInput(format!(
                    "track {} ({}) is in the {} group but held by {} members",
                    track.id,
                    isrc,
                    count,
                    distinct.len()
                )));
            }
            kept_membership.insert(isrc.to_string(), distinct);
        }

        groups.insert(count, sorted_tracks(tracks));
    }

    let threshold = match find_best_default_shared_count(&groups) {
        None => Threshold::NoOverlap,
        Some(ideal) => {
            let available: Vec<u32> = groups.keys().rev().copied().collect();
            Threshold::Limits(ThresholdSelection::new(available, ideal))
        }
    };

    if let Threshold::Limits(selection) = &threshold {
        debug!(
            "Grouped {} shared tracks into counts [{}], default threshold {}",
            groups.values().map(Vec::len).sum::<usize>(),
            selection.available.iter().join(", "),
            selection.ideal_shared_count
        );
    } else {
        debug!("No shared tracks to group");
    }

    Ok(Grouping {
        groups,
        membership: kept_membership,
        members: members.clone(),
        threshold,
    })
}

/// Runs [`compute_grouping`] on a playlist payload.
pub fn compute_playlist_grouping(playlist: &Playlist) -> Result<Grouping> {
    compute_grouping(
        &playlist.tracks_per_shared_count,
        &playlist.user_ids_per_shared_tracks,
        &playlist.users,
    )
}

/// Keeps the tracks held by every member of `member_ids`.
///
/// An empty selection returns the grouping unchanged. Groups emptied by the
/// filter stay in the result.
pub fn filter_by_members<S: AsRef<str>>(
    grouping: &Grouping,
    membership: &MembershipRecord,
    member_ids: &[S],
) -> Result<Grouping> {
    if member_ids.is_empty() {
        return Ok(grouping.clone());
    }

    let wanted: HashSet<&str> = member_ids.iter().map(AsRef::as_ref).collect();
    let mut groups = BTreeMap::new();

    for (&count, tracks) in &grouping.groups {
        let mut kept = Vec::new();
        for track in tracks {
            let isrc = track_isrc(track)?;
            let holders: HashSet<&str> = membership_of(membership, track, isrc)?
                .iter()
                .map(String::as_str)
                .collect();
            if wanted.is_subset(&holders) {
                kept.push(track.clone());
            }
        }
        groups.insert(count, kept);
    }

    Ok(Grouping {
        groups,
        membership: grouping.membership.clone(),
        members: grouping.members.clone(),
        threshold: grouping.threshold.clone(),
    })
}

fn track_isrc(track: &Track) -> Result<&str> {
    track.isrc().ok_or_else(|| {
        TunematesError::MalformedInput(format!("track {} has no ISRC", track.id))
    })
}

fn membership_of<'a>(
    membership: &'a MembershipRecord,
    track: &Track,
    isrc: &str,
) -> Result<&'a Vec<String>> {
    membership.get(isrc).ok_or_else(|| {
        TunematesError::MalformedInput(format!(
            "no membership entry for track {} ({})",
            track.id, isrc
        ))
    })
}

/// Orders by joined artist names, then title, then catalog id.
fn sorted_tracks(tracks: &[Track]) -> Vec<Track> {
    let mut sorted = tracks.to_vec();
    sorted.sort_by_cached_key(|t| (t.artists_label(), t.name.clone(), t.id.clone()));
    sorted
}
