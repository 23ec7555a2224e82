//! Pairwise offset from two constellations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{OffsetError, OffsetResult};
use crate::config::OffsetSettings;
use crate::fingerprint::ConstellationInfo;

/// Best-supported offset between two sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetEstimate {
    /// Positive when the source starts after the base.
    pub offset_secs: f64,
    pub offset_frames: i64,
    /// Votes for the winning delta.
    pub votes: usize,
    /// Landmark pairs compared.
    pub pairs: usize,
}

/// Estimate how far `src` starts after `base`.
///
/// Every landmark pair sharing a frequency bin votes for
/// `delta = base_frame - src_frame`; the most voted delta wins, ties going
/// to the smallest delta.
pub fn compute_offset(
    base: &ConstellationInfo,
    src: &ConstellationInfo,
    settings: &OffsetSettings,
) -> OffsetResult<OffsetEstimate> {
    if base.sample_rate != src.sample_rate || base.hop_size != src.hop_size {
        return Err(OffsetError::SampleRateMismatch {
            base_rate: base.sample_rate,
            base_hop: base.hop_size,
            src_rate: src.sample_rate,
            src_hop: src.hop_size,
        });
    }

    let mut histogram: BTreeMap<i64, usize> = BTreeMap::new();
    let mut pairs = 0usize;

    for (bin, base_frames) in &base.constellation {
        let Some(src_frames) = src.constellation.get(bin) else {
            continue;
        };
        for &base_t in base_frames {
            for &src_t in src_frames {
                *histogram.entry(base_t as i64 - src_t as i64).or_default() += 1;
                pairs += 1;
            }
        }
    }

    // Iterating ascending and replacing only on a strictly higher count keeps
    // the smallest delta on ties.
    let mut best: Option<(i64, usize)> = None;
    for (&delta, &votes) in &histogram {
        if best.map_or(true, |(_, best_votes)| votes > best_votes) {
            best = Some((delta, votes));
        }
    }

    let (offset_frames, votes) = best.ok_or(OffsetError::NoCommonLandmarks)?;
    if votes < settings.min_matches {
        return Err(OffsetError::BelowThreshold {
            votes,
            min_matches: settings.min_matches,
        });
    }

    Ok(OffsetEstimate {
        offset_secs: offset_frames as f64 * base.frame_secs(),
        offset_frames,
        votes,
        pairs,
    })
}
