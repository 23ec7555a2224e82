//! Anchoring every source on one shared timeline.

use super::{compute_offset, OffsetError, OffsetResult};
use crate::config::OffsetSettings;
use crate::fingerprint::ConstellationInfo;
use crate::models::GlobalOffset;

/// Place every source on a shared timeline.
///
/// Source 0 is anchored at `[0, d0)`. Each later source is correlated against
/// the already-anchored sources in index order; the first success places it
/// at `base.start + offset`. Whenever a start goes negative all windows are
/// shifted so the earliest start is 0. Non-fatal correlation errors move on
/// to the next base; a source no base resolves stays `None`. A fatal error
/// aborts the walk.
///
/// `correlate(base, src)` returns the offset in seconds of `src` relative to
/// `base`.
pub fn resolve_global_offsets<F>(
    durations: &[f64],
    mut correlate: F,
) -> OffsetResult<Vec<Option<GlobalOffset>>>
where
    F: FnMut(usize, usize) -> OffsetResult<f64>,
{
    let mut windows: Vec<Option<GlobalOffset>> = vec![None; durations.len()];
    let Some(&first) = durations.first() else {
        return Ok(windows);
    };
    windows[0] = Some(GlobalOffset::new(0.0, first));

    for src in 1..durations.len() {
        for base in 0..src {
            let Some(base_window) = windows[base] else {
                continue;
            };

            match correlate(base, src) {
                Ok(offset_secs) => {
                    let start = base_window.start_secs + offset_secs;
                    windows[src] = Some(GlobalOffset::new(start, start + durations[src]));
                    if start < 0.0 {
                        for window in windows.iter_mut().flatten() {
                            *window = window.shifted(-start);
                        }
                    }
                    break;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::debug!("Source {} vs base {}: {}", src, base, e);
                }
            }
        }

        if windows[src].is_none() {
            tracing::warn!("Source {} could not be placed on the timeline", src);
        }
    }

    Ok(windows)
}

/// [`resolve_global_offsets`] over landmark constellations.
pub fn compute_global_offsets(
    constellations: &[ConstellationInfo],
    durations: &[f64],
    settings: &OffsetSettings,
) -> OffsetResult<Vec<Option<GlobalOffset>>> {
    if constellations.len() != durations.len() {
        return Err(OffsetError::LengthMismatch {
            expected: constellations.len(),
            actual: durations.len(),
        });
    }

    resolve_global_offsets(durations, |base, src| {
        compute_offset(&constellations[base], &constellations[src], settings)
            .map(|estimate| estimate.offset_secs)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Constellation;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rebases_when_a_source_starts_first() {
        // Source 1 starts 10 s before source 0, source 2 starts 5 s after it.
        let durations = [30.0, 25.0, 40.0];
        let windows = resolve_global_offsets(&durations, |base, src| match (base, src) {
            (0, 1) => Ok(-10.0),
            (0, 2) => Ok(5.0),
            _ => Err(OffsetError::NoCommonLandmarks),
        })
        .unwrap();

        let w: Vec<GlobalOffset> = windows.into_iter().map(Option::unwrap).collect();
        assert!(approx(w[0].start_secs, 10.0) && approx(w[0].end_secs, 40.0));
        assert!(approx(w[1].start_secs, 0.0) && approx(w[1].end_secs, 25.0));
        assert!(approx(w[2].start_secs, 15.0) && approx(w[2].end_secs, 55.0));

        let min_start = w.iter().map(|g| g.start_secs).fold(f64::INFINITY, f64::min);
        assert!(approx(min_start, 0.0));
        assert!(approx(w[2].start_secs - w[0].start_secs, 5.0));
        assert!(approx(w[0].start_secs - w[1].start_secs, 10.0));
    }

    #[test]
    fn falls_back_to_later_bases() {
        let durations = [20.0, 20.0, 20.0];
        let mut calls = Vec::new();
        let windows = resolve_global_offsets(&durations, |base, src| {
            calls.push((base, src));
            match (base, src) {
                (0, 1) => Ok(4.0),
                (1, 2) => Ok(2.0),
                _ => Err(OffsetError::NoCommonLandmarks),
            }
        })
        .unwrap();

        assert_eq!(calls, vec![(0, 1), (0, 2), (1, 2)]);
        assert!(approx(windows[2].unwrap().start_secs, 6.0));
    }

    #[test]
    fn unresolved_source_stays_none_and_is_not_a_base() {
        let durations = [10.0, 10.0, 10.0];
        let mut calls = Vec::new();
        let windows = resolve_global_offsets(&durations, |base, src| {
            calls.push((base, src));
            match (base, src) {
                (0, 2) => Ok(1.0),
                _ => Err(OffsetError::BelowThreshold {
                    votes: 1,
                    min_matches: 5,
                }),
            }
        })
        .unwrap();

        assert!(windows[1].is_none());
        assert!(windows[2].is_some());
        assert_eq!(calls, vec![(0, 1), (0, 2)]);
    }

    #[test]
    fn fatal_error_aborts() {
        let durations = [10.0, 10.0];
        let result = resolve_global_offsets(&durations, |_, _| {
            Err(OffsetError::SampleRateMismatch {
                base_rate: 44100,
                base_hop: 1024,
                src_rate: 48000,
                src_hop: 1024,
            })
        });
        assert!(result.is_err());
    }

    #[test]
    fn repeated_rebasing_keeps_minimum_at_zero() {
        let durations = [10.0, 10.0, 10.0];
        let windows = resolve_global_offsets(&durations, |base, src| match (base, src) {
            (0, 1) => Ok(-3.0),
            (0, 2) => Ok(-7.0),
            _ => Err(OffsetError::NoCommonLandmarks),
        })
        .unwrap();

        let starts: Vec<f64> = windows.iter().map(|w| w.unwrap().start_secs).collect();
        assert!(approx(starts[0], 7.0));
        assert!(approx(starts[1], 4.0));
        assert!(approx(starts[2], 0.0));
    }

    #[test]
    fn constellation_walk_uses_pairwise_offsets() {
        let make = |frames: &[u32]| {
            let mut constellation = Constellation::new();
            for (i, &f) in frames.iter().enumerate() {
                constellation.entry(100 + i as u32).or_default().insert(f);
            }
            ConstellationInfo {
                sample_rate: 1024,
                hop_size: 1024,
                constellation,
            }
        };
        // One frame per second; source 1 is the same content 2 s later.
        let base = make(&[5, 9, 14]);
        let src = make(&[3, 7, 12]);

        let windows =
            compute_global_offsets(&[base, src], &[20.0, 18.0], &OffsetSettings::default())
                .unwrap();

        assert!(approx(windows[0].unwrap().start_secs, 0.0));
        assert!(approx(windows[1].unwrap().start_secs, 2.0));
        assert!(approx(windows[1].unwrap().end_secs, 20.0));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let result = compute_global_offsets(&[], &[1.0], &OffsetSettings::default());
        assert!(matches!(result, Err(OffsetError::LengthMismatch { .. })));
    }
}
