//! The weighted random walk over the shared timeline.

use std::path::PathBuf;

use rand::Rng;

use super::{validate_sources, SubclipBounds, TimelineError, TimelineResult, TimelineSource};
use crate::models::{CompilationPlan, PlannedSubclip, SubclipSpec};

/// Remainders shorter than this are below container timestamp precision.
pub(crate) const SLIVER_SECS: f64 = 1e-3;

/// Pick one of `candidates` (index, weight) with probability proportional to
/// its weight. Returns `None` only for an empty slice.
pub fn pick_weighted<R: Rng + ?Sized>(candidates: &[(usize, f64)], rng: &mut R) -> Option<usize> {
    let total: f64 = candidates.iter().map(|(_, w)| w).sum();
    let draw = rng.gen::<f64>() * total;

    let mut accum = 0.0;
    for &(idx, weight) in candidates {
        accum += weight;
        if accum >= draw {
            return Some(idx);
        }
    }
    candidates.last().map(|&(idx, _)| idx)
}

/// Walk the timeline from 0 to the latest window end.
///
/// At each cursor position a source whose window covers the cursor is picked
/// by weight and a duration is drawn from `bounds`. When the picked window
/// has less than `max` left, the subclip runs to the window end and the
/// source is retired. `render` produces the subclip and reports its measured
/// duration; the cursor advances by that measurement.
///
/// A retired window whose tail came back short by at most `bounds.slack_secs`
/// is skipped; a larger shortfall is [`TimelineError::RenderShortfall`].
pub fn build_plan<R, F>(
    sources: &[TimelineSource],
    bounds: SubclipBounds,
    rng: &mut R,
    mut render: F,
) -> TimelineResult<CompilationPlan>
where
    R: Rng + ?Sized,
    F: FnMut(&SubclipSpec) -> TimelineResult<(PathBuf, f64)>,
{
    validate_sources(sources, bounds)?;

    let timeline_end = sources
        .iter()
        .filter_map(|s| s.window)
        .map(|w| w.end_secs)
        .fold(None, |acc: Option<f64>, end| Some(acc.map_or(end, |a| a.max(end))))
        .ok_or(TimelineError::NoResolvedSources)?;

    let mut exhausted = vec![false; sources.len()];
    let mut plan = CompilationPlan {
        subclips: Vec::new(),
        timeline_end_secs: timeline_end,
    };
    let mut t = 0.0;

    while timeline_end - t > SLIVER_SECS {
        let active: Vec<(usize, f64)> = sources
            .iter()
            .enumerate()
            .filter(|(idx, s)| {
                !exhausted[*idx]
                    && s.window
                        .is_some_and(|w| w.contains(t) && w.end_secs - t > SLIVER_SECS)
            })
            .map(|(idx, s)| (idx, s.weight))
            .collect();

        let Some(idx) = pick_weighted(&active, rng) else {
            // Encoder rounding can leave a sliver of a retired or ending window.
            let covered_end = sources
                .iter()
                .filter_map(|s| s.window)
                .filter(|w| w.contains(t))
                .map(|w| w.end_secs)
                .fold(None, |acc: Option<f64>, end| Some(acc.map_or(end, |a| a.max(end))));

            match covered_end {
                Some(end) if end - t <= bounds.slack_secs => {
                    tracing::debug!("Skipping {:.3}s sliver at {:.3}s", end - t, t);
                    t = end;
                    continue;
                }
                Some(end) => {
                    return Err(TimelineError::RenderShortfall {
                        at_secs: t,
                        gap_secs: end - t,
                    })
                }
                None => return Err(TimelineError::CoverageGap { at_secs: t }),
            }
        };

        let Some(window) = sources[idx].window else {
            return Err(TimelineError::CoverageGap { at_secs: t });
        };

        let remaining = window.end_secs - t;
        let mut duration = if bounds.min_secs < bounds.max_secs {
            rng.gen_range(bounds.min_secs..=bounds.max_secs)
        } else {
            bounds.min_secs
        };
        if remaining < bounds.max_secs {
            duration = remaining;
            exhausted[idx] = true;
        }

        let spec = SubclipSpec {
            source_index: idx,
            local_start_secs: (t - window.start_secs).max(0.0),
            duration_secs: duration,
        };

        let (path, measured_secs) = render(&spec)?;
        if measured_secs <= 0.0 {
            return Err(TimelineError::EmptySubclip {
                source_index: idx,
                at_secs: t,
            });
        }

        plan.subclips.push(PlannedSubclip {
            spec,
            global_start_secs: t,
            measured_secs,
            path,
        });
        t += measured_secs;
    }

    Ok(plan)
}
