//! Landmark selection over a band × tile partition of the spectrogram.

use std::cmp::Ordering;

use super::spectrum::Spectrogram;
use super::Constellation;

/// Partition geometry for landmark picking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    /// Frequency bins per band.
    pub band_height: usize,
    /// Frames per tile.
    pub tile_width: usize,
    /// Landmarks kept per (band, tile).
    pub peaks_per_tile: usize,
}

/// Keep the strongest `peaks_per_tile` cells of every (band, tile).
///
/// Zero-magnitude cells never become landmarks. Ties break toward the
/// earlier frame, then the lower bin.
pub fn pick_landmarks(spectrogram: &Spectrogram, partition: Partition) -> Constellation {
    let mut constellation = Constellation::new();
    let band_height = partition.band_height.max(1);
    let tile_width = partition.tile_width.max(1);
    let num_frames = spectrogram.num_frames();
    let num_bins = spectrogram.num_bins;

    if partition.peaks_per_tile == 0 || num_frames == 0 {
        return constellation;
    }

    let mut cells: Vec<(f64, usize, usize)> = Vec::new();
    for band_start in (0..num_bins).step_by(band_height) {
        let band_end = (band_start + band_height).min(num_bins);

        for tile_start in (0..num_frames).step_by(tile_width) {
            let tile_end = (tile_start + tile_width).min(num_frames);

            cells.clear();
            for frame in tile_start..tile_end {
                let magnitudes = &spectrogram.frames[frame];
                for bin in band_start..band_end {
                    let magnitude = magnitudes[bin];
                    if magnitude > 0.0 {
                        cells.push((magnitude, frame, bin));
                    }
                }
            }

            cells.sort_by(|a, b| match b.0.total_cmp(&a.0) {
                Ordering::Equal => (a.1, a.2).cmp(&(b.1, b.2)),
                other => other,
            });

            for &(_, frame, bin) in cells.iter().take(partition.peaks_per_tile) {
                constellation
                    .entry(bin as u32)
                    .or_default()
                    .insert(frame as u32);
            }
        }
    }

    constellation
}

/// Total landmarks in a constellation.
pub fn landmark_count(constellation: &Constellation) -> usize {
    constellation.values().map(|frames| frames.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(frames: Vec<Vec<f64>>) -> Spectrogram {
        let num_bins = frames.first().map(Vec::len).unwrap_or(0);
        Spectrogram { frames, num_bins }
    }

    #[test]
    fn keeps_top_k_per_partition() {
        // 4 frames x 4 bins, 2x2 partitions, one landmark each.
        let spec = grid(vec![
            vec![1.0, 9.0, 2.0, 0.0],
            vec![3.0, 4.0, 0.0, 8.0],
            vec![0.0, 0.0, 5.0, 1.0],
            vec![7.0, 0.0, 6.0, 0.0],
        ]);
        let partition = Partition {
            band_height: 2,
            tile_width: 2,
            peaks_per_tile: 1,
        };

        let constellation = pick_landmarks(&spec, partition);

        assert_eq!(landmark_count(&constellation), 4);
        assert!(constellation[&1].contains(&0));
        assert!(constellation[&3].contains(&1));
        assert!(constellation[&0].contains(&3));
        assert!(constellation[&2].contains(&3));
    }

    #[test]
    fn never_exceeds_k_per_partition() {
        let frames: Vec<Vec<f64>> = (0..10)
            .map(|t| (0..16).map(|b| ((t * 7 + b * 3) % 11) as f64 + 1.0).collect())
            .collect();
        let spec = grid(frames);
        let partition = Partition {
            band_height: 4,
            tile_width: 3,
            peaks_per_tile: 2,
        };

        let constellation = pick_landmarks(&spec, partition);

        for band in 0..4u32 {
            for tile in 0..4u32 {
                let count = constellation
                    .iter()
                    .filter(|(bin, _)| **bin / 4 == band)
                    .flat_map(|(_, frames)| frames.iter())
                    .filter(|frame| **frame / 3 == tile)
                    .count();
                assert!(count <= 2, "band {} tile {} has {}", band, tile, count);
            }
        }
    }

    #[test]
    fn ties_prefer_earlier_frame_then_lower_bin() {
        let spec = grid(vec![vec![0.0, 5.0, 5.0], vec![5.0, 5.0, 5.0]]);
        let partition = Partition {
            band_height: 3,
            tile_width: 2,
            peaks_per_tile: 2,
        };

        let constellation = pick_landmarks(&spec, partition);

        assert_eq!(landmark_count(&constellation), 2);
        assert!(constellation[&1].contains(&0));
        assert!(constellation[&2].contains(&0));
    }

    #[test]
    fn zero_magnitudes_are_skipped() {
        let spec = grid(vec![vec![0.0, 0.0], vec![0.0, 1.0]]);
        let partition = Partition {
            band_height: 2,
            tile_width: 2,
            peaks_per_tile: 3,
        };

        let constellation = pick_landmarks(&spec, partition);
        assert_eq!(landmark_count(&constellation), 1);
        assert!(constellation[&1].contains(&1));
    }
}
