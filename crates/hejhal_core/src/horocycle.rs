//! Horocycle samples and the per-(level, R_max) space they live in.

use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::domain::{nearest_cusp, reduce_to_subgroup_domain};
use crate::error::{HejhalError, Result};
use crate::group::{Cusp, GroupData, Sl2z};
use crate::truncation::truncation;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpaceSettings {
    /// Horocycle height as a fraction of √3/(2N), the lowest point of the fundamental domain.
    pub height_factor: f64,
    pub truncation_eps: f64,
    /// Terms kept beyond the truncation point.
    pub extra_terms: usize,
}

impl Default for SpaceSettings {
    fn default() -> Self {
        Self {
            height_factor: 0.98,
            truncation_eps: 1e-16,
            extra_terms: 5,
        }
    }
}

impl SpaceSettings {
    pub fn default_height(&self, level: u64) -> f64 {
        self.height_factor * 3f64.sqrt() / (2.0 * level as f64)
    }
}

/// One sample z_m = x_m + iY and where its pullback lands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorocyclePoint {
    pub z: Complex<f64>,
    /// Pullback expressed in the local coordinate of `cusp` (z*).
    pub local: Complex<f64>,
    pub cusp: Cusp,
    pub vertex_index: usize,
    /// Pullback into the fundamental domain of Γ0(N) (w).
    pub pullback: Complex<f64>,
    /// γ ∈ Γ0(N) with γ·z = w.
    pub transform: Sl2z,
}

/// Samples `size` equally spaced points on the horocycle at `height`, in order.
pub fn sample(height: f64, group: &GroupData, size: usize) -> Result<Vec<HorocyclePoint>> {
    (1..=size)
        .map(|m| -> Result<HorocyclePoint> {
            let z = Complex::new((m as f64 - 0.5) / (2.0 * size as f64), height);
            let (transform, pullback) = reduce_to_subgroup_domain(z, group)?;
            let nearest = nearest_cusp(pullback, group);
            Ok(HorocyclePoint {
                z,
                local: nearest.local,
                cusp: nearest.cusp,
                vertex_index: nearest.vertex_index,
                pullback,
                transform,
            })
        })
        .collect()
}

/// Sample data for one horocycle height and truncation size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaassSpace {
    group: GroupData,
    r_max: f64,
    height: f64,
    size: usize,
    samples: Vec<HorocyclePoint>,
}

impl MaassSpace {
    /// Builds the space at the default height for the group's level.
    pub fn new(group: GroupData, r_max: f64, settings: SpaceSettings) -> Result<Self> {
        let height = settings.default_height(group.level());
        Self::with_height(group, r_max, height, settings)
    }

    pub fn with_height(
        group: GroupData,
        r_max: f64,
        height: f64,
        settings: SpaceSettings,
    ) -> Result<Self> {
        let size = truncation(r_max, height, settings.truncation_eps)? + settings.extra_terms;
        Self::with_size(group, r_max, height, size)
    }

    /// Builds the space with an explicit number of samples Q (coefficients a(1)..a(Q-1)).
    pub fn with_size(group: GroupData, r_max: f64, height: f64, size: usize) -> Result<Self> {
        if size < 3 {
            return Err(HejhalError::TruncationNotFound {
                r: r_max,
                y: height,
                limit: size,
            });
        }
        let samples = sample(height, &group, size)?;
        Ok(Self {
            group,
            r_max,
            height,
            size,
            samples,
        })
    }

    /// The same space sampled at another height, keeping the number of terms.
    pub fn resample(&self, height: f64) -> Result<Self> {
        Self::with_size(self.group.clone(), self.r_max, height, self.size)
    }

    pub fn group(&self) -> &GroupData {
        &self.group
    }

    pub fn r_max(&self) -> f64 {
        self.r_max
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Q, the number of horocycle samples.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn samples(&self) -> &[HorocyclePoint] {
        &self.samples
    }
}
