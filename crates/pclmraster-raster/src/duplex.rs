// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Duplex geometry policy — which axes of the image and margins are swapped
// when a page lands on the back of a duplex sheet.

use pclmraster_core::{BacksideMode, DeviceRasterProfile, FlippedMargin, Rotation};
use tracing::debug;

/// Backside swap flags.
///
/// Computed once per job. The page assembler keeps the job-wide copy: the
/// first backside that mirrors both axes folds them into a 180° turn, and the
/// folded flags stand for every later backside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapState {
    pub image_x: bool,
    pub image_y: bool,
    pub margin_x: bool,
    pub margin_y: bool,
}

impl SwapState {
    const ALL: Self = Self {
        image_x: true,
        image_y: true,
        margin_x: true,
        margin_y: true,
    };

    /// The backside policy table. First matching rule wins.
    pub fn compute(backside: BacksideMode, tumble: bool, flipped_margin: FlippedMargin) -> Self {
        match backside {
            BacksideMode::ManualTumble if tumble => Self::full_flip(flipped_margin),
            BacksideMode::Rotated if !tumble => Self::full_flip(flipped_margin),
            BacksideMode::Flipped => {
                let mut state = if tumble {
                    Self {
                        image_x: true,
                        margin_x: true,
                        margin_y: true,
                        ..Self::default()
                    }
                } else {
                    Self {
                        image_y: true,
                        ..Self::default()
                    }
                };
                if flipped_margin == FlippedMargin::False {
                    state.margin_y = !state.margin_y;
                }
                state
            }
            _ => Self::default(),
        }
    }

    fn full_flip(flipped_margin: FlippedMargin) -> Self {
        Self {
            margin_y: flipped_margin != FlippedMargin::True,
            ..Self::ALL
        }
    }

    /// Job-wide swap state; only duplex jobs have anything to swap.
    pub fn for_profile(profile: &DeviceRasterProfile) -> Self {
        if !profile.duplex {
            return Self::default();
        }
        let state = Self::compute(profile.backside, profile.tumble, profile.flipped_margin);
        debug!(
            backside = ?profile.backside,
            tumble = profile.tumble,
            flipped_margin = ?profile.flipped_margin,
            ?state,
            "Duplex swap policy"
        );
        state
    }

    /// Fold a simultaneous x and y image swap into a half turn. Returns the
    /// page's effective rotation and the remaining swap flags.
    pub fn fold(self, rotation: Rotation) -> (Self, Rotation) {
        if self.image_x && self.image_y {
            let folded = Self {
                image_x: false,
                image_y: false,
                ..self
            };
            (folded, rotation.half_turn())
        } else {
            (self, rotation)
        }
    }

    /// Exchange margins `[left, bottom, right, top]` per the margin flags.
    pub fn swap_margins(&self, margins: &mut [f64; 4]) {
        if self.margin_x {
            margins.swap(0, 2);
        }
        if self.margin_y {
            margins.swap(1, 3);
        }
    }
}
