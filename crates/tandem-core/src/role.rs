//! Rank roles and the fixed rank partition they are classified from.
//!
//! A run is launched with either exactly as many ranks as the compute grid
//! has cells, in which case every rank computes and postprocessing is off,
//! or with twice as many, in which case even world ranks compute and odd
//! world ranks postprocess. Rank `r` is paired with rank `r ^ 1` across
//! the two roles.

use std::fmt;

use crate::error::LayoutError;

/// The part a rank plays in the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Advances simulation state each step and runs producer halves.
    Compute,
    /// Receives sampled data and runs consumer halves.
    Postprocess,
}

impl Role {
    /// Lower-case name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compute => "compute",
            Self::Postprocess => "postprocess",
        }
    }

    /// The other role.
    pub fn opposite(self) -> Self {
        match self {
            Self::Compute => Self::Postprocess,
            Self::Postprocess => Self::Compute,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the world ranks are split between roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionMode {
    /// Every rank is a compute rank; postprocessing is disabled.
    ComputeOnly,
    /// Even ranks compute, odd ranks postprocess.
    Interleaved,
}

/// The fixed rank partition established at bootstrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankLayout {
    compute_grid: [u32; 3],
    world_size: u32,
    mode: PartitionMode,
}

impl RankLayout {
    /// Derive the partition from the compute grid and the world size.
    ///
    /// # Errors
    ///
    /// [`LayoutError::EmptyGrid`] if a grid dimension is zero,
    /// [`LayoutError::RankCountMismatch`] if `world_size` is neither the
    /// grid cell count nor twice that.
    pub fn new(compute_grid: [u32; 3], world_size: u32) -> Result<Self, LayoutError> {
        if compute_grid.contains(&0) {
            return Err(LayoutError::EmptyGrid { compute_grid });
        }
        let compute_ranks = compute_grid
            .iter()
            .try_fold(1u64, |acc, &d| acc.checked_mul(u64::from(d)))
            .ok_or(LayoutError::RankCountMismatch {
                compute_grid,
                world_size,
            })?;

        let mode = if u64::from(world_size) == compute_ranks {
            PartitionMode::ComputeOnly
        } else if compute_ranks.checked_mul(2) == Some(u64::from(world_size)) {
            PartitionMode::Interleaved
        } else {
            return Err(LayoutError::RankCountMismatch {
                compute_grid,
                world_size,
            });
        };

        Ok(Self {
            compute_grid,
            world_size,
            mode,
        })
    }

    /// The compute rank grid.
    pub fn compute_grid(&self) -> [u32; 3] {
        self.compute_grid
    }

    /// Total number of ranks in the run.
    pub fn world_size(&self) -> u32 {
        self.world_size
    }

    /// The partition mode.
    pub fn mode(&self) -> PartitionMode {
        self.mode
    }

    /// Whether postprocess ranks exist in this run.
    pub fn has_postprocess(&self) -> bool {
        self.mode == PartitionMode::Interleaved
    }

    /// Number of ranks that take the given role.
    pub fn ranks_with_role(&self, role: Role) -> u32 {
        match (self.mode, role) {
            (PartitionMode::ComputeOnly, Role::Compute) => self.world_size,
            (PartitionMode::ComputeOnly, Role::Postprocess) => 0,
            (PartitionMode::Interleaved, _) => self.world_size / 2,
        }
    }

    /// Locate a world rank inside the partition.
    ///
    /// # Errors
    ///
    /// [`LayoutError::RankOutOfRange`] if `rank >= world_size`.
    pub fn position(&self, rank: u32) -> Result<RankPosition, LayoutError> {
        if rank >= self.world_size {
            return Err(LayoutError::RankOutOfRange {
                rank,
                world_size: self.world_size,
            });
        }
        Ok(RankPosition {
            world_rank: rank,
            mode: self.mode,
        })
    }
}

/// A process's place in a validated [`RankLayout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankPosition {
    world_rank: u32,
    mode: PartitionMode,
}

impl RankPosition {
    /// Decide this rank's role. Pure and idempotent.
    pub fn classify(&self) -> Role {
        match self.mode {
            PartitionMode::ComputeOnly => Role::Compute,
            PartitionMode::Interleaved if self.world_rank % 2 == 0 => Role::Compute,
            PartitionMode::Interleaved => Role::Postprocess,
        }
    }

    /// Rank in the world communicator.
    pub fn world_rank(&self) -> u32 {
        self.world_rank
    }

    /// Rank among the ranks sharing this role.
    pub fn local_rank(&self) -> u32 {
        match self.mode {
            PartitionMode::ComputeOnly => self.world_rank,
            PartitionMode::Interleaved => self.world_rank / 2,
        }
    }

    /// World rank of the partner on the other role, if there is one.
    pub fn peer(&self) -> Option<u32> {
        match self.mode {
            PartitionMode::ComputeOnly => None,
            PartitionMode::Interleaved => Some(self.world_rank ^ 1),
        }
    }

    /// The partition mode this position was taken from.
    pub fn mode(&self) -> PartitionMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn matching_rank_count_is_compute_only() {
        let layout = RankLayout::new([2, 1, 1], 2).unwrap();
        assert_eq!(layout.mode(), PartitionMode::ComputeOnly);
        assert!(!layout.has_postprocess());
        for rank in 0..2 {
            assert_eq!(layout.position(rank).unwrap().classify(), Role::Compute);
        }
        assert_eq!(layout.ranks_with_role(Role::Postprocess), 0);
    }

    #[test]
    fn doubled_rank_count_interleaves_roles() {
        let layout = RankLayout::new([2, 2, 1], 8).unwrap();
        assert_eq!(layout.mode(), PartitionMode::Interleaved);
        let roles: Vec<Role> = (0..8)
            .map(|r| layout.position(r).unwrap().classify())
            .collect();
        assert_eq!(
            roles,
            [
                Role::Compute,
                Role::Postprocess,
                Role::Compute,
                Role::Postprocess,
                Role::Compute,
                Role::Postprocess,
                Role::Compute,
                Role::Postprocess,
            ]
        );
        assert_eq!(layout.ranks_with_role(Role::Compute), 4);
        assert_eq!(layout.ranks_with_role(Role::Postprocess), 4);
    }

    #[test]
    fn peers_pair_compute_with_postprocess() {
        let layout = RankLayout::new([1, 1, 1], 2).unwrap();
        let compute = layout.position(0).unwrap();
        let post = layout.position(1).unwrap();
        assert_eq!(compute.peer(), Some(1));
        assert_eq!(post.peer(), Some(0));
        assert_eq!(compute.local_rank(), 0);
        assert_eq!(post.local_rank(), 0);
    }

    #[test]
    fn other_rank_counts_rejected() {
        match RankLayout::new([2, 1, 1], 3) {
            Err(LayoutError::RankCountMismatch { world_size, .. }) => assert_eq!(world_size, 3),
            other => panic!("expected RankCountMismatch, got {other:?}"),
        }
    }

    #[test]
    fn zero_dimension_rejected() {
        assert!(matches!(
            RankLayout::new([0, 1, 1], 0),
            Err(LayoutError::EmptyGrid { .. })
        ));
    }

    #[test]
    fn rank_outside_world_rejected() {
        let layout = RankLayout::new([1, 1, 1], 2).unwrap();
        assert!(matches!(
            layout.position(2),
            Err(LayoutError::RankOutOfRange {
                rank: 2,
                world_size: 2
            })
        ));
    }

    #[test]
    fn overflowing_grid_rejected() {
        assert!(matches!(
            RankLayout::new([u32::MAX, u32::MAX, u32::MAX], 4),
            Err(LayoutError::RankCountMismatch { .. })
        ));
    }

    proptest! {
        #[test]
        fn classification_is_stable_and_balanced(
            x in 1u32..4, y in 1u32..4, z in 1u32..4, split in any::<bool>()
        ) {
            let compute = x * y * z;
            let world = if split { compute * 2 } else { compute };
            let layout = RankLayout::new([x, y, z], world).unwrap();

            let mut compute_seen = 0;
            for rank in 0..world {
                let pos = layout.position(rank).unwrap();
                let role = pos.classify();
                prop_assert_eq!(role, pos.classify());
                if role == Role::Compute {
                    compute_seen += 1;
                }
                if let Some(peer) = pos.peer() {
                    let peer_role = layout.position(peer).unwrap().classify();
                    prop_assert_eq!(peer_role, role.opposite());
                }
            }
            prop_assert_eq!(compute_seen, compute);
        }
    }
}
