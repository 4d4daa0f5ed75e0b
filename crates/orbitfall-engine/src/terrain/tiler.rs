use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;

use crate::api::config::TerrainTuning;
use crate::api::host::{HostWorld, SpawnDesc};
use crate::api::types::{EntityId, ModelId, Pose};
use crate::assets::definition::TerrainDefinition;

pub const TILE_TAG: &str = "terrain_tile";

/// Integer grid coordinate of a ground tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord(pub i32, pub i32);

impl TileCoord {
    /// Tile containing the horizontal position of `p`.
    pub fn containing(p: Vec3, tile_size: f32) -> Self {
        TileCoord(
            (p.x / tile_size).floor() as i32,
            (p.y / tile_size).floor() as i32,
        )
    }

    pub fn center(self, tile_size: f32, height: f32) -> Vec3 {
        Vec3::new(
            (self.0 as f32 + 0.5) * tile_size,
            (self.1 as f32 + 0.5) * tile_size,
            height,
        )
    }
}

/// Tiles added and removed by one re-evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileDelta {
    pub spawned: Vec<TileCoord>,
    pub despawned: Vec<TileCoord>,
}

impl TileDelta {
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && self.despawned.is_empty()
    }
}

/// Sliding window of ground tiles around the player.
///
/// Keeps the `(2 * ring + 1)^2` tiles centered on the player's tile resident.
/// The window is only re-evaluated once the player has moved `move_threshold`
/// horizontally since the last evaluation.
#[derive(Debug)]
pub struct TerrainTiler {
    model: ModelId,
    tile_size: f32,
    ring: i32,
    threshold: f32,
    ground_height: f32,
    origin: Vec3,
    resident: BTreeMap<TileCoord, EntityId>,
    last_eval: Option<Vec3>,
}

impl TerrainTiler {
    pub fn new(def: &TerrainDefinition, tuning: &TerrainTuning, origin: Vec3) -> Self {
        Self {
            model: def.tile_model.clone(),
            tile_size: def.tile_size.unwrap_or(tuning.tile_size).max(1.0),
            ring: tuning.ring as i32,
            threshold: tuning.move_threshold.max(0.0),
            ground_height: def.ground_height,
            origin,
            resident: BTreeMap::new(),
            last_eval: None,
        }
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Tiles that should be resident with the player at `p`.
    pub fn desired(&self, p: Vec3) -> BTreeSet<TileCoord> {
        let TileCoord(cx, cy) = TileCoord::containing(p - self.origin, self.tile_size);
        let mut set = BTreeSet::new();
        for dx in -self.ring..=self.ring {
            for dy in -self.ring..=self.ring {
                set.insert(TileCoord(cx + dx, cy + dy));
            }
        }
        set
    }

    pub fn update(&mut self, world: &mut dyn HostWorld, player: Vec3) -> TileDelta {
        if let Some(last) = self.last_eval {
            let moved = (player - last).truncate().length();
            if moved < self.threshold {
                return TileDelta::default();
            }
        }
        self.last_eval = Some(player);

        let desired = self.desired(player);
        let mut delta = TileDelta::default();

        let stale: Vec<TileCoord> = self
            .resident
            .keys()
            .filter(|c| !desired.contains(c))
            .copied()
            .collect();
        for coord in stale {
            if let Some(entity) = self.resident.remove(&coord) {
                world.despawn(entity);
                delta.despawned.push(coord);
            }
        }

        for coord in desired {
            if self.resident.contains_key(&coord) {
                continue;
            }
            let center = self.origin + coord.center(self.tile_size, self.ground_height);
            let entity = world.spawn(SpawnDesc::model(self.model.clone(), Pose::at(center)).with_tag(TILE_TAG));
            self.resident.insert(coord, entity);
            delta.spawned.push(coord);
        }

        if !delta.is_empty() {
            log::debug!(
                "terrain: +{} -{} tiles, {} resident",
                delta.spawned.len(),
                delta.despawned.len(),
                self.resident.len()
            );
        }
        delta
    }

    pub fn resident(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.resident.keys().copied()
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        self.resident.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.resident.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resident.is_empty()
    }

    /// Despawn every tile. Returns how many went.
    pub fn clear(&mut self, world: &mut dyn HostWorld) -> usize {
        let mut despawned = 0;
        for (_, entity) in std::mem::take(&mut self.resident) {
            despawned += world.despawn(entity) as usize;
        }
        self.last_eval = None;
        despawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::world::SimWorld;

    fn tiler() -> TerrainTiler {
        let def = TerrainDefinition {
            tile_model: ModelId::new("ground"),
            tile_size: None,
            ground_height: 0.0,
        };
        TerrainTiler::new(&def, &TerrainTuning::default(), Vec3::ZERO)
    }

    fn no_duplicates(world: &SimWorld, tiler: &TerrainTiler) {
        let tiles = world.find_all_by_tag(TILE_TAG);
        assert_eq!(tiles.len(), tiler.len());
        let mut centers: Vec<(i64, i64)> = tiles
            .iter()
            .map(|t| (t.pos.x.round() as i64, t.pos.y.round() as i64))
            .collect();
        centers.sort();
        centers.dedup();
        assert_eq!(centers.len(), tiler.len(), "two tiles share a coordinate");
    }

    #[test]
    fn first_update_fills_the_window() {
        let mut world = SimWorld::new();
        let mut t = tiler();
        let delta = t.update(&mut world, Vec3::new(250.0, 250.0, 0.0));
        assert_eq!(delta.spawned.len(), 9);
        assert!(delta.despawned.is_empty());
        assert!(t.contains(TileCoord(-1, -1)) && t.contains(TileCoord(1, 1)));
        no_duplicates(&world, &t);
    }

    #[test]
    fn moving_exactly_the_threshold_shifts_one_ring() {
        let mut world = SimWorld::new();
        let mut t = tiler();
        t.update(&mut world, Vec3::new(250.0, 250.0, 0.0));

        let delta = t.update(&mut world, Vec3::new(750.0, 250.0, 0.0));
        let mut spawned = delta.spawned.clone();
        spawned.sort();
        let mut despawned = delta.despawned.clone();
        despawned.sort();
        assert_eq!(spawned, vec![TileCoord(2, -1), TileCoord(2, 0), TileCoord(2, 1)]);
        assert_eq!(despawned, vec![TileCoord(-1, -1), TileCoord(-1, 0), TileCoord(-1, 1)]);
        assert_eq!(t.len(), 9);
        no_duplicates(&world, &t);
    }

    #[test]
    fn small_moves_do_nothing() {
        let mut world = SimWorld::new();
        let mut t = tiler();
        t.update(&mut world, Vec3::new(250.0, 250.0, 0.0));
        let delta = t.update(&mut world, Vec3::new(700.0, 250.0, 300.0));
        assert!(delta.is_empty());
    }

    #[test]
    fn diagonal_move_keeps_window_consistent() {
        let mut world = SimWorld::new();
        let mut t = tiler();
        let mut p = Vec3::new(250.0, 250.0, 0.0);
        t.update(&mut world, p);
        for _ in 0..6 {
            p += Vec3::new(400.0, 400.0, 0.0);
            t.update(&mut world, p);
            let expected = t.desired(p);
            let resident: BTreeSet<_> = t.resident().collect();
            assert_eq!(resident, expected);
            no_duplicates(&world, &t);
        }
    }

    #[test]
    fn clear_removes_everything() {
        let mut world = SimWorld::new();
        let mut t = tiler();
        t.update(&mut world, Vec3::ZERO);
        assert_eq!(t.clear(&mut world), 9);
        assert!(world.find_all_by_tag(TILE_TAG).is_empty());
        assert_eq!(t.clear(&mut world), 0);
    }
}
