use anyhow::{anyhow, Result};
use glam::Vec2;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::body::{BodyTree, Circle};

/// Axis-aligned footprint of a room or hall in the x/z ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f32,
    pub depth: f32,
}

/// Compass direction of a room connection. North is negative z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::South => 1,
            Self::East => 2,
            Self::West => 3,
        }
    }
}

/// Handle to a room inside a [`Level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(usize);

/// Handle to a hall inside a [`Level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HallId(usize);

/// Projectile in flight inside a room.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: f32,
    pub damage: f32,
}

impl Bullet {
    fn advance(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }

    fn footprint(&self) -> Circle {
        Circle {
            center: self.position,
            radius: self.size,
        }
    }
}

/// Wave enemy: a world position, an outer collision radius, a health pool
/// and the articulated body that attenuates incoming hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub position: Vec2,
    pub radius: f32,
    pub health: f32,
    pub body: BodyTree,
}

impl Enemy {
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    fn footprint(&self) -> Circle {
        Circle {
            center: self.position,
            radius: self.radius,
        }
    }
}

/// Wave state of a combat room.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Wave {
    pub enemies: Vec<Enemy>,
}

/// One room of the dungeon. `position` is the minimum corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub position: Vec2,
    pub size: Extent,
    pub activated: bool,
    pub unlocked: bool,
    connections: [Option<HallId>; 4],
    bullets: Vec<Bullet>,
    wave: Option<Wave>,
}

impl Room {
    pub fn new(position: Vec2, size: Extent) -> Self {
        Self {
            position,
            size,
            activated: false,
            unlocked: true,
            connections: [None; 4],
            bullets: Vec::new(),
            wave: None,
        }
    }

    pub fn connection(&self, direction: Direction) -> Option<HallId> {
        self.connections[direction.index()]
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn wave(&self) -> Option<&Wave> {
        self.wave.as_ref()
    }

    fn min(&self) -> Vec2 {
        self.position
    }

    fn max(&self) -> Vec2 {
        self.position + Vec2::new(self.size.width, self.size.depth)
    }

    fn center(&self) -> Vec2 {
        self.position + Vec2::new(self.size.width, self.size.depth) / 2.0
    }
}

/// Corridor joining two rooms across the gap between their facing walls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hall {
    pub from: RoomId,
    pub to: RoomId,
    pub position: Vec2,
    pub size: Extent,
    pub vertical: bool,
}

/// Dungeon structure: rooms joined by halls, plus the player's location.
///
/// Layout generation and spawn randomization are the caller's concern; the
/// level stores what it is given and advances the simulation each tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Level {
    rooms: Vec<Room>,
    halls: Vec<Hall>,
    player_room: Option<RoomId>,
}

impl Level {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_room(&mut self, room: Room) -> RoomId {
        let id = RoomId(self.rooms.len());
        self.rooms.push(room);
        id
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.0)
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(id.0)
    }

    pub fn hall(&self, id: HallId) -> Option<&Hall> {
        self.halls.get(id.0)
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn halls(&self) -> &[Hall] {
        &self.halls
    }

    /// Joins two rooms with a hall of the given breadth, `direction` seen
    /// from `from`. Both rooms record the connection.
    pub fn connect(
        &mut self,
        from: RoomId,
        to: RoomId,
        direction: Direction,
        breadth: f32,
    ) -> Result<HallId> {
        if from == to {
            return Err(anyhow!("cannot connect a room to itself"));
        }
        let from_room = self
            .rooms
            .get(from.0)
            .ok_or_else(|| anyhow!("unknown room {from:?}"))?;
        let to_room = self
            .rooms
            .get(to.0)
            .ok_or_else(|| anyhow!("unknown room {to:?}"))?;
        if from_room.connection(direction).is_some() {
            return Err(anyhow!("room {from:?} already has a {direction:?} hall"));
        }
        if to_room.connection(direction.opposite()).is_some() {
            return Err(anyhow!(
                "room {to:?} already has a {:?} hall",
                direction.opposite()
            ));
        }

        let hall = hall_between(from, from_room, to, to_room, direction, breadth)?;
        let id = HallId(self.halls.len());
        self.halls.push(hall);
        self.rooms[from.0].connections[direction.index()] = Some(id);
        self.rooms[to.0].connections[direction.opposite().index()] = Some(id);
        debug!("connected {from:?} -> {to:?} ({direction:?})");
        Ok(id)
    }

    /// Places a wave of enemies in a room. Spawn positions come from the
    /// caller; the room locks until the wave is cleared.
    pub fn spawn_wave(&mut self, id: RoomId, enemies: Vec<Enemy>) -> Result<()> {
        let room = self
            .rooms
            .get_mut(id.0)
            .ok_or_else(|| anyhow!("unknown room {id:?}"))?;
        if room.wave.is_some() {
            return Err(anyhow!("room {id:?} already has an active wave"));
        }
        debug!("spawning {} enemies in {id:?}", enemies.len());
        room.wave = Some(Wave { enemies });
        room.activated = true;
        room.unlocked = false;
        Ok(())
    }

    pub fn add_bullet(&mut self, id: RoomId, bullet: Bullet) -> Result<()> {
        let room = self
            .rooms
            .get_mut(id.0)
            .ok_or_else(|| anyhow!("unknown room {id:?}"))?;
        room.bullets.push(bullet);
        Ok(())
    }

    /// Marks the player as being inside a room.
    pub fn enter(&mut self, id: RoomId) -> Result<()> {
        if id.0 >= self.rooms.len() {
            return Err(anyhow!("unknown room {id:?}"));
        }
        self.player_room = Some(id);
        Ok(())
    }

    pub fn exit(&mut self) {
        self.player_room = None;
    }

    pub fn player_room(&self) -> Option<RoomId> {
        self.player_room
    }

    /// Advances every room by one tick: bullets move, and in wave rooms
    /// bullet hits are routed through each enemy's body tree. A bullet is
    /// spent on its first contact; a failed body query counts as no damage
    /// for gameplay continuity but is logged rather than masked.
    pub fn update(&mut self, dt: f32) {
        for room in &mut self.rooms {
            for bullet in &mut room.bullets {
                bullet.advance(dt);
            }
            let Some(wave) = room.wave.as_mut() else {
                continue;
            };
            resolve_wave_hits(wave, &mut room.bullets);
            if wave.enemies.is_empty() {
                debug!("wave cleared");
                room.wave = None;
                room.unlocked = true;
            }
        }
    }
}

fn resolve_wave_hits(wave: &mut Wave, bullets: &mut Vec<Bullet>) {
    bullets.retain(|bullet| {
        let Some(enemy) = wave
            .enemies
            .iter_mut()
            .find(|enemy| enemy.footprint().overlaps(&bullet.footprint()))
        else {
            return true;
        };
        // Hit position re-expressed in the enemy's local frame.
        let local = bullet.position - enemy.position;
        match enemy.body.take_bullet(local, bullet.damage) {
            Ok(damage) => {
                enemy.health -= damage;
                debug!("bullet dealt {damage:.2}, enemy health {:.2}", enemy.health);
            }
            Err(err) => warn!("bullet resolution failed: {err}"),
        }
        false
    });
    wave.enemies.retain(Enemy::is_alive);
}

fn hall_between(
    from: RoomId,
    from_room: &Room,
    to: RoomId,
    to_room: &Room,
    direction: Direction,
    breadth: f32,
) -> Result<Hall> {
    if !(breadth > 0.0) {
        return Err(anyhow!("hall breadth must be positive, got {breadth}"));
    }
    let center = (from_room.center() + to_room.center()) / 2.0;
    let (gap_start, gap_end, vertical) = match direction {
        Direction::North => (to_room.max().y, from_room.min().y, true),
        Direction::South => (from_room.max().y, to_room.min().y, true),
        Direction::East => (from_room.max().x, to_room.min().x, false),
        Direction::West => (to_room.max().x, from_room.min().x, false),
    };
    let gap = gap_end - gap_start;
    if gap <= 0.0 {
        return Err(anyhow!(
            "rooms {from:?} and {to:?} leave no {direction:?} gap to span"
        ));
    }
    let (position, size) = if vertical {
        (
            Vec2::new(center.x - breadth / 2.0, gap_start),
            Extent {
                width: breadth,
                depth: gap,
            },
        )
    } else {
        (
            Vec2::new(gap_start, center.y - breadth / 2.0),
            Extent {
                width: gap,
                depth: breadth,
            },
        )
    };
    Ok(Hall {
        from,
        to,
        position,
        size,
        vertical,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::PartKind;

    fn room(x: f32, z: f32, width: f32, depth: f32) -> Room {
        Room::new(Vec2::new(x, z), Extent { width, depth })
    }

    fn enemy(x: f32, z: f32, health: f32, defense: f32) -> Enemy {
        Enemy {
            position: Vec2::new(x, z),
            radius: 2.0,
            health,
            body: BodyTree::with_root(Vec2::ZERO, 2.0, PartKind::Body, defense).unwrap(),
        }
    }

    #[test]
    fn connecting_rooms_registers_both_sides() {
        let mut level = Level::new();
        let a = level.add_room(room(0.0, 0.0, 10.0, 10.0));
        let b = level.add_room(room(0.0, 15.0, 10.0, 10.0));
        let hall = level.connect(a, b, Direction::South, 4.0).unwrap();
        assert_eq!(level.room(a).unwrap().connection(Direction::South), Some(hall));
        assert_eq!(level.room(b).unwrap().connection(Direction::North), Some(hall));
    }

    #[test]
    fn hall_spans_the_gap_between_facing_walls() {
        let mut level = Level::new();
        let a = level.add_room(room(0.0, 0.0, 10.0, 10.0));
        let b = level.add_room(room(0.0, 15.0, 10.0, 10.0));
        let hall = level.connect(a, b, Direction::South, 4.0).unwrap();
        let hall = *level.hall(hall).unwrap();
        assert!(hall.vertical);
        assert_eq!(hall.position, Vec2::new(3.0, 10.0));
        assert_eq!(hall.size, Extent { width: 4.0, depth: 5.0 });
    }

    #[test]
    fn horizontal_hall_geometry() {
        let mut level = Level::new();
        let a = level.add_room(room(0.0, 0.0, 10.0, 10.0));
        let b = level.add_room(room(14.0, 2.0, 6.0, 6.0));
        let hall = level.connect(a, b, Direction::East, 2.0).unwrap();
        let hall = *level.hall(hall).unwrap();
        assert!(!hall.vertical);
        assert_eq!(hall.position.x, 10.0);
        assert_eq!(hall.size, Extent { width: 4.0, depth: 2.0 });
    }

    #[test]
    fn overlapping_rooms_cannot_be_joined() {
        let mut level = Level::new();
        let a = level.add_room(room(0.0, 0.0, 10.0, 10.0));
        let b = level.add_room(room(0.0, 5.0, 10.0, 10.0));
        assert!(level.connect(a, b, Direction::South, 4.0).is_err());
    }

    #[test]
    fn duplicate_connections_are_rejected() {
        let mut level = Level::new();
        let a = level.add_room(room(0.0, 0.0, 10.0, 10.0));
        let b = level.add_room(room(0.0, 15.0, 10.0, 10.0));
        level.connect(a, b, Direction::South, 4.0).unwrap();
        let again = level.connect(a, b, Direction::South, 4.0);
        assert!(again.is_err());
    }

    #[test]
    fn bullets_advance_with_time() {
        let mut level = Level::new();
        let a = level.add_room(room(0.0, 0.0, 100.0, 100.0));
        level
            .add_bullet(
                a,
                Bullet {
                    position: Vec2::ZERO,
                    velocity: Vec2::new(10.0, 0.0),
                    size: 0.5,
                    damage: 5.0,
                },
            )
            .unwrap();
        level.update(0.5);
        assert_eq!(level.room(a).unwrap().bullets()[0].position, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn bullet_damage_routes_through_the_body_tree() {
        let mut level = Level::new();
        let a = level.add_room(room(0.0, 0.0, 100.0, 100.0));
        // Defense 2 halves the 10 damage; two hits kill the 10 hp enemy.
        level.spawn_wave(a, vec![enemy(10.0, 0.0, 10.0, 2.0)]).unwrap();
        assert!(!level.room(a).unwrap().unlocked);

        let shot = Bullet {
            position: Vec2::new(9.0, 0.0),
            velocity: Vec2::ZERO,
            size: 0.5,
            damage: 10.0,
        };
        level.add_bullet(a, shot).unwrap();
        level.update(0.1);
        {
            let room = level.room(a).unwrap();
            // Bullet consumed on contact, enemy wounded but alive.
            assert!(room.bullets().is_empty());
            let wave = room.wave().unwrap();
            assert_eq!(wave.enemies.len(), 1);
            assert!((wave.enemies[0].health - 5.0).abs() < 1e-6);
        }

        level.add_bullet(a, shot).unwrap();
        level.update(0.1);
        let room = level.room(a).unwrap();
        assert!(room.wave().is_none());
        assert!(room.unlocked);
    }

    #[test]
    fn bullets_missing_every_enemy_keep_flying() {
        let mut level = Level::new();
        let a = level.add_room(room(0.0, 0.0, 100.0, 100.0));
        level.spawn_wave(a, vec![enemy(50.0, 50.0, 10.0, 1.0)]).unwrap();
        level
            .add_bullet(
                a,
                Bullet {
                    position: Vec2::ZERO,
                    velocity: Vec2::new(1.0, 0.0),
                    size: 0.5,
                    damage: 5.0,
                },
            )
            .unwrap();
        level.update(1.0);
        assert_eq!(level.room(a).unwrap().bullets().len(), 1);
    }

    #[test]
    fn player_presence_is_tracked_per_room() {
        let mut level = Level::new();
        let a = level.add_room(room(0.0, 0.0, 10.0, 10.0));
        assert!(level.enter(RoomId(5)).is_err());
        level.enter(a).unwrap();
        assert_eq!(level.player_room(), Some(a));
        level.exit();
        assert_eq!(level.player_room(), None);
    }
}
