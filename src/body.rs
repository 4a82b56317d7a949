use std::ops::ControlFlow;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::easing::swing_ease;

/// Origins closer than this are treated as coincident with a node.
const COINCIDENT_EPSILON: f32 = 1e-6;

/// Errors surfaced by the body tree.
///
/// All of these are local validation failures detected at the node
/// performing the unsafe operation; a failure aborts the whole traversal
/// rather than returning a partial damage total.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum BodyError {
    #[error("defense must be positive, got {value}")]
    InvalidDefense { value: f32 },
    #[error("part size must be positive, got {value}")]
    InvalidSize { value: f32 },
    #[error("bearing is undefined at zero distance")]
    ZeroDistance,
    #[error("raw damage must be a non-negative number, got {value}")]
    NegativeDamage { value: f32 },
    #[error("no {kind:?} weapon matched the requested index; {remaining} left uncounted")]
    WeaponNotFound { kind: WeaponKind, remaining: usize },
    #[error("node {0:?} does not belong to this tree")]
    UnknownNode(NodeId),
}

/// Specific weapon carried by a `PartKind::Weapon` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    Sword,
    Gun,
}

/// Specific limb carried by a `PartKind::Appendage` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppendageKind {
    Leg,
}

/// Closed set of body part categories.
///
/// The subtype lives inside the variant so it exists exactly when the
/// category calls for one; behaviour differences are dispatched by matching
/// on this tag rather than by inheritance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartKind {
    Body,
    Weapon(WeaponKind),
    Appendage(AppendageKind),
}

impl PartKind {
    /// Weapon with the default subtype.
    pub fn weapon() -> Self {
        Self::Weapon(WeaponKind::Sword)
    }

    /// Appendage with the default subtype.
    pub fn appendage() -> Self {
        Self::Appendage(AppendageKind::Leg)
    }
}

/// Sign of a sword swing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwingDirection {
    Clockwise,
    Counterclockwise,
}

impl SwingDirection {
    fn signum(self) -> f32 {
        match self {
            Self::Clockwise => -1.0,
            Self::Counterclockwise => 1.0,
        }
    }
}

/// Outcome of driving a weapon's attack animation for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponAction {
    /// Nothing to animate this tick (gun outside its discharge window).
    Idle,
    /// A sword updated its swing angle.
    Swung,
    /// A gun entered its discharge window; the caller should spawn the shot.
    Fired,
    /// A gun is still inside its discharge window after having fired.
    Discharging,
}

/// Handle to a node inside a [`BodyTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

/// Circular collision footprint, used for projectile containment checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn contains(&self, point: Vec2) -> bool {
        self.center.distance(point) <= self.radius
    }

    pub fn overlaps(&self, other: &Circle) -> bool {
        self.center.distance(other.center) <= self.radius + other.radius
    }
}

/// One element of the articulated tree: torso, appendage, or weapon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPart {
    /// Offset from the parent's origin in the x/z ground plane.
    pub position: Vec2,
    /// Scalar extent: rendering scale, hit radius and blade/limb reach.
    pub size: f32,
    pub kind: PartKind,
    /// Divisor applied to all damage absorbed by this node's subtree.
    pub defense: f32,
    /// Current swing/rotation angle, mutated by gait and attack animation.
    pub orientation: f32,
    /// Elapsed-time accumulator driving periodic motion.
    pub animation_clock: f32,
    /// Set while a one-shot animation (gun discharge) is in progress.
    pub uses_custom_animation: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl BodyPart {
    fn new(
        position: Vec2,
        size: f32,
        kind: PartKind,
        defense: f32,
        parent: Option<NodeId>,
    ) -> Result<Self, BodyError> {
        if !(defense > 0.0) {
            return Err(BodyError::InvalidDefense { value: defense });
        }
        if !(size > 0.0) {
            return Err(BodyError::InvalidSize { value: size });
        }
        Ok(Self {
            position,
            size,
            kind,
            defense,
            orientation: 0.0,
            animation_clock: 0.0,
            uses_custom_animation: false,
            parent,
            children: Vec::new(),
        })
    }

    /// Period of this part's periodic animation.
    pub fn period(&self) -> f32 {
        self.size / 2.0
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Collision footprint in this part's local frame.
    pub fn footprint(&self) -> Circle {
        Circle {
            center: Vec2::ZERO,
            radius: self.size,
        }
    }

    /// Whether a slash with the given local origin and arc catches this part.
    ///
    /// A coincident origin is a guaranteed hit: the attack sits on the
    /// part's own origin, trivially inside reach, and no bearing exists to
    /// compare against.
    fn swept_by(&self, origin: Vec2, sweep_half_angle: f32) -> Result<bool, BodyError> {
        let distance = origin.length();
        if distance > self.size {
            return Ok(false);
        }
        if distance <= COINCIDENT_EPSILON {
            return Ok(true);
        }
        let phi = BodyTree::bearing(origin)?;
        Ok((self.orientation - phi).abs() <= sweep_half_angle)
    }
}

/// Articulated tree of body parts backed by a node arena.
///
/// Nodes own their children exclusively through the arena; the upward
/// parent link is a plain index, so no reference cycles exist. The
/// structure is fixed after assembly and dropped as a whole with the
/// owning entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyTree {
    nodes: Vec<BodyPart>,
}

impl BodyTree {
    /// Creates a tree holding only the root part.
    pub fn with_root(
        position: Vec2,
        size: f32,
        kind: PartKind,
        defense: f32,
    ) -> Result<Self, BodyError> {
        let root = BodyPart::new(position, size, kind, defense, None)?;
        Ok(Self { nodes: vec![root] })
    }

    /// Attaches a new part under `parent`, returning its handle.
    pub fn attach(
        &mut self,
        parent: NodeId,
        position: Vec2,
        size: f32,
        kind: PartKind,
        defense: f32,
    ) -> Result<NodeId, BodyError> {
        if parent.0 >= self.nodes.len() {
            return Err(BodyError::UnknownNode(parent));
        }
        let id = NodeId(self.nodes.len());
        let part = BodyPart::new(position, size, kind, defense, Some(parent))?;
        self.nodes.push(part);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&BodyPart> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut BodyPart> {
        self.nodes.get_mut(id.0)
    }

    /// Visits every node depth first, parents before children.
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            for &child in self.nodes[id.0].children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// Position of a node in the root's frame, accumulated over its
    /// ancestors' offsets.
    pub fn world_position(&self, id: NodeId) -> Option<Vec2> {
        let mut part = self.nodes.get(id.0)?;
        let mut position = part.position;
        while let Some(parent) = part.parent {
            part = &self.nodes[parent.0];
            position += part.position;
        }
        Some(position)
    }

    /// Collision footprint of a node in the root's frame.
    pub fn footprint(&self, id: NodeId) -> Option<Circle> {
        Some(Circle {
            center: self.world_position(id)?,
            radius: self.nodes[id.0].size,
        })
    }

    /// Bearing from a node origin to an attack origin expressed in that
    /// node's frame.
    ///
    /// Fails with [`BodyError::ZeroDistance`] for a coincident origin, where
    /// the division would produce an invalid angle.
    pub fn bearing(origin: Vec2) -> Result<f32, BodyError> {
        let distance = origin.length();
        if distance <= COINCIDENT_EPSILON {
            return Err(BodyError::ZeroDistance);
        }
        Ok((origin.x / distance).clamp(-1.0, 1.0).acos())
    }

    /// Damage inflicted on this tree by a melee slash. Pure query: the
    /// caller deducts the result from its health state.
    ///
    /// `origin` is the attacker's position in the root's local frame,
    /// `sweep_half_angle` half the angular width of the swing arc. Each
    /// node's accumulated subtree total is divided by its own `defense` on
    /// the way up, so defense compounds multiplicatively along the path
    /// from a struck leaf to the root: deeply nested parts are armored by
    /// every ancestor. This compounding is deliberate.
    pub fn take_slash(
        &self,
        origin: Vec2,
        sweep_half_angle: f32,
        raw_damage: f32,
    ) -> Result<f32, BodyError> {
        validate_damage(raw_damage)?;
        self.slash_from(self.root(), origin, sweep_half_angle, raw_damage)
    }

    fn slash_from(
        &self,
        id: NodeId,
        origin: Vec2,
        sweep_half_angle: f32,
        raw_damage: f32,
    ) -> Result<f32, BodyError> {
        let part = &self.nodes[id.0];
        let mut total = 0.0;
        if part.swept_by(origin, sweep_half_angle)? {
            total += raw_damage;
        }
        for &child in &part.children {
            // The child sees the attack in its own local frame.
            let local = origin - self.nodes[child.0].position;
            total += self.slash_from(child, local, sweep_half_angle, raw_damage)?;
        }
        Ok(total / part.defense)
    }

    /// Damage inflicted on this tree by a projectile. Pure query.
    ///
    /// The bullet is a point tested against each node's circular footprint,
    /// walked top down. A hit terminates at the first touched node: its
    /// children are not visited, so a bullet never damages both a parent
    /// and its descendants in one call. Defense compounds per level exactly
    /// as in [`BodyTree::take_slash`].
    pub fn take_bullet(&self, origin: Vec2, raw_damage: f32) -> Result<f32, BodyError> {
        validate_damage(raw_damage)?;
        Ok(self.bullet_from(self.root(), origin, raw_damage))
    }

    fn bullet_from(&self, id: NodeId, origin: Vec2, raw_damage: f32) -> f32 {
        let part = &self.nodes[id.0];
        let mut total = 0.0;
        if part.footprint().contains(origin) {
            total = raw_damage;
        } else {
            for &child in &part.children {
                let local = origin - self.nodes[child.0].position;
                total += self.bullet_from(child, local, raw_damage);
            }
        }
        total / part.defense
    }

    /// Drives the attack animation of the `index`-th weapon of the given
    /// kind, counted in depth-first order.
    ///
    /// Swords set their swing angle from the eased ramp of
    /// `elapsed / period`, signed by `direction`. Guns discharge only inside
    /// the middle half of their period: [`WeaponAction::Fired`] is reported
    /// once when the window is entered and `uses_custom_animation` stays set
    /// until the window is left. If no weapon of the requested kind matches
    /// the index, the distinguishable [`BodyError::WeaponNotFound`] carries
    /// the number of matches still uncounted.
    pub fn advance_weapon(
        &mut self,
        index: usize,
        kind: WeaponKind,
        direction: SwingDirection,
        elapsed: f32,
    ) -> Result<WeaponAction, BodyError> {
        match self.advance_from(self.root(), index, kind, direction, elapsed) {
            ControlFlow::Break(action) => Ok(action),
            ControlFlow::Continue(remaining) => Err(BodyError::WeaponNotFound { kind, remaining }),
        }
    }

    fn advance_from(
        &mut self,
        id: NodeId,
        mut remaining: usize,
        kind: WeaponKind,
        direction: SwingDirection,
        elapsed: f32,
    ) -> ControlFlow<WeaponAction, usize> {
        if let PartKind::Weapon(weapon) = self.nodes[id.0].kind {
            if weapon == kind {
                if remaining == 0 {
                    return ControlFlow::Break(self.drive_weapon(id, weapon, direction, elapsed));
                }
                remaining -= 1;
            }
        }
        for i in 0..self.nodes[id.0].children.len() {
            let child = self.nodes[id.0].children[i];
            match self.advance_from(child, remaining, kind, direction, elapsed) {
                ControlFlow::Break(action) => return ControlFlow::Break(action),
                ControlFlow::Continue(left) => remaining = left,
            }
        }
        ControlFlow::Continue(remaining)
    }

    fn drive_weapon(
        &mut self,
        id: NodeId,
        weapon: WeaponKind,
        direction: SwingDirection,
        elapsed: f32,
    ) -> WeaponAction {
        let part = &mut self.nodes[id.0];
        let period = part.period();
        match weapon {
            WeaponKind::Sword => {
                part.orientation = direction.signum() * swing_ease((elapsed / period).abs());
                WeaponAction::Swung
            }
            WeaponKind::Gun => {
                let in_window = elapsed > period / 4.0 && elapsed < 3.0 * period / 4.0;
                if in_window {
                    if part.uses_custom_animation {
                        WeaponAction::Discharging
                    } else {
                        part.uses_custom_animation = true;
                        WeaponAction::Fired
                    }
                } else {
                    part.uses_custom_animation = false;
                    WeaponAction::Idle
                }
            }
        }
    }

    /// Advances gait animation by one tick.
    ///
    /// Body parts move along their current heading by `velocity * elapsed`;
    /// appendages accumulate their animation clock and set their swing
    /// angle from the eased oscillation of `clock / period`. Weapons are
    /// driven by [`BodyTree::advance_weapon`] instead.
    pub fn walk(&mut self, velocity: f32, elapsed: f32) {
        for part in &mut self.nodes {
            match part.kind {
                PartKind::Body => {
                    let heading = Vec2::new(part.orientation.cos(), part.orientation.sin());
                    part.position += heading * velocity * elapsed;
                }
                PartKind::Appendage(_) => {
                    part.animation_clock += elapsed;
                    part.orientation = swing_ease(part.animation_clock / part.period());
                }
                PartKind::Weapon(_) => {}
            }
        }
    }
}

fn validate_damage(raw_damage: f32) -> Result<(), BodyError> {
    if raw_damage.is_finite() && raw_damage >= 0.0 {
        Ok(())
    } else {
        Err(BodyError::NegativeDamage { value: raw_damage })
    }
}
