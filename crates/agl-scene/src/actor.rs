//! Scenegraph nodes.
//!
//! Actors live in the scene's arena and are addressed by [`ActorId`]. A node
//! owns its children through the arena; `parent` is a back-reference only.
//! What an actor draws and how it reacts to input comes from its
//! [`ActorDelegate`] and its attached behaviours.

use agl_core::{Color, IRegion, Painter, ProgramId, Rect, Region, RenderTarget};

use crate::animation::AnimationId;
use crate::behaviour::{Behaviour, BehaviourSlot};
use crate::event_handler::{ActorEvent, EventResult};
use crate::scene::Scene;

slotmap::new_key_type! {
    /// Handle to an actor in a [`Scene`].
    pub struct ActorId;
}

/// How far an actor has been brought up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    /// Created, `init` not yet called.
    Unrealized,
    /// `init` ran with the render context available.
    Initialized,
    /// `set_size` ran at least once.
    Sized,
}

/// Per-actor off-screen copy of a subtree's rendering.
#[derive(Debug, Clone, Default)]
pub struct RenderCache {
    /// Policy switch.
    pub enabled: bool,
    /// Whether the target holds the subtree's current pixels.
    pub valid: bool,
    /// Where the cached content is drawn, relative to the actor's origin.
    pub offset: [f32; 2],
    /// Where in the target the content origin was rendered.
    pub position: [f32; 2],
    /// Minimum target size; larger than the region to allow panning
    /// without re-rendering.
    pub size_request: [u32; 2],
    pub(crate) target: Option<RenderTarget>,
}

impl RenderCache {
    pub fn target(&self) -> Option<RenderTarget> {
        self.target
    }

    /// Target size needed for `region`.
    pub(crate) fn wanted_size(&self, region: &Region) -> (u32, u32) {
        let w = region.width().ceil().max(0.0) as u32;
        let h = region.height().ceil().max(0.0) as u32;
        (w.max(self.size_request[0]), h.max(self.size_request[1]))
    }
}

/// Access to the owning scene from inside an actor or behaviour hook.
pub struct ActorCx<'a> {
    pub scene: &'a mut Scene,
    id: ActorId,
}

impl<'a> ActorCx<'a> {
    pub(crate) fn new(scene: &'a mut Scene, id: ActorId) -> Self {
        Self { scene, id }
    }

    /// The actor the hook runs for.
    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn node(&self) -> Option<&ActorNode> {
        self.scene.actor(self.id)
    }

    pub fn region(&self) -> Region {
        self.node().map(|n| n.region).unwrap_or_default()
    }

    pub fn colour(&self) -> u32 {
        self.node().map_or(0, |n| n.colour)
    }

    pub fn invalidate(&mut self) {
        self.scene.invalidate(self.id);
    }
}

/// Hooks an actor implements. Every hook defaults to doing nothing.
///
/// While a hook runs its delegate is detached from the node, so calling back
/// into the scene for the same actor does not re-enter the delegate.
pub trait ActorDelegate {
    /// Called once, the first time the actor is drawn.
    fn init(&mut self, cx: &mut ActorCx<'_>) {
        let _ = cx;
    }

    /// The actor or one of its ancestors was resized.
    fn set_size(&mut self, cx: &mut ActorCx<'_>) {
        let _ = cx;
    }

    /// Once per render of the actor, before `paint`.
    fn set_state(&mut self, cx: &mut ActorCx<'_>) {
        let _ = cx;
    }

    /// Draw the actor in its local coordinates, `(0, 0)` being its region origin.
    fn paint(&mut self, cx: &mut ActorCx<'_>, painter: &mut Painter) {
        let _ = (cx, painter);
    }

    fn on_event(&mut self, cx: &mut ActorCx<'_>, event: &ActorEvent) -> EventResult {
        let _ = (cx, event);
        EventResult::Ignored
    }

    /// The actor was invalidated.
    fn invalidate(&mut self, cx: &mut ActorCx<'_>) {
        let _ = cx;
    }

    /// Called before the actor's children are freed.
    fn free(&mut self, cx: &mut ActorCx<'_>) {
        let _ = cx;
    }
}

/// Plain container. Draws nothing itself.
#[derive(Debug, Default)]
pub struct Group;

impl ActorDelegate for Group {}

/// Fills the actor's region with its colour.
#[derive(Debug, Default)]
pub struct Fill;

impl ActorDelegate for Fill {
    fn paint(&mut self, cx: &mut ActorCx<'_>, painter: &mut Painter) {
        let r = cx.region();
        painter.fill_rect(
            Rect::new(0.0, 0.0, r.width(), r.height()),
            Color::from_rgba_u32(cx.colour()),
        );
    }
}

/// Delegate driven by closures, for small actors that do not warrant a type.
#[derive(Default)]
pub struct FnDelegate {
    paint: Option<Box<dyn FnMut(&mut ActorCx<'_>, &mut Painter)>>,
    on_event: Option<Box<dyn FnMut(&mut ActorCx<'_>, &ActorEvent) -> EventResult>>,
    free: Option<Box<dyn FnMut(&mut ActorCx<'_>)>>,
}

impl FnDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_paint(mut self, f: impl FnMut(&mut ActorCx<'_>, &mut Painter) + 'static) -> Self {
        self.paint = Some(Box::new(f));
        self
    }

    pub fn on_event(
        mut self,
        f: impl FnMut(&mut ActorCx<'_>, &ActorEvent) -> EventResult + 'static,
    ) -> Self {
        self.on_event = Some(Box::new(f));
        self
    }

    pub fn on_free(mut self, f: impl FnMut(&mut ActorCx<'_>) + 'static) -> Self {
        self.free = Some(Box::new(f));
        self
    }
}

impl ActorDelegate for FnDelegate {
    fn paint(&mut self, cx: &mut ActorCx<'_>, painter: &mut Painter) {
        if let Some(f) = self.paint.as_mut() {
            f(cx, painter);
        }
    }

    fn on_event(&mut self, cx: &mut ActorCx<'_>, event: &ActorEvent) -> EventResult {
        match self.on_event.as_mut() {
            Some(f) => f(cx, event),
            None => EventResult::Ignored,
        }
    }

    fn free(&mut self, cx: &mut ActorCx<'_>) {
        if let Some(f) = self.free.as_mut() {
            f(cx);
        }
    }
}

/// A node in the scene's arena.
pub struct ActorNode {
    pub(crate) name: Option<String>,
    pub(crate) parent: Option<ActorId>,
    pub(crate) children: Vec<ActorId>,
    pub(crate) region: Region,
    pub(crate) scrollable: Option<IRegion>,
    pub(crate) program: Option<ProgramId>,
    pub(crate) colour: u32,
    pub(crate) z: i32,
    pub(crate) disabled: bool,
    pub(crate) cache: RenderCache,
    pub(crate) behaviours: Vec<BehaviourSlot>,
    pub(crate) transitions: Vec<AnimationId>,
    pub(crate) delegate: Option<Box<dyn ActorDelegate>>,
    pub(crate) lifecycle: Lifecycle,
}

impl ActorNode {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<ActorId> {
        self.parent
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[ActorId] {
        &self.children
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn scrollable(&self) -> Option<IRegion> {
        self.scrollable
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    pub fn colour(&self) -> u32 {
        self.colour
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    /// The actor's own flag; see [`Scene::is_disabled`] for the inherited state.
    pub fn disabled(&self) -> bool {
        self.disabled
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Animations started for this actor that are still running.
    pub fn transitions(&self) -> &[AnimationId] {
        &self.transitions
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn behaviour_count(&self) -> usize {
        self.behaviours.len()
    }

    pub(crate) fn scroll_offset(&self) -> [f32; 2] {
        self.scrollable
            .map_or([0.0, 0.0], |s| [s.x1 as f32, s.y1 as f32])
    }
}

/// Builder for a new actor, turned into a node by [`Scene::insert`] or
/// [`Scene::add`].
pub struct Actor {
    pub(crate) name: Option<String>,
    pub(crate) region: Region,
    pub(crate) scrollable: Option<IRegion>,
    pub(crate) program: Option<ProgramId>,
    pub(crate) colour: u32,
    pub(crate) z: i32,
    pub(crate) disabled: bool,
    pub(crate) cache: Option<bool>,
    pub(crate) size_request: [u32; 2],
    pub(crate) behaviours: Vec<Box<dyn Behaviour>>,
    pub(crate) delegate: Box<dyn ActorDelegate>,
}

impl Actor {
    pub fn new(delegate: impl ActorDelegate + 'static) -> Self {
        Self {
            name: None,
            region: Region::default(),
            scrollable: None,
            program: None,
            colour: 0xffffffff,
            z: 0,
            disabled: false,
            cache: None,
            size_request: [0, 0],
            behaviours: Vec::new(),
            delegate: Box::new(delegate),
        }
    }

    pub fn group() -> Self {
        Self::new(Group)
    }

    /// Actor filling its region with `colour` (`0xRRGGBBAA`).
    pub fn fill(colour: u32) -> Self {
        Self::new(Fill).colour(colour)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Region from corners.
    pub fn at(self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.region(Region::new(x1, y1, x2, y2))
    }

    pub fn scrollable(mut self, viewport: IRegion) -> Self {
        self.scrollable = Some(viewport);
        self
    }

    pub fn program(mut self, program: ProgramId) -> Self {
        self.program = Some(program);
        self
    }

    pub fn colour(mut self, colour: u32) -> Self {
        self.colour = colour;
        self
    }

    pub fn z(mut self, z: i32) -> Self {
        self.z = z;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Override the scene's default cache policy for this actor.
    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = Some(enabled);
        self
    }

    pub fn cache_size_request(mut self, width: u32, height: u32) -> Self {
        self.size_request = [width, height];
        self
    }

    /// Attach a behaviour. Attachment order is event priority order.
    pub fn behaviour(mut self, behaviour: impl Behaviour + 'static) -> Self {
        self.behaviours.push(Box::new(behaviour));
        self
    }

    pub(crate) fn into_node(self, cache_by_default: bool) -> ActorNode {
        ActorNode {
            name: self.name,
            parent: None,
            children: Vec::new(),
            region: self.region,
            scrollable: self.scrollable,
            program: self.program,
            colour: self.colour,
            z: self.z,
            disabled: self.disabled,
            cache: RenderCache {
                enabled: self.cache.unwrap_or(cache_by_default),
                size_request: self.size_request,
                ..RenderCache::default()
            },
            behaviours: self.behaviours.into_iter().map(BehaviourSlot::new).collect(),
            transitions: Vec::new(),
            delegate: Some(self.delegate),
            lifecycle: Lifecycle::Unrealized,
        }
    }
}
