//! The actor tree and its frame loop.
//!
//! A [`Scene`] owns every actor in an arena, the render context it draws
//! through, the animation runner and the interaction state (hover, selection,
//! pointer grab). Mutations never render: they mark caches stale and raise a
//! single pending redraw request, which the application answers by calling
//! [`Scene::draw`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::rc::Rc;

use agl_config::AglConfig;
use agl_core::{
    Color, ContextType, IRegion, Painter, ProgramId, Rect, Region, RenderContext, Transform2D,
    Viewport,
};
use slotmap::SlotMap;
use winit::keyboard::ModifiersState;

use crate::actor::{Actor, ActorCx, ActorDelegate, ActorId, ActorNode, Lifecycle};
use crate::animation::{Animatable, AnimationId, AnimationRunner, FrameClock, SystemClock, TickReport};
use crate::behaviour::Behaviour;
use crate::error::{Result, SceneError};

/// Shared queue of actors with deferred behaviour work.
///
/// Clones feed the same queue, so code outside the scene (an observable
/// subscriber, say) can schedule work for [`Scene::run_idle`].
#[derive(Clone, Default)]
pub struct IdleHandle {
    queue: Rc<RefCell<Vec<ActorId>>>,
}

impl IdleHandle {
    pub fn queue(&self, id: ActorId) {
        let mut queue = self.queue.borrow_mut();
        if !queue.contains(&id) {
            queue.push(id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    fn take(&self) -> Vec<ActorId> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }
}

pub struct Scene {
    pub(crate) actors: SlotMap<ActorId, ActorNode>,
    pub(crate) root: ActorId,
    context: Box<dyn RenderContext>,
    background: u32,
    animations_enabled: bool,
    cache_by_default: bool,
    pub(crate) hovered: Option<ActorId>,
    pub(crate) selected: Option<ActorId>,
    pub(crate) grabbed: Option<ActorId>,
    pub(crate) pointer: Option<[f32; 2]>,
    pub(crate) modifiers: ModifiersState,
    draw_depth: usize,
    redraw_pending: bool,
    draw_callback: Option<Box<dyn FnMut()>>,
    runner: AnimationRunner,
    animation_owners: HashMap<AnimationId, ActorId>,
    idle: IdleHandle,
    frames: u64,
}

impl Scene {
    /// Scene for a `width` x `height` window with default settings and the
    /// system frame clock.
    pub fn new(context: impl RenderContext + 'static, width: u32, height: u32) -> Self {
        let mut config = AglConfig::default();
        config.window.width = width;
        config.window.height = height;
        Self::with_config(context, &config, SystemClock::new())
    }

    pub fn with_config(
        context: impl RenderContext + 'static,
        config: &AglConfig,
        clock: impl FrameClock + 'static,
    ) -> Self {
        let (width, height) = (config.window.width, config.window.height);
        let mut actors = SlotMap::with_key();
        let root = actors.insert(
            Actor::group()
                .name("root")
                .region(Region::sized(width as f32, height as f32))
                .into_node(false),
        );
        log::debug!(
            "scene created: {:?} context, {width}x{height}",
            context.kind()
        );
        Self {
            actors,
            root,
            context: Box::new(context),
            background: config.rendering.background,
            animations_enabled: config.animation.enabled,
            cache_by_default: config.rendering.cache_by_default,
            hovered: None,
            selected: None,
            grabbed: None,
            pointer: None,
            modifiers: ModifiersState::empty(),
            draw_depth: 0,
            redraw_pending: false,
            draw_callback: None,
            runner: AnimationRunner::with_config(&config.animation, clock),
            animation_owners: HashMap::new(),
            idle: IdleHandle::default(),
            frames: 0,
        }
    }

    pub fn root(&self) -> ActorId {
        self.root
    }

    pub fn context_type(&self) -> ContextType {
        self.context.kind()
    }

    pub fn context(&self) -> &dyn RenderContext {
        self.context.as_ref()
    }

    pub fn background(&self) -> u32 {
        self.background
    }

    pub fn set_background(&mut self, colour: u32) {
        self.background = colour;
        self.invalidate(self.root);
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn actor(&self, id: ActorId) -> Option<&ActorNode> {
        self.actors.get(id)
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.actors.contains_key(id)
    }

    /// Live actors, attached or not, including the root.
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn parent(&self, id: ActorId) -> Option<ActorId> {
        self.actors.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: ActorId) -> &[ActorId] {
        self.actors.get(id).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    pub fn region(&self, id: ActorId) -> Option<Region> {
        self.actors.get(id).map(|n| n.region)
    }

    fn node_mut(&mut self, id: ActorId, op: &str) -> Option<&mut ActorNode> {
        let node = self.actors.get_mut(id);
        if node.is_none() {
            log::warn!("{op}: actor {id:?} has been freed");
        }
        node
    }

    // --- tree -------------------------------------------------------------

    /// Create a detached actor.
    pub fn insert(&mut self, actor: Actor) -> ActorId {
        let id = self.actors.insert(actor.into_node(self.cache_by_default));
        log::debug!("actor {id:?} created");
        id
    }

    /// Create an actor and append it to `parent`.
    pub fn add(&mut self, parent: ActorId, actor: Actor) -> Result<ActorId> {
        if !self.contains(parent) {
            log::warn!("add: parent {parent:?} has been freed");
            return Err(SceneError::StaleActor(parent));
        }
        let id = self.insert(actor);
        self.add_child(parent, id)
    }

    /// Append `child` to `parent`'s children. Returns the child.
    ///
    /// # Panics
    /// Panics if the child is `parent` or one of its ancestors. In debug
    /// builds also panics if the child still has a parent.
    pub fn add_child(&mut self, parent: ActorId, child: ActorId) -> Result<ActorId> {
        if !self.contains(parent) {
            log::warn!("add_child: parent {parent:?} has been freed");
            return Err(SceneError::StaleActor(parent));
        }
        if !self.contains(child) {
            log::warn!("add_child: child {child:?} has been freed");
            return Err(SceneError::StaleActor(child));
        }
        assert!(
            !self.is_ancestor_or_self(child, parent),
            "add_child: {child:?} is an ancestor of {parent:?}"
        );
        debug_assert!(
            self.actors[child].parent.is_none(),
            "add_child: {child:?} is still attached"
        );
        if let Some(old) = self.actors[child].parent {
            log::warn!("add_child: moving {child:?} away from {old:?}");
            self.detach(child);
            self.invalidate(old);
        }
        self.actors[parent].children.push(child);
        self.actors[child].parent = Some(parent);
        self.invalidate(child);
        Ok(child)
    }

    /// Detach `child` from `parent` without freeing it. The caller becomes
    /// responsible for re-attaching or freeing it.
    pub fn remove_child(&mut self, parent: ActorId, child: ActorId) -> bool {
        match self.actors.get(child) {
            Some(node) if node.parent == Some(parent) => {}
            _ => {
                log::warn!("remove_child: {child:?} is not a child of {parent:?}");
                return false;
            }
        }
        self.detach(child);
        self.invalidate(parent);
        true
    }

    fn detach(&mut self, child: ActorId) {
        let Some(parent) = self.actors.get_mut(child).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(p) = self.actors.get_mut(parent) {
            p.children.retain(|c| *c != child);
        }
    }

    fn is_ancestor_or_self(&self, ancestor: ActorId, mut id: ActorId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.parent(id) {
                Some(p) => id = p,
                None => return false,
            }
        }
    }

    /// Topmost ancestor of `id`.
    pub fn root_of(&self, id: ActorId) -> ActorId {
        let mut id = id;
        while let Some(p) = self.parent(id) {
            id = p;
        }
        id
    }

    /// Whether the actor is connected to this scene's root.
    pub fn is_attached(&self, id: ActorId) -> bool {
        self.contains(id) && self.root_of(id) == self.root
    }

    /// Free an actor and, recursively, its children.
    ///
    /// The actor's `free` hook runs first. Its render target is released, it
    /// is detached from its parent, its animations are removed and the
    /// scene's hover, selection and grab references to it are cleared.
    pub fn free(&mut self, id: ActorId) -> bool {
        if id == self.root {
            log::warn!("free: the root actor is freed with its scene");
            return false;
        }
        if !self.contains(id) {
            log::warn!("free: actor {id:?} has already been freed");
            return false;
        }
        self.free_node(id);
        true
    }

    fn free_node(&mut self, id: ActorId) {
        self.with_delegate(id, |d, cx| d.free(cx));
        let behaviours = self.actors.get(id).map_or(0, |n| n.behaviours.len());
        for i in 0..behaviours {
            self.with_behaviour_slot(id, i, false, |b, cx| b.free(cx));
        }

        let children = self.actors.get(id).map(|n| n.children.clone()).unwrap_or_default();
        for child in children {
            if self.contains(child) {
                self.free_node(child);
            }
        }

        let Some(node) = self.actors.get_mut(id) else {
            return;
        };
        if let Some(target) = node.cache.target.take() {
            self.context.release_target(target);
        }
        let transitions = std::mem::take(&mut node.transitions);
        self.detach(id);
        for anim in transitions {
            self.animation_owners.remove(&anim);
            if self.runner.is_running(anim) {
                self.runner.remove(anim);
            }
        }
        self.prune_finished();
        for slot in [&mut self.hovered, &mut self.selected, &mut self.grabbed] {
            if *slot == Some(id) {
                *slot = None;
            }
        }
        self.actors.remove(id);
        log::debug!("actor {id:?} freed");
    }

    /// First actor named `name` in depth-first order, starting at `from`.
    pub fn find_by_name(&self, from: ActorId, name: &str) -> Option<ActorId> {
        self.find(from, &|n| n.name.as_deref() == Some(name))
    }

    /// First actor with the given z in depth-first order, starting at `from`.
    pub fn find_by_z(&self, from: ActorId, z: i32) -> Option<ActorId> {
        self.find(from, &|n| n.z == z)
    }

    fn find(&self, id: ActorId, pred: &dyn Fn(&ActorNode) -> bool) -> Option<ActorId> {
        let node = self.actors.get(id)?;
        if pred(node) {
            return Some(id);
        }
        node.children.iter().find_map(|c| self.find(*c, pred))
    }

    /// Absolute position of the actor's region origin.
    pub fn find_offset(&self, id: ActorId) -> [f32; 2] {
        let mut offset = [0.0, 0.0];
        let mut current = Some(id);
        while let Some(c) = current {
            let Some(node) = self.actors.get(c) else {
                break;
            };
            offset[0] += node.region.x1;
            offset[1] += node.region.y1;
            if c != id {
                let scroll = node.scroll_offset();
                offset[0] -= scroll[0];
                offset[1] -= scroll[1];
            }
            current = node.parent;
        }
        offset
    }

    /// Absolute position of the space `id`'s children are placed in.
    pub fn content_origin(&self, id: ActorId) -> [f32; 2] {
        let offset = self.find_offset(id);
        let scroll = self.actors.get(id).map_or([0.0, 0.0], |n| n.scroll_offset());
        [offset[0] - scroll[0], offset[1] - scroll[1]]
    }

    // --- hooks ------------------------------------------------------------

    /// Run `f` on the actor's delegate, which is detached from the node
    /// for the duration of the call.
    pub(crate) fn with_delegate<R>(
        &mut self,
        id: ActorId,
        f: impl FnOnce(&mut dyn ActorDelegate, &mut ActorCx<'_>) -> R,
    ) -> Option<R> {
        let mut delegate = self.actors.get_mut(id)?.delegate.take()?;
        let result = {
            let mut cx = ActorCx::new(self, id);
            f(delegate.as_mut(), &mut cx)
        };
        if let Some(node) = self.actors.get_mut(id) {
            node.delegate = Some(delegate);
        }
        Some(result)
    }

    /// Run `f` on one behaviour, initialising it first if `init` is set and
    /// it has not been used yet.
    pub(crate) fn with_behaviour_slot<R>(
        &mut self,
        id: ActorId,
        index: usize,
        init: bool,
        f: impl FnOnce(&mut dyn Behaviour, &mut ActorCx<'_>) -> R,
    ) -> Option<R> {
        let slot = self.actors.get_mut(id)?.behaviours.get_mut(index)?;
        let mut behaviour = slot.behaviour.take()?;
        let needs_init = init && !slot.initialised;
        slot.initialised |= needs_init;
        let result = {
            let mut cx = ActorCx::new(self, id);
            if needs_init {
                behaviour.init(&mut cx);
            }
            f(behaviour.as_mut(), &mut cx)
        };
        if let Some(slot) = self.actors.get_mut(id).and_then(|n| n.behaviours.get_mut(index)) {
            slot.behaviour = Some(behaviour);
        }
        Some(result)
    }

    pub(crate) fn behaviour_count(&self, id: ActorId) -> usize {
        self.actors.get(id).map_or(0, |n| n.behaviours.len())
    }

    /// Attach a behaviour after creation. It goes last in priority order.
    pub fn add_behaviour(&mut self, id: ActorId, behaviour: impl Behaviour + 'static) -> bool {
        let Some(node) = self.node_mut(id, "add_behaviour") else {
            return false;
        };
        node.behaviours
            .push(crate::behaviour::BehaviourSlot::new(Box::new(behaviour)));
        true
    }

    /// The actor's first behaviour of type `B`.
    pub fn find_behaviour<B: Behaviour>(&self, id: ActorId) -> Option<&B> {
        self.actors.get(id)?.behaviours.iter().find_map(|slot| {
            slot.behaviour
                .as_ref()
                .and_then(|b| b.as_any().downcast_ref::<B>())
        })
    }

    /// Run `f` with the actor's first behaviour of type `B` and a context
    /// for the actor.
    pub fn with_behaviour<B: Behaviour, R>(
        &mut self,
        id: ActorId,
        f: impl FnOnce(&mut B, &mut ActorCx<'_>) -> R,
    ) -> Option<R> {
        let index = self.actors.get(id)?.behaviours.iter().position(|slot| {
            slot.behaviour
                .as_ref()
                .is_some_and(|b| b.as_any().is::<B>())
        })?;
        self.with_behaviour_slot(id, index, true, |b, cx| {
            b.as_any_mut().downcast_mut::<B>().map(|b| f(b, cx))
        })
        .flatten()
    }

    // --- invalidation -----------------------------------------------------

    /// Mark the actor's cache and every ancestor's cache stale and request a
    /// redraw. Nothing is rendered until the next [`draw`](Self::draw).
    pub fn invalidate(&mut self, id: ActorId) {
        if !self.contains(id) {
            log::warn!("invalidate: actor {id:?} has been freed");
            return;
        }
        let mut current = Some(id);
        while let Some(c) = current {
            let Some(node) = self.actors.get_mut(c) else {
                break;
            };
            node.cache.valid = false;
            current = node.parent;
        }
        self.with_delegate(id, |d, cx| d.invalidate(cx));
        self.request_redraw();
    }

    /// [`invalidate`](Self::invalidate) plus every descendant's cache.
    pub fn invalidate_down(&mut self, id: ActorId) {
        let mut stack = vec![id];
        while let Some(c) = stack.pop() {
            if let Some(node) = self.actors.get_mut(c) {
                node.cache.valid = false;
                stack.extend_from_slice(&node.children);
            }
        }
        self.invalidate(id);
    }

    fn invalidate_ancestors(&mut self, id: ActorId) {
        let mut current = self.parent(id);
        while let Some(c) = current {
            let Some(node) = self.actors.get_mut(c) else {
                break;
            };
            node.cache.valid = false;
            current = node.parent;
        }
        self.request_redraw();
    }

    /// Ask the application for a redraw. Requests coalesce until the next
    /// [`draw`](Self::draw) starts.
    pub fn request_redraw(&mut self) {
        if self.redraw_pending {
            return;
        }
        self.redraw_pending = true;
        if let Some(callback) = self.draw_callback.as_mut() {
            callback();
        }
    }

    /// Called when the scene needs a redraw, at most once per frame.
    pub fn set_draw_callback(&mut self, callback: impl FnMut() + 'static) {
        self.draw_callback = Some(Box::new(callback));
    }

    pub fn needs_redraw(&self) -> bool {
        self.redraw_pending
    }

    // --- actor properties -------------------------------------------------

    pub fn set_name(&mut self, id: ActorId, name: impl Into<String>) {
        if let Some(node) = self.node_mut(id, "set_name") {
            node.name = Some(name.into());
        }
    }

    /// Move or resize an actor. A size change runs `set_size` on the actor
    /// and its descendants.
    pub fn set_region(&mut self, id: ActorId, region: Region) {
        let Some(node) = self.node_mut(id, "set_region") else {
            return;
        };
        if node.region == region {
            return;
        }
        let resized =
            node.region.width() != region.width() || node.region.height() != region.height();
        node.region = region;
        if resized && node.lifecycle >= Lifecycle::Initialized {
            self.resize_subtree(id);
        }
        self.invalidate(id);
    }

    /// Scroll viewport in content coordinates; children are clipped to the
    /// region and shifted by the viewport's origin.
    pub fn set_scrollable(&mut self, id: ActorId, viewport: Option<IRegion>) {
        if let Some(node) = self.node_mut(id, "set_scrollable") {
            node.scrollable = viewport;
            self.invalidate(id);
        }
    }

    pub fn set_disabled(&mut self, id: ActorId, disabled: bool) {
        if let Some(node) = self.node_mut(id, "set_disabled") {
            if node.disabled != disabled {
                node.disabled = disabled;
                // Cached descendants hold pixels rendered with the old dim state.
                self.invalidate_down(id);
            }
        }
    }

    /// Disabled itself or through an ancestor.
    pub fn is_disabled(&self, id: ActorId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            match self.actors.get(c) {
                Some(node) if node.disabled => return true,
                Some(node) => current = node.parent,
                None => return false,
            }
        }
        false
    }

    /// Turning the cache off releases the target and invalidates, so stale
    /// pixels are never shown.
    pub fn set_cache_enabled(&mut self, id: ActorId, enabled: bool) {
        let Some(node) = self.actors.get_mut(id) else {
            log::warn!("set_cache_enabled: actor {id:?} has been freed");
            return;
        };
        if node.cache.enabled == enabled {
            return;
        }
        node.cache.enabled = enabled;
        node.cache.valid = false;
        if !enabled {
            if let Some(target) = node.cache.target.take() {
                self.context.release_target(target);
            }
        }
        self.invalidate(id);
    }

    /// Shift where the cached content is drawn without re-rendering it.
    pub fn set_cache_offset(&mut self, id: ActorId, offset: [f32; 2]) {
        if let Some(node) = self.node_mut(id, "set_cache_offset") {
            node.cache.offset = offset;
            self.invalidate_ancestors(id);
        }
    }

    /// Where in the target the content origin is rendered.
    pub fn set_cache_position(&mut self, id: ActorId, position: [f32; 2]) {
        if let Some(node) = self.node_mut(id, "set_cache_position") {
            node.cache.position = position;
            self.invalidate(id);
        }
    }

    pub fn set_cache_size_request(&mut self, id: ActorId, width: u32, height: u32) {
        if let Some(node) = self.node_mut(id, "set_cache_size_request") {
            node.cache.size_request = [width, height];
            self.invalidate(id);
        }
    }

    pub fn set_z(&mut self, id: ActorId, z: i32) {
        if let Some(node) = self.node_mut(id, "set_z") {
            node.z = z;
            self.invalidate(id);
        }
    }

    pub fn set_colour(&mut self, id: ActorId, colour: u32) {
        if let Some(node) = self.node_mut(id, "set_colour") {
            node.colour = colour;
            self.invalidate(id);
        }
    }

    pub fn set_program(&mut self, id: ActorId, program: Option<ProgramId>) {
        if let Some(node) = self.node_mut(id, "set_program") {
            node.program = program;
            self.invalidate(id);
        }
    }

    /// Resize the root to the window size.
    pub fn set_size(&mut self, width: u32, height: u32) {
        let root = self.root;
        self.actors[root].region = Region::sized(width as f32, height as f32);
        self.resize_subtree(root);
        self.invalidate_down(root);
    }

    fn resize_subtree(&mut self, id: ActorId) {
        let Some(lifecycle) = self.actors.get(id).map(|n| n.lifecycle) else {
            return;
        };
        if lifecycle >= Lifecycle::Initialized {
            self.size_actor(id);
        }
        for child in self.children(id).to_vec() {
            self.resize_subtree(child);
        }
    }

    fn size_actor(&mut self, id: ActorId) {
        self.with_delegate(id, |d, cx| d.set_size(cx));
        for i in 0..self.behaviour_count(id) {
            self.with_behaviour_slot(id, i, true, |b, cx| b.layout(cx));
        }
        if let Some(node) = self.actors.get_mut(id) {
            node.lifecycle = Lifecycle::Sized;
        }
    }

    // --- interaction state ------------------------------------------------

    pub fn hovered(&self) -> Option<ActorId> {
        self.hovered
    }

    pub fn selected(&self) -> Option<ActorId> {
        self.selected
    }

    pub fn set_selected(&mut self, id: Option<ActorId>) {
        self.selected = id;
    }

    pub fn grabbed(&self) -> Option<ActorId> {
        self.grabbed
    }

    /// Send every following input event to `id`, bypassing hit testing,
    /// until called again with `None`. Overwrites any earlier grab.
    pub fn grab(&mut self, id: Option<ActorId>) {
        log::debug!("grab {:?} -> {:?}", self.grabbed, id);
        self.grabbed = id;
    }

    // --- drawing ----------------------------------------------------------

    /// Bind the render context. Nested calls are tracked and warned about;
    /// only the outermost pair binds and releases the context.
    pub fn begin_draw(&mut self) -> Result<()> {
        self.draw_depth += 1;
        if self.draw_depth > 1 {
            log::warn!("nested draw (depth {})", self.draw_depth);
            return Ok(());
        }
        if let Err(e) = self.context.make_current() {
            self.draw_depth -= 1;
            return Err(e.into());
        }
        Ok(())
    }

    pub fn end_draw(&mut self) {
        match self.draw_depth {
            0 => log::warn!("end_draw without begin_draw"),
            1 => {
                self.draw_depth = 0;
                self.context.clear_current();
            }
            _ => self.draw_depth -= 1,
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.draw_depth > 0
    }

    /// Render one frame and present it.
    pub fn draw(&mut self) -> Result<()> {
        // Held until layout has run: changes made while preparing this frame
        // are painted by it and must not request another one.
        self.redraw_pending = true;
        self.begin_draw()?;
        let result = self.draw_frame();
        self.end_draw();
        result
    }

    fn draw_frame(&mut self) -> Result<()> {
        let root = self.root;
        self.realize(root);
        self.layout_pass(root);
        self.redraw_pending = false;

        let region = self.actors[root].region;
        let viewport = Viewport {
            width: region.width().max(0.0) as u32,
            height: region.height().max(0.0) as u32,
        };
        let mut painter = Painter::begin_frame(viewport);
        painter.clear(Color::from_rgba_u32(self.background));
        self.paint_actor(root, &mut painter);
        self.context.present(&painter.finish())?;
        self.frames += 1;
        Ok(())
    }

    /// Bring unrealized actors up to `Sized`.
    fn realize(&mut self, id: ActorId) {
        let Some(lifecycle) = self.actors.get(id).map(|n| n.lifecycle) else {
            return;
        };
        if lifecycle == Lifecycle::Unrealized {
            self.with_delegate(id, |d, cx| d.init(cx));
            if let Some(node) = self.actors.get_mut(id) {
                node.lifecycle = Lifecycle::Initialized;
            }
            log::debug!("actor {id:?} initialised");
        }
        if lifecycle < Lifecycle::Sized {
            self.size_actor(id);
        }
        for child in self.children(id).to_vec() {
            self.realize(child);
        }
    }

    fn layout_pass(&mut self, id: ActorId) {
        for i in 0..self.behaviour_count(id) {
            self.with_behaviour_slot(id, i, true, |b, cx| b.layout(cx));
        }
        for child in self.children(id).to_vec() {
            self.layout_pass(child);
        }
    }

    fn paint_actor(&mut self, id: ActorId, painter: &mut Painter) {
        let Some(node) = self.actors.get(id) else {
            return;
        };
        let region = node.region;
        if id != self.root && !region.has_area() {
            return;
        }
        let disabled = node.disabled;
        let cached = node.cache.enabled;

        painter.push_transform(Transform2D::translate(region.x1, region.y1));
        if disabled {
            painter.push_dim();
        }
        if cached {
            self.paint_cached(id, region, painter);
        } else {
            self.render_contents(id, region, painter);
        }
        if disabled {
            painter.pop_dim();
        }
        painter.pop_transform();
    }

    /// Blit the actor's cache, re-rendering it first on a miss.
    fn paint_cached(&mut self, id: ActorId, region: Region, painter: &mut Painter) {
        let Some(node) = self.actors.get_mut(id) else {
            return;
        };
        if !node.cache.valid {
            let (width, height) = node.cache.wanted_size(&region);
            let reusable = node
                .cache
                .target
                .filter(|t| t.width == width && t.height == height);
            let target = match reusable {
                Some(target) => target,
                None => {
                    if let Some(old) = node.cache.target.take() {
                        self.context.release_target(old);
                    }
                    match self.context.create_target(width, height) {
                        Ok(target) => {
                            node.cache.target = Some(target);
                            target
                        }
                        Err(e) => {
                            log::warn!(
                                "actor {id:?} ({}) not rendered this frame: {e}",
                                node.name.as_deref().unwrap_or("unnamed")
                            );
                            return;
                        }
                    }
                }
            };
            // Set before rendering so an invalidation from a paint hook sticks.
            node.cache.valid = true;
            let position = node.cache.position;
            painter.begin_target(&target);
            painter.push_transform(Transform2D::translate(position[0], position[1]));
            self.render_contents(id, region, painter);
            painter.pop_transform();
            painter.end_target();
        }

        let Some(node) = self.actors.get(id) else {
            return;
        };
        let Some(target) = node.cache.target else {
            return;
        };
        let [px, py] = node.cache.position;
        let [ox, oy] = node.cache.offset;
        painter.draw_target(
            &target,
            Rect::new(0.0, 0.0, region.width(), region.height()),
            [px - ox, py - oy],
        );
    }

    /// `set_state`, behaviour `draw`, `paint`, then the children by z.
    fn render_contents(&mut self, id: ActorId, region: Region, painter: &mut Painter) {
        self.with_delegate(id, |d, cx| d.set_state(cx));
        let program = self.actors.get(id).and_then(|n| n.program);
        if program.is_some() {
            painter.use_program(program);
        }

        let mut paint = true;
        for i in 0..self.behaviour_count(id) {
            if self.with_behaviour_slot(id, i, true, |b, cx| b.draw(cx, painter)) == Some(false) {
                paint = false;
                break;
            }
        }
        if paint {
            self.with_delegate(id, |d, cx| d.paint(cx, painter));
        }
        if program.is_some() {
            painter.use_program(None);
        }

        let Some(node) = self.actors.get(id) else {
            return;
        };
        let scroll = node.scrollable;
        let mut children = node.children.clone();
        children.sort_by_key(|c| self.actors.get(*c).map_or(0, |n| n.z));

        if let Some(s) = scroll {
            painter.push_clip_rect(Rect::new(0.0, 0.0, region.width(), region.height()));
            painter.push_transform(Transform2D::translate(-(s.x1 as f32), -(s.y1 as f32)));
        }
        for child in children {
            self.paint_actor(child, painter);
        }
        if scroll.is_some() {
            painter.pop_transform();
            painter.pop_clip();
        }
    }

    // --- animation --------------------------------------------------------

    pub fn animations(&self) -> &AnimationRunner {
        &self.runner
    }

    pub fn animations_mut(&mut self) -> &mut AnimationRunner {
        &mut self.runner
    }

    pub fn animations_enabled(&self) -> bool {
        self.animations_enabled
    }

    pub fn set_animations_enabled(&mut self, enabled: bool) {
        self.animations_enabled = enabled;
    }

    /// Animate `animatables` from their start to their target values on
    /// behalf of `actor`, which is invalidated on every frame.
    ///
    /// With animations disabled the values jump to their targets and
    /// `on_finish` runs before this returns. Returns the started animation.
    pub fn animate(
        &mut self,
        actor: ActorId,
        animatables: &[Animatable],
        on_finish: impl FnOnce() + 'static,
    ) -> Option<AnimationId> {
        if !self.animations_enabled {
            for a in animatables {
                a.set(a.target());
            }
            if self.contains(actor) {
                self.invalidate(actor);
            }
            on_finish();
            return None;
        }

        let id = self.runner.new_animation(Some(Box::new(move |_| on_finish())));
        self.runner.add_member(id, animatables);
        self.prune_finished();
        if !self.runner.start(id) {
            return None;
        }
        match self.actors.get_mut(actor) {
            Some(node) => {
                node.transitions.push(id);
                self.animation_owners.insert(id, actor);
            }
            None => log::warn!("animate: actor {actor:?} has been freed, frames will not redraw"),
        }
        Some(id)
    }

    /// Advance running animations and invalidate the actors they belong to.
    pub fn tick(&mut self) -> TickReport {
        let report = self.runner.tick();
        for id in &report.framed {
            if let Some(&actor) = self.animation_owners.get(id) {
                if self.contains(actor) {
                    self.invalidate(actor);
                }
            }
        }
        self.prune_finished();
        report
    }

    fn prune_finished(&mut self) {
        for id in self.runner.drain_finished() {
            if let Some(actor) = self.animation_owners.remove(&id) {
                if let Some(node) = self.actors.get_mut(actor) {
                    node.transitions.retain(|t| *t != id);
                }
            }
        }
    }

    // --- idle -------------------------------------------------------------

    pub fn idle_handle(&self) -> IdleHandle {
        self.idle.clone()
    }

    /// Schedule the actor's behaviours' `idle` hooks for the next
    /// [`run_idle`](Self::run_idle).
    pub fn queue_idle(&mut self, id: ActorId) {
        self.idle.queue(id);
    }

    pub fn has_idle_work(&self) -> bool {
        !self.idle.is_empty()
    }

    /// Run queued idle work. Work queued meanwhile waits for the next call.
    /// Returns the number of actors processed.
    pub fn run_idle(&mut self) -> usize {
        let queued = self.idle.take();
        for &id in &queued {
            for i in 0..self.behaviour_count(id) {
                self.with_behaviour_slot(id, i, true, |b, cx| b.idle(cx));
            }
        }
        queued.len()
    }

    // --- debugging --------------------------------------------------------

    /// Indented dump of the attached tree.
    pub fn tree_string(&self) -> String {
        let mut out = String::new();
        self.write_tree(self.root, 0, &mut out);
        out
    }

    fn write_tree(&self, id: ActorId, depth: usize, out: &mut String) {
        let Some(node) = self.actors.get(id) else {
            return;
        };
        let r = node.region;
        let cache = match (node.cache.enabled, node.cache.valid) {
            (false, _) => "",
            (true, true) => " cache=valid",
            (true, false) => " cache=stale",
        };
        let _ = writeln!(
            out,
            "{:indent$}{} ({}, {} {}x{}) z={}{}{}",
            "",
            node.name.as_deref().unwrap_or("unnamed"),
            r.x1,
            r.y1,
            r.width(),
            r.height(),
            node.z,
            cache,
            if node.disabled { " disabled" } else { "" },
            indent = depth * 2,
        );
        for child in &node.children {
            self.write_tree(*child, depth + 1, out);
        }
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        for child in self.children(self.root).to_vec() {
            if self.contains(child) {
                self.free_node(child);
            }
        }
        // Detached actors are dropped with the arena; their targets still go back.
        let targets: Vec<_> = self
            .actors
            .values_mut()
            .filter_map(|n| n.cache.target.take())
            .collect();
        for target in targets {
            self.context.release_target(target);
        }
    }
}
