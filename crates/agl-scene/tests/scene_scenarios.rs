//! End-to-end scene behaviour against the software render context.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use agl_config::AglConfig;
use agl_core::{Color, IRegion, Rect, SoftwareContext, SoftwareHandle};
use agl_scene::behaviour::{Follow, Hover, Invalidator, Key, KeyBinding, Resolver, Selectable};
use agl_scene::{
    Actor, ActorCx, ActorEvent, Animatable, EventResult, FnDelegate, InputEvent, ManualClock,
    Observable, Scene,
};
use winit::keyboard::{KeyCode, ModifiersState};

const BLACK: u32 = 0x000000ff;
const RED: u32 = 0xff0000ff;
const GREEN: u32 = 0x00ff00ff;
const BLUE: u32 = 0x0000ffff;

fn scene(width: u32, height: u32) -> (Scene, SoftwareHandle) {
    let _ = env_logger::builder().is_test(true).try_init();
    let ctx = SoftwareContext::new();
    let handle = ctx.handle();
    (Scene::new(ctx, width, height), handle)
}

fn animated_scene() -> (Scene, ManualClock) {
    let clock = ManualClock::new();
    let scene = Scene::with_config(SoftwareContext::new(), &AglConfig::default(), clock.clone());
    (scene, clock)
}

fn rgba(c: u32) -> [u8; 4] {
    c.to_be_bytes()
}

/// Actor that counts how often it is painted, filling its region with `colour`.
fn counted(colour: u32, paints: &Rc<Cell<usize>>) -> Actor {
    let paints = paints.clone();
    Actor::new(FnDelegate::new().on_paint(move |cx, painter| {
        paints.set(paints.get() + 1);
        let r = cx.region();
        painter.fill_rect(Rect::new(0.0, 0.0, r.width(), r.height()), Color::from_rgba_u32(colour));
    }))
}

fn resolver(f: impl FnMut(&mut ActorCx<'_>) -> bool + 'static) -> Resolver {
    Box::new(f)
}

fn build_panel(s: &mut Scene, cache: bool) {
    let root = s.root();
    let panel = s.add(root, Actor::fill(RED).at(10.0, 10.0, 60.0, 60.0).cache(cache)).unwrap();
    s.add(panel, Actor::fill(BLUE).at(5.0, 5.0, 20.0, 20.0).z(1).cache(cache)).unwrap();
    s.add(panel, Actor::fill(GREEN).at(10.0, 10.0, 30.0, 30.0)).unwrap();
}

#[test]
fn test_cached_output_matches_direct_rendering() {
    let (mut direct, direct_px) = scene(80, 80);
    let (mut cached, cached_px) = scene(80, 80);
    build_panel(&mut direct, false);
    build_panel(&mut cached, true);

    direct.draw().unwrap();
    cached.draw().unwrap();
    assert_eq!(direct_px.pixels(), cached_px.pixels());
    // Drawn again from the caches.
    cached.draw().unwrap();
    assert_eq!(direct_px.pixels(), cached_px.pixels());

    // The blue child has the higher z and paints over green.
    assert_eq!(cached_px.pixel(27, 27), Some(rgba(BLUE)));
    assert_eq!(cached_px.pixel(38, 38), Some(rgba(GREEN)));
    assert_eq!(cached_px.pixel(12, 12), Some(rgba(RED)));
    assert_eq!(cached_px.pixel(70, 70), Some(rgba(BLACK)));
}

#[test]
fn test_valid_cache_skips_repaint() {
    let (mut s, px) = scene(50, 50);
    let root = s.root();
    let paints = Rc::new(Cell::new(0));
    let sibling_paints = Rc::new(Cell::new(0));
    let cached = s.add(root, counted(RED, &paints).at(0.0, 0.0, 20.0, 20.0).cache(true)).unwrap();
    let sibling = s.add(root, counted(BLUE, &sibling_paints).at(25.0, 0.0, 45.0, 20.0)).unwrap();

    s.draw().unwrap();
    s.draw().unwrap();
    assert_eq!(paints.get(), 1);
    assert_eq!(sibling_paints.get(), 2);

    s.invalidate(sibling);
    s.draw().unwrap();
    assert_eq!(paints.get(), 1);

    s.invalidate(cached);
    s.draw().unwrap();
    assert_eq!(paints.get(), 2);
    assert_eq!(px.pixel(5, 5), Some(rgba(RED)));
}

#[test]
fn test_cache_offset_pans_without_repaint() {
    let (mut s, px) = scene(40, 40);
    let root = s.root();
    let paints = Rc::new(Cell::new(0));
    let p = paints.clone();
    let strip = s
        .add(
            root,
            Actor::new(FnDelegate::new().on_paint(move |_, painter| {
                p.set(p.get() + 1);
                painter.fill_rect(Rect::new(0.0, 0.0, 10.0, 20.0), Color::from_rgba_u32(RED));
                painter.fill_rect(Rect::new(10.0, 0.0, 10.0, 20.0), Color::from_rgba_u32(BLUE));
            }))
            .at(0.0, 0.0, 20.0, 20.0)
            .cache(true),
        )
        .unwrap();

    s.draw().unwrap();
    assert_eq!(px.pixel(6, 5), Some(rgba(RED)));

    s.set_cache_offset(strip, [-5.0, 0.0]);
    assert!(s.actor(strip).unwrap().cache().valid);
    assert!(s.needs_redraw());
    s.draw().unwrap();
    assert_eq!(px.pixel(6, 5), Some(rgba(BLUE)));
    assert_eq!(paints.get(), 1);
}

#[test]
fn test_failed_allocation_skips_actor_for_the_frame() {
    let (mut s, px) = scene(40, 40);
    let root = s.root();
    let cached = s.add(root, Actor::fill(RED).at(0.0, 0.0, 10.0, 10.0).cache(true)).unwrap();
    s.add(root, Actor::fill(BLUE).at(20.0, 20.0, 30.0, 30.0)).unwrap();

    px.set_fail_allocations(true);
    s.draw().unwrap();
    assert_eq!(px.pixel(5, 5), Some(rgba(BLACK)));
    assert_eq!(px.pixel(25, 25), Some(rgba(BLUE)));
    assert!(!s.actor(cached).unwrap().cache().valid);

    px.set_fail_allocations(false);
    s.draw().unwrap();
    assert_eq!(px.pixel(5, 5), Some(rgba(RED)));
    assert!(s.actor(cached).unwrap().cache().valid);
}

#[test]
fn test_cache_targets_follow_lifecycle() {
    let (mut s, px) = scene(40, 40);
    let root = s.root();
    let a = s.add(root, Actor::fill(RED).at(0.0, 0.0, 10.0, 10.0).cache(true)).unwrap();
    let b = s.add(a, Actor::fill(BLUE).at(0.0, 0.0, 5.0, 5.0).cache(true)).unwrap();
    s.draw().unwrap();
    assert_eq!(px.live_targets(), 2);

    // Growing the actor replaces its target.
    s.set_region(a, agl_core::Region::new(0.0, 0.0, 20.0, 20.0));
    s.draw().unwrap();
    assert_eq!(px.live_targets(), 2);
    assert_eq!(s.actor(a).unwrap().cache().target().map(|t| t.width), Some(20));

    s.set_cache_enabled(b, false);
    assert_eq!(px.live_targets(), 1);
    assert!(s.actor(b).unwrap().cache().target().is_none());

    s.free(a);
    assert_eq!(px.live_targets(), 0);
}

#[test]
fn test_free_releases_whole_subtree() {
    let (mut s, _) = scene(40, 40);
    let root = s.root();
    let freed = Rc::new(Cell::new(0));
    let counting = |freed: &Rc<Cell<usize>>| {
        let freed = freed.clone();
        Actor::new(FnDelegate::new().on_free(move |_| freed.set(freed.get() + 1)))
    };
    let a = s.add(root, counting(&freed)).unwrap();
    let b = s.add(a, counting(&freed)).unwrap();
    s.add(b, counting(&freed)).unwrap();
    s.add(root, counting(&freed)).unwrap();
    assert_eq!(s.len(), 5);

    assert!(s.free(a));
    assert_eq!(freed.get(), 3);
    assert_eq!(s.len(), 2);
    assert!(!s.contains(b));
    assert_eq!(s.children(root).len(), 1);
}

#[test]
fn test_remove_child_detaches_without_freeing() {
    let (mut s, _) = scene(40, 40);
    let root = s.root();
    let freed = Rc::new(Cell::new(false));
    let f = freed.clone();
    let a = s.add(root, Actor::new(FnDelegate::new().on_free(move |_| f.set(true)))).unwrap();
    let other = s.add(root, Actor::group()).unwrap();

    assert!(s.remove_child(root, a));
    assert!(!freed.get());
    assert!(s.contains(a));
    assert!(!s.is_attached(a));
    assert!(!s.remove_child(root, a));

    s.add_child(other, a).unwrap();
    assert_eq!(s.parent(a), Some(other));
    s.free(a);
    assert!(freed.get());
}

#[test]
fn test_simple_hit_test() {
    let (mut s, _) = scene(100, 100);
    let root = s.root();
    let a = s.add(root, Actor::group().at(0.0, 0.0, 10.0, 10.0)).unwrap();
    let b = s.add(root, Actor::group().at(20.0, 20.0, 30.0, 30.0)).unwrap();
    assert_eq!(s.hit_test([5.0, 5.0]), Some(a));
    assert_eq!(s.hit_test([25.0, 25.0]), Some(b));
    assert_eq!(s.hit_test([15.0, 15.0]), Some(root));
}

#[test]
fn test_grab_receives_all_pointer_events() {
    let (mut s, _) = scene(100, 100);
    let root = s.root();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let slider = s
        .add(
            root,
            Actor::new(FnDelegate::new().on_event(move |cx, ev| {
                log.borrow_mut().push(*ev);
                let id = cx.id();
                match ev {
                    ActorEvent::ButtonPress { .. } => cx.scene.grab(Some(id)),
                    ActorEvent::ButtonRelease { .. } => cx.scene.grab(None),
                    _ => {}
                }
                EventResult::Handled
            }))
            .at(0.0, 0.0, 10.0, 10.0),
        )
        .unwrap();
    let other = s.add(root, Actor::group().at(50.0, 50.0, 60.0, 60.0)).unwrap();

    s.dispatch(&InputEvent::press(5.0, 5.0));
    assert_eq!(s.grabbed(), Some(slider));

    let d = s.dispatch(&InputEvent::motion(55.0, 55.0));
    assert_eq!(d.target, slider);
    assert_eq!(d.handled_by, Some(slider));
    assert_eq!(s.hovered(), Some(slider));
    assert!(matches!(seen.borrow().last(), Some(ActorEvent::Motion { x, .. }) if *x == 55.0));

    s.dispatch(&InputEvent::release(55.0, 55.0));
    assert_eq!(s.grabbed(), None);
    assert_eq!(s.dispatch(&InputEvent::motion(55.0, 55.0)).target, other);
}

#[test]
fn test_disabled_actor_is_dimmed_and_inert() {
    let (mut s, px) = scene(40, 40);
    let root = s.root();
    let clicks = Rc::new(Cell::new(0));
    let c = clicks.clone();
    let a = s
        .add(
            root,
            Actor::new(FnDelegate::new().on_event(move |_, _| {
                c.set(c.get() + 1);
                EventResult::Handled
            }))
            .at(0.0, 0.0, 10.0, 10.0),
        )
        .unwrap();
    let fill = s.add(a, Actor::fill(RED).at(0.0, 0.0, 10.0, 10.0)).unwrap();
    s.set_disabled(a, true);
    s.draw().unwrap();

    let [r, g, b, _] = px.pixel(5, 5).unwrap();
    assert!(r > 0 && r < 255);
    assert_eq!((r, r), (g, b));

    s.dispatch(&InputEvent::press(5.0, 5.0));
    assert_eq!(clicks.get(), 0);
    assert_eq!(s.hit_test([5.0, 5.0]), Some(root));
    assert!(s.is_disabled(fill));
}

fn close(a: Option<[u8; 4]>, b: Option<[u8; 4]>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 2),
        _ => false,
    }
}

#[test]
fn test_disabled_cached_actor_matches_direct() {
    let (mut direct, direct_px) = scene(20, 20);
    let (mut cached, cached_px) = scene(20, 20);
    for (s, cache) in [(&mut direct, false), (&mut cached, true)] {
        let root = s.root();
        let a = s.add(root, Actor::fill(RED).at(0.0, 0.0, 10.0, 10.0).cache(cache)).unwrap();
        s.set_disabled(a, true);
        s.draw().unwrap();
    }
    let [r, g, b, _] = direct_px.pixel(5, 5).unwrap();
    assert_eq!((r, r), (g, b));
    assert!(close(direct_px.pixel(5, 5), cached_px.pixel(5, 5)));

    // A cache hit keeps the dimmed pixels.
    cached.draw().unwrap();
    assert!(close(direct_px.pixel(5, 5), cached_px.pixel(5, 5)));
}

#[test]
fn test_disabling_ancestor_refreshes_cached_child() {
    let (mut s, px) = scene(20, 20);
    let root = s.root();
    let panel = s.add(root, Actor::group().at(0.0, 0.0, 20.0, 20.0)).unwrap();
    let child = s.add(panel, Actor::fill(RED).at(0.0, 0.0, 10.0, 10.0).cache(true)).unwrap();
    s.draw().unwrap();
    assert_eq!(px.pixel(5, 5), Some(rgba(RED)));

    s.set_disabled(panel, true);
    assert!(!s.actor(child).unwrap().cache().valid);
    s.draw().unwrap();
    let [r, g, b, _] = px.pixel(5, 5).unwrap();
    assert!(r < 255);
    assert_eq!((r, r), (g, b));

    s.set_disabled(panel, false);
    s.draw().unwrap();
    assert_eq!(px.pixel(5, 5), Some(rgba(RED)));
}

#[test]
fn test_grab_receives_key_events() {
    let (mut s, _) = scene(40, 40);
    let root = s.root();
    let keys = Rc::new(Cell::new(0));
    let k = keys.clone();
    let grabber = s
        .add(
            root,
            Actor::new(FnDelegate::new().on_event(move |_, ev| match ev {
                ActorEvent::KeyPress { .. } => {
                    k.set(k.get() + 1);
                    EventResult::Handled
                }
                _ => EventResult::Ignored,
            }))
            .at(0.0, 0.0, 10.0, 10.0),
        )
        .unwrap();
    let picked = s.add(root, Actor::group().at(20.0, 20.0, 30.0, 30.0)).unwrap();
    s.set_selected(Some(picked));
    s.grab(Some(grabber));

    let d = s.dispatch(&InputEvent::key(KeyCode::Space, ModifiersState::empty()));
    assert_eq!(d.target, grabber);
    assert_eq!(keys.get(), 1);

    s.grab(None);
    let d = s.dispatch(&InputEvent::key(KeyCode::Space, ModifiersState::empty()));
    assert_eq!(d.target, picked);
    assert_eq!(keys.get(), 1);
}

#[test]
fn test_scrollable_clips_and_shifts_children() {
    let (mut s, px) = scene(80, 80);
    let root = s.root();
    let view = s
        .add(
            root,
            Actor::group().at(10.0, 10.0, 60.0, 60.0).scrollable(IRegion::new(100, 0, 150, 50)),
        )
        .unwrap();
    s.add(view, Actor::fill(RED).at(100.0, 0.0, 120.0, 20.0)).unwrap();
    s.add(view, Actor::fill(BLUE).at(140.0, 0.0, 200.0, 50.0)).unwrap();
    s.draw().unwrap();

    assert_eq!(px.pixel(15, 15), Some(rgba(RED)));
    assert_eq!(px.pixel(55, 15), Some(rgba(BLUE)));
    // Past the viewport edge.
    assert_eq!(px.pixel(65, 15), Some(rgba(BLACK)));

    s.set_scrollable(view, Some(IRegion::new(90, 0, 140, 50)));
    s.draw().unwrap();
    assert_eq!(px.pixel(15, 15), Some(rgba(BLACK)));
    assert_eq!(px.pixel(25, 15), Some(rgba(RED)));
}

#[test]
fn test_animation_interpolates_and_finishes() {
    let (mut s, clock) = animated_scene();
    let root = s.root();
    let bar = s.add(root, Actor::fill(RED).at(0.0, 0.0, 10.0, 10.0).cache(true)).unwrap();
    s.draw().unwrap();

    let width = Animatable::new(0);
    width.set_target(100);
    let finished = Rc::new(Cell::new(0));
    let f = finished.clone();
    let anim = s.animate(bar, &[width.clone()], move || f.set(f.get() + 1)).unwrap();
    assert_eq!(s.actor(bar).unwrap().transitions(), &[anim]);

    clock.advance(Duration::from_millis(150));
    let report = s.tick();
    assert_eq!(report.framed, vec![anim]);
    assert_eq!(width.get_i32(), 50);
    assert!(!s.actor(bar).unwrap().cache().valid);

    clock.advance(Duration::from_millis(150));
    s.tick();
    assert_eq!(width.get_i32(), 100);
    assert_eq!(finished.get(), 0);

    clock.advance(Duration::from_millis(20));
    let report = s.tick();
    assert_eq!(report.finished, vec![anim]);
    assert_eq!(finished.get(), 1);
    assert!(s.animations().is_empty());
    assert!(s.actor(bar).unwrap().transitions().is_empty());
}

#[test]
fn test_new_animation_steals_running_value() {
    let (mut s, clock) = animated_scene();
    let root = s.root();
    let a = s.add(root, Actor::group()).unwrap();
    let x = Animatable::new(0);
    x.set_target(100);

    let first_done = Rc::new(Cell::new(false));
    let f = first_done.clone();
    let first = s.animate(a, &[x.clone()], move || f.set(true)).unwrap();
    clock.advance(Duration::from_millis(150));
    s.tick();
    assert_eq!(x.get_i32(), 50);

    x.set_target(0);
    let second = s.animate(a, &[x.clone()], || {}).unwrap();
    assert!(first_done.get());
    assert!(!s.animations().is_running(first));
    assert_eq!(s.actor(a).unwrap().transitions(), &[second]);

    clock.advance(Duration::from_millis(150));
    s.tick();
    assert_eq!(x.get_i32(), 25);
}

#[test]
fn test_free_stops_running_animations() {
    let (mut s, _clock) = animated_scene();
    let root = s.root();
    let a = s.add(root, Actor::group()).unwrap();
    let x = Animatable::new(0.0f32);
    x.set_target(1.0f32);
    let done = Rc::new(Cell::new(false));
    let d = done.clone();
    s.animate(a, &[x.clone()], move || d.set(true)).unwrap();
    s.free(a);
    assert!(done.get());
    assert!(s.animations().is_empty());
}

#[test]
fn test_hover_behaviour_tracks_pointer() {
    let (mut s, _) = scene(40, 40);
    let root = s.root();
    let a = s.add(root, Actor::group().at(0.0, 0.0, 10.0, 10.0).behaviour(Hover::new())).unwrap();
    s.draw().unwrap();

    s.dispatch(&InputEvent::motion(5.0, 5.0));
    assert!(s.find_behaviour::<Hover>(a).unwrap().is_hovered());
    assert!(s.needs_redraw());
    s.dispatch(&InputEvent::motion(30.0, 30.0));
    assert!(!s.find_behaviour::<Hover>(a).unwrap().is_hovered());
}

#[test]
fn test_key_behaviour_consumes_bound_keys_only() {
    let (mut s, _) = scene(40, 40);
    let root = s.root();
    let presses = Rc::new(RefCell::new(Vec::new()));
    let p = presses.clone();
    let a = s
        .add(
            root,
            Actor::group().at(0.0, 0.0, 10.0, 10.0).behaviour(Key::new([KeyBinding::new(
                KeyCode::Delete,
                move |_, key, _| p.borrow_mut().push(key),
            )])),
        )
        .unwrap();
    s.set_selected(Some(a));

    let d = s.dispatch(&InputEvent::key(KeyCode::Delete, ModifiersState::empty()));
    assert_eq!(d.handled_by, Some(a));
    let d = s.dispatch(&InputEvent::key(KeyCode::KeyQ, ModifiersState::empty()));
    assert_eq!(d.handled_by, None);
    assert_eq!(*presses.borrow(), vec![KeyCode::Delete]);
    assert_eq!(s.find_behaviour::<Key>(a).unwrap().len(), 1);
}

#[test]
fn test_selectables_share_an_observable() {
    let (mut s, _) = scene(40, 40);
    let root = s.root();
    let selection = Observable::new(0, 0, 1);
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut ids = Vec::new();
    for index in 0..2 {
        let log = calls.clone();
        let x = index as f32 * 20.0;
        let behaviour = Selectable::new(selection.clone(), index)
            .on_select(move |_, value, is_self| log.borrow_mut().push((index, value, is_self)));
        let actor = Actor::group().at(x, 0.0, x + 10.0, 10.0).behaviour(behaviour);
        ids.push(s.add(root, actor).unwrap());
    }
    s.draw().unwrap();
    assert_eq!(selection.subscriber_count(), 2);

    s.dispatch(&InputEvent::press(25.0, 5.0));
    assert_eq!(s.selected(), Some(ids[1]));
    assert_eq!(selection.get(), 1);
    assert!(calls.borrow().is_empty());

    assert_eq!(s.run_idle(), 2);
    let mut seen = calls.borrow().clone();
    seen.sort();
    assert_eq!(seen, vec![(0, 1, false), (1, 1, true)]);

    s.free(ids[0]);
    assert_eq!(selection.subscriber_count(), 1);
}

#[test]
fn test_invalidator_resolves_in_order() {
    let (mut s, _) = scene(40, 40);
    let root = s.root();
    let ready = Rc::new(Cell::new(false));
    let order = Rc::new(RefCell::new(Vec::new()));
    let (o1, o2, r) = (order.clone(), order.clone(), ready.clone());
    let inv = Invalidator::new(vec![
        resolver(move |_| {
            o1.borrow_mut().push(0);
            r.get()
        }),
        resolver(move |_| {
            o2.borrow_mut().push(1);
            true
        }),
    ]);
    let a = s.add(root, Actor::group().behaviour(inv)).unwrap();

    s.with_behaviour::<Invalidator, _>(a, |inv, cx| {
        inv.invalidate(cx, 1);
        inv.invalidate(cx, 0);
    });
    assert!(s.has_idle_work());
    s.run_idle();
    // Bit 0 cannot resolve yet, so bit 1 waits.
    assert_eq!(*order.borrow(), vec![0]);
    assert!(s.find_behaviour::<Invalidator>(a).unwrap().is_dirty(1));

    ready.set(true);
    s.with_behaviour::<Invalidator, _>(a, |inv, cx| inv.invalidate(cx, 0));
    s.run_idle();
    assert_eq!(*order.borrow(), vec![0, 0, 1]);
    assert!(s.find_behaviour::<Invalidator>(a).unwrap().is_clean());
    assert!(!s.has_idle_work());
}

#[test]
fn test_follow_tracks_target_across_the_tree() {
    let (mut s, _) = scene(100, 100);
    let root = s.root();
    let panel = s.add(root, Actor::group().at(10.0, 10.0, 90.0, 90.0)).unwrap();
    let item = s.add(panel, Actor::group().at(20.0, 30.0, 40.0, 45.0)).unwrap();
    let overlay = s.add(root, Actor::group().at(0.0, 0.0, 50.0, 50.0)).unwrap();
    let follow = Follow::new(item).offset(2.0, 0.0).mirror_size(true);
    let marker = s.add(overlay, Actor::group().at(0.0, 0.0, 1.0, 1.0).behaviour(follow)).unwrap();
    s.set_region(overlay, agl_core::Region::new(5.0, 5.0, 55.0, 55.0));
    s.draw().unwrap();

    let r = s.region(marker).unwrap();
    assert_eq!((r.x1, r.y1, r.width(), r.height()), (27.0, 35.0, 20.0, 15.0));

    s.set_region(item, agl_core::Region::new(0.0, 0.0, 20.0, 15.0));
    s.draw().unwrap();
    assert_eq!(s.find_offset(marker), [12.0, 10.0]);
}

#[test]
fn test_follow_layout_does_not_request_another_frame() {
    let (mut s, _) = scene(100, 100);
    let requests = Rc::new(Cell::new(0));
    let r = requests.clone();
    s.set_draw_callback(move || r.set(r.get() + 1));
    let root = s.root();
    let item = s.add(root, Actor::fill(RED).at(10.0, 10.0, 30.0, 30.0)).unwrap();
    let marker = s
        .add(root, Actor::fill(BLUE).at(0.0, 0.0, 5.0, 5.0).behaviour(Follow::new(item)))
        .unwrap();
    s.draw().unwrap();
    requests.set(0);

    s.set_region(item, agl_core::Region::new(40.0, 40.0, 60.0, 60.0));
    assert_eq!(requests.get(), 1);
    s.draw().unwrap();
    assert_eq!(s.find_offset(marker), [40.0, 40.0]);
    assert_eq!(requests.get(), 1);
    assert!(!s.needs_redraw());
}

#[test]
fn test_redraw_requests_reach_the_application() {
    let (mut s, px) = scene(20, 20);
    let requests = Rc::new(Cell::new(0));
    let r = requests.clone();
    s.set_draw_callback(move || r.set(r.get() + 1));
    let root = s.root();
    let a = s.add(root, Actor::fill(RED).at(0.0, 0.0, 5.0, 5.0)).unwrap();
    s.set_colour(a, GREEN);
    assert_eq!(requests.get(), 1);
    s.draw().unwrap();
    assert!(!s.needs_redraw());
    assert_eq!(px.pixel(1, 1), Some(rgba(GREEN)));
    s.set_colour(a, BLUE);
    assert_eq!(requests.get(), 2);
}
