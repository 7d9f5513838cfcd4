use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::core::{Callback, Point};
use crate::engine::{Engine, FrameRequestId};
use crate::error::{BindingError, BindingResult};

use super::engine_scope::EngineLink;
use super::{Binding, EngineScope, Lifecycle};

pub type PointerCallback = Callback<dyn Fn(Option<Point>)>;

#[derive(Debug, Clone)]
pub struct MousePositionProps {
    /// Called with the graph-space pointer position whenever it changed
    /// since the previous frame.
    pub on_change: PointerCallback,
}

impl MousePositionProps {
    #[must_use]
    pub fn new(on_change: PointerCallback) -> Self {
        Self { on_change }
    }
}

struct FrameLoop {
    on_change: PointerCallback,
    last: Option<Point>,
    request: Option<FrameRequestId>,
    running: bool,
}

fn schedule<E: Engine>(frame_loop: &Rc<RefCell<FrameLoop>>, engine: &E, engine_ref: Weak<E>) {
    let weak_loop = Rc::downgrade(frame_loop);
    let request = engine.request_frame(Box::new(move || tick(&weak_loop, &engine_ref)));
    frame_loop.borrow_mut().request = Some(request);
}

fn tick<E: Engine>(frame_loop: &Weak<RefCell<FrameLoop>>, engine_ref: &Weak<E>) {
    let (Some(frame_loop), Some(engine)) = (frame_loop.upgrade(), engine_ref.upgrade()) else {
        return;
    };
    let changed = {
        let mut state = frame_loop.borrow_mut();
        state.request = None;
        if !state.running {
            return;
        }
        let position = engine.pointer_position();
        if position == state.last {
            None
        } else {
            state.last = position;
            Some((state.on_change.clone(), position))
        }
    };
    if let Some((on_change, position)) = changed {
        trace!(?position, "pointer moved");
        on_change(position);
    }
    // `on_change` may have torn the loop down.
    if frame_loop.borrow().running {
        schedule(&frame_loop, engine.as_ref(), Weak::clone(engine_ref));
    }
}

/// Follows the engine's pointer position on every frame.
///
/// The loop re-arms itself after each frame and is cancelled synchronously
/// on teardown: no callback runs afterwards.
pub struct MousePositionBinding<E: Engine> {
    link: EngineLink<E>,
    lifecycle: Lifecycle,
    frame_loop: Option<Rc<RefCell<FrameLoop>>>,
}

impl<E: Engine> MousePositionBinding<E> {
    #[must_use]
    pub fn new(scope: EngineScope<E>) -> Self {
        Self {
            link: EngineLink::new(scope),
            lifecycle: Lifecycle::Uninitialized,
            frame_loop: None,
        }
    }

    /// Last position reported to `on_change`.
    #[must_use]
    pub fn position(&self) -> Option<Point> {
        self.frame_loop
            .as_ref()
            .and_then(|frame_loop| frame_loop.borrow().last)
    }
}

impl<E: Engine> Binding for MousePositionBinding<E> {
    type Props = MousePositionProps;

    const NAME: &'static str = "mouse-position";

    fn apply(&mut self, props: MousePositionProps) -> BindingResult<()> {
        if self.lifecycle.is_destroyed() {
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        let engine = self.link.resolve()?;
        if let Some(frame_loop) = &self.frame_loop {
            frame_loop.borrow_mut().on_change = props.on_change;
            return Ok(());
        }
        let frame_loop = Rc::new(RefCell::new(FrameLoop {
            on_change: props.on_change,
            last: None,
            request: None,
            running: true,
        }));
        schedule(&frame_loop, engine.as_ref(), self.link.weak());
        self.frame_loop = Some(frame_loop);
        self.lifecycle = Lifecycle::Ready;
        debug!("pointer frame loop started");
        Ok(())
    }

    fn teardown(&mut self) {
        if self.lifecycle.is_destroyed() {
            return;
        }
        self.lifecycle = Lifecycle::Destroyed;
        let Some(frame_loop) = self.frame_loop.take() else {
            return;
        };
        let request = {
            let mut state = frame_loop.borrow_mut();
            state.running = false;
            state.request.take()
        };
        if let (Some(request), Some(engine)) = (request, self.link.upgrade()) {
            engine.cancel_frame(request);
        }
        debug!("pointer frame loop stopped");
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}

impl<E: Engine> Drop for MousePositionBinding<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
