//! Pointer/touch capture.
//!
//! Platform bindings translate their native events into [`RawInput`] once,
//! normalize it to a [`PointerSample`] and feed that into a
//! [`CaptureMachine`]. The machine itself never sees mouse vs. touch event
//! types, only the sample's [`SourceId`].

/// Surface-local logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Which contact produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceId {
    Mouse,
    Touch(i32)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub position: Point,
    pub source:   SourceId
}

impl PointerSample {
    pub fn mouse(x: f32, y: f32) -> Self {
        Self {
            position: Point::new(x, y),
            source:   SourceId::Mouse
        }
    }

    pub fn touch(id: i32, x: f32, y: f32) -> Self {
        Self {
            position: Point::new(x, y),
            source:   SourceId::Touch(id)
        }
    }
}

/// Viewport origin of the rendered surface (`getBoundingClientRect`).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingRect {
    pub left: f64,
    pub top:  f64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub identifier: i32,
    pub client_x:   f64,
    pub client_y:   f64
}

/// A native input event, already stripped down to what capture needs.
#[derive(Debug, Clone, Copy)]
pub enum RawInput<'a> {
    Mouse {
        client_x: f64,
        client_y: f64
    },
    Touch {
        changed: &'a [TouchPoint],
        touches: &'a [TouchPoint]
    }
}

impl RawInput<'_> {
    /// Resolve to one surface-local sample. Touch input prefers
    /// `changedTouches[0]`, then `touches[0]`; with neither there is nothing
    /// to sample.
    pub fn normalize(&self, rect: BoundingRect) -> Option<PointerSample> {
        let (client_x, client_y, source) = match *self {
            Self::Mouse { client_x, client_y } => (client_x, client_y, SourceId::Mouse),
            Self::Touch { changed, touches } => {
                let touch = changed.first().or_else(|| touches.first())?;
                (touch.client_x, touch.client_y, SourceId::Touch(touch.identifier))
            }
        };
        Some(PointerSample {
            position: Point::new((client_x - rect.left) as f32, (client_y - rect.top) as f32),
            source
        })
    }

    /// Like [`normalize`](Self::normalize), but picks the `active` touch out
    /// of `changedTouches` when it is there.
    pub fn normalize_for(&self, rect: BoundingRect, active: Option<i32>) -> Option<PointerSample> {
        if let (Self::Touch { changed, .. }, Some(id)) = (*self, active) {
            if let Some(touch) = changed.iter().find(|t| t.identifier == id) {
                return Some(PointerSample::touch(
                    id,
                    (touch.client_x - rect.left) as f32,
                    (touch.client_y - rect.top) as f32
                ));
            }
        }
        self.normalize(rect)
    }

    /// Every contact an end/cancel event released.
    pub fn lifted(&self) -> Vec<SourceId> {
        match *self {
            Self::Mouse { .. } => vec![SourceId::Mouse],
            Self::Touch { changed: [], touches } => touches
                .first()
                .map(|t| SourceId::Touch(t.identifier))
                .into_iter()
                .collect(),
            Self::Touch { changed, .. } => changed.iter().map(|t| SourceId::Touch(t.identifier)).collect()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Drawing {
        last:     Point,
        touch_id: Option<i32>
    }
}

/// What a sample did to the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// Dropped: wrong state or a contact other than the active one.
    Ignored,
    Began(Point),
    Segment { from: Point, to: Point },
    Ended
}

#[derive(Debug, Default)]
pub struct CaptureMachine {
    state: CaptureState
}

impl CaptureMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, CaptureState::Drawing { .. })
    }

    /// Identifier of the touch driving the current stroke.
    pub fn active_touch(&self) -> Option<i32> {
        match self.state {
            CaptureState::Drawing { touch_id, .. } => touch_id,
            CaptureState::Idle => None
        }
    }

    /// Touch-move must cancel page scroll while this holds.
    pub fn locks_scroll(&self) -> bool {
        self.is_drawing()
    }

    /// Pointer-down / touch-start. Only one stroke at a time; a second
    /// contact landing mid-stroke is ignored.
    pub fn start(&mut self, sample: PointerSample) -> Transition {
        if self.is_drawing() {
            log::debug!("start from {:?} ignored, stroke in progress", sample.source);
            return Transition::Ignored;
        }
        let touch_id = match sample.source {
            SourceId::Touch(id) => Some(id),
            SourceId::Mouse => None
        };
        self.state = CaptureState::Drawing {
            last: sample.position,
            touch_id
        };
        Transition::Began(sample.position)
    }

    /// Pointer-move / touch-move.
    pub fn advance(&mut self, sample: PointerSample) -> Transition {
        let CaptureState::Drawing { last, touch_id } = self.state else {
            return Transition::Ignored;
        };
        if !owns(touch_id, sample.source) {
            return Transition::Ignored;
        }
        self.state = CaptureState::Drawing {
            last: sample.position,
            touch_id
        };
        Transition::Segment {
            from: last,
            to:   sample.position
        }
    }

    /// Pointer-up/leave/out, touch-end/cancel. `lifted` lists every contact
    /// the event released; the stroke ends if its own contact is among them.
    /// Repeated stops are no-ops.
    pub fn stop(&mut self, lifted: &[SourceId]) -> Transition {
        let CaptureState::Drawing { touch_id, .. } = self.state else {
            return Transition::Ignored;
        };
        if !lifted.iter().any(|source| owns(touch_id, *source)) {
            return Transition::Ignored;
        }
        self.state = CaptureState::Idle;
        Transition::Ended
    }

    /// Drop any stroke in progress without notifying anyone.
    pub fn reset(&mut self) {
        self.state = CaptureState::Idle;
    }
}

fn owns(active_touch: Option<i32>, source: SourceId) -> bool {
    match (active_touch, source) {
        (None, SourceId::Mouse) => true,
        (Some(active), SourceId::Touch(id)) => active == id,
        _ => false
    }
}
