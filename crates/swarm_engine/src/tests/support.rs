//! Test doubles for pooled objects

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::SpawnError;
use crate::foundation::math::{Transform, Vec3};
use crate::instancing::InstanceId;
use crate::pooling::{ActivationFlags, HandoffData, ObjectFactory, PooledObject, Promotable, Promotion};

/// One hook invocation, tagged with the object's spawn order
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HookCall {
    Promote {
        object: usize,
        id: InstanceId,
        handoff: Option<u32>,
        entity_id: Option<u64>,
    },
    Demote {
        object: usize,
    },
    Transform {
        object: usize,
        transform: Transform,
    },
    Target {
        object: usize,
        target: Vec3,
    },
    Speed {
        object: usize,
        speed: f32,
    },
}

#[derive(Default)]
struct HookState {
    calls: Vec<HookCall>,
    activation: Vec<ActivationFlags>,
}

/// Shared record of everything the fake objects were told
#[derive(Clone, Default)]
pub(crate) struct HookLog(Rc<RefCell<HookState>>);

impl HookLog {
    pub fn calls(&self) -> Vec<HookCall> {
        self.0.borrow().calls.clone()
    }

    pub fn promotions(&self) -> Vec<HookCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, HookCall::Promote { .. }))
            .collect()
    }

    pub fn activation_of(&self, object: usize) -> Option<ActivationFlags> {
        self.0.borrow().activation.get(object).copied()
    }

    pub fn spawned(&self) -> usize {
        self.0.borrow().activation.len()
    }

    fn push(&self, call: HookCall) {
        self.0.borrow_mut().calls.push(call);
    }

    fn register(&self) -> usize {
        let mut state = self.0.borrow_mut();
        state.activation.push(ActivationFlags::all());
        state.activation.len() - 1
    }

    fn set_activation(&self, object: usize, flags: ActivationFlags) {
        if let Some(slot) = self.0.borrow_mut().activation.get_mut(object) {
            *slot = flags;
        }
    }
}

/// Object that records its hooks and counts its own demotions
///
/// The demotion count is handed back on demote and restored on the next
/// promotion, so tests can see handoff data survive a round trip.
pub(crate) struct FakeObject {
    index: usize,
    transform: Transform,
    demotions: u32,
    promotable: bool,
    log: HookLog,
}

impl PooledObject for FakeObject {
    fn transform(&self) -> Transform {
        self.transform
    }

    fn set_transform(&mut self, transform: &Transform) {
        self.transform = *transform;
    }

    fn set_activation(&mut self, flags: ActivationFlags) {
        self.log.set_activation(self.index, flags);
    }

    fn as_promotable_mut(&mut self) -> Option<&mut dyn Promotable> {
        if self.promotable {
            Some(self)
        } else {
            None
        }
    }
}

impl Promotable for FakeObject {
    fn on_promote(&mut self, promotion: Promotion) {
        let handoff = promotion
            .handoff
            .and_then(|data| data.downcast::<u32>().ok())
            .map(|count| *count);
        if let Some(count) = handoff {
            self.demotions = count;
        }
        self.log.push(HookCall::Promote {
            object: self.index,
            id: promotion.id,
            handoff,
            entity_id: promotion.entity_id,
        });
    }

    fn on_demote(&mut self) -> Option<HandoffData> {
        self.demotions += 1;
        self.log.push(HookCall::Demote { object: self.index });
        Some(Box::new(self.demotions))
    }

    fn on_transform_update(&mut self, transform: &Transform) {
        self.transform = *transform;
        self.log.push(HookCall::Transform {
            object: self.index,
            transform: *transform,
        });
    }

    fn on_target_update(&mut self, target: Vec3) {
        self.log.push(HookCall::Target {
            object: self.index,
            target,
        });
    }

    fn on_speed_update(&mut self, speed: f32) {
        self.log.push(HookCall::Speed {
            object: self.index,
            speed,
        });
    }
}

/// Factory producing [`FakeObject`]s
pub(crate) struct FakeFactory {
    log: HookLog,
    promotable: bool,
}

impl FakeFactory {
    pub fn new(log: HookLog) -> Self {
        Self { log, promotable: true }
    }

    /// Objects without promotion hooks
    pub fn plain(log: HookLog) -> Self {
        Self { log, promotable: false }
    }
}

impl ObjectFactory for FakeFactory {
    fn spawn(&mut self, transform: &Transform) -> Result<Box<dyn PooledObject>, SpawnError> {
        let index = self.log.register();
        Ok(Box::new(FakeObject {
            index,
            transform: *transform,
            demotions: 0,
            promotable: self.promotable,
            log: self.log.clone(),
        }))
    }
}
