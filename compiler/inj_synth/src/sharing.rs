//! Which values are bound to locals, and in which evaluation frame.
//!
//! Frame 0 is the call site; every provider lambda opens the next frame in
//! the order synthesis builds them. A value is shared only with uses in its
//! own frame, so nothing a lambda needs is computed before the lambda runs.

use inj_resolve::{DependencyResult, InjectableKind, ResultKey, Success, ValueResult, ValueSource};
use rustc_hash::FxHashMap;

/// Frame of the call site itself.
pub(crate) const CALL_SITE: u32 = 0;

/// Uses of every bindable value, per frame.
#[derive(Debug, Default)]
pub(crate) struct SharingPlan {
    uses: FxHashMap<(ResultKey, u32), usize>,
}

impl SharingPlan {
    /// Walk `results` the way synthesis will: a bindable value is expanded
    /// at its first use in a frame and only counted afterwards.
    pub fn new(results: &[DependencyResult]) -> Self {
        let mut walk = Walk {
            plan: SharingPlan::default(),
            frames: vec![CALL_SITE],
            next_frame: CALL_SITE + 1,
        };
        for dependency in results {
            walk.dependency(dependency);
        }
        walk.plan
    }

    pub fn uses(&self, key: &ResultKey, frame: u32) -> usize {
        self.uses.get(&(key.clone(), frame)).copied().unwrap_or(0)
    }

    /// Whether `value` is bound to a local in `frame`.
    pub fn is_shared(&self, value: &ValueResult, frame: u32) -> bool {
        is_bindable(value) && self.uses(&value.key, frame) > 1
    }
}

struct Walk {
    plan: SharingPlan,
    frames: Vec<u32>,
    next_frame: u32,
}

impl Walk {
    fn dependency(&mut self, dependency: &DependencyResult) {
        if let Success::Value(value) = &dependency.result {
            inj_stack::ensure_sufficient_stack(|| self.value(value));
        }
    }

    fn value(&mut self, value: &ValueResult) {
        if is_bindable(value) {
            let frame = self.frames.last().copied().unwrap_or(CALL_SITE);
            let count = self.plan.uses.entry((value.key.clone(), frame)).or_insert(0);
            *count += 1;
            if *count > 1 {
                return;
            }
        }
        match &value.injectable.kind {
            InjectableKind::Callable(callable) if callable.source != ValueSource::Call => {}
            InjectableKind::Provider { .. } => {
                self.frames.push(self.next_frame);
                self.next_frame += 1;
                if let Some(instance) = value.dependencies.first() {
                    self.dependency(instance);
                }
                self.frames.pop();
            }
            _ => {
                for dependency in &value.dependencies {
                    self.dependency(dependency);
                }
            }
        }
    }
}

/// Calls can be bound; reads and built-ins are cheap to repeat. Values
/// inside a cycle depend on the temporary and stay inline.
fn is_bindable(value: &ValueResult) -> bool {
    let is_call = matches!(
        &value.injectable.kind,
        InjectableKind::Callable(callable) if callable.source == ValueSource::Call
    );
    is_call && !value.is_in_between_circular_dependency()
}
