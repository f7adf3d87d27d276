//! Nullability facts for stable values.
//!
//! A value is stable when nothing can change it between a check and a use:
//! a local `val`, a function parameter, or a `val` declared by the script.
//! `x != null` in a condition records that `x` is non-null on the branch
//! where the condition holds; later reads of `x` there are smart casts.

use kite_types::DescriptorId;
use rustc_hash::FxHashSet;
use std::rc::Rc;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataFlowInfo {
    non_null: FxHashSet<DescriptorId>,
}

impl DataFlowInfo {
    pub fn empty() -> Rc<Self> {
        Rc::new(DataFlowInfo::default())
    }

    pub fn is_definitely_not_null(&self, value: DescriptorId) -> bool {
        self.non_null.contains(&value)
    }

    pub fn is_empty(&self) -> bool {
        self.non_null.is_empty()
    }

    pub fn with_not_null(self: &Rc<Self>, value: DescriptorId) -> Rc<Self> {
        if self.non_null.contains(&value) {
            return Rc::clone(self);
        }
        let mut next = (**self).clone();
        next.non_null.insert(value);
        Rc::new(next)
    }

    /// Facts that hold when both `self` and `other` hold.
    pub fn and(self: &Rc<Self>, other: &Rc<Self>) -> Rc<Self> {
        if other.non_null.is_subset(&self.non_null) {
            return Rc::clone(self);
        }
        let mut next = (**self).clone();
        next.non_null.extend(other.non_null.iter().copied());
        Rc::new(next)
    }

    /// Facts that hold when either `self` or `other` holds.
    pub fn or(self: &Rc<Self>, other: &Rc<Self>) -> Rc<Self> {
        if self.non_null.is_subset(&other.non_null) {
            return Rc::clone(self);
        }
        Rc::new(DataFlowInfo {
            non_null: self.non_null.intersection(&other.non_null).copied().collect(),
        })
    }
}

/// Data flow on the two outcomes of a boolean condition.
#[derive(Clone, Debug)]
pub struct ConditionalDataFlow {
    pub when_true: Rc<DataFlowInfo>,
    pub when_false: Rc<DataFlowInfo>,
}

impl ConditionalDataFlow {
    pub fn unchanged(info: &Rc<DataFlowInfo>) -> Self {
        ConditionalDataFlow {
            when_true: Rc::clone(info),
            when_false: Rc::clone(info),
        }
    }

    pub fn negate(self) -> Self {
        ConditionalDataFlow {
            when_true: self.when_false,
            when_false: self.when_true,
        }
    }
}
