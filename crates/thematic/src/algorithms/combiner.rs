//! Multivariate class combination.
//!
//! ## Purpose
//!
//! This module composes two or three independently classified variables
//! into one joint class index, as used by bivariate (and trivariate)
//! choropleth maps.
//!
//! ## Design notes
//!
//! * **Stateless**: A [`Combiner`] holds cloned breaks only; it is rebuilt
//!   whenever any of the underlying classifications change.
//! * **Mixed radix**: The joint index nests variables left to right, so with
//!   class counts `(n_a, n_b)` the index is `n_b * class(a) + class(b)`.
//!
//! ## Invariants
//!
//! * `combine` returns `JointClass::Class(i)` with `i < joint_classes()`, or
//!   `JointClass::NoData`; never both meanings at once.

// External dependencies
use num_traits::Float;

// Internal dependencies
use crate::algorithms::classification::{class_of, IntervalClosure};
use crate::primitives::errors::ThematicError;

/// Class count required per variable by bivariate and trivariate maps.
pub const CANONICAL_CLASSES: usize = 3;

// ============================================================================
// Classed Variable
// ============================================================================

/// Breaks and closure of one classified variable.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassedVariable<T> {
    /// Final breaks (length = classes + 1).
    pub breaks: Vec<T>,

    /// Closure used to assign values.
    pub closure: IntervalClosure,
}

impl<T: Float> ClassedVariable<T> {
    /// Create a classed variable from its breaks.
    pub fn new(breaks: Vec<T>, closure: IntervalClosure) -> Self {
        Self { breaks, closure }
    }

    /// Number of classes.
    pub fn classes(&self) -> usize {
        self.breaks.len().saturating_sub(1)
    }
}

// ============================================================================
// Joint Class
// ============================================================================

/// Result of combining one value per variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointClass {
    /// Joint class index.
    Class(usize),

    /// At least one variable was missing or outside its breaks.
    NoData,
}

impl JointClass {
    /// Index of the joint class, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            JointClass::Class(i) => Some(*i),
            JointClass::NoData => None,
        }
    }
}

// ============================================================================
// Combiner
// ============================================================================

/// Joint classification of two or three variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Combiner<T> {
    variables: Vec<ClassedVariable<T>>,
}

impl<T: Float> Combiner<T> {
    /// Bivariate 3x3 combination.
    pub fn bivariate<A, B>(a: A, b: B) -> Result<Self, ThematicError>
    where
        A: Into<ClassedVariable<T>>,
        B: Into<ClassedVariable<T>>,
    {
        Self::canonical(vec![a.into(), b.into()])
    }

    /// Trivariate 3x3x3 combination.
    pub fn trivariate<A, B, C>(a: A, b: B, c: C) -> Result<Self, ThematicError>
    where
        A: Into<ClassedVariable<T>>,
        B: Into<ClassedVariable<T>>,
        C: Into<ClassedVariable<T>>,
    {
        Self::canonical(vec![a.into(), b.into(), c.into()])
    }

    /// General nesting of two or three variables with any class counts.
    pub fn from_results<I, V>(variables: I) -> Result<Self, ThematicError>
    where
        I: IntoIterator<Item = V>,
        V: Into<ClassedVariable<T>>,
    {
        let variables: Vec<ClassedVariable<T>> = variables.into_iter().map(Into::into).collect();
        if !(2..=3).contains(&variables.len()) {
            return Err(ThematicError::invalid_parameter(
                "variables",
                variables.len() as f64,
                "must combine two or three variables",
            ));
        }
        if let Some(v) = variables.iter().find(|v| v.classes() == 0) {
            return Err(ThematicError::invalid_parameter(
                "classes",
                v.classes() as f64,
                "every variable needs at least one class",
            ));
        }
        Ok(Self { variables })
    }

    fn canonical(variables: Vec<ClassedVariable<T>>) -> Result<Self, ThematicError> {
        if let Some(v) = variables
            .iter()
            .find(|v| v.classes() != CANONICAL_CLASSES)
        {
            return Err(ThematicError::invalid_parameter(
                "classes",
                v.classes() as f64,
                "multivariate composition requires exactly 3 classes per variable",
            ));
        }
        Self::from_results(variables)
    }

    /// Class count of every variable, in nesting order.
    pub fn class_counts(&self) -> Vec<usize> {
        self.variables.iter().map(ClassedVariable::classes).collect()
    }

    /// Number of joint classes.
    pub fn joint_classes(&self) -> usize {
        self.variables.iter().map(ClassedVariable::classes).product()
    }

    /// Joint class of a tuple of class indices.
    pub fn combine_classes(&self, classes: &[usize]) -> Option<usize> {
        if classes.len() != self.variables.len() {
            return None;
        }
        self.variables
            .iter()
            .zip(classes)
            .try_fold(0usize, |acc, (v, &c)| {
                (c < v.classes()).then(|| acc * v.classes() + c)
            })
    }

    /// Joint class of a tuple of raw values (one per variable).
    pub fn combine(&self, values: &[T]) -> JointClass {
        if values.len() != self.variables.len() {
            return JointClass::NoData;
        }
        let classes: Option<Vec<usize>> = self
            .variables
            .iter()
            .zip(values)
            .map(|(v, &x)| class_of(x, &v.breaks, v.closure))
            .collect();
        classes
            .and_then(|c| self.combine_classes(&c))
            .map_or(JointClass::NoData, JointClass::Class)
    }
}
